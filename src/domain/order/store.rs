use async_trait::async_trait;

use crate::domain::catalog::{StockDecrement, StoreError};
use crate::domain::customer::CustomerId;
use super::aggregate::{Order, OrderDraft};
use super::errors::CommitError;
use super::value_objects::{OrderFilter, OrderId, PageRequest};
use super::views::{OrderPage, OrderView};

// ============================================================================
// Order Repository
// ============================================================================

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist the order, its items, its initial status history and every
    /// stock decrement as one unit.
    ///
    /// Each decrement is re-checked against the live count inside the unit;
    /// on any failure nothing is persisted and no stock moves.
    async fn commit_atomic(&self, draft: &OrderDraft, decrements: &[StockDecrement]) -> Result<Order, CommitError>;

    async fn find_order(&self, id: OrderId, include_history: bool) -> Result<Option<OrderView>, StoreError>;

    /// Orders of one customer, newest first
    async fn list_customer_orders(&self, customer_id: CustomerId) -> Result<Vec<OrderView>, StoreError>;

    /// The `limit` newest orders of all customers
    async fn recent_orders(&self, limit: u32) -> Result<Vec<OrderView>, StoreError>;

    /// Filtered orders, newest first, cut to one page
    async fn search_orders(&self, filter: &OrderFilter, page: PageRequest) -> Result<OrderPage, StoreError>;
}
