use std::sync::Arc;

use crate::domain::customer::CustomerDirectory;
use super::commands::{GetCustomerOrders, GetMyOrders, GetOrder, GetRecentOrders, SearchOrders};
use super::errors::CheckoutError;
use super::store::OrderStore;
use super::value_objects::MAX_PAGE_SIZE;
use super::views::{OrderPage, OrderView};

// ============================================================================
// Order Query Handler - read side over the Order Repository
// ============================================================================

pub struct OrderQueryHandler {
    customers: Arc<dyn CustomerDirectory>,
    orders: Arc<dyn OrderStore>,
}

impl OrderQueryHandler {
    pub fn new(customers: Arc<dyn CustomerDirectory>, orders: Arc<dyn OrderStore>) -> Self {
        Self { customers, orders }
    }

    pub async fn get_order(&self, query: GetOrder) -> Result<Option<OrderView>, CheckoutError> {
        let view = self
            .orders
            .find_order(query.order_id, query.include_history)
            .await?;

        if view.is_none() {
            tracing::debug!(order_id = %query.order_id, "Order not found");
        }
        Ok(view)
    }

    /// Orders of the customer linked to the principal, newest first
    pub async fn my_orders(&self, query: GetMyOrders) -> Result<Vec<OrderView>, CheckoutError> {
        let customer_id = self
            .customers
            .resolve(&query.principal)
            .await?
            .ok_or(CheckoutError::CustomerProfileNotFound)?;

        let orders = self.orders.list_customer_orders(customer_id).await?;
        tracing::debug!(
            customer_id = %customer_id,
            order_count = orders.len(),
            "Listed customer orders"
        );
        Ok(orders)
    }

    /// Newest orders across all customers, at most `MAX_PAGE_SIZE`
    pub async fn recent_orders(&self, query: GetRecentOrders) -> Result<Vec<OrderView>, CheckoutError> {
        let limit = query.limit.min(MAX_PAGE_SIZE);
        Ok(self.orders.recent_orders(limit).await?)
    }

    /// Orders of any customer by id. An unknown customer has no orders.
    pub async fn customer_orders(&self, query: GetCustomerOrders) -> Result<Vec<OrderView>, CheckoutError> {
        Ok(self.orders.list_customer_orders(query.customer_id).await?)
    }

    pub async fn search_orders(&self, query: SearchOrders) -> Result<OrderPage, CheckoutError> {
        let page = self.orders.search_orders(&query.filter, query.page).await?;
        tracing::debug!(
            page = query.page.page,
            page_size = query.page.page_size,
            returned = page.orders.len(),
            total = page.total,
            "Searched orders"
        );
        Ok(page)
    }
}
