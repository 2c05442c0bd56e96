use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::Instrument;
use uuid::Uuid;

use crate::domain::catalog::CatalogReader;
use crate::domain::customer::CustomerDirectory;
use crate::utils::IsTransient;
use super::builder::OrderBuilder;
use super::commands::PlaceOrder;
use super::errors::CheckoutError;
use super::store::OrderStore;
use super::views::{OrderView, PartLabel};

// ============================================================================
// Checkout Command Handler
// ============================================================================
//
// Orchestrates: Principal → Customer → Draft (priced snapshot) → Atomic Commit
//
// ============================================================================

pub struct CheckoutHandler {
    customers: Arc<dyn CustomerDirectory>,
    catalog: Arc<dyn CatalogReader>,
    orders: Arc<dyn OrderStore>,
    builder: OrderBuilder,
}

impl CheckoutHandler {
    pub fn new(
        customers: Arc<dyn CustomerDirectory>,
        catalog: Arc<dyn CatalogReader>,
        orders: Arc<dyn OrderStore>,
        builder: OrderBuilder,
    ) -> Self {
        Self {
            customers,
            catalog,
            orders,
            builder,
        }
    }

    /// Place one order. Every failure leaves stock and orders untouched.
    pub async fn handle(&self, command: PlaceOrder) -> Result<OrderView, CheckoutError> {
        let correlation_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "checkout",
            correlation_id = %correlation_id,
            principal_id = %command.principal,
        );

        async move {
            let result = self.place(&command).await;
            match &result {
                Ok(view) => tracing::info!(
                    order_id = %view.id,
                    customer_id = %view.customer_id,
                    item_count = view.items.len(),
                    total = %view.total,
                    "✅ Order placed"
                ),
                Err(err) if err.is_transient() => tracing::error!(
                    error = %err,
                    kind = err.kind(),
                    "❌ Checkout failed"
                ),
                Err(err) => tracing::warn!(
                    error = %err,
                    kind = err.kind(),
                    "Checkout rejected"
                ),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn place(&self, command: &PlaceOrder) -> Result<OrderView, CheckoutError> {
        // Resolve the principal before looking at the request at all
        let customer_id = self
            .customers
            .resolve(&command.principal)
            .await?
            .ok_or(CheckoutError::CustomerProfileNotFound)?;

        let draft = self
            .builder
            .build(customer_id, &command.lines, self.catalog.as_ref(), Utc::now())
            .await?;
        draft.check_invariants().map_err(CheckoutError::InconsistentDraft)?;

        let labels: HashMap<_, _> = draft
            .items
            .iter()
            .map(|item| {
                (
                    item.part_id,
                    PartLabel {
                        name: item.part_name.clone(),
                        sku: item.sku.clone(),
                    },
                )
            })
            .collect();

        let decrements = draft.stock_decrements();
        tracing::debug!(
            customer_id = %customer_id,
            line_count = draft.items.len(),
            part_count = decrements.len(),
            subtotal = %draft.subtotal,
            "Committing order draft"
        );

        let order = self.orders.commit_atomic(&draft, &decrements).await?;

        Ok(OrderView::from_order(&order, &labels, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::domain::catalog::PartId;
    use crate::domain::customer::PrincipalId;
    use crate::domain::order::{OrderLineRequest, OrderStatus};
    use rust_decimal::Decimal;

    async fn setup() -> (Arc<MemoryStore>, CheckoutHandler) {
        let store = Arc::new(MemoryStore::new());
        store.add_customer("user-1").await;
        store
            .add_part(PartId(1), "Brake pad", "BP-001", Decimal::new(1999, 2), 10)
            .await;
        store
            .add_part(PartId(2), "Air filter", "AF-002", Decimal::new(1250, 2), 1)
            .await;

        let handler = CheckoutHandler::new(
            store.clone(),
            store.clone(),
            store.clone(),
            OrderBuilder::default(),
        );
        (store, handler)
    }

    fn place(principal: &str, lines: Vec<OrderLineRequest>) -> PlaceOrder {
        PlaceOrder::new(PrincipalId::new(principal), lines)
    }

    #[tokio::test]
    async fn test_happy_path_reserves_stock() {
        let (store, handler) = setup().await;

        let view = handler
            .handle(place("user-1", vec![OrderLineRequest::new(1, 2)]))
            .await
            .unwrap();

        assert_eq!(view.subtotal, Decimal::new(3998, 2));
        assert_eq!(view.tax, Decimal::new(800, 2));
        assert_eq!(view.total, Decimal::new(4798, 2));
        assert_eq!(view.status, OrderStatus::Pending);
        assert_eq!(view.items[0].part_name, "Brake pad");
        assert_eq!(view.items[0].sku, "BP-001");
        assert_eq!(view.items[0].line_total, Decimal::new(3998, 2));
        assert_eq!(store.stock_of(PartId(1)).await, Some(8));
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_principal_fails_before_validation() {
        let (store, handler) = setup().await;

        // Empty lines would be EmptyOrder, but the profile check comes first
        let err = handler.handle(place("stranger", vec![])).await.unwrap_err();

        assert_eq!(err, CheckoutError::CustomerProfileNotFound);
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_empty_order_writes_nothing() {
        let (store, handler) = setup().await;

        let err = handler.handle(place("user-1", vec![])).await.unwrap_err();

        assert_eq!(err, CheckoutError::EmptyOrder);
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_insufficient_stock_leaves_stock_alone() {
        let (store, handler) = setup().await;

        let err = handler
            .handle(place("user-1", vec![OrderLineRequest::new(2, 5)]))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            CheckoutError::InsufficientStock {
                part_id: PartId(2),
                requested: 5,
                available: 1,
            }
        );
        assert_eq!(store.stock_of(PartId(2)).await, Some(1));
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_part() {
        let (store, handler) = setup().await;

        let err = handler
            .handle(place(
                "user-1",
                vec![OrderLineRequest::new(1, 1), OrderLineRequest::new(999, 1)],
            ))
            .await
            .unwrap_err();

        assert_eq!(err, CheckoutError::PartNotFound(PartId(999)));
        assert_eq!(store.stock_of(PartId(1)).await, Some(10));
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_duplicate_lines_are_checked_together() {
        let (store, handler) = setup().await;

        // Each line fits the stock on its own, the sum does not
        let err = handler
            .handle(place(
                "user-1",
                vec![OrderLineRequest::new(2, 1), OrderLineRequest::new(2, 1)],
            ))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            CheckoutError::InsufficientStock {
                part_id: PartId(2),
                requested: 2,
                available: 1,
            }
        );
        assert_eq!(store.stock_of(PartId(2)).await, Some(1));
    }

    #[tokio::test]
    async fn test_max_quantity_lines_for_one_part_are_rejected() {
        let (store, handler) = setup().await;
        store
            .add_part(PartId(3), "Wheel nut", "WN-003", Decimal::new(10, 2), i32::MAX)
            .await;

        let err = handler
            .handle(place("user-1", vec![OrderLineRequest::new(3, i32::MAX); 3]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::InsufficientStock { part_id: PartId(3), available: i32::MAX, .. }
        ));
        assert_eq!(store.stock_of(PartId(3)).await, Some(i32::MAX));
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_commit_failure_is_rolled_back() {
        let (store, handler) = setup().await;
        store.fail_next_commit().await;

        let err = handler
            .handle(place("user-1", vec![OrderLineRequest::new(1, 3)]))
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::CommitFailure(_)));
        assert_eq!(store.stock_of(PartId(1)).await, Some(10));
        assert_eq!(store.order_count().await, 0);

        // The fault is one-shot
        handler
            .handle(place("user-1", vec![OrderLineRequest::new(1, 3)]))
            .await
            .unwrap();
        assert_eq!(store.stock_of(PartId(1)).await, Some(7));
    }

    #[tokio::test]
    async fn test_last_unit_race_has_one_winner() {
        let (store, handler) = setup().await;
        let handler = Arc::new(handler);

        let tasks: Vec<_> = (0..2)
            .map(|_| {
                let handler = handler.clone();
                tokio::spawn(async move {
                    handler
                        .handle(place("user-1", vec![OrderLineRequest::new(2, 1)]))
                        .await
                })
            })
            .collect();

        let results: Vec<_> = futures_util::future::join_all(tasks)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect();

        let wins = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1);
        assert!(results.iter().any(|r| matches!(
            r,
            Err(CheckoutError::InsufficientStock { part_id: PartId(2), .. })
        )));
        assert_eq!(store.stock_of(PartId(2)).await, Some(0));
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn test_committed_order_keeps_snapshot_price() {
        let (store, handler) = setup().await;

        let view = handler
            .handle(place("user-1", vec![OrderLineRequest::new(1, 1)]))
            .await
            .unwrap();
        store.set_part_price(PartId(1), Decimal::new(2999, 2)).await;

        let stored = store.find_order(view.id, false).await.unwrap().unwrap();
        assert_eq!(stored.items[0].unit_price, Decimal::new(1999, 2));
        assert_eq!(stored.subtotal, Decimal::new(1999, 2));
    }
}
