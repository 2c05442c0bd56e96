use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::catalog::{aggregate_decrements, PartId, StockDecrement};
use crate::domain::customer::CustomerId;
use super::value_objects::{line_total, OrderId, OrderStatus};

// ============================================================================
// Order Draft - validated and priced, not yet persisted
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItemDraft {
    pub part_id: PartId,
    pub part_name: String,
    pub sku: String,
    pub quantity: i32,
    /// Price read at checkout; the order never looks at the catalog price again
    pub unit_price: Decimal,
}

impl OrderItemDraft {
    pub fn line_total(&self) -> Decimal {
        line_total(self.unit_price, self.quantity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusHistoryDraft {
    pub status: OrderStatus,
    pub changed_at: DateTime<Utc>,
}

/// Output of the order builder, input of `OrderStore::commit_atomic`
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    pub customer_id: CustomerId,
    pub created_at: DateTime<Utc>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub status: OrderStatus,
    pub items: Vec<OrderItemDraft>,
    pub status_history: Vec<StatusHistoryDraft>,
}

impl OrderDraft {
    /// One decrement per distinct part, summed over all lines for that part
    pub fn stock_decrements(&self) -> Vec<StockDecrement> {
        aggregate_decrements(self.items.iter().map(|item| (item.part_id, item.quantity)))
    }

    /// Check the totals and history invariants before the draft is committed
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.items.is_empty() {
            return Err("order has no items".to_string());
        }

        let subtotal: Decimal = self.items.iter().map(OrderItemDraft::line_total).sum();
        if subtotal != self.subtotal {
            return Err(format!("subtotal {} != sum of lines {}", self.subtotal, subtotal));
        }
        if self.subtotal + self.tax != self.total {
            return Err(format!(
                "total {} != subtotal {} + tax {}",
                self.total, self.subtotal, self.tax
            ));
        }

        match self.status_history.first() {
            Some(first) if first.status == OrderStatus::Pending && first.changed_at == self.created_at => Ok(()),
            Some(first) => Err(format!(
                "first history entry is {} at {}, order created at {}",
                first.status, first.changed_at, self.created_at
            )),
            None => Err("order has no status history".to_string()),
        }
    }

    /// The draft as persisted, given the identities the store assigned.
    ///
    /// `item_ids` and `history_ids` follow the draft's own ordering.
    pub fn into_order(self, id: OrderId, item_ids: &[i64], history_ids: &[i64]) -> Order {
        debug_assert_eq!(item_ids.len(), self.items.len());
        debug_assert_eq!(history_ids.len(), self.status_history.len());

        let items = self
            .items
            .into_iter()
            .zip(item_ids)
            .map(|(item, item_id)| OrderItem {
                id: *item_id,
                order_id: id,
                part_id: item.part_id,
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
            .collect();

        let status_history = self
            .status_history
            .into_iter()
            .zip(history_ids)
            .map(|(entry, entry_id)| OrderStatusHistory {
                id: *entry_id,
                order_id: id,
                status: entry.status,
                changed_at: entry.changed_at,
            })
            .collect();

        Order {
            id,
            customer_id: self.customer_id,
            created_at: self.created_at,
            subtotal: self.subtotal,
            tax: self.tax,
            total: self.total,
            status: self.status,
            items,
            status_history,
        }
    }
}

// ============================================================================
// Persisted Order Graph
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: OrderId,
    pub part_id: PartId,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        line_total(self.unit_price, self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusHistory {
    pub id: i64,
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub created_at: DateTime<Utc>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub status_history: Vec<OrderStatusHistory>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> OrderDraft {
        let now = Utc::now();
        OrderDraft {
            customer_id: CustomerId(3),
            created_at: now,
            subtotal: Decimal::new(5997, 2),
            tax: Decimal::new(1199, 2),
            total: Decimal::new(7196, 2),
            status: OrderStatus::Pending,
            items: vec![
                OrderItemDraft {
                    part_id: PartId(2),
                    part_name: "Oil filter".into(),
                    sku: "OF-2".into(),
                    quantity: 1,
                    unit_price: Decimal::new(1999, 2),
                },
                OrderItemDraft {
                    part_id: PartId(2),
                    part_name: "Oil filter".into(),
                    sku: "OF-2".into(),
                    quantity: 2,
                    unit_price: Decimal::new(1999, 2),
                },
            ],
            status_history: vec![StatusHistoryDraft {
                status: OrderStatus::Pending,
                changed_at: now,
            }],
        }
    }

    #[test]
    fn test_stock_decrements_sum_repeated_parts() {
        assert_eq!(
            draft().stock_decrements(),
            vec![StockDecrement { part_id: PartId(2), quantity: 3 }]
        );
    }

    #[test]
    fn test_into_order_assigns_ids_in_draft_order() {
        let order = draft().into_order(OrderId(10), &[100, 101], &[500]);

        assert_eq!(order.id, OrderId(10));
        assert_eq!(order.items[0].id, 100);
        assert_eq!(order.items[1].quantity, 2);
        assert!(order.items.iter().all(|item| item.order_id == OrderId(10)));
        assert_eq!(order.status_history[0].id, 500);
    }

    #[test]
    fn test_check_invariants_accepts_consistent_draft() {
        assert!(draft().check_invariants().is_ok());
    }

    #[test]
    fn test_check_invariants_detects_bad_total() {
        let mut bad = draft();
        bad.total = Decimal::new(1, 0);
        assert!(bad.check_invariants().unwrap_err().starts_with("total"));
    }

    #[test]
    fn test_check_invariants_detects_missing_history() {
        let mut bad = draft();
        bad.status_history.clear();
        assert_eq!(bad.check_invariants().unwrap_err(), "order has no status history");
    }
}
