use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::catalog::PartId;
use crate::domain::customer::CustomerId;
use super::aggregate::Order;
use super::value_objects::{OrderId, OrderStatus};

// ============================================================================
// Order Views - the one canonical representation handed to callers
// ============================================================================

/// Display data of a part, joined onto order lines
#[derive(Debug, Clone, PartialEq)]
pub struct PartLabel {
    pub name: String,
    pub sku: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineView {
    pub part_id: PartId,
    pub part_name: String,
    pub sku: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryView {
    pub status: OrderStatus,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub created_at: DateTime<Utc>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub status: OrderStatus,
    pub items: Vec<OrderLineView>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub status_history: Option<Vec<StatusHistoryView>>,
}

/// One page of a staff listing, with the match count before paging
#[derive(Debug, Clone, PartialEq)]
pub struct OrderPage {
    pub orders: Vec<OrderView>,
    pub total: u64,
}

impl OrderView {
    /// Build the view of `order`, labelling lines from `labels`.
    ///
    /// A part missing from `labels` (deleted from the catalog since) keeps its
    /// id and snapshot price but gets empty name and sku.
    pub fn from_order(order: &Order, labels: &HashMap<PartId, PartLabel>, include_history: bool) -> Self {
        let items = order
            .items
            .iter()
            .map(|item| {
                let (part_name, sku) = labels
                    .get(&item.part_id)
                    .map(|label| (label.name.clone(), label.sku.clone()))
                    .unwrap_or_default();

                OrderLineView {
                    part_id: item.part_id,
                    part_name,
                    sku,
                    unit_price: item.unit_price,
                    quantity: item.quantity,
                    line_total: item.line_total(),
                }
            })
            .collect();

        let status_history = include_history.then(|| {
            let mut history: Vec<StatusHistoryView> = order
                .status_history
                .iter()
                .map(|entry| StatusHistoryView {
                    status: entry.status,
                    changed_at: entry.changed_at,
                })
                .collect();
            history.sort_by_key(|entry| entry.changed_at);
            history
        });

        Self {
            id: order.id,
            customer_id: order.customer_id,
            created_at: order.created_at,
            subtotal: order.subtotal,
            tax: order.tax,
            total: order.total,
            status: order.status,
            items,
            status_history,
        }
    }
}
