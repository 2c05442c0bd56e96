use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::catalog::{CatalogReader, PartId, PartSnapshot};
use crate::domain::customer::CustomerId;
use super::aggregate::{OrderDraft, OrderItemDraft, StatusHistoryDraft};
use super::errors::CheckoutError;
use super::value_objects::{compute_tax, line_total, OrderLineRequest, OrderStatus, DEFAULT_TAX_RATE};

// ============================================================================
// Order Builder
// ============================================================================
//
// Turns requested lines into a priced, validated draft. Holds no state
// besides the tax rate. Stock is checked against the snapshot read once per
// checkout, summed per part over repeated lines; the store re-checks it
// inside the commit.
//
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct OrderBuilder {
    tax_rate: Decimal,
}

impl Default for OrderBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_TAX_RATE)
    }
}

impl OrderBuilder {
    pub fn new(tax_rate: Decimal) -> Self {
        Self { tax_rate }
    }

    /// Read a fresh price/stock snapshot and price the request against it
    pub async fn build(
        &self,
        customer_id: CustomerId,
        lines: &[OrderLineRequest],
        catalog: &dyn CatalogReader,
        now: DateTime<Utc>,
    ) -> Result<OrderDraft, CheckoutError> {
        if lines.is_empty() {
            return Err(CheckoutError::EmptyOrder);
        }

        let part_ids = distinct_part_ids(lines);
        let prices = catalog.get_prices(&part_ids).await?;

        tracing::debug!(
            requested_parts = part_ids.len(),
            found_parts = prices.len(),
            "Loaded price snapshot"
        );

        self.price(customer_id, lines, &prices, now)
    }

    /// Validate every line in input order and compute the totals.
    ///
    /// The first failing line aborts the whole draft.
    pub fn price(
        &self,
        customer_id: CustomerId,
        lines: &[OrderLineRequest],
        prices: &HashMap<PartId, PartSnapshot>,
        now: DateTime<Utc>,
    ) -> Result<OrderDraft, CheckoutError> {
        if lines.is_empty() {
            return Err(CheckoutError::EmptyOrder);
        }

        let mut items = Vec::with_capacity(lines.len());
        let mut subtotal = Decimal::ZERO;
        // Units claimed so far per part, across repeated lines
        let mut claimed: HashMap<PartId, i64> = HashMap::new();

        for line in lines {
            let part = prices
                .get(&line.part_id)
                .ok_or(CheckoutError::PartNotFound(line.part_id))?;

            if line.quantity <= 0 {
                return Err(CheckoutError::InvalidQuantity {
                    part_id: line.part_id,
                    quantity: line.quantity,
                });
            }

            let total = claimed.entry(line.part_id).or_insert(0);
            *total += i64::from(line.quantity);
            if *total > i64::from(part.quantity_in_stock) {
                return Err(CheckoutError::InsufficientStock {
                    part_id: line.part_id,
                    requested: *total,
                    available: part.quantity_in_stock,
                });
            }

            subtotal += line_total(part.price, line.quantity);
            items.push(OrderItemDraft {
                part_id: line.part_id,
                part_name: part.name.clone(),
                sku: part.sku.clone(),
                quantity: line.quantity,
                unit_price: part.price,
            });
        }

        let tax = compute_tax(subtotal, self.tax_rate);
        let total = subtotal + tax;

        Ok(OrderDraft {
            customer_id,
            created_at: now,
            subtotal,
            tax,
            total,
            status: OrderStatus::Pending,
            items,
            status_history: vec![StatusHistoryDraft {
                status: OrderStatus::Pending,
                changed_at: now,
            }],
        })
    }
}

/// Requested part ids without duplicates, in first-seen order
fn distinct_part_ids(lines: &[OrderLineRequest]) -> Vec<PartId> {
    let mut seen = HashSet::new();
    lines
        .iter()
        .map(|line| line.part_id)
        .filter(|part_id| seen.insert(*part_id))
        .collect()
}

// ============================================================================
// Unit Tests
// ============================================================================
