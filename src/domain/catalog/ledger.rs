use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;

use super::errors::StoreError;
use super::value_objects::{PartId, PartSnapshot, StockDecrement};

// ============================================================================
// Inventory Ledger
// ============================================================================
//
// Read side: `CatalogReader::get_prices` takes a fresh snapshot per checkout.
// Write side: decrements are never applied on their own. They are handed to
// `OrderStore::commit_atomic` together with the order graph, and the store
// re-checks every count inside its transaction.
//
// ============================================================================

/// Read access to live price and stock counts
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// Snapshot of every requested part that currently exists.
    ///
    /// Ids absent from the returned map do not exist.
    async fn get_prices(&self, part_ids: &[PartId]) -> Result<HashMap<PartId, PartSnapshot>, StoreError>;
}

/// Remaining stock after taking `requested` units, or `None` if there are not enough.
pub fn checked_decrement(available: i32, requested: i64) -> Option<i32> {
    if requested <= 0 || requested > i64::from(available) {
        return None;
    }
    i32::try_from(i64::from(available) - requested).ok()
}

/// Merge per-line quantities into one decrement per part, ordered by part id.
///
/// The ascending order gives every commit the same row lock order. Totals are
/// summed in `i64` and saturate, so they can exceed any stock count but never wrap.
pub fn aggregate_decrements<I>(lines: I) -> Vec<StockDecrement>
where
    I: IntoIterator<Item = (PartId, i32)>,
{
    let mut totals: BTreeMap<PartId, i64> = BTreeMap::new();
    for (part_id, quantity) in lines {
        let total = totals.entry(part_id).or_insert(0);
        *total = total.checked_add(i64::from(quantity)).unwrap_or(i64::MAX);
    }

    totals
        .into_iter()
        .map(|(part_id, quantity)| StockDecrement { part_id, quantity })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_decrement_within_stock() {
        assert_eq!(checked_decrement(10, 2), Some(8));
        assert_eq!(checked_decrement(1, 1), Some(0));
    }

    #[test]
    fn test_checked_decrement_rejects_overdraw_and_non_positive() {
        assert_eq!(checked_decrement(1, 5), None);
        assert_eq!(checked_decrement(10, 0), None);
        assert_eq!(checked_decrement(10, -3), None);
        assert_eq!(checked_decrement(i32::MAX, i64::from(i32::MAX) + 1), None);
    }

    #[test]
    fn test_aggregate_decrements_merges_and_sorts() {
        let merged = aggregate_decrements(vec![
            (PartId(7), 1),
            (PartId(2), 3),
            (PartId(7), 4),
        ]);

        assert_eq!(
            merged,
            vec![
                StockDecrement { part_id: PartId(2), quantity: 3 },
                StockDecrement { part_id: PartId(7), quantity: 5 },
            ]
        );
    }

    #[test]
    fn test_aggregate_decrements_does_not_wrap_past_i32() {
        let merged = aggregate_decrements(vec![(PartId(1), i32::MAX); 3]);

        assert_eq!(
            merged,
            vec![StockDecrement { part_id: PartId(1), quantity: 3 * i64::from(i32::MAX) }]
        );
        assert_eq!(checked_decrement(i32::MAX, merged[0].quantity), None);
    }
}
