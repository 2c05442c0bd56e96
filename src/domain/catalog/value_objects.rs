use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ============================================================================
// Catalog Value Objects
// ============================================================================

/// Identifier of a catalog part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartId(pub i64);

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for PartId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A catalog part as stored by the catalog collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub id: PartId,
    pub name: String,
    pub sku: String,
    pub price: Decimal,
    pub quantity_in_stock: i32,
    pub category_id: i64,
}

impl Part {
    pub fn snapshot(&self) -> PartSnapshot {
        PartSnapshot {
            name: self.name.clone(),
            sku: self.sku.clone(),
            price: self.price,
            quantity_in_stock: self.quantity_in_stock,
        }
    }
}

/// Price and stock of a part as read at the start of one checkout.
///
/// Valid only for the checkout that read it; never cached across requests.
#[derive(Debug, Clone, PartialEq)]
pub struct PartSnapshot {
    pub name: String,
    pub sku: String,
    pub price: Decimal,
    pub quantity_in_stock: i32,
}

/// One stock reduction to apply inside the order commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockDecrement {
    pub part_id: PartId,
    pub quantity: i64,
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_id_serializes_as_plain_integer() {
        let json = serde_json::to_string(&PartId(42)).unwrap();
        assert_eq!(json, "42");

        let parsed: PartId = serde_json::from_str("7").unwrap();
        assert_eq!(parsed, PartId(7));
    }

    #[test]
    fn test_snapshot_copies_price_and_stock() {
        let part = Part {
            id: PartId(1),
            name: "Brake pad".to_string(),
            sku: "BP-001".to_string(),
            price: Decimal::new(1999, 2),
            quantity_in_stock: 10,
            category_id: 3,
        };

        let snapshot = part.snapshot();
        assert_eq!(snapshot.price, Decimal::new(1999, 2));
        assert_eq!(snapshot.quantity_in_stock, 10);
        assert_eq!(snapshot.sku, "BP-001");
    }
}
