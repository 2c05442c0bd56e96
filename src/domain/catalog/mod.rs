// ============================================================================
// Catalog Domain - Parts and the Inventory Ledger
// ============================================================================
//
// The catalog itself (category/part CRUD) is owned elsewhere. This module only
// carries what checkout needs:
// - Value objects (PartId, Part, PartSnapshot, StockDecrement)
// - Errors (StoreError for read-side storage failures)
// - Ledger (CatalogReader trait, decrement aggregation)
//
// ============================================================================

pub mod value_objects;
pub mod errors;
pub mod ledger;

// Re-export for convenience
pub use value_objects::*;
pub use errors::*;
pub use ledger::*;
