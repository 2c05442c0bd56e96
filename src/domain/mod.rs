// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Each aggregate has its own subdirectory with:
// - Value objects
// - Errors
// - Aggregate implementation
// - Collaborator traits (ledger / directory / store)
// - Command handler (orders only)
//
// Storage backends live in crate::db and implement the collaborator traits,
// so nothing in this layer knows about SQL.
//
// ============================================================================

pub mod catalog;
pub mod customer;
pub mod order;
