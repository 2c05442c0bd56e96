// ============================================================================
// Customer Domain - Profiles and the Customer Resolver
// ============================================================================
//
// - Value objects (CustomerId, PrincipalId, Customer)
// - Directory (CustomerDirectory trait)
//
// ============================================================================

pub mod value_objects;
pub mod directory;

// Re-export for convenience
pub use value_objects::*;
pub use directory::*;
