// ============================================================================
// Storage Backends
// ============================================================================
//
// Both backends implement CustomerDirectory, CatalogReader and OrderStore:
// - postgres: sqlx PgPool, one transaction per order commit
// - memory: process-local store for demo runs and tests
//
// ============================================================================

pub mod schema;
pub mod postgres;
pub mod memory;

pub use postgres::PgStore;
pub use memory::MemoryStore;
