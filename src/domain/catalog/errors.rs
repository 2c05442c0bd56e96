// ============================================================================
// Storage Errors (read side)
// ============================================================================

/// Failure of a read against the backing store.
///
/// Reads never mutate anything, so a failed read leaves no state behind.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(String),
}
