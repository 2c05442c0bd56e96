use crate::domain::catalog::PartId;
use crate::utils::IsTransient;

// ============================================================================
// Checkout Errors
// ============================================================================
//
// Every failure aborts the whole checkout. Only CommitFailure can happen
// after the atomic commit has started, and it is rolled back by the store.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CheckoutError {
    #[error("Customer profile not found")]
    CustomerProfileNotFound,

    #[error("Order must contain at least one item")]
    EmptyOrder,

    #[error("Part {0} not found")]
    PartNotFound(PartId),

    #[error("Quantity must be positive for part {part_id}, got {quantity}")]
    InvalidQuantity { part_id: PartId, quantity: i32 },

    #[error("Not enough stock for part {part_id}: requested {requested}, available {available}")]
    InsufficientStock {
        part_id: PartId,
        requested: i64,
        available: i32,
    },

    #[error("Order draft is inconsistent: {0}")]
    InconsistentDraft(String),

    #[error("Order commit failed: {0}")]
    CommitFailure(String),

    #[error("Storage unavailable: {0}")]
    StoreUnavailable(String),
}

impl CheckoutError {
    /// Stable name of the failure kind, used in metrics labels and API bodies
    pub fn kind(&self) -> &'static str {
        match self {
            CheckoutError::CustomerProfileNotFound => "customer_profile_not_found",
            CheckoutError::EmptyOrder => "empty_order",
            CheckoutError::PartNotFound(_) => "part_not_found",
            CheckoutError::InvalidQuantity { .. } => "invalid_quantity",
            CheckoutError::InsufficientStock { .. } => "insufficient_stock",
            CheckoutError::InconsistentDraft(_) => "inconsistent_draft",
            CheckoutError::CommitFailure(_) => "commit_failure",
            CheckoutError::StoreUnavailable(_) => "store_unavailable",
        }
    }
}

/// Failure of `OrderStore::commit_atomic`. Nothing was persisted.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommitError {
    /// The commit-time re-check found fewer units than the decrement needs
    #[error("Not enough stock for part {part_id}: requested {requested}, available {available}")]
    InsufficientStock {
        part_id: PartId,
        requested: i64,
        available: i32,
    },

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl IsTransient for CheckoutError {
    fn is_transient(&self) -> bool {
        matches!(
            self,
            CheckoutError::CommitFailure(_) | CheckoutError::StoreUnavailable(_)
        )
    }
}

impl From<CommitError> for CheckoutError {
    fn from(err: CommitError) -> Self {
        match err {
            CommitError::InsufficientStock {
                part_id,
                requested,
                available,
            } => CheckoutError::InsufficientStock {
                part_id,
                requested,
                available,
            },
            CommitError::Backend(reason) => CheckoutError::CommitFailure(reason),
        }
    }
}

impl From<crate::domain::catalog::StoreError> for CheckoutError {
    fn from(err: crate::domain::catalog::StoreError) -> Self {
        CheckoutError::StoreUnavailable(err.to_string())
    }
}
