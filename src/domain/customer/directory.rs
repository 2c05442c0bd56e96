use async_trait::async_trait;

use crate::domain::catalog::StoreError;
use super::value_objects::{CustomerId, PrincipalId};

// ============================================================================
// Customer Resolver
// ============================================================================
//
// Contract consumed by checkout: map an authenticated principal to the
// customer profile it owns. Profiles are created and edited elsewhere.
//
// ============================================================================

#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    /// `Ok(None)` when the principal has no customer profile
    async fn resolve(&self, principal: &PrincipalId) -> Result<Option<CustomerId>, StoreError>;
}
