use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};

use crate::auth::Principal;
use crate::domain::customer::PrincipalId;
use super::error::ApiError;

// ============================================================================
// Principal Extraction
// ============================================================================
//
// The auth gateway in front of the service validates the token and forwards
// the identity as headers.
//
// ============================================================================

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const USER_ROLES_HEADER: &str = "X-User-Roles";

fn principal_from_request(req: &HttpRequest) -> Result<Principal, ApiError> {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    let id = header(USER_ID_HEADER).ok_or(ApiError::Unauthenticated)?;
    let roles = header(USER_ROLES_HEADER).unwrap_or_default();

    Ok(Principal::from_role_list(PrincipalId::new(id), roles))
}

impl FromRequest for Principal {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(principal_from_request(req))
    }
}
