use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

use crate::auth::AccessDenied;
use crate::domain::order::{CheckoutError, OrderId};

// ============================================================================
// API Errors - mapping of domain failures to HTTP responses
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Missing X-User-Id header")]
    Unauthenticated,

    #[error(transparent)]
    Forbidden(#[from] AccessDenied),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Invalid request parameters: {0}")]
    InvalidRequest(String),

    #[error("Order {0} not found")]
    OrderNotFound(OrderId),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated => "unauthenticated",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::InvalidBody(_) => "invalid_body",
            ApiError::InvalidRequest(_) => "invalid_request",
            ApiError::OrderNotFound(_) => "order_not_found",
            ApiError::Checkout(err) => err.kind(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::InvalidBody(_) | ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::OrderNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Checkout(err) => match err {
                CheckoutError::CustomerProfileNotFound | CheckoutError::PartNotFound(_) => StatusCode::NOT_FOUND,
                CheckoutError::EmptyOrder
                | CheckoutError::InvalidQuantity { .. }
                | CheckoutError::InsufficientStock { .. } => StatusCode::BAD_REQUEST,
                CheckoutError::InconsistentDraft(_) | CheckoutError::CommitFailure(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                CheckoutError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.kind(),
            message: self.to_string(),
        })
    }
}
