use std::time::Instant;

use actix_web::http::header;
use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::auth::{authorize, Capability, Principal};
use crate::domain::customer::CustomerId;
use crate::domain::order::{
    GetCustomerOrders, GetMyOrders, GetOrder, GetRecentOrders, OrderFilter, OrderId, OrderLineRequest, PageRequest,
    PlaceOrder, SearchOrders, DEFAULT_PAGE_SIZE,
};
use crate::metrics::OUTCOME_PLACED;
use crate::utils::{retry_on_transient, RetryResult};
use super::error::ApiError;
use super::AppState;

/// Operation label for retry metrics
const CHECKOUT_OPERATION: &str = "checkout";

/// Match count of a search before paging
pub const TOTAL_COUNT_HEADER: &str = "X-Total-Count";

const DEFAULT_RECENT_LIMIT: u32 = 10;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateOrderRequest {
    pub items: Vec<OrderLineRequest>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderQuery {
    #[serde(default)]
    pub include_history: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentQuery {
    #[serde(default = "default_recent_limit")]
    pub limit: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    pub customer_id: Option<i64>,
    pub customer_name: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

fn default_recent_limit() -> u32 {
    DEFAULT_RECENT_LIMIT
}

fn first_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl SearchQuery {
    fn into_search(self) -> SearchOrders {
        SearchOrders {
            filter: OrderFilter {
                customer_id: self.customer_id.map(CustomerId),
                customer_name: self.customer_name,
                from: self.from,
                to: self.to,
            },
            page: PageRequest::new(self.page, self.page_size),
        }
    }
}

/// POST /api/orders
pub async fn place_order(
    state: web::Data<AppState>,
    principal: Principal,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, ApiError> {
    authorize(&principal, Capability::PlaceOrder)?;

    let command = PlaceOrder::new(principal.id, body.into_inner().items);
    let units = command.requested_units();
    let started = Instant::now();
    let mut attempts = 0;

    let result = retry_on_transient(CHECKOUT_OPERATION, state.retry.clone(), |attempt| {
        attempts = attempt;
        if attempt > 1 {
            state.metrics.record_retry_attempt(CHECKOUT_OPERATION, attempt);
        }
        let command = command.clone();
        let checkout = &state.checkout;
        async move { checkout.handle(command).await }
    })
    .await;

    let result = match result {
        RetryResult::Success(view) => {
            if attempts > 1 {
                state.metrics.record_retry_outcome(CHECKOUT_OPERATION, true);
            }
            Ok(view)
        }
        RetryResult::Failed(err) => {
            if attempts > 1 {
                state.metrics.record_retry_outcome(CHECKOUT_OPERATION, false);
            }
            Err(err)
        }
        RetryResult::PermanentFailure(err) => Err(err),
    };

    let elapsed = started.elapsed().as_secs_f64();
    match result {
        Ok(view) => {
            state
                .metrics
                .record_checkout(OUTCOME_PLACED, elapsed, u64::try_from(units).unwrap_or(0));
            Ok(HttpResponse::Created()
                .insert_header((header::LOCATION, format!("/api/orders/{}", view.id)))
                .json(view))
        }
        Err(err) => {
            state.metrics.record_checkout(err.kind(), elapsed, 0);
            Err(err.into())
        }
    }
}

/// GET /api/orders/my
pub async fn my_orders(state: web::Data<AppState>, principal: Principal) -> Result<HttpResponse, ApiError> {
    authorize(&principal, Capability::ViewOwnOrders)?;

    let orders = state
        .queries
        .my_orders(GetMyOrders {
            principal: principal.id,
        })
        .await?;

    Ok(HttpResponse::Ok().json(orders))
}

/// GET /api/orders/{id}?includeHistory=bool
pub async fn get_order(
    state: web::Data<AppState>,
    principal: Principal,
    path: web::Path<i64>,
    query: web::Query<OrderQuery>,
) -> Result<HttpResponse, ApiError> {
    authorize(&principal, Capability::ViewAnyOrder)?;

    let order_id = OrderId(path.into_inner());
    let view = state
        .queries
        .get_order(GetOrder {
            order_id,
            include_history: query.include_history,
        })
        .await?
        .ok_or(ApiError::OrderNotFound(order_id))?;

    Ok(HttpResponse::Ok().json(view))
}

/// GET /api/orders/recent?limit=n
pub async fn recent_orders(
    state: web::Data<AppState>,
    principal: Principal,
    query: web::Query<RecentQuery>,
) -> Result<HttpResponse, ApiError> {
    authorize(&principal, Capability::ViewAnyOrder)?;

    let orders = state
        .queries
        .recent_orders(GetRecentOrders { limit: query.limit })
        .await?;

    Ok(HttpResponse::Ok().json(orders))
}

/// GET /api/customers/{customerId}/orders
pub async fn customer_orders(
    state: web::Data<AppState>,
    principal: Principal,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    authorize(&principal, Capability::ViewAnyOrder)?;

    let orders = state
        .queries
        .customer_orders(GetCustomerOrders {
            customer_id: CustomerId(path.into_inner()),
        })
        .await?;

    Ok(HttpResponse::Ok().json(orders))
}

/// GET /api/orders?page&pageSize&customerId&customerName&from&to
pub async fn search_orders(
    state: web::Data<AppState>,
    principal: Principal,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, ApiError> {
    authorize(&principal, Capability::ViewAnyOrder)?;

    let page = state.queries.search_orders(query.into_inner().into_search()).await?;

    Ok(HttpResponse::Ok()
        .insert_header((TOTAL_COUNT_HEADER, page.total.to_string()))
        .json(page.orders))
}
