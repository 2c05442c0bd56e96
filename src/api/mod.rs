// ============================================================================
// HTTP API - thin actix-web layer over the order handlers
// ============================================================================
//
// Routes:
// - POST /api/orders                       place an order (Customer)
// - GET  /api/orders                       filtered, paged search (staff)
// - GET  /api/orders/recent                newest orders (staff)
// - GET  /api/orders/my                    own orders (Customer)
// - GET  /api/orders/{id}                  any order, optional history (staff)
// - GET  /api/customers/{customerId}/orders  one customer's orders (staff)
// - GET  /metrics, GET /health
//
// ============================================================================

mod error;
mod orders;
mod principal;

use std::sync::Arc;

use actix_web::web;

use crate::domain::catalog::CatalogReader;
use crate::domain::customer::CustomerDirectory;
use crate::domain::order::{CheckoutHandler, OrderBuilder, OrderQueryHandler, OrderStore};
use crate::metrics::{self, Metrics};
use crate::utils::RetryConfig;

pub use error::ApiError;

/// Shared state of all workers
pub struct AppState {
    pub checkout: CheckoutHandler,
    pub queries: OrderQueryHandler,
    pub metrics: Arc<Metrics>,
    pub retry: RetryConfig,
}

impl AppState {
    pub fn new(
        customers: Arc<dyn CustomerDirectory>,
        catalog: Arc<dyn CatalogReader>,
        orders: Arc<dyn OrderStore>,
        builder: OrderBuilder,
        metrics: Arc<Metrics>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            checkout: CheckoutHandler::new(customers.clone(), catalog, orders.clone(), builder),
            queries: OrderQueryHandler::new(customers, orders),
            metrics,
            retry,
        }
    }
}

/// Register state and routes on an app
pub fn configure(state: web::Data<AppState>) -> impl FnOnce(&mut web::ServiceConfig) + Clone {
    move |cfg: &mut web::ServiceConfig| {
        let json_config = web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::InvalidBody(err.to_string()).into());
        let path_config = web::PathConfig::default()
            .error_handler(|err, _req| ApiError::InvalidRequest(err.to_string()).into());
        let query_config = web::QueryConfig::default()
            .error_handler(|err, _req| ApiError::InvalidRequest(err.to_string()).into());

        cfg.app_data(web::Data::new(state.metrics.clone()))
            .app_data(state)
            .app_data(json_config)
            .app_data(path_config)
            .app_data(query_config)
            .route("/metrics", web::get().to(metrics::metrics_handler))
            .route("/health", web::get().to(metrics::health_handler))
            .service(
                web::scope("/api/orders")
                    .route("", web::post().to(orders::place_order))
                    .route("", web::get().to(orders::search_orders))
                    .route("/recent", web::get().to(orders::recent_orders))
                    .route("/my", web::get().to(orders::my_orders))
                    .route("/{id}", web::get().to(orders::get_order)),
            )
            .route(
                "/api/customers/{customer_id}/orders",
                web::get().to(orders::customer_orders),
            );
    }
}
