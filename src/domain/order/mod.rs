// ============================================================================
// Order Domain - Checkout and Order Lookup
// ============================================================================
//
// This module contains ALL Order-specific code:
// - Value objects (OrderId, OrderStatus, OrderLineRequest, money, listing)
// - Errors (CheckoutError, CommitError)
// - Aggregate (OrderDraft, Order, OrderItem, OrderStatusHistory)
// - Builder (validation and pricing against a catalog snapshot)
// - Store (OrderStore trait, the atomic commit boundary)
// - Views (OrderView returned to callers, OrderPage for staff listings)
// - Commands and queries (PlaceOrder, GetOrder, GetMyOrders, staff listings)
// - Handlers (CheckoutHandler, OrderQueryHandler)
//
// ============================================================================

pub mod value_objects;
pub mod errors;
pub mod aggregate;
pub mod builder;
pub mod store;
pub mod views;
pub mod commands;
pub mod command_handler;
pub mod query_handler;

// Re-export for convenience
pub use value_objects::*;
pub use errors::*;
pub use aggregate::*;
pub use builder::*;
pub use store::*;
pub use views::*;
pub use commands::*;
pub use command_handler::*;
pub use query_handler::*;
