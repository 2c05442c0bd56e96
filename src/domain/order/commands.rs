use crate::domain::customer::{CustomerId, PrincipalId};
use super::value_objects::{OrderFilter, OrderId, OrderLineRequest, PageRequest};

// ============================================================================
// Order Commands - Represent user intent
// ============================================================================

/// Place a new order for the customer profile linked to `principal`
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub principal: PrincipalId,
    pub lines: Vec<OrderLineRequest>,
}

impl PlaceOrder {
    pub fn new(principal: PrincipalId, lines: Vec<OrderLineRequest>) -> Self {
        Self { principal, lines }
    }

    /// Total units requested across all lines
    pub fn requested_units(&self) -> i64 {
        self.lines.iter().map(|line| i64::from(line.quantity)).sum()
    }
}

// ============================================================================
// Order Queries
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct GetOrder {
    pub order_id: OrderId,
    pub include_history: bool,
}

#[derive(Debug, Clone)]
pub struct GetMyOrders {
    pub principal: PrincipalId,
}

#[derive(Debug, Clone, Copy)]
pub struct GetRecentOrders {
    pub limit: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct GetCustomerOrders {
    pub customer_id: CustomerId,
}

#[derive(Debug, Clone, Default)]
pub struct SearchOrders {
    pub filter: OrderFilter,
    pub page: PageRequest,
}
