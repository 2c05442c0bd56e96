use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::catalog::PartId;
use crate::domain::customer::CustomerId;

// ============================================================================
// Order Value Objects
// ============================================================================

/// Identifier assigned to an order when it is committed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub i64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One requested line of a checkout. Ephemeral, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OrderLineRequest {
    pub part_id: PartId,
    pub quantity: i32,
}

impl OrderLineRequest {
    pub fn new(part_id: impl Into<PartId>, quantity: i32) -> Self {
        Self {
            part_id: part_id.into(),
            quantity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Name as stored in the status columns
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Unknown order status: {0}")]
pub struct UnknownOrderStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownOrderStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(OrderStatus::Pending),
            "Processing" => Ok(OrderStatus::Processing),
            "Shipped" => Ok(OrderStatus::Shipped),
            "Delivered" => Ok(OrderStatus::Delivered),
            "Cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(UnknownOrderStatus(other.to_string())),
        }
    }
}

// ============================================================================
// Money
// ============================================================================

/// Monetary values carry two decimal places
pub const MONEY_DECIMAL_PLACES: u32 = 2;

/// 20% tax
pub const DEFAULT_TAX_RATE: Decimal = Decimal::from_parts(20, 0, 0, false, 2);

/// Round to cents, halves away from zero (0.125 -> 0.13, -0.125 -> -0.13)
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

pub fn line_total(unit_price: Decimal, quantity: i32) -> Decimal {
    unit_price * Decimal::from(quantity)
}

pub fn compute_tax(subtotal: Decimal, tax_rate: Decimal) -> Decimal {
    round_money(subtotal * tax_rate)
}

// ============================================================================
// Listing
// ============================================================================

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Staff search over all orders. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderFilter {
    pub customer_id: Option<CustomerId>,
    /// Substring of the customer's first or last name, case-insensitive
    pub customer_name: Option<String>,
    /// Inclusive lower bound on `created_at`
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`
    pub to: Option<DateTime<Utc>>,
}

impl OrderFilter {
    /// Name filter, or `None` when it is blank
    pub fn name_needle(&self) -> Option<&str> {
        self.customer_name.as_deref().filter(|name| !name.trim().is_empty())
    }

    pub fn covers(&self, created_at: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| created_at >= from) && self.to.map_or(true, |to| created_at <= to)
    }
}

/// One-based page of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

impl PageRequest {
    /// Page numbers start at 1; the size is clamped to `1..=MAX_PAGE_SIZE`
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
