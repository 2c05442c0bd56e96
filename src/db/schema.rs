use anyhow::{Context, Result};
use sqlx::PgPool;

// ============================================================================
// Schema Bootstrap
// ============================================================================
//
// Idempotent DDL run at startup. Customer, category and part rows are owned by
// other services; the tables are created here so a fresh database is usable.
//
// ============================================================================

pub const SCHEMA_STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS customers (
        id BIGSERIAL PRIMARY KEY,
        user_id TEXT NOT NULL UNIQUE,
        first_name TEXT NOT NULL DEFAULT '',
        last_name TEXT NOT NULL DEFAULT '',
        email TEXT,
        phone TEXT,
        address_line1 TEXT,
        address_line2 TEXT,
        city TEXT,
        state TEXT,
        postal_code TEXT,
        country TEXT
    )",
    "CREATE TABLE IF NOT EXISTS parts (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        sku TEXT NOT NULL UNIQUE,
        price NUMERIC(18, 2) NOT NULL CHECK (price >= 0),
        quantity_in_stock INTEGER NOT NULL CHECK (quantity_in_stock >= 0),
        category_id BIGINT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS orders (
        id BIGSERIAL PRIMARY KEY,
        customer_id BIGINT NOT NULL REFERENCES customers (id),
        created_at TIMESTAMPTZ NOT NULL,
        subtotal NUMERIC(18, 2) NOT NULL,
        tax NUMERIC(18, 2) NOT NULL,
        total NUMERIC(18, 2) NOT NULL,
        status TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_orders_customer ON orders (customer_id, created_at DESC)",
    "CREATE TABLE IF NOT EXISTS order_items (
        id BIGSERIAL PRIMARY KEY,
        order_id BIGINT NOT NULL REFERENCES orders (id),
        part_id BIGINT NOT NULL,
        quantity INTEGER NOT NULL CHECK (quantity > 0),
        unit_price NUMERIC(18, 2) NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_order_items_order ON order_items (order_id)",
    "CREATE TABLE IF NOT EXISTS order_status_history (
        id BIGSERIAL PRIMARY KEY,
        order_id BIGINT NOT NULL REFERENCES orders (id),
        status TEXT NOT NULL,
        changed_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_order_status_history_order ON order_status_history (order_id)",
];

/// Create missing tables and indexes
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    for statement in SCHEMA_STATEMENTS {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("schema statement failed: {}", first_line(statement)))?;
    }

    tracing::info!(statements = SCHEMA_STATEMENTS.len(), "Schema ensured");
    Ok(())
}

fn first_line(statement: &str) -> &str {
    statement.lines().next().unwrap_or(statement).trim()
}
