use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};

use crate::domain::catalog::{CatalogReader, PartId, PartSnapshot, StockDecrement, StoreError};
use crate::domain::customer::{CustomerDirectory, CustomerId, PrincipalId};
use crate::domain::order::{
    CommitError, Order, OrderDraft, OrderFilter, OrderId, OrderItem, OrderPage, OrderStatus, OrderStatusHistory,
    OrderStore, OrderView, PageRequest, PartLabel,
};

// ============================================================================
// Postgres Store
// ============================================================================
//
// One PgPool shared by all requests. The order commit is a single transaction:
// 1. Guarded stock decrements, ascending part id (consistent lock order)
// 2. Order row, item rows, initial history row
// 3. COMMIT
// Returning early drops the transaction, which rolls it back.
//
// ============================================================================

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<sqlx::Error> for CommitError {
    fn from(err: sqlx::Error) -> Self {
        CommitError::Backend(err.to_string())
    }
}

// ============================================================================
// Rows
// ============================================================================

#[derive(sqlx::FromRow)]
struct PartRow {
    id: i64,
    name: String,
    sku: String,
    price: Decimal,
    quantity_in_stock: i32,
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i64,
    customer_id: i64,
    created_at: DateTime<Utc>,
    subtotal: Decimal,
    tax: Decimal,
    total: Decimal,
    status: String,
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: i64,
    order_id: i64,
    part_id: i64,
    quantity: i32,
    unit_price: Decimal,
    part_name: Option<String>,
    sku: Option<String>,
}

#[derive(sqlx::FromRow)]
struct StatusHistoryRow {
    id: i64,
    order_id: i64,
    status: String,
    changed_at: DateTime<Utc>,
}

fn parse_status(raw: &str) -> Result<OrderStatus, StoreError> {
    raw.parse::<OrderStatus>()
        .map_err(|err| StoreError::Backend(err.to_string()))
}

impl OrderItemRow {
    fn label(&self) -> Option<(PartId, PartLabel)> {
        match (&self.part_name, &self.sku) {
            (Some(name), Some(sku)) => Some((
                PartId(self.part_id),
                PartLabel {
                    name: name.clone(),
                    sku: sku.clone(),
                },
            )),
            _ => None,
        }
    }

    fn into_item(self) -> OrderItem {
        OrderItem {
            id: self.id,
            order_id: OrderId(self.order_id),
            part_id: PartId(self.part_id),
            quantity: self.quantity,
            unit_price: self.unit_price,
        }
    }
}

/// Assemble order views from rows. Items and history may span several orders.
fn assemble_views(
    orders: Vec<OrderRow>,
    items: Vec<OrderItemRow>,
    history: Option<Vec<StatusHistoryRow>>,
) -> Result<Vec<OrderView>, StoreError> {
    let include_history = history.is_some();
    let mut labels = HashMap::new();
    let mut items_by_order: HashMap<i64, Vec<OrderItem>> = HashMap::new();
    for row in items {
        if let Some((part_id, label)) = row.label() {
            labels.insert(part_id, label);
        }
        items_by_order.entry(row.order_id).or_default().push(row.into_item());
    }

    let mut history_by_order: HashMap<i64, Vec<OrderStatusHistory>> = HashMap::new();
    for row in history.unwrap_or_default() {
        history_by_order
            .entry(row.order_id)
            .or_default()
            .push(OrderStatusHistory {
                id: row.id,
                order_id: OrderId(row.order_id),
                status: parse_status(&row.status)?,
                changed_at: row.changed_at,
            });
    }

    orders
        .into_iter()
        .map(|row| {
            let order = Order {
                id: OrderId(row.id),
                customer_id: CustomerId(row.customer_id),
                created_at: row.created_at,
                subtotal: row.subtotal,
                tax: row.tax,
                total: row.total,
                status: parse_status(&row.status)?,
                items: items_by_order.remove(&row.id).unwrap_or_default(),
                status_history: history_by_order.remove(&row.id).unwrap_or_default(),
            };
            Ok(OrderView::from_order(&order, &labels, include_history))
        })
        .collect()
}

// ============================================================================
// Transaction Helpers
// ============================================================================

async fn decrement_stock_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    decrement: &StockDecrement,
) -> Result<(), CommitError> {
    let result = sqlx::query(
        "UPDATE parts SET quantity_in_stock = quantity_in_stock - $2::bigint
            WHERE id = $1 AND quantity_in_stock >= $2::bigint",
    )
    .bind(decrement.part_id.0)
    .bind(decrement.quantity)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 1 {
        return Ok(());
    }

    // Guard failed: report the live count seen inside this transaction
    let available: Option<(i32,)> = sqlx::query_as("SELECT quantity_in_stock FROM parts WHERE id = $1")
        .bind(decrement.part_id.0)
        .fetch_optional(&mut **tx)
        .await?;

    Err(CommitError::InsufficientStock {
        part_id: decrement.part_id,
        requested: decrement.quantity,
        available: available.map(|(count,)| count).unwrap_or(0),
    })
}

async fn insert_order_in_tx(tx: &mut Transaction<'_, Postgres>, draft: &OrderDraft) -> Result<i64, CommitError> {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO orders (customer_id, created_at, subtotal, tax, total, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id",
    )
    .bind(draft.customer_id.0)
    .bind(draft.created_at)
    .bind(draft.subtotal)
    .bind(draft.tax)
    .bind(draft.total)
    .bind(draft.status.as_str())
    .fetch_one(&mut **tx)
    .await?;
    Ok(id)
}

async fn insert_items_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    order_id: i64,
    draft: &OrderDraft,
) -> Result<Vec<i64>, CommitError> {
    let mut ids = Vec::with_capacity(draft.items.len());
    for item in &draft.items {
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO order_items (order_id, part_id, quantity, unit_price)
                VALUES ($1, $2, $3, $4)
                RETURNING id",
        )
        .bind(order_id)
        .bind(item.part_id.0)
        .bind(item.quantity)
        .bind(item.unit_price)
        .fetch_one(&mut **tx)
        .await?;
        ids.push(id);
    }
    Ok(ids)
}

async fn insert_history_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    order_id: i64,
    draft: &OrderDraft,
) -> Result<Vec<i64>, CommitError> {
    let mut ids = Vec::with_capacity(draft.status_history.len());
    for entry in &draft.status_history {
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO order_status_history (order_id, status, changed_at)
                VALUES ($1, $2, $3)
                RETURNING id",
        )
        .bind(order_id)
        .bind(entry.status.as_str())
        .bind(entry.changed_at)
        .fetch_one(&mut **tx)
        .await?;
        ids.push(id);
    }
    Ok(ids)
}

const ORDER_COLUMNS: &str = "SELECT id, customer_id, created_at, subtotal, tax, total, status FROM orders";

const ITEM_COLUMNS: &str = "SELECT oi.id, oi.order_id, oi.part_id, oi.quantity, oi.unit_price,
        p.name AS part_name, p.sku
    FROM order_items oi
    LEFT JOIN parts p ON p.id = oi.part_id";

/// Staff search predicate. A NULL parameter disables its condition.
const ORDER_SEARCH: &str = "FROM orders o
    JOIN customers c ON c.id = o.customer_id
    WHERE ($1::bigint IS NULL OR o.customer_id = $1)
      AND ($2::text IS NULL
           OR strpos(lower(c.first_name), lower($2)) > 0
           OR strpos(lower(c.last_name), lower($2)) > 0)
      AND ($3::timestamptz IS NULL OR o.created_at >= $3)
      AND ($4::timestamptz IS NULL OR o.created_at <= $4)";

impl PgStore {
    /// Views of already-ordered order rows, with their items and without history
    async fn views_of(&self, orders: Vec<OrderRow>) -> Result<Vec<OrderView>, StoreError> {
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let order_ids: Vec<i64> = orders.iter().map(|order| order.id).collect();
        let items = sqlx::query_as::<_, OrderItemRow>(&format!(
            "{ITEM_COLUMNS} WHERE oi.order_id = ANY($1) ORDER BY oi.order_id, oi.id"
        ))
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await?;

        assemble_views(orders, items, None)
    }
}

// ============================================================================
// Trait Implementations
// ============================================================================

#[async_trait]
impl CustomerDirectory for PgStore {
    async fn resolve(&self, principal: &PrincipalId) -> Result<Option<CustomerId>, StoreError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM customers WHERE user_id = $1")
            .bind(principal.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(id,)| CustomerId(id)))
    }
}

#[async_trait]
impl CatalogReader for PgStore {
    async fn get_prices(&self, part_ids: &[PartId]) -> Result<HashMap<PartId, PartSnapshot>, StoreError> {
        let ids: Vec<i64> = part_ids.iter().map(|id| id.0).collect();
        let rows = sqlx::query_as::<_, PartRow>(
            "SELECT id, name, sku, price, quantity_in_stock FROM parts WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                (
                    PartId(row.id),
                    PartSnapshot {
                        name: row.name,
                        sku: row.sku,
                        price: row.price,
                        quantity_in_stock: row.quantity_in_stock,
                    },
                )
            })
            .collect())
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn commit_atomic(&self, draft: &OrderDraft, decrements: &[StockDecrement]) -> Result<Order, CommitError> {
        let mut tx = self.pool.begin().await?;

        for decrement in decrements {
            decrement_stock_in_tx(&mut tx, decrement).await?;
        }

        let order_id = insert_order_in_tx(&mut tx, draft).await?;
        let item_ids = insert_items_in_tx(&mut tx, order_id, draft).await?;
        let history_ids = insert_history_in_tx(&mut tx, order_id, draft).await?;

        tx.commit().await?;

        tracing::debug!(
            order_id = order_id,
            item_count = item_ids.len(),
            decrement_count = decrements.len(),
            "Order transaction committed"
        );

        Ok(draft.clone().into_order(OrderId(order_id), &item_ids, &history_ids))
    }

    async fn find_order(&self, id: OrderId, include_history: bool) -> Result<Option<OrderView>, StoreError> {
        let order = sqlx::query_as::<_, OrderRow>(&format!("{ORDER_COLUMNS} WHERE id = $1"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        let Some(order) = order else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, OrderItemRow>(&format!("{ITEM_COLUMNS} WHERE oi.order_id = $1 ORDER BY oi.id"))
            .bind(id.0)
            .fetch_all(&self.pool)
            .await?;

        let history = if include_history {
            Some(
                sqlx::query_as::<_, StatusHistoryRow>(
                    "SELECT id, order_id, status, changed_at FROM order_status_history
                        WHERE order_id = $1
                        ORDER BY changed_at, id",
                )
                .bind(id.0)
                .fetch_all(&self.pool)
                .await?,
            )
        } else {
            None
        };

        Ok(assemble_views(vec![order], items, history)?.pop())
    }

    async fn list_customer_orders(&self, customer_id: CustomerId) -> Result<Vec<OrderView>, StoreError> {
        let orders = sqlx::query_as::<_, OrderRow>(&format!(
            "{ORDER_COLUMNS} WHERE customer_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(customer_id.0)
        .fetch_all(&self.pool)
        .await?;

        self.views_of(orders).await
    }

    async fn recent_orders(&self, limit: u32) -> Result<Vec<OrderView>, StoreError> {
        let orders = sqlx::query_as::<_, OrderRow>(&format!(
            "{ORDER_COLUMNS} ORDER BY created_at DESC, id DESC LIMIT $1"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        self.views_of(orders).await
    }

    async fn search_orders(&self, filter: &OrderFilter, page: PageRequest) -> Result<OrderPage, StoreError> {
        let customer_id = filter.customer_id.map(|id| id.0);
        let name = filter.name_needle();

        let (total,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) {ORDER_SEARCH}"))
            .bind(customer_id)
            .bind(name)
            .bind(filter.from)
            .bind(filter.to)
            .fetch_one(&self.pool)
            .await?;

        let offset = i64::try_from(page.offset()).map_err(|err| StoreError::Backend(err.to_string()))?;
        let orders = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT o.id, o.customer_id, o.created_at, o.subtotal, o.tax, o.total, o.status {ORDER_SEARCH}
                ORDER BY o.created_at DESC, o.id DESC
                LIMIT $5 OFFSET $6"
        ))
        .bind(customer_id)
        .bind(name)
        .bind(filter.from)
        .bind(filter.to)
        .bind(i64::from(page.page_size))
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(OrderPage {
            orders: self.views_of(orders).await?,
            total: u64::try_from(total).unwrap_or(0),
        })
    }
}
