use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use crate::domain::catalog::{CatalogReader, Part, PartId, PartSnapshot, StockDecrement, StoreError, checked_decrement};
use crate::domain::customer::{Customer, CustomerDirectory, CustomerId, PrincipalId};
use crate::domain::order::{
    CommitError, Order, OrderDraft, OrderFilter, OrderId, OrderPage, OrderStore, OrderView, PageRequest, PartLabel,
};

// ============================================================================
// In-Memory Store
// ============================================================================
//
// Same contract as the Postgres store, for demo runs without DATABASE_URL and
// for tests. A commit stages the new counts of the parts it touches and
// writes them back only when every step succeeded; the lock serializes
// commits like row locks would.
//
// ============================================================================

#[derive(Debug, Default)]
struct MemoryState {
    customers: BTreeMap<CustomerId, Customer>,
    parts: BTreeMap<PartId, Part>,
    orders: BTreeMap<OrderId, Order>,
    next_customer_id: i64,
    next_order_id: i64,
    next_item_id: i64,
    next_history_id: i64,
}

impl MemoryState {
    fn labels(&self) -> HashMap<PartId, PartLabel> {
        self.parts
            .values()
            .map(|part| {
                (
                    part.id,
                    PartLabel {
                        name: part.name.clone(),
                        sku: part.sku.clone(),
                    },
                )
            })
            .collect()
    }

    /// Remaining counts of the decremented parts, without touching the state
    fn stage_decrements(&self, decrements: &[StockDecrement]) -> Result<BTreeMap<PartId, i32>, CommitError> {
        let mut staged = BTreeMap::new();
        for decrement in decrements {
            let available = match staged.get(&decrement.part_id) {
                Some(count) => *count,
                None => self
                    .parts
                    .get(&decrement.part_id)
                    .map(|part| part.quantity_in_stock)
                    .unwrap_or(0),
            };

            let remaining = checked_decrement(available, decrement.quantity).ok_or(CommitError::InsufficientStock {
                part_id: decrement.part_id,
                requested: decrement.quantity,
                available,
            })?;
            staged.insert(decrement.part_id, remaining);
        }
        Ok(staged)
    }

    fn write_back(&mut self, staged: BTreeMap<PartId, i32>) {
        for (part_id, remaining) in staged {
            if let Some(part) = self.parts.get_mut(&part_id) {
                part.quantity_in_stock = remaining;
            }
        }
    }

    /// Views of the given orders, newest first
    fn newest_first<'a>(&self, orders: impl IntoIterator<Item = &'a Order>) -> Vec<OrderView> {
        let labels = self.labels();
        let mut orders: Vec<&Order> = orders.into_iter().collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        orders
            .into_iter()
            .map(|order| OrderView::from_order(order, &labels, false))
            .collect()
    }

    fn matches(&self, order: &Order, filter: &OrderFilter) -> bool {
        if filter.customer_id.is_some_and(|id| id != order.customer_id) {
            return false;
        }
        if let Some(needle) = filter.name_needle() {
            let named = self
                .customers
                .get(&order.customer_id)
                .is_some_and(|customer| customer.name_contains(needle));
            if !named {
                return false;
            }
        }
        filter.covers(order.created_at)
    }

    fn insert_order(&mut self, draft: &OrderDraft) -> Order {
        self.next_order_id += 1;
        let order_id = OrderId(self.next_order_id);

        let item_ids: Vec<i64> = draft
            .items
            .iter()
            .map(|_| {
                self.next_item_id += 1;
                self.next_item_id
            })
            .collect();
        let history_ids: Vec<i64> = draft
            .status_history
            .iter()
            .map(|_| {
                self.next_history_id += 1;
                self.next_history_id
            })
            .collect();

        let order = draft.clone().into_order(order_id, &item_ids, &history_ids);
        self.orders.insert(order_id, order.clone());
        order
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    fail_next_commit: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a customer profile for `user_id`
    pub async fn add_named_customer(&self, user_id: &str, first_name: &str, last_name: &str) -> CustomerId {
        let mut state = self.state.lock().await;
        state.next_customer_id += 1;
        let id = CustomerId(state.next_customer_id);
        state.customers.insert(
            id,
            Customer {
                id,
                user_id: PrincipalId::new(user_id),
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
            },
        );
        id
    }

    pub async fn add_part(&self, id: PartId, name: &str, sku: &str, price: Decimal, quantity_in_stock: i32) {
        let mut state = self.state.lock().await;
        state.parts.insert(
            id,
            Part {
                id,
                name: name.to_string(),
                sku: sku.to_string(),
                price,
                quantity_in_stock,
                category_id: 1,
            },
        );
    }

    /// Demo catalog and customers for runs without a database
    pub async fn seed_demo(&self) {
        let customers = [("customer-1", "Ada", "Byrne"), ("customer-2", "Ravi", "Patel")];
        for (user_id, first_name, last_name) in customers {
            self.add_named_customer(user_id, first_name, last_name).await;
        }

        let parts = [
            (1, "Brake pad set", "BRK-1001", Decimal::new(1999, 2), 10),
            (2, "Oil filter", "OIL-2002", Decimal::new(899, 2), 25),
            (3, "Spark plug", "SPK-3003", Decimal::new(450, 2), 100),
            (4, "Alternator", "ALT-4004", Decimal::new(18950, 2), 1),
        ];
        for (id, name, sku, price, stock) in parts {
            self.add_part(PartId(id), name, sku, price, stock).await;
        }

        tracing::info!(customers = customers.len(), parts = parts.len(), "Seeded in-memory store");
    }
}

// Test hooks
#[cfg(test)]
impl MemoryStore {
    pub async fn add_customer(&self, user_id: &str) -> CustomerId {
        self.add_named_customer(user_id, "", "").await
    }

    /// Catalog price change, as the catalog service would make it
    pub async fn set_part_price(&self, id: PartId, price: Decimal) {
        if let Some(part) = self.state.lock().await.parts.get_mut(&id) {
            part.price = price;
        }
    }

    pub async fn remove_part(&self, id: PartId) {
        self.state.lock().await.parts.remove(&id);
    }

    pub async fn stock_of(&self, id: PartId) -> Option<i32> {
        self.state.lock().await.parts.get(&id).map(|part| part.quantity_in_stock)
    }

    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    /// Make the next commit fail after its stock decrements were applied
    pub async fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl CustomerDirectory for MemoryStore {
    async fn resolve(&self, principal: &PrincipalId) -> Result<Option<CustomerId>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .customers
            .values()
            .find(|customer| &customer.user_id == principal)
            .map(|customer| customer.id))
    }
}

#[async_trait]
impl CatalogReader for MemoryStore {
    async fn get_prices(&self, part_ids: &[PartId]) -> Result<HashMap<PartId, PartSnapshot>, StoreError> {
        let state = self.state.lock().await;
        Ok(part_ids
            .iter()
            .filter_map(|id| state.parts.get(id).map(|part| (*id, part.snapshot())))
            .collect())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn commit_atomic(&self, draft: &OrderDraft, decrements: &[StockDecrement]) -> Result<Order, CommitError> {
        let mut state = self.state.lock().await;
        let staged = state.stage_decrements(decrements)?;

        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            tracing::warn!(staged_parts = staged.len(), "Injected commit failure");
            return Err(CommitError::Backend("injected failure".to_string()));
        }

        state.write_back(staged);
        Ok(state.insert_order(draft))
    }

    async fn find_order(&self, id: OrderId, include_history: bool) -> Result<Option<OrderView>, StoreError> {
        let state = self.state.lock().await;
        let labels = state.labels();
        Ok(state
            .orders
            .get(&id)
            .map(|order| OrderView::from_order(order, &labels, include_history)))
    }

    async fn list_customer_orders(&self, customer_id: CustomerId) -> Result<Vec<OrderView>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.newest_first(
            state
                .orders
                .values()
                .filter(|order| order.customer_id == customer_id),
        ))
    }

    async fn recent_orders(&self, limit: u32) -> Result<Vec<OrderView>, StoreError> {
        let state = self.state.lock().await;
        let mut views = state.newest_first(state.orders.values());
        views.truncate(limit as usize);
        Ok(views)
    }

    async fn search_orders(&self, filter: &OrderFilter, page: PageRequest) -> Result<OrderPage, StoreError> {
        let state = self.state.lock().await;
        let views = state.newest_first(state.orders.values().filter(|order| state.matches(order, filter)));

        let total = views.len() as u64;
        let orders = views
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.page_size as usize)
            .collect();
        Ok(OrderPage { orders, total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{OrderItemDraft, OrderStatus, StatusHistoryDraft};
    use chrono::Utc;
    use std::sync::Arc;

    fn draft(customer_id: CustomerId, lines: &[(i64, i32, Decimal)]) -> OrderDraft {
        let now = Utc::now();
        let items: Vec<OrderItemDraft> = lines
            .iter()
            .map(|(part_id, quantity, unit_price)| OrderItemDraft {
                part_id: PartId(*part_id),
                part_name: String::new(),
                sku: String::new(),
                quantity: *quantity,
                unit_price: *unit_price,
            })
            .collect();
        let subtotal: Decimal = items.iter().map(OrderItemDraft::line_total).sum();

        OrderDraft {
            customer_id,
            created_at: now,
            subtotal,
            tax: Decimal::ZERO,
            total: subtotal,
            status: OrderStatus::Pending,
            items,
            status_history: vec![StatusHistoryDraft {
                status: OrderStatus::Pending,
                changed_at: now,
            }],
        }
    }

    async fn store() -> (MemoryStore, CustomerId) {
        let store = MemoryStore::new();
        let customer = store.add_customer("user-1").await;
        store.add_part(PartId(1), "Clutch kit", "CK-1", Decimal::new(12000, 2), 5).await;
        store.add_part(PartId(2), "Timing belt", "TB-2", Decimal::new(4500, 2), 1).await;
        (store, customer)
    }

    #[tokio::test]
    async fn test_commit_assigns_identity_and_decrements() {
        let (store, customer) = store().await;
        let draft = draft(customer, &[(1, 2, Decimal::new(12000, 2))]);

        let order = store.commit_atomic(&draft, &draft.stock_decrements()).await.unwrap();

        assert_eq!(order.id, OrderId(1));
        assert_eq!(order.items[0].order_id, order.id);
        assert_eq!(order.total, draft.total);
        assert_eq!(store.stock_of(PartId(1)).await, Some(3));
    }

    #[tokio::test]
    async fn test_failed_decrement_rolls_back_earlier_ones() {
        let (store, customer) = store().await;
        let draft = draft(
            customer,
            &[(1, 2, Decimal::new(12000, 2)), (2, 3, Decimal::new(4500, 2))],
        );

        let err = store.commit_atomic(&draft, &draft.stock_decrements()).await.unwrap_err();

        assert_eq!(
            err,
            CommitError::InsufficientStock {
                part_id: PartId(2),
                requested: 3,
                available: 1,
            }
        );
        assert_eq!(store.stock_of(PartId(1)).await, Some(5));
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_injected_failure_leaves_no_state() {
        let (store, customer) = store().await;
        store.fail_next_commit().await;
        let draft = draft(customer, &[(1, 1, Decimal::new(12000, 2))]);

        let err = store.commit_atomic(&draft, &draft.stock_decrements()).await.unwrap_err();

        assert!(matches!(err, CommitError::Backend(_)));
        assert_eq!(store.stock_of(PartId(1)).await, Some(5));
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_removed_part_fails_commit() {
        let (store, customer) = store().await;
        store.remove_part(PartId(2)).await;
        let draft = draft(customer, &[(2, 1, Decimal::new(4500, 2))]);

        let err = store.commit_atomic(&draft, &draft.stock_decrements()).await.unwrap_err();

        assert_eq!(
            err,
            CommitError::InsufficientStock {
                part_id: PartId(2),
                requested: 1,
                available: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_stock_never_negative_under_concurrent_commits() {
        let (store, customer) = store().await;
        let store = Arc::new(store);

        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    let draft = draft(customer, &[(1, 2, Decimal::new(12000, 2))]);
                    store.commit_atomic(&draft, &draft.stock_decrements()).await
                })
            })
            .collect();

        let results = futures_util::future::join_all(tasks).await;
        let committed = results.into_iter().filter(|r| matches!(r, Ok(Ok(_)))).count();

        // 5 units, 2 per order
        assert_eq!(committed, 2);
        assert_eq!(store.stock_of(PartId(1)).await, Some(1));
        assert_eq!(store.order_count().await, 2);
    }

    #[tokio::test]
    async fn test_views_use_current_labels_and_snapshot_prices() {
        let (store, customer) = store().await;
        let draft = draft(customer, &[(1, 1, Decimal::new(12000, 2))]);
        let order = store.commit_atomic(&draft, &draft.stock_decrements()).await.unwrap();

        store.set_part_price(PartId(1), Decimal::new(1, 0)).await;
        let view = store.find_order(order.id, false).await.unwrap().unwrap();

        assert_eq!(view.items[0].sku, "CK-1");
        assert_eq!(view.items[0].unit_price, Decimal::new(12000, 2));
        assert!(view.status_history.is_none());
    }

    #[tokio::test]
    async fn test_resolve_by_user_id() {
        let (store, customer) = store().await;

        assert_eq!(store.resolve(&PrincipalId::new("user-1")).await.unwrap(), Some(customer));
        assert_eq!(store.resolve(&PrincipalId::new("user-9")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_prices_skips_missing_parts() {
        let (store, _) = store().await;

        let prices = store.get_prices(&[PartId(1), PartId(999)]).await.unwrap();

        assert_eq!(prices.len(), 1);
        assert_eq!(prices[&PartId(1)].quantity_in_stock, 5);
    }

    #[tokio::test]
    async fn test_decrement_past_i32_range_is_rejected() {
        let (store, customer) = store().await;
        store.add_part(PartId(3), "Wheel nut", "WN-3", Decimal::new(10, 2), i32::MAX).await;
        let draft = draft(customer, &[(3, 1, Decimal::new(10, 2))]);
        let oversized = [StockDecrement {
            part_id: PartId(3),
            quantity: 3 * i64::from(i32::MAX),
        }];

        let err = store.commit_atomic(&draft, &oversized).await.unwrap_err();

        assert_eq!(
            err,
            CommitError::InsufficientStock {
                part_id: PartId(3),
                requested: 3 * i64::from(i32::MAX),
                available: i32::MAX,
            }
        );
        assert_eq!(store.stock_of(PartId(3)).await, Some(i32::MAX));
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_repeated_decrements_for_one_part_are_staged_together() {
        let (store, customer) = store().await;
        let draft = draft(customer, &[(1, 3, Decimal::new(12000, 2))]);
        let split = [
            StockDecrement { part_id: PartId(1), quantity: 3 },
            StockDecrement { part_id: PartId(1), quantity: 3 },
        ];

        let err = store.commit_atomic(&draft, &split).await.unwrap_err();

        assert_eq!(
            err,
            CommitError::InsufficientStock {
                part_id: PartId(1),
                requested: 3,
                available: 2,
            }
        );
        assert_eq!(store.stock_of(PartId(1)).await, Some(5));
    }

    #[tokio::test]
    async fn test_recent_and_search_listings() {
        let (store, first_customer) = store().await;
        let second_customer = store.add_named_customer("user-2", "Lena", "Vogel").await;
        for customer in [first_customer, second_customer, second_customer] {
            let draft = draft(customer, &[(1, 1, Decimal::new(12000, 2))]);
            store.commit_atomic(&draft, &draft.stock_decrements()).await.unwrap();
        }

        let recent = store.recent_orders(2).await.unwrap();
        assert_eq!(recent.iter().map(|o| o.id).collect::<Vec<_>>(), vec![OrderId(3), OrderId(2)]);

        let filter = OrderFilter {
            customer_name: Some("vog".into()),
            ..Default::default()
        };
        let page = store.search_orders(&filter, PageRequest::new(1, 1)).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.orders[0].id, OrderId(3));

        let page = store.search_orders(&OrderFilter::default(), PageRequest::new(2, 2)).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.orders.iter().map(|o| o.id).collect::<Vec<_>>(), vec![OrderId(1)]);
    }
}
