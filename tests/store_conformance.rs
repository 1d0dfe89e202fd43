//! Store Conformance Tests
//!
//! Both repository backends must satisfy identical semantics, so the
//! checks are written once against the port and run per backend. The
//! file backend runs on a tempdir; the postgres conformance test is
//! ignored by default and needs a DATABASE_URL pointing at a scratch
//! database.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use orderflow_service::adapters::persistence::{FileOrderStore, PgOrderStore};
use orderflow_service::domain::order::{Order, OrderStatus};
use orderflow_service::ports::repository::{
    OrderFilters, OrderRepository, Page, RepositoryError,
};

/// Unique lowercase token so checks never collide, even on a dirty
/// postgres database.
fn unique(tag: &str) -> String {
    format!("0x{tag}{}", Uuid::new_v4().simple())
}

fn make_order(
    escrow: &str,
    sell_token: &str,
    buy_token: &str,
    age_secs: i64,
    expires_at: Option<i64>,
) -> Order {
    Order {
        order_id: Uuid::new_v4().to_string(),
        escrow_address: escrow.to_string(),
        contract_instance: "instance-blob".to_string(),
        secret_key: "sk".to_string(),
        partial_address: "pa".to_string(),
        sell_token_address: sell_token.to_string(),
        sell_token_amount: "100000000".to_string(),
        buy_token_address: buy_token.to_string(),
        buy_token_amount: "50000000000000000".to_string(),
        status: OrderStatus::Open,
        expires_at,
        created_at: Utc::now() - Duration::seconds(age_secs),
    }
}

async fn file_store() -> (tempfile::TempDir, Arc<FileOrderStore>) {
    let dir = tempfile::tempdir().unwrap();
    let store = FileOrderStore::new(dir.path().to_str().unwrap())
        .await
        .unwrap();
    store.initialize().await.unwrap();
    (dir, Arc::new(store))
}

// ---- Port-level checks, shared by both backends ----

async fn check_duplicate_escrow(store: &dyn OrderRepository) {
    let escrow = unique("esc");
    let sell = unique("sell");
    let buy = unique("buy");

    store
        .insert_order(make_order(&escrow, &sell, &buy, 0, None))
        .await
        .unwrap();

    let err = store
        .insert_order(make_order(&escrow, &sell, &buy, 0, None))
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::EscrowExists));

    // A different escrow is unaffected by the conflict
    store
        .insert_order(make_order(&unique("esc"), &sell, &buy, 0, None))
        .await
        .unwrap();
}

async fn check_concurrent_duplicate_insert(store: Arc<dyn OrderRepository>) {
    let escrow = unique("esc");
    let sell = unique("sell");
    let buy = unique("buy");
    let a = make_order(&escrow, &sell, &buy, 0, None);
    let b = make_order(&escrow, &sell, &buy, 0, None);

    let (ra, rb) = tokio::join!(store.insert_order(a), store.insert_order(b));
    let successes = [&ra, &rb].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one concurrent insert must win");

    let loser = if ra.is_err() { ra } else { rb };
    assert!(matches!(
        loser.unwrap_err(),
        RepositoryError::EscrowExists
    ));
}

async fn check_filters_sort_and_pagination(store: &dyn OrderRepository) {
    let sell = unique("sell");
    let buy_a = unique("buy");
    let buy_b = unique("buy");

    // Four matching orders at distinct ages, newest first expected
    let newest = make_order(&unique("esc"), &sell, &buy_a, 10, None);
    let second = make_order(&unique("esc"), &sell, &buy_b, 20, None);
    let third = make_order(&unique("esc"), &sell, &buy_a, 30, None);
    let oldest = make_order(&unique("esc"), &sell, &buy_a, 40, None);
    // Decoy with a different sell token
    let decoy = make_order(&unique("esc"), &unique("sell"), &buy_a, 5, None);

    for order in [&newest, &second, &third, &oldest, &decoy] {
        store.insert_order(order.clone()).await.unwrap();
    }

    let by_sell = OrderFilters {
        sell_token_address: Some(sell.clone()),
        ..OrderFilters::default()
    };

    let all = store
        .get_orders_with_filters(&by_sell, Page::default())
        .await
        .unwrap();
    let ids: Vec<&str> = all.iter().map(|o| o.order_id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            newest.order_id.as_str(),
            second.order_id.as_str(),
            third.order_id.as_str(),
            oldest.order_id.as_str()
        ]
    );

    // Offset skips the newest, limit caps the window
    let page = store
        .get_orders_with_filters(
            &by_sell,
            Page {
                limit: Some(2),
                offset: Some(1),
            },
        )
        .await
        .unwrap();
    let ids: Vec<&str> = page.iter().map(|o| o.order_id.as_str()).collect();
    assert_eq!(
        ids,
        vec![second.order_id.as_str(), third.order_id.as_str()]
    );

    // AND semantics: sell token and buy token must both match
    let both = store
        .get_orders_with_filters(
            &OrderFilters {
                sell_token_address: Some(sell.clone()),
                buy_token_address: Some(buy_b.clone()),
                ..OrderFilters::default()
            },
            Page::default(),
        )
        .await
        .unwrap();
    assert_eq!(both.len(), 1);
    assert_eq!(both[0].order_id, second.order_id);
}

async fn check_lazy_expiry(store: &dyn OrderRepository) {
    let sell = unique("sell");
    let expired = make_order(
        &unique("esc"),
        &sell,
        &unique("buy"),
        60,
        Some(Utc::now().timestamp() - 10),
    );
    let live = make_order(
        &unique("esc"),
        &sell,
        &unique("buy"),
        30,
        Some(Utc::now().timestamp() + 3_600),
    );
    store.insert_order(expired.clone()).await.unwrap();
    store.insert_order(live.clone()).await.unwrap();

    let listed = store
        .get_orders_with_filters(
            &OrderFilters {
                sell_token_address: Some(sell),
                ..OrderFilters::default()
            },
            Page::default(),
        )
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].order_id, live.order_id);

    // Expiry hides, it does not delete: raw lookups still find it
    let found = store.get_order_by_id(&expired.order_id).await.unwrap();
    assert!(found.is_some());
}

async fn check_mark_filled(store: &dyn OrderRepository) {
    let sell = unique("sell");
    let order = make_order(&unique("esc"), &sell, &unique("buy"), 0, None);
    store.insert_order(order.clone()).await.unwrap();

    assert!(store.mark_order_filled(&order.order_id).await.unwrap());
    // Repeat is idempotent, still reports the order exists
    assert!(store.mark_order_filled(&order.order_id).await.unwrap());
    assert!(!store.mark_order_filled("no-such-order").await.unwrap());

    // Hidden from listings, still reachable by raw lookups
    let listed = store
        .get_orders_with_filters(
            &OrderFilters {
                sell_token_address: Some(sell),
                ..OrderFilters::default()
            },
            Page::default(),
        )
        .await
        .unwrap();
    assert!(listed.is_empty());

    let found = store
        .get_order_by_id(&order.order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.status, OrderStatus::Filled);

    let by_escrow = store
        .get_order_by_escrow_address(&order.escrow_address)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_escrow.order_id, order.order_id);
}

async fn check_close_idempotent(store: &dyn OrderRepository) {
    let order = make_order(
        &unique("esc"),
        &unique("sell"),
        &unique("buy"),
        0,
        None,
    );
    store.insert_order(order.clone()).await.unwrap();

    assert!(store.close_order(&order.order_id).await.unwrap());
    assert!(!store.close_order(&order.order_id).await.unwrap());
    assert!(store.get_order_by_id(&order.order_id).await.unwrap().is_none());
}

// ---- File backend ----

#[tokio::test]
async fn test_file_duplicate_escrow() {
    let (_dir, store) = file_store().await;
    check_duplicate_escrow(store.as_ref()).await;
}

#[tokio::test]
async fn test_file_concurrent_duplicate_insert() {
    let (_dir, store) = file_store().await;
    check_concurrent_duplicate_insert(store).await;
}

#[tokio::test]
async fn test_file_filters_sort_and_pagination() {
    let (_dir, store) = file_store().await;
    check_filters_sort_and_pagination(store.as_ref()).await;
}

#[tokio::test]
async fn test_file_lazy_expiry() {
    let (_dir, store) = file_store().await;
    check_lazy_expiry(store.as_ref()).await;
}

#[tokio::test]
async fn test_file_mark_filled() {
    let (_dir, store) = file_store().await;
    check_mark_filled(store.as_ref()).await;
}

#[tokio::test]
async fn test_file_close_idempotent() {
    let (_dir, store) = file_store().await;
    check_close_idempotent(store.as_ref()).await;
}

#[tokio::test]
async fn test_file_mark_filled_rolls_back_on_failed_flush() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().to_str().unwrap();
    let tmp_path = dir.path().join("orders.json.tmp");

    let order = make_order(
        &unique("esc"),
        &unique("sell"),
        &unique("buy"),
        0,
        None,
    );

    {
        let store = FileOrderStore::new(data_dir).await.unwrap();
        store.initialize().await.unwrap();
        store.insert_order(order.clone()).await.unwrap();

        // A directory squatting on the tmp path makes the atomic
        // flush fail
        std::fs::create_dir(&tmp_path).unwrap();

        assert!(store.mark_order_filled(&order.order_id).await.is_err());
        // The failed transition is rolled back, so memory agrees with
        // disk and a retry attempts the flush again instead of
        // reporting a durable fill that never landed
        let current = store
            .get_order_by_id(&order.order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(current.status, OrderStatus::Open);
        assert!(store.mark_order_filled(&order.order_id).await.is_err());

        // Once the flush is unblocked the retry succeeds durably
        std::fs::remove_dir(&tmp_path).unwrap();
        assert!(store.mark_order_filled(&order.order_id).await.unwrap());
    }

    let reopened = FileOrderStore::new(data_dir).await.unwrap();
    reopened.initialize().await.unwrap();
    let reloaded = reopened
        .get_order_by_id(&order.order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.status, OrderStatus::Filled);
}

#[tokio::test]
async fn test_file_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().to_str().unwrap();

    let keep = make_order(
        &unique("esc"),
        &unique("sell"),
        &unique("buy"),
        0,
        None,
    );
    let fill = make_order(
        &unique("esc"),
        &unique("sell"),
        &unique("buy"),
        0,
        None,
    );

    {
        let store = FileOrderStore::new(data_dir).await.unwrap();
        store.initialize().await.unwrap();
        store.insert_order(keep.clone()).await.unwrap();
        store.insert_order(fill.clone()).await.unwrap();
        store.mark_order_filled(&fill.order_id).await.unwrap();
        store.close().await.unwrap();
    }

    let reopened = FileOrderStore::new(data_dir).await.unwrap();
    reopened.initialize().await.unwrap();

    let all = reopened.get_all_orders().await.unwrap();
    assert_eq!(all.len(), 2);

    let reloaded = reopened
        .get_order_by_id(&keep.order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded, keep);

    let refilled = reopened
        .get_order_by_id(&fill.order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refilled.status, OrderStatus::Filled);
}

// ---- Postgres backend ----

#[tokio::test]
#[ignore = "needs a scratch PostgreSQL database via DATABASE_URL"]
async fn test_postgres_conformance() {
    let url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must point at a scratch database");
    let store = PgOrderStore::connect(&url).await.unwrap();
    store.initialize().await.unwrap();
    let store: Arc<dyn OrderRepository> = Arc::new(store);

    check_duplicate_escrow(store.as_ref()).await;
    check_concurrent_duplicate_insert(Arc::clone(&store)).await;
    check_filters_sort_and_pagination(store.as_ref()).await;
    check_lazy_expiry(store.as_ref()).await;
    check_mark_filled(store.as_ref()).await;
    check_close_idempotent(store.as_ref()).await;
}
