//! File Order Store - Embedded Single-File JSON Backend
//!
//! Persists the order table to `orders.json` in the data directory
//! using atomic writes (write to tmp file, then rename), so the file
//! is always either the old or the new version, never a partial write.
//!
//! All mutations hold the write lock across the uniqueness check, the
//! in-memory update and the flush to disk, which makes check-then-insert
//! atomic with respect to concurrent inserts of the same escrow address.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use crate::domain::order::{Order, OrderId, OrderStatus};
use crate::ports::repository::{
    OrderFilters, OrderRepository, Page, RepositoryError,
};

/// Embedded order store backed by one JSON file.
pub struct FileOrderStore {
    /// Path to orders.json.
    orders_path: PathBuf,
    /// Temporary path for atomic writes.
    tmp_path: PathBuf,
    /// In-memory table, source of truth between flushes.
    orders: RwLock<HashMap<OrderId, Order>>,
}

impl FileOrderStore {
    /// Create a store rooted at the given data directory.
    ///
    /// Creates the directory if it doesn't exist. Existing orders are
    /// loaded by `initialize`.
    pub async fn new(data_dir: &str) -> Result<Self, RepositoryError> {
        let dir = Path::new(data_dir);
        fs::create_dir_all(dir)
            .await
            .context("Failed to create data directory")
            .map_err(RepositoryError::Backend)?;

        Ok(Self {
            orders_path: dir.join("orders.json"),
            tmp_path: dir.join("orders.json.tmp"),
            orders: RwLock::new(HashMap::new()),
        })
    }

    /// Flush the given table to disk atomically (tmp → rename).
    ///
    /// Callers hold the write lock, so flushes are serialized.
    async fn persist(
        &self,
        orders: &HashMap<OrderId, Order>,
    ) -> Result<(), RepositoryError> {
        let list: Vec<&Order> = orders.values().collect();
        let json = serde_json::to_string_pretty(&list)
            .context("Failed to serialize orders")
            .map_err(RepositoryError::Backend)?;

        fs::write(&self.tmp_path, &json)
            .await
            .context("Failed to write tmp orders file")
            .map_err(RepositoryError::Backend)?;

        fs::rename(&self.tmp_path, &self.orders_path)
            .await
            .context("Failed to rename orders file")
            .map_err(RepositoryError::Backend)?;

        Ok(())
    }
}

#[async_trait]
impl OrderRepository for FileOrderStore {
    /// Load any existing orders file into memory. Idempotent; a fresh
    /// directory simply starts empty.
    #[instrument(skip(self))]
    async fn initialize(&self) -> Result<(), RepositoryError> {
        if !self.orders_path.exists() {
            info!("No orders file found, starting fresh");
            return Ok(());
        }

        let json = fs::read_to_string(&self.orders_path)
            .await
            .context("Failed to read orders file")
            .map_err(RepositoryError::Backend)?;

        let list: Vec<Order> = serde_json::from_str(&json)
            .context("Failed to parse orders JSON")
            .map_err(RepositoryError::Backend)?;

        let mut orders = self.orders.write().await;
        orders.clear();
        for order in list {
            orders.insert(order.order_id.clone(), order);
        }

        info!(
            count = orders.len(),
            path = %self.orders_path.display(),
            "Orders loaded"
        );
        Ok(())
    }

    async fn insert_order(&self, order: Order) -> Result<Order, RepositoryError> {
        let mut orders = self.orders.write().await;

        if orders
            .values()
            .any(|o| o.escrow_address == order.escrow_address)
        {
            return Err(RepositoryError::EscrowExists);
        }

        orders.insert(order.order_id.clone(), order.clone());
        if let Err(e) = self.persist(&orders).await {
            // Roll back the in-memory insert so memory and disk agree.
            orders.remove(&order.order_id);
            return Err(e);
        }
        Ok(order)
    }

    async fn get_order_by_id(
        &self,
        order_id: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        Ok(self.orders.read().await.get(order_id).cloned())
    }

    async fn get_order_by_escrow_address(
        &self,
        escrow_address: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        Ok(self
            .orders
            .read()
            .await
            .values()
            .find(|o| o.escrow_address == escrow_address)
            .cloned())
    }

    async fn get_all_orders(&self) -> Result<Vec<Order>, RepositoryError> {
        let mut list: Vec<Order> =
            self.orders.read().await.values().cloned().collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn get_orders_with_filters(
        &self,
        filters: &OrderFilters,
        page: Page,
    ) -> Result<Vec<Order>, RepositoryError> {
        let now = Utc::now();
        let mut list: Vec<Order> = self
            .orders
            .read()
            .await
            .values()
            .filter(|o| o.is_listable(now))
            .filter(|o| {
                filters
                    .escrow_address
                    .as_ref()
                    .is_none_or(|v| *v == o.escrow_address)
            })
            .filter(|o| {
                filters
                    .sell_token_address
                    .as_ref()
                    .is_none_or(|v| *v == o.sell_token_address)
            })
            .filter(|o| {
                filters
                    .buy_token_address
                    .as_ref()
                    .is_none_or(|v| *v == o.buy_token_address)
            })
            .cloned()
            .collect();

        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let offset = page.offset.unwrap_or(0) as usize;
        let limit = page.limit.map_or(usize::MAX, |l| l as usize);
        Ok(list.into_iter().skip(offset).take(limit).collect())
    }

    async fn mark_order_filled(
        &self,
        order_id: &str,
    ) -> Result<bool, RepositoryError> {
        let mut orders = self.orders.write().await;
        let Some(order) = orders.get_mut(order_id) else {
            return Ok(false);
        };
        if order.status == OrderStatus::Filled {
            return Ok(true);
        }
        order.status = OrderStatus::Filled;
        if let Err(e) = self.persist(&orders).await {
            // Roll back so memory and disk agree and a retry flushes
            // again instead of taking the already-filled short circuit.
            if let Some(order) = orders.get_mut(order_id) {
                order.status = OrderStatus::Open;
            }
            return Err(e);
        }
        Ok(true)
    }

    async fn close_order(&self, order_id: &str) -> Result<bool, RepositoryError> {
        let mut orders = self.orders.write().await;
        if orders.remove(order_id).is_none() {
            return Ok(false);
        }
        self.persist(&orders).await?;
        Ok(true)
    }

    async fn close(&self) -> Result<(), RepositoryError> {
        // Every mutation is flushed synchronously; nothing buffered.
        let orders = self.orders.read().await;
        if let Err(e) = self.persist(&orders).await {
            warn!(error = %e, "Final flush failed during shutdown");
        }
        Ok(())
    }
}
