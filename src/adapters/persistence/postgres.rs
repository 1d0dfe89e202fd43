//! Postgres Order Store - Relational Production Backend
//!
//! Implements the `OrderRepository` port on PostgreSQL via sqlx.
//! Escrow-address uniqueness is enforced by the UNIQUE constraint in
//! the schema, not by an application-level read-then-write, so two
//! concurrent inserts for the same escrow deterministically yield one
//! success and one conflict.
//!
//! Amounts are persisted as their exact decimal-string representation
//! (TEXT columns), never as floating point.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::QueryBuilder;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{info, instrument};

use crate::domain::order::{Order, OrderStatus};
use crate::ports::repository::{
    OrderFilters, OrderRepository, Page, RepositoryError,
};

const SELECT_COLUMNS: &str = "SELECT order_id, escrow_address, \
     contract_instance, secret_key, partial_address, sell_token_address, \
     sell_token_amount, buy_token_address, buy_token_amount, status, \
     expires_at, created_at FROM orders";

/// PostgreSQL-backed order store.
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    /// Connect a pool to the given database URL.
    pub async fn connect(database_url: &str) -> Result<Self, RepositoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL")
            .map_err(RepositoryError::Backend)?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool (tests).
    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Row shape mirroring the `orders` table.
#[derive(sqlx::FromRow)]
struct OrderRow {
    order_id: String,
    escrow_address: String,
    contract_instance: String,
    secret_key: String,
    partial_address: String,
    sell_token_address: String,
    sell_token_amount: String,
    buy_token_address: String,
    buy_token_amount: String,
    status: String,
    expires_at: Option<i64>,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status =
            OrderStatus::parse(&row.status).map_err(RepositoryError::Backend)?;
        Ok(Self {
            order_id: row.order_id,
            escrow_address: row.escrow_address,
            contract_instance: row.contract_instance,
            secret_key: row.secret_key,
            partial_address: row.partial_address,
            sell_token_address: row.sell_token_address,
            sell_token_amount: row.sell_token_amount,
            buy_token_address: row.buy_token_address,
            buy_token_amount: row.buy_token_amount,
            status,
            expires_at: row.expires_at,
            created_at: row.created_at,
        })
    }
}

fn backend(err: sqlx::Error) -> RepositoryError {
    RepositoryError::backend(err)
}

#[async_trait]
impl OrderRepository for PgOrderStore {
    /// Run pending schema migrations. Idempotent.
    #[instrument(skip(self))]
    async fn initialize(&self) -> Result<(), RepositoryError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run migrations")
            .map_err(RepositoryError::Backend)?;
        info!("PostgreSQL schema ready");
        Ok(())
    }

    async fn insert_order(&self, order: Order) -> Result<Order, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO orders (order_id, escrow_address, contract_instance, \
             secret_key, partial_address, sell_token_address, \
             sell_token_amount, buy_token_address, buy_token_amount, status, \
             expires_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(&order.order_id)
        .bind(&order.escrow_address)
        .bind(&order.contract_instance)
        .bind(&order.secret_key)
        .bind(&order.partial_address)
        .bind(&order.sell_token_address)
        .bind(&order.sell_token_amount)
        .bind(&order.buy_token_address)
        .bind(&order.buy_token_amount)
        .bind(order.status.as_str())
        .bind(order.expires_at)
        .bind(order.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(order),
            // order_id is a fresh UUID, so in practice the only unique
            // conflict here is the escrow address.
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(RepositoryError::EscrowExists)
            }
            Err(e) => Err(backend(e)),
        }
    }

    async fn get_order_by_id(
        &self,
        order_id: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "{SELECT_COLUMNS} WHERE order_id = $1"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        row.map(Order::try_from).transpose()
    }

    async fn get_order_by_escrow_address(
        &self,
        escrow_address: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "{SELECT_COLUMNS} WHERE escrow_address = $1"
        ))
        .bind(escrow_address)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        row.map(Order::try_from).transpose()
    }

    async fn get_all_orders(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{SELECT_COLUMNS} ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        rows.into_iter().map(Order::try_from).collect()
    }

    async fn get_orders_with_filters(
        &self,
        filters: &OrderFilters,
        page: Page,
    ) -> Result<Vec<Order>, RepositoryError> {
        let mut qb = QueryBuilder::new(SELECT_COLUMNS);
        qb.push(" WHERE status = 'open' AND (expires_at IS NULL OR expires_at > ");
        qb.push_bind(Utc::now().timestamp());
        qb.push(")");

        if let Some(escrow) = &filters.escrow_address {
            qb.push(" AND escrow_address = ");
            qb.push_bind(escrow);
        }
        if let Some(sell) = &filters.sell_token_address {
            qb.push(" AND sell_token_address = ");
            qb.push_bind(sell);
        }
        if let Some(buy) = &filters.buy_token_address {
            qb.push(" AND buy_token_address = ");
            qb.push_bind(buy);
        }

        qb.push(" ORDER BY created_at DESC");
        if let Some(limit) = page.limit {
            qb.push(" LIMIT ");
            qb.push_bind(i64::from(limit));
        }
        if let Some(offset) = page.offset {
            qb.push(" OFFSET ");
            qb.push_bind(i64::from(offset));
        }

        let rows = qb
            .build_query_as::<OrderRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.into_iter().map(Order::try_from).collect()
    }

    async fn mark_order_filled(
        &self,
        order_id: &str,
    ) -> Result<bool, RepositoryError> {
        // Idempotent: re-running the UPDATE on a filled order still
        // matches the row, so retries report success.
        let result = sqlx::query("UPDATE orders SET status = 'filled' WHERE order_id = $1")
            .bind(order_id)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected() > 0)
    }

    async fn close_order(&self, order_id: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM orders WHERE order_id = $1")
            .bind(order_id)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected() > 0)
    }

    async fn close(&self) -> Result<(), RepositoryError> {
        self.pool.close().await;
        Ok(())
    }
}
