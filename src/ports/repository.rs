//! Repository Port - Order Storage Interface
//!
//! Capability interface for the durable order table, independent of
//! backend. Two adapters implement it: an embedded single-file JSON
//! store for local/dev use and a PostgreSQL store for production.
//! Both must satisfy identical semantics, including the atomic
//! escrow-address uniqueness check on insert.
//!
//! Lookup primitives here are raw: status and expiry filtering belong
//! to `get_orders_with_filters` only, so the service can still fetch a
//! filled or expired order by id during the settlement grace window.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::order::Order;

/// Storage-layer failures surfaced to the service.
#[derive(Debug, Error)]
pub enum RepositoryError {
  /// Another stored order already holds this escrow address.
  #[error("order with this escrow address already exists")]
  EscrowExists,
  /// The backend failed or is unreachable. Fatal for the request,
  /// never retried by the service itself.
  #[error(transparent)]
  Backend(#[from] anyhow::Error),
}

impl RepositoryError {
  /// Wrap any backend error without losing its chain.
  pub fn backend(err: impl Into<anyhow::Error>) -> Self {
    Self::Backend(err.into())
  }
}

/// Exact-match filters combined with AND semantics.
///
/// Addresses are compared as stored; callers normalize (lowercase)
/// before filtering, matching the write-time policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilters {
  pub escrow_address: Option<String>,
  pub sell_token_address: Option<String>,
  pub buy_token_address: Option<String>,
}

/// Pagination applied after filtering and createdAt-descending sort.
/// An absent limit returns all matches.
#[derive(Debug, Clone, Copy, Default)]
pub struct Page {
  pub limit: Option<u32>,
  pub offset: Option<u32>,
}

/// Trait for order storage providers.
#[async_trait]
pub trait OrderRepository: Send + Sync + 'static {
  /// Idempotently provision schema/migrations. Fails if storage is
  /// unreachable; the hosting process treats that as fatal.
  async fn initialize(&self) -> Result<(), RepositoryError>;

  /// Store a new order. The escrow-address uniqueness check is atomic
  /// with respect to concurrent inserts: of two simultaneous inserts
  /// for the same escrow, exactly one succeeds and the other gets
  /// [`RepositoryError::EscrowExists`].
  async fn insert_order(&self, order: Order) -> Result<Order, RepositoryError>;

  /// Raw lookup by order id. No status/expiry filtering.
  async fn get_order_by_id(
    &self,
    order_id: &str,
  ) -> Result<Option<Order>, RepositoryError>;

  /// Raw lookup by escrow address. No status/expiry filtering.
  async fn get_order_by_escrow_address(
    &self,
    escrow_address: &str,
  ) -> Result<Option<Order>, RepositoryError>;

  /// Raw dump of every stored order, createdAt descending. Used by
  /// close-all so expired-but-stored orders are removed too.
  async fn get_all_orders(&self) -> Result<Vec<Order>, RepositoryError>;

  /// Open, not-expired orders matching all provided filters, ordered
  /// by createdAt descending, then limit/offset applied.
  async fn get_orders_with_filters(
    &self,
    filters: &OrderFilters,
    page: Page,
  ) -> Result<Vec<Order>, RepositoryError>;

  /// Idempotently transition an order to `filled`. Returns whether
  /// the order exists; marking an already-filled order is not an
  /// error (the fill workflow retries this call).
  async fn mark_order_filled(
    &self,
    order_id: &str,
  ) -> Result<bool, RepositoryError>;

  /// Physically delete an order. Returns whether a row was affected;
  /// deleting twice is not an error, the second call reports false.
  async fn close_order(&self, order_id: &str) -> Result<bool, RepositoryError>;

  /// Release backend resources. Safe to call during shutdown.
  async fn close(&self) -> Result<(), RepositoryError>;
}
