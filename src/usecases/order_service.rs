//! Order Service - Lifecycle Orchestration over the Repository
//!
//! Layers validation, redaction and webhook dispatch on top of the
//! `OrderRepository` port:
//! - Create: field validation, address normalization, identity
//!   assignment, duplicate-escrow conflict mapping
//! - List (public): filtered listing with unconditional redaction
//! - Get (sensitive): raw lookups for authenticated callers, ignoring
//!   status/expiry so a just-filled order stays retrievable during the
//!   settlement grace window
//! - Fill/Close: idempotent terminal transitions
//!
//! Expiry is evaluated lazily at read time by the repository; this
//! layer never runs background sweeps.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::order::{
  NewOrder, Order, OrderStatus, PublicOrder, normalize_address,
  parse_token_amount,
};
use crate::ports::notifier::{OrderEvent, OrderNotifier};
use crate::ports::repository::{
  OrderFilters, OrderRepository, Page, RepositoryError,
};

/// Service-level error taxonomy surfaced to the HTTP facade.
///
/// Messages never carry sensitive order fields; backend causes are
/// logged by the facade and replaced with a generic failure on the
/// wire.
#[derive(Debug, Error)]
pub enum ServiceError {
  /// Malformed or missing input. Client's fault, no retry implied.
  #[error("invalid order: {0}")]
  Validation(String),
  /// An order for this escrow address already exists. Client should
  /// not retry with the same data.
  #[error("order with this escrow address already exists")]
  DuplicateEscrow,
  /// Lookup miss on an operation that requires the order to exist.
  #[error("order not found")]
  NotFound,
  /// Storage failure. Aborts the request.
  #[error(transparent)]
  Backend(anyhow::Error),
}

impl From<RepositoryError> for ServiceError {
  fn from(err: RepositoryError) -> Self {
    match err {
      RepositoryError::EscrowExists => Self::DuplicateEscrow,
      RepositoryError::Backend(cause) => Self::Backend(cause),
    }
  }
}

/// Orchestrates order lifecycle over storage and notification ports.
///
/// Constructed once at startup and shared across requests; all mutable
/// state lives behind the repository.
pub struct OrderService {
  repo: Arc<dyn OrderRepository>,
  notifier: Arc<dyn OrderNotifier>,
}

impl OrderService {
  /// Create a new service over the given ports.
  pub fn new(
    repo: Arc<dyn OrderRepository>,
    notifier: Arc<dyn OrderNotifier>,
  ) -> Self {
    Self { repo, notifier }
  }

  /// Validate and store a seller's order.
  ///
  /// Assigns `orderId` and `createdAt`, normalizes addresses, and
  /// fires `order.created` (public fields only) on success.
  #[instrument(skip(self, new_order), fields(escrow = %new_order.escrow_address))]
  pub async fn create_order(
    &self,
    new_order: NewOrder,
  ) -> Result<Order, ServiceError> {
    let order = validate_new_order(new_order)?;
    let stored = self.repo.insert_order(order).await?;

    info!(order_id = %stored.order_id, "Order created");
    self.dispatch(
      OrderEvent::Created,
      serde_json::to_value(stored.to_public()).unwrap_or_default(),
    );
    Ok(stored)
  }

  /// Public listing: open, not-expired orders matching the filters,
  /// redacted unconditionally.
  pub async fn list_orders(
    &self,
    filters: &OrderFilters,
    page: Page,
  ) -> Result<Vec<PublicOrder>, ServiceError> {
    let orders = self
      .repo
      .get_orders_with_filters(&normalize_filters(filters), page)
      .await?;
    Ok(orders.iter().map(Order::to_public).collect())
  }

  /// Public lookup of a single order by id, redacted. Raw lookup so
  /// the order detail view keeps working for filled/expired orders.
  pub async fn get_order_public(
    &self,
    order_id: &str,
  ) -> Result<Option<PublicOrder>, ServiceError> {
    let order = self.repo.get_order_by_id(order_id).await?;
    Ok(order.map(|o| o.to_public()))
  }

  /// Full records including escrow secrets.
  ///
  /// Only call after the HMAC guard accepted the request. Lookups by
  /// id or escrow address are raw (status/expiry ignored) so the fill
  /// workflow can finish settlement on a just-filled order; without
  /// either, the filtered listing is returned unredacted.
  pub async fn get_orders_sensitive(
    &self,
    order_id: Option<&str>,
    filters: &OrderFilters,
    page: Page,
  ) -> Result<Vec<Order>, ServiceError> {
    if let Some(id) = order_id {
      return Ok(self.repo.get_order_by_id(id).await?.into_iter().collect());
    }
    if let Some(escrow) = &filters.escrow_address {
      let order = self
        .repo
        .get_order_by_escrow_address(&normalize_address(escrow))
        .await?;
      return Ok(order.into_iter().collect());
    }
    Ok(
      self
        .repo
        .get_orders_with_filters(&normalize_filters(filters), page)
        .await?,
    )
  }

  /// Idempotently mark an order filled. Returns whether the order
  /// exists; retries by the fill workflow are expected and harmless.
  #[instrument(skip(self))]
  pub async fn mark_filled(&self, order_id: &str) -> Result<bool, ServiceError> {
    let exists = self.repo.mark_order_filled(order_id).await?;
    if exists {
      info!(order_id, "Order marked filled");
      self.dispatch(OrderEvent::Filled, json!({ "orderId": order_id }));
    }
    Ok(exists)
  }

  /// Delete a single order. Returns whether it existed; a repeat call
  /// reports false without erroring.
  #[instrument(skip(self))]
  pub async fn close_order(&self, order_id: &str) -> Result<bool, ServiceError> {
    let affected = self.repo.close_order(order_id).await?;
    if affected {
      info!(order_id, "Order closed");
      self.dispatch(OrderEvent::Closed, json!({ "orderId": order_id }));
    }
    Ok(affected)
  }

  /// Delete every stored order (open, expired or filled) and return
  /// the count removed.
  #[instrument(skip(self))]
  pub async fn close_all(&self) -> Result<u64, ServiceError> {
    let orders = self.repo.get_all_orders().await?;
    let mut count = 0u64;
    for order in orders {
      if self.repo.close_order(&order.order_id).await? {
        count += 1;
        self.dispatch(OrderEvent::Closed, json!({ "orderId": order.order_id }));
      }
    }
    info!(count, "All orders closed");
    Ok(count)
  }

  /// Fire-and-forget dispatch on a detached task, after the primary
  /// result is already determined. Failures never reach the caller.
  fn dispatch(&self, event: OrderEvent, payload: serde_json::Value) {
    let notifier = Arc::clone(&self.notifier);
    tokio::spawn(async move {
      notifier.notify(event, payload).await;
    });
  }
}

/// Check required fields and amount bounds, then build the stored
/// entity with server-assigned identity.
fn validate_new_order(new_order: NewOrder) -> Result<Order, ServiceError> {
  let required = [
    ("escrowAddress", &new_order.escrow_address),
    ("contractInstance", &new_order.contract_instance),
    ("secretKey", &new_order.secret_key),
    ("partialAddress", &new_order.partial_address),
    ("sellTokenAddress", &new_order.sell_token_address),
    ("buyTokenAddress", &new_order.buy_token_address),
  ];
  for (name, value) in required {
    if value.trim().is_empty() {
      return Err(ServiceError::Validation(format!("{name} is required")));
    }
  }

  parse_token_amount(&new_order.sell_token_amount)
    .map_err(|e| ServiceError::Validation(format!("sellTokenAmount: {e}")))?;
  parse_token_amount(&new_order.buy_token_amount)
    .map_err(|e| ServiceError::Validation(format!("buyTokenAmount: {e}")))?;

  Ok(Order {
    order_id: Uuid::new_v4().to_string(),
    escrow_address: normalize_address(&new_order.escrow_address),
    contract_instance: new_order.contract_instance,
    secret_key: new_order.secret_key,
    partial_address: new_order.partial_address,
    sell_token_address: normalize_address(&new_order.sell_token_address),
    sell_token_amount: new_order.sell_token_amount,
    buy_token_address: normalize_address(&new_order.buy_token_address),
    buy_token_amount: new_order.buy_token_amount,
    status: OrderStatus::Open,
    expires_at: new_order.expires_at,
    created_at: Utc::now(),
  })
}

/// Apply the write-time address normalization to filter inputs.
fn normalize_filters(filters: &OrderFilters) -> OrderFilters {
  OrderFilters {
    escrow_address: filters
      .escrow_address
      .as_deref()
      .map(normalize_address),
    sell_token_address: filters
      .sell_token_address
      .as_deref()
      .map(normalize_address),
    buy_token_address: filters
      .buy_token_address
      .as_deref()
      .map(normalize_address),
  }
}
