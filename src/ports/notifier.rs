//! Notifier Port - Lifecycle Event Sink
//!
//! Order lifecycle events are published fire-and-forget after the
//! primary operation's result is already determined. Delivery is
//! best-effort: implementations log failures and never propagate them
//! into the calling operation.

use async_trait::async_trait;

/// Order lifecycle events published to the configured sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderEvent {
  Created,
  Filled,
  Closed,
}

impl OrderEvent {
  /// Wire name of the event.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Created => "order.created",
      Self::Filled => "order.filled",
      Self::Closed => "order.closed",
    }
  }
}

impl std::fmt::Display for OrderEvent {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Trait for lifecycle event sinks.
///
/// `payload` carries only public order fields; sensitive escrow
/// material must never reach a notifier.
#[async_trait]
pub trait OrderNotifier: Send + Sync + 'static {
  /// Deliver one event. Infallible by contract: failures are the
  /// implementation's problem (log sink), not the caller's.
  async fn notify(&self, event: OrderEvent, payload: serde_json::Value);
}
