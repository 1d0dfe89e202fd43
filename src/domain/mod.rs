//! Domain layer - Core business entities and validation.
//!
//! Pure domain logic for the order bulletin board. No external I/O
//! allowed here (hexagonal architecture inner ring). All types are
//! serializable and testable in isolation.

pub mod order;

// Re-export core types for convenience
pub use order::{NewOrder, Order, OrderId, OrderStatus, PublicOrder};
