//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates the order lifecycle over the port interfaces.
//!
//! Use cases:
//! - `OrderService`: validation, uniqueness conflict mapping,
//!   sensitive-field redaction, lazy-expiry listing, close/fill
//!   lifecycle, and fire-and-forget webhook dispatch

pub mod order_service;

pub use order_service::{OrderService, ServiceError};
