//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the domain/usecases layer
//! requires from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `OrderRepository`: durable order storage (file or PostgreSQL)
//! - `OrderNotifier`: best-effort lifecycle event delivery

pub mod notifier;
pub mod repository;
