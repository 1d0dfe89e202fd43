//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (file I/O, PostgreSQL, HTTP). Each sub-module
//! groups adapters by infrastructure concern.
//!
//! Adapter categories:
//! - `http`: axum order facade and the HMAC authentication guard
//! - `persistence`: embedded file store and PostgreSQL order stores
//! - `webhook`: fire-and-forget lifecycle event delivery via reqwest

pub mod http;
pub mod persistence;
pub mod webhook;
