//! HTTP Facade - axum Order API
//!
//! Thin translation layer between the wire contract and the
//! `OrderService`:
//! - `POST /order` - create (public)
//! - `GET /order` - list/get; `include_sensitive=true` requires a
//!   signed request
//! - `DELETE /order` - close one (`?id=`) or all (`?all=true`), signed
//! - `POST /order/filled` - idempotent mark-filled (`?id=`), signed
//! - `GET /health` - liveness, unauthenticated

pub mod auth;
mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use crate::usecases::OrderService;
use auth::HmacGuard;

/// Shared per-process state: the service and the guard, constructed
/// once at startup and cloned (cheaply) per request.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<OrderService>,
    pub guard: Arc<HmacGuard>,
}

/// Build the order facade router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/order",
            post(handlers::create_order)
                .get(handlers::get_orders)
                .delete(handlers::close_orders),
        )
        .route("/order/filled", post(handlers::mark_filled))
        .route("/health", get(handlers::health))
        .with_state(state)
}
