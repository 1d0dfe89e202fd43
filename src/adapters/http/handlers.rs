//! Request handlers for the order facade.
//!
//! Handlers stay thin: parse, authenticate where required, delegate to
//! the service, map errors to wire responses. Auth failures collapse
//! into one generic 401 regardless of cause, and backend failures are
//! logged here and surfaced as a generic 500.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, instrument, warn};

use super::AppState;
use super::auth::{HEADER_SIGNATURE, HEADER_TIMESTAMP, HmacGuard};
use crate::domain::order::NewOrder;
use crate::ports::repository::{OrderFilters, Page};
use crate::usecases::ServiceError;

/// Path component signed by callers; query strings are excluded from
/// the canonical string.
const ORDER_PATH: &str = "/order";
const ORDER_FILLED_PATH: &str = "/order/filled";

/// Query parameters for `GET /order`.
#[derive(Debug, Deserialize)]
pub struct OrderQuery {
    pub id: Option<String>,
    pub escrow_address: Option<String>,
    pub sell_token_address: Option<String>,
    pub buy_token_address: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    #[serde(default)]
    pub include_sensitive: bool,
}

/// Query parameters for `DELETE /order`.
#[derive(Debug, Deserialize)]
pub struct CloseQuery {
    pub id: Option<String>,
    #[serde(default)]
    pub all: bool,
}

/// Query parameters for `POST /order/filled`.
#[derive(Debug, Deserialize)]
pub struct FilledQuery {
    pub id: String,
}

/// Wire-level error responses. Messages are generic by design; the
/// real cause of backend failures lives in the logs only.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    Validation(String),
    DuplicateEscrow,
    NotFound,
    Internal,
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(msg) => Self::Validation(msg),
            ServiceError::DuplicateEscrow => Self::DuplicateEscrow,
            ServiceError::NotFound => Self::NotFound,
            ServiceError::Backend(cause) => {
                error!(error = ?cause, "Backend failure");
                Self::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::DuplicateEscrow => (StatusCode::CONFLICT, "escrow exists".to_string()),
            Self::NotFound => (StatusCode::NOT_FOUND, "order not found".to_string()),
            Self::Internal => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };
        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

/// Check the signature headers for a state-revealing or mutating
/// request. Every failure mode maps to the same `Unauthorized`.
fn require_auth(
    guard: &HmacGuard,
    method: &str,
    path: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), ApiError> {
    let timestamp = headers
        .get(HEADER_TIMESTAMP)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let signature = headers
        .get(HEADER_SIGNATURE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if timestamp.is_empty()
        || signature.is_empty()
        || !guard.verify(method, path, timestamp, body, signature)
    {
        warn!(method, path, "Rejected unauthenticated request");
        return Err(ApiError::Unauthorized);
    }
    Ok(())
}

/// Liveness probe. Unauthenticated, fixed body.
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// `POST /order` - validate and store a new order.
#[instrument(skip_all)]
pub async fn create_order(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Response, ApiError> {
    // Deserialize by hand so malformed bodies get a 400, not axum's 422.
    let new_order: NewOrder = serde_json::from_value(body)
        .map_err(|e| ApiError::Validation(format!("invalid order body: {e}")))?;

    let stored = state.service.create_order(new_order).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": stored.to_public() })),
    )
        .into_response())
}

/// `GET /order` - public listing, or full records for signed requests.
#[instrument(skip_all, fields(sensitive = query.include_sensitive))]
pub async fn get_orders(
    State(state): State<AppState>,
    Query(query): Query<OrderQuery>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let filters = OrderFilters {
        escrow_address: query.escrow_address.clone(),
        sell_token_address: query.sell_token_address.clone(),
        buy_token_address: query.buy_token_address.clone(),
    };
    let page = Page {
        limit: query.limit,
        offset: query.offset,
    };

    if query.include_sensitive {
        // Signed over the path only; the query string is excluded.
        require_auth(&state.guard, "GET", ORDER_PATH, &headers, b"")?;
        let orders = state
            .service
            .get_orders_sensitive(query.id.as_deref(), &filters, page)
            .await?;
        return Ok(Json(json!({ "success": true, "data": orders })));
    }

    let data = if let Some(id) = &query.id {
        state
            .service
            .get_order_public(id)
            .await?
            .into_iter()
            .collect()
    } else {
        state.service.list_orders(&filters, page).await?
    };
    Ok(Json(json!({ "success": true, "data": data })))
}

/// `DELETE /order` - close one order or all of them. Always signed.
#[instrument(skip_all)]
pub async fn close_orders(
    State(state): State<AppState>,
    Query(query): Query<CloseQuery>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_auth(&state.guard, "DELETE", ORDER_PATH, &headers, b"")?;

    if query.all {
        let count = state.service.close_all().await?;
        return Ok(Json(json!({ "success": true, "count": count })));
    }

    let Some(id) = query.id else {
        return Err(ApiError::Validation(
            "id or all=true is required".to_string(),
        ));
    };
    // Idempotent: closing an already-gone order still succeeds.
    let _ = state.service.close_order(&id).await?;
    Ok(Json(json!({ "success": true })))
}

/// `POST /order/filled` - idempotent mark-filled. Always signed.
#[instrument(skip_all)]
pub async fn mark_filled(
    State(state): State<AppState>,
    Query(query): Query<FilledQuery>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_auth(&state.guard, "POST", ORDER_FILLED_PATH, &headers, b"")?;

    if state.service.mark_filled(&query.id).await? {
        Ok(Json(json!({ "success": true })))
    } else {
        Err(ApiError::NotFound)
    }
}
