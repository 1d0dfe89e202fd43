//! Core order domain types.
//!
//! Defines the single entity of the service: an escrow-backed sell
//! order, plus its public (redacted) projection and the seller-supplied
//! creation payload.
//!
//! Wire format is camelCase JSON to stay compatible with existing
//! desk clients. Token amounts travel as decimal strings end to end so
//! any token decimal width up to uint256 survives without precision
//! loss; they are validated against `U256` bounds at creation.

use alloy::primitives::U256;
use anyhow::{Context, Result, bail, ensure};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque order identifier assigned at creation, immutable afterwards.
pub type OrderId = String;

/// Lifecycle status of a stored order.
///
/// `Filled` is terminal but distinct from deletion: the fill workflow
/// marks an order filled before finishing settlement off-system, so a
/// crash in between never leaves a drained escrow publicly listed.
/// Cancellation deletes the row outright and has no status of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Listed publicly and available to fill.
    Open,
    /// Escrow drained by a buyer; hidden from listings, kept for the
    /// settlement grace window until explicitly closed.
    Filled,
}

impl OrderStatus {
    /// Storage representation (also the JSON representation).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Filled => "filled",
        }
    }

    /// Parse the storage representation back into a status.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "open" => Ok(Self::Open),
            "filled" => Ok(Self::Filled),
            other => bail!("unknown order status: {other}"),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored order, including the escrow secrets.
///
/// The sensitive fields (`secret_key`, `partial_address`,
/// `contract_instance`) enable draining the escrow and must never
/// leave the service unredacted; callers serialize [`PublicOrder`]
/// unless the request passed the HMAC guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Unique identifier, assigned by the service.
    pub order_id: OrderId,
    /// Address of the on-chain escrow holding the sale. Globally
    /// unique among stored orders.
    pub escrow_address: String,
    /// Serialized deployment descriptor for the escrow. Sensitive.
    pub contract_instance: String,
    /// Key material to derive the escrow account. Sensitive.
    pub secret_key: String,
    /// Partial address for escrow account derivation. Sensitive.
    pub partial_address: String,
    /// Token the seller offers.
    pub sell_token_address: String,
    /// Amount offered, decimal string with uint256 semantics.
    pub sell_token_amount: String,
    /// Token the seller wants in return.
    pub buy_token_address: String,
    /// Amount wanted, decimal string with uint256 semantics.
    pub buy_token_amount: String,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Optional epoch-seconds deadline. Past deadlines hide the order
    /// from listings without deleting it (lazy expiry).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    /// Server-assigned creation time, default sort key (descending).
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Whether the expiry deadline, if any, has passed at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now.timestamp())
    }

    /// Whether the order belongs in public listings at `now`:
    /// open and not expired.
    pub fn is_listable(&self, now: DateTime<Utc>) -> bool {
        self.status == OrderStatus::Open && !self.is_expired(now)
    }

    /// Redacted projection with all escrow secrets removed.
    pub fn to_public(&self) -> PublicOrder {
        PublicOrder {
            order_id: self.order_id.clone(),
            escrow_address: self.escrow_address.clone(),
            sell_token_address: self.sell_token_address.clone(),
            sell_token_amount: self.sell_token_amount.clone(),
            buy_token_address: self.buy_token_address.clone(),
            buy_token_amount: self.buy_token_amount.clone(),
            status: self.status,
            expires_at: self.expires_at,
            created_at: self.created_at,
        }
    }
}

/// Public projection of an [`Order`]: the swap terms without any of
/// the fields that would let a caller drain the escrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicOrder {
    pub order_id: OrderId,
    pub escrow_address: String,
    pub sell_token_address: String,
    pub sell_token_amount: String,
    pub buy_token_address: String,
    pub buy_token_amount: String,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Seller-submitted order fields, before the service assigns identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub escrow_address: String,
    pub contract_instance: String,
    pub secret_key: String,
    pub partial_address: String,
    pub sell_token_address: String,
    pub sell_token_amount: String,
    pub buy_token_address: String,
    pub buy_token_amount: String,
    #[serde(default)]
    pub expires_at: Option<i64>,
}

/// Normalize an on-chain address for storage and comparison.
///
/// Addresses are lowercased once at the boundary so repository
/// matching stays byte-exact on stored values.
pub fn normalize_address(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

/// Parse and validate a token amount carried as a decimal string.
///
/// Accepts positive base-10 integers representable in 256 bits.
/// Rejects zero, signs, hex, whitespace and anything wider than
/// uint256.
pub fn parse_token_amount(raw: &str) -> Result<U256> {
    ensure!(!raw.is_empty(), "amount must not be empty");
    ensure!(
        raw.bytes().all(|b| b.is_ascii_digit()),
        "amount must be a base-10 integer: {raw:?}"
    );
    let value = U256::from_str_radix(raw, 10)
        .with_context(|| format!("amount exceeds uint256: {raw:?}"))?;
    ensure!(value > U256::ZERO, "amount must be positive");
    Ok(value)
}
