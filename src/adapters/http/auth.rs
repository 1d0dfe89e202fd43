//! Request Authentication - HMAC-SHA256 Signed Requests
//!
//! Any request that reveals escrow secrets or mutates state must carry
//! `x-timestamp` and `x-signature` headers. The signature is
//! HMAC-SHA256 over the canonical string
//! `METHOD\nPATH\nUNIX_TIMESTAMP_SECONDS\nRAW_BODY` (query string
//! excluded), hex-encoded. A clock-skew window bounds replay of old
//! signed requests.
//!
//! The guard is a pure check; the facade turns every negative result
//! into the same generic 401 so callers cannot distinguish a bad
//! signature from a missing secret or a stale timestamp.

use chrono::Utc;

/// Header carrying the signer's Unix timestamp in seconds.
pub const HEADER_TIMESTAMP: &str = "x-timestamp";
/// Header carrying the hex-encoded HMAC-SHA256 signature.
pub const HEADER_SIGNATURE: &str = "x-signature";

/// Default tolerated clock skew between signer and server, seconds.
pub const DEFAULT_MAX_SKEW_SECONDS: i64 = 300;

/// Verifies signed requests against the shared secret.
///
/// Constructed once at startup and shared by the facade. With no
/// secret configured the guard fails closed and rejects everything.
pub struct HmacGuard {
    /// Shared secret; `None` means every check fails.
    secret: Option<String>,
    /// Maximum tolerated |now - timestamp| in seconds.
    max_skew_seconds: i64,
}

impl HmacGuard {
    /// Create a guard with the given secret and skew window.
    pub fn new(secret: Option<String>, max_skew_seconds: i64) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
            max_skew_seconds,
        }
    }

    /// Compute the hex signature for a request. Also used by tests and
    /// operator tooling to produce valid signatures.
    pub fn sign(
        secret: &str,
        method: &str,
        path: &str,
        timestamp: &str,
        body: &[u8],
    ) -> String {
        let mut payload = format!(
            "{}\n{}\n{}\n",
            method.to_uppercase(),
            path,
            timestamp
        )
        .into_bytes();
        payload.extend_from_slice(body);
        hex::encode(hmac_sha256::HMAC::mac(payload, secret.as_bytes()))
    }

    /// Verify a signed request against the current clock.
    pub fn verify(
        &self,
        method: &str,
        path: &str,
        timestamp: &str,
        body: &[u8],
        signature: &str,
    ) -> bool {
        self.verify_at(Utc::now().timestamp(), method, path, timestamp, body, signature)
    }

    /// Clock-injected verification core.
    fn verify_at(
        &self,
        now_seconds: i64,
        method: &str,
        path: &str,
        timestamp: &str,
        body: &[u8],
        signature: &str,
    ) -> bool {
        // Fail closed when no secret is configured.
        let Some(secret) = &self.secret else {
            return false;
        };

        let Ok(ts) = timestamp.trim().parse::<i64>() else {
            return false;
        };
        if (now_seconds - ts).abs() > self.max_skew_seconds {
            return false;
        }

        let computed = Self::sign(secret, method, path, timestamp, body);
        constant_time_eq(computed.as_bytes(), signature.as_bytes())
    }
}

/// Constant-time byte comparison.
///
/// Unequal lengths are rejected up front (length is not secret); the
/// compare itself never short-circuits on content.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    fn guard() -> HmacGuard {
        HmacGuard::new(Some(SECRET.to_string()), DEFAULT_MAX_SKEW_SECONDS)
    }

    fn signed(method: &str, path: &str, ts: i64, body: &[u8]) -> (String, String) {
        let ts = ts.to_string();
        let sig = HmacGuard::sign(SECRET, method, path, &ts, body);
        (ts, sig)
    }

    #[test]
    fn test_accepts_valid_signature() {
        let g = guard();
        let now = Utc::now().timestamp();
        let (ts, sig) = signed("GET", "/order", now, b"");
        assert!(g.verify("GET", "/order", &ts, b"", &sig));
    }

    #[test]
    fn test_method_is_uppercased_before_signing() {
        let g = guard();
        let now = Utc::now().timestamp();
        let (ts, sig) = signed("delete", "/order", now, b"");
        assert!(g.verify("DELETE", "/order", &ts, b"", &sig));
    }

    #[test]
    fn test_rejects_tampered_body_path_and_timestamp() {
        let g = guard();
        let now = Utc::now().timestamp();
        let (ts, sig) = signed("GET", "/order", now, b"payload");

        assert!(!g.verify("GET", "/order", &ts, b"payload2", &sig));
        assert!(!g.verify("GET", "/orders", &ts, b"payload", &sig));
        let shifted = (now + 1).to_string();
        assert!(!g.verify("GET", "/order", &shifted, b"payload", &sig));
    }

    #[test]
    fn test_skew_boundary_299_accepts_301_rejects() {
        let g = guard();
        let signed_at = 1_700_000_000i64;
        let ts = signed_at.to_string();
        let sig = HmacGuard::sign(SECRET, "GET", "/order", &ts, b"");

        assert!(g.verify_at(signed_at + 299, "GET", "/order", &ts, b"", &sig));
        assert!(g.verify_at(signed_at + 300, "GET", "/order", &ts, b"", &sig));
        assert!(!g.verify_at(signed_at + 301, "GET", "/order", &ts, b"", &sig));
        // Skew applies in both directions.
        assert!(!g.verify_at(signed_at - 301, "GET", "/order", &ts, b"", &sig));
    }

    #[test]
    fn test_fails_closed_without_secret() {
        let g = HmacGuard::new(None, DEFAULT_MAX_SKEW_SECONDS);
        let now = Utc::now().timestamp();
        let (ts, sig) = signed("GET", "/order", now, b"");
        assert!(!g.verify("GET", "/order", &ts, b"", &sig));

        let empty = HmacGuard::new(Some(String::new()), DEFAULT_MAX_SKEW_SECONDS);
        assert!(!empty.verify("GET", "/order", &ts, b"", &sig));
    }

    #[test]
    fn test_rejects_unparseable_timestamp() {
        let g = guard();
        let sig = HmacGuard::sign(SECRET, "GET", "/order", "soon", b"");
        assert!(!g.verify("GET", "/order", "soon", b"", &sig));
    }

    #[test]
    fn test_rejects_wrong_length_signature() {
        let g = guard();
        let now = Utc::now().timestamp().to_string();
        assert!(!g.verify("GET", "/order", &now, b"", "deadbeef"));
        assert!(!g.verify("GET", "/order", &now, b"", ""));
    }
}
