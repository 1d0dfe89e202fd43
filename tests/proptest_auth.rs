//! Property-Based Tests - Signing and Amount Parsing
//!
//! Uses proptest to check the request-signing round trip and the
//! decimal amount validator across generated inputs.

use chrono::Utc;
use proptest::prelude::*;

use alloy::primitives::U256;
use orderflow_service::adapters::http::auth::HmacGuard;
use orderflow_service::domain::order::{normalize_address, parse_token_amount};

proptest! {
    /// Anything signed with the shared secret verifies within the skew
    /// window, for any method, path and body.
    #[test]
    fn prop_sign_verify_round_trip(
        secret in "[!-~]{8,64}",
        method in prop::sample::select(vec!["GET", "POST", "DELETE", "put"]),
        path in "/[a-z0-9/]{0,30}",
        body in prop::collection::vec(any::<u8>(), 0..256),
    ) {
        let guard = HmacGuard::new(Some(secret.clone()), 300);
        let ts = Utc::now().timestamp().to_string();
        let sig = HmacGuard::sign(&secret, method, &path, &ts, &body);
        prop_assert!(guard.verify(method, &path, &ts, &body, &sig));
    }

    /// Any change to the body invalidates the signature.
    #[test]
    fn prop_tampered_body_rejected(
        secret in "[!-~]{8,64}",
        body in prop::collection::vec(any::<u8>(), 0..256),
        extra in any::<u8>(),
    ) {
        let guard = HmacGuard::new(Some(secret.clone()), 300);
        let ts = Utc::now().timestamp().to_string();
        let sig = HmacGuard::sign(&secret, "POST", "/order", &ts, &body);

        let mut tampered = body.clone();
        tampered.push(extra);
        prop_assert!(!guard.verify("POST", "/order", &ts, &tampered, &sig));
    }

    /// A signature from one secret never verifies under another.
    #[test]
    fn prop_wrong_secret_rejected(
        secret_a in "[!-~]{8,64}",
        secret_b in "[!-~]{8,64}",
        body in prop::collection::vec(any::<u8>(), 0..128),
    ) {
        prop_assume!(secret_a != secret_b);
        let guard = HmacGuard::new(Some(secret_b), 300);
        let ts = Utc::now().timestamp().to_string();
        let sig = HmacGuard::sign(&secret_a, "GET", "/order", &ts, &body);
        prop_assert!(!guard.verify("GET", "/order", &ts, &body, &sig));
    }

    /// Every positive u128 survives the decimal-string validator.
    #[test]
    fn prop_accepts_positive_decimal_amounts(value in 1u128..) {
        let parsed = parse_token_amount(&value.to_string()).unwrap();
        prop_assert_eq!(parsed, U256::from(value));
    }

    /// Any non-digit character anywhere in the amount is rejected.
    #[test]
    fn prop_rejects_nondigit_amounts(
        prefix in "[0-9]{0,8}",
        junk in "[a-zA-Z .+-]",
        suffix in "[0-9]{0,8}",
    ) {
        let raw = format!("{prefix}{junk}{suffix}");
        prop_assert!(parse_token_amount(&raw).is_err());
    }

    /// Normalization is idempotent: a second pass changes nothing.
    #[test]
    fn prop_normalization_idempotent(raw in "\\PC{0,40}") {
        let once = normalize_address(&raw);
        prop_assert_eq!(normalize_address(&once), once.clone());
    }
}
