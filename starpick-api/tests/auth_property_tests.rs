//! Property-Based Tests for Authentication
//!
//! For any user, a generated token authenticates back to the same session;
//! tampered tokens, expired tokens, and absent credentials are rejected.

use axum::http::{Method, StatusCode};
use chrono::Utc;
use proptest::prelude::*;
use starpick_api::auth::{
    authenticate_token, generate_jwt_token, AuthConfig, FixedClock, JwtSecret,
};
use starpick_core::{new_entity_id, Role, User};
use std::sync::Arc;

#[path = "support/app.rs"]
mod support;
use support::TestApp;

// 2024-01-01T00:00:00Z
const TEST_EPOCH: i64 = 1_704_067_200;

fn test_config(now: i64) -> AuthConfig {
    AuthConfig {
        jwt_secret: JwtSecret::new("property-test-secret".to_string()).unwrap(),
        clock: Arc::new(FixedClock(now)),
        ..AuthConfig::default()
    }
}

fn user_with(username: &str, role: Role) -> User {
    User {
        user_id: new_entity_id(),
        username: username.to_string(),
        email: format!("{username}@gmail.com"),
        password_hash: String::new(),
        role,
        email_verified: true,
        created_at: Utc::now(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Round trip: token carries identity and role intact.
    #[test]
    fn token_round_trips_identity(
        username in "[a-z][a-z0-9_-]{2,29}",
        is_admin in any::<bool>(),
    ) {
        let config = test_config(TEST_EPOCH);
        let role = if is_admin { Role::Admin } else { Role::User };
        let user = user_with(&username, role);

        let token = generate_jwt_token(&config, &user).unwrap();
        let session = authenticate_token(&config, &token).unwrap();

        prop_assert_eq!(session.user_id, user.user_id);
        prop_assert_eq!(&session.username, &username);
        prop_assert_eq!(session.role, role);
        prop_assert_eq!(session.is_admin(), is_admin);
    }

    /// Any corruption of the signature is rejected.
    #[test]
    fn tampered_tokens_are_rejected(flip in 0usize..16) {
        let config = test_config(TEST_EPOCH);
        let user = user_with("nadia", Role::User);
        let token = generate_jwt_token(&config, &user).unwrap();

        let mut bytes = token.into_bytes();
        // Flip inside the encoded header; the payload and signature no
        // longer agree with it afterwards.
        let idx = 10 + flip;
        bytes[idx] = if bytes[idx] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        prop_assert!(authenticate_token(&config, &tampered).is_err());
    }
}

#[test]
fn expired_token_is_rejected_with_skew_leeway() {
    let issue_config = test_config(TEST_EPOCH);
    let user = user_with("nadia", Role::User);
    let token = generate_jwt_token(&issue_config, &user).unwrap();
    let expiration = issue_config.jwt_expiration_secs;
    let leeway = issue_config.jwt_clock_skew_secs;

    // Just inside the leeway: still valid.
    let config = test_config(TEST_EPOCH + expiration + leeway - 1);
    assert!(authenticate_token(&config, &token).is_ok());

    // Past the leeway: rejected.
    let config = test_config(TEST_EPOCH + expiration + leeway + 1);
    let err = authenticate_token(&config, &token).unwrap_err();
    assert_eq!(err.code, starpick_api::ErrorCode::TokenExpired);
}

#[test]
fn token_from_another_secret_is_rejected() {
    let config_a = test_config(TEST_EPOCH);
    let mut config_b = test_config(TEST_EPOCH);
    config_b.jwt_secret = JwtSecret::new("a-different-secret".to_string()).unwrap();

    let user = user_with("nadia", Role::User);
    let token = generate_jwt_token(&config_a, &user).unwrap();
    assert!(authenticate_token(&config_b, &token).is_err());
}

#[tokio::test]
async fn protected_routes_reject_missing_and_garbage_credentials() {
    let app = TestApp::new();

    let (status, _) = app
        .request(Method::GET, "/api/v1/stars/random", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(
            Method::GET,
            "/api/v1/stars/random",
            Some("not.a.token"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
