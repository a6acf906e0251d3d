//! End-to-End Router Tests
//!
//! Exercises the full HTTP surface against the in-memory store: account
//! lifecycle, catalog CRUD and search, bulk import status mapping, and the
//! audited change workflow with role enforcement.

use axum::http::{Method, StatusCode};
use serde_json::json;
use starpick_core::Role;

#[path = "support/app.rs"]
mod support;
use support::TestApp;

// ============================================================================
// ACCOUNT LIFECYCLE
// ============================================================================

#[tokio::test]
async fn signup_verify_login_flow() {
    let app = TestApp::new();

    let (status, _) = app
        .request(
            Method::POST,
            "/auth/signup",
            None,
            Some(json!({
                "username": "nadia",
                "email": "Nadia@Gmail.com",
                "password": "Sup3rSecret"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // Email is normalized to lowercase before the passcode goes out.
    let otp = app.mailer.last_otp_for("nadia@gmail.com").unwrap();

    // Login before verification is refused.
    let (status, _) = app
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "username": "nadia", "password": "Sup3rSecret" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(
            Method::POST,
            "/auth/verify-email",
            None,
            Some(json!({ "email": "nadia@gmail.com", "otp": otp })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "username": "nadia", "password": "Sup3rSecret" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();
    assert_eq!(body["user"]["username"], "nadia");
    assert_eq!(body["user"]["role"], "user");

    // The token works against a protected route.
    let (status, body) = app
        .request(Method::GET, "/auth/me", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "nadia@gmail.com");
}

#[tokio::test]
async fn signup_rejects_bad_input() {
    let app = TestApp::new();

    // Unsupported email domain.
    let (status, _) = app
        .request(
            Method::POST,
            "/auth/signup",
            None,
            Some(json!({
                "username": "nadia",
                "email": "nadia@example.com",
                "password": "Sup3rSecret"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Weak password.
    let (status, _) = app
        .request(
            Method::POST,
            "/auth/signup",
            None,
            Some(json!({
                "username": "nadia",
                "email": "nadia@gmail.com",
                "password": "password"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn wrong_password_and_unknown_user_are_indistinguishable() {
    let app = TestApp::new();
    app.seeded_user("nadia", Role::User).await;

    let (status_wrong, body_wrong) = app
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "username": "nadia", "password": "WrongPass1" })),
        )
        .await;
    let (status_unknown, body_unknown) = app
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "username": "ghost", "password": "WrongPass1" })),
        )
        .await;

    assert_eq!(status_wrong, StatusCode::UNAUTHORIZED);
    assert_eq!(status_unknown, StatusCode::UNAUTHORIZED);
    assert_eq!(body_wrong["message"], body_unknown["message"]);
}

#[tokio::test]
async fn expired_otp_requires_resend() {
    let app = TestApp::new();

    app.request(
        Method::POST,
        "/auth/signup",
        None,
        Some(json!({
            "username": "nadia",
            "email": "nadia@gmail.com",
            "password": "Sup3rSecret"
        })),
    )
    .await;
    let first_otp = app.mailer.last_otp_for("nadia@gmail.com").unwrap();

    let (status, _) = app
        .request(
            Method::POST,
            "/auth/resend-otp",
            None,
            Some(json!({ "email": "nadia@gmail.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let second_otp = app.mailer.last_otp_for("nadia@gmail.com").unwrap();

    // The resend replaced the stored passcode; the first one may only still
    // work if the generator happened to repeat it.
    if first_otp != second_otp {
        let (status, _) = app
            .request(
                Method::POST,
                "/auth/verify-email",
                None,
                Some(json!({ "email": "nadia@gmail.com", "otp": first_otp })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (status, _) = app
        .request(
            Method::POST,
            "/auth/verify-email",
            None,
            Some(json!({ "email": "nadia@gmail.com", "otp": second_otp })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

// ============================================================================
// CATALOG
// ============================================================================

#[tokio::test]
async fn catalog_reads_are_public_and_mutations_are_not() {
    let app = TestApp::new();

    let (status, body) = app.request(Method::GET, "/api/v1/stars", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/stars",
            None,
            Some(json!({ "name": "Vega", "tier": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(Method::GET, "/api/v1/stars/random", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn star_crud_cycle() {
    let app = TestApp::new();
    let (_, token) = app.seeded_user("nadia", Role::User).await;

    let (status, created) = app
        .request(
            Method::POST,
            "/api/v1/stars",
            Some(&token),
            Some(json!({ "name": "Vega", "tier": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let star_id = created["star_id"].as_str().unwrap().to_string();

    // Duplicate name conflicts.
    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/stars",
            Some(&token),
            Some(json!({ "name": "Vega", "tier": 3 })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Out-of-range tier is a structured 400, not a serde rejection.
    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/stars",
            Some(&token),
            Some(json!({ "name": "Sirius", "tier": 7 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_RANGE");

    let (status, updated) = app
        .request(
            Method::PUT,
            &format!("/api/v1/stars/{star_id}"),
            Some(&token),
            Some(json!({ "name": "Vega Prime", "tier": 2 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Vega Prime");
    assert_eq!(updated["tier"], 2);

    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/api/v1/stars/{star_id}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/api/v1/stars/{star_id}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn search_filters_by_substring_and_tier() {
    let app = TestApp::new();
    let (_, token) = app.seeded_user("nadia", Role::User).await;

    for (name, tier) in [("Vega", 1), ("Venus Star", 3), ("Altair", 3)] {
        app.request(
            Method::POST,
            "/api/v1/stars",
            Some(&token),
            Some(json!({ "name": name, "tier": tier })),
        )
        .await;
    }

    let (status, body) = app
        .request(Method::GET, "/api/v1/stars/search?key=ve", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);

    let (status, body) = app
        .request(Method::GET, "/api/v1/stars/search?key=ve&tier=3", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["stars"][0]["name"], "Venus Star");

    // No criteria at all is a 400.
    let (status, _) = app
        .request(Method::GET, "/api/v1/stars/search", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn random_pick_avoids_recent_stars() {
    let app = TestApp::new();
    let (_, token) = app.seeded_user("nadia", Role::User).await;

    // Empty catalog is a 404.
    let (status, body) = app
        .request(Method::GET, "/api/v1/stars/random", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "EMPTY_CATALOG");

    for i in 0..5 {
        app.request(
            Method::POST,
            "/api/v1/stars",
            Some(&token),
            Some(json!({ "name": format!("Star-{i}"), "tier": 1 })),
        )
        .await;
    }

    // capacity_for(5) == 4, so five consecutive picks cannot repeat.
    let mut names = Vec::new();
    for _ in 0..5 {
        let (status, body) = app
            .request(Method::GET, "/api/v1/stars/random", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        names.push(body["name"].as_str().unwrap().to_string());
    }
    let mut unique = names.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 5, "picks repeated inside the window: {names:?}");
}

#[tokio::test]
async fn bulk_import_maps_outcomes_to_statuses() {
    let app = TestApp::new();
    let (_, token) = app.seeded_user("nadia", Role::User).await;

    // All rows good.
    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/stars/bulk",
            Some(&token),
            Some(json!([
                { "name": "Vega", "tier": 1 },
                { "name": "Altair", "tier": 2 }
            ])),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["created"].as_array().unwrap().len(), 2);

    // Some rows bad.
    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/stars/bulk",
            Some(&token),
            Some(json!([
                { "name": "Vega", "tier": 1 },
                { "name": "Deneb", "tier": 4 }
            ])),
        )
        .await;
    assert_eq!(status, StatusCode::MULTI_STATUS);
    assert_eq!(body["created"].as_array().unwrap().len(), 1);
    assert_eq!(body["failures"][0]["row"], 1);

    // Every row bad.
    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/stars/bulk",
            Some(&token),
            Some(json!([{ "name": "Vega", "tier": 1 }])),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");

    // An empty array is a no-op, not an error.
    let (status, body) = app
        .request(Method::POST, "/api/v1/stars/bulk", Some(&token), Some(json!([])))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["created"].as_array().unwrap().is_empty());
}

// ============================================================================
// AUDIT WORKFLOW
// ============================================================================

#[tokio::test]
async fn audit_workflow_over_http() {
    let app = TestApp::new();
    let (_, user_token) = app.seeded_user("nadia", Role::User).await;
    let (_, admin_token) = app.seeded_user("root", Role::Admin).await;

    let (status, audit) = app
        .request(
            Method::POST,
            "/api/v1/audits",
            Some(&user_token),
            Some(json!({
                "action": "create",
                "star_name": "Vega",
                "tier": 2,
                "comment": "seen in last night's survey"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(audit["status"], "pending");
    let audit_id = audit["audit_id"].as_str().unwrap().to_string();

    // A non-admin cannot decide.
    let (status, _) = app
        .request(
            Method::PUT,
            &format!("/api/v1/audits/{audit_id}/approve"),
            Some(&user_token),
            Some(json!({})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, decided) = app
        .request(
            Method::PUT,
            &format!("/api/v1/audits/{audit_id}/approve"),
            Some(&admin_token),
            Some(json!({ "comment": "confirmed" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decided["status"], "approved");
    assert_eq!(decided["comment"], "confirmed");

    // The approval applied the create.
    let (_, body) = app.request(Method::GET, "/api/v1/stars", None, None).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["stars"][0]["name"], "Vega");

    // A second decision conflicts.
    let (status, body) = app
        .request(
            Method::PUT,
            &format!("/api/v1/audits/{audit_id}/reject"),
            Some(&admin_token),
            Some(json!({})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_DECIDED");
}

#[tokio::test]
async fn rejected_delete_leaves_the_star_in_place() {
    let app = TestApp::new();
    let (_, user_token) = app.seeded_user("nadia", Role::User).await;
    let (_, admin_token) = app.seeded_user("root", Role::Admin).await;

    let (_, star) = app
        .request(
            Method::POST,
            "/api/v1/stars",
            Some(&user_token),
            Some(json!({ "name": "Vega", "tier": 2 })),
        )
        .await;
    let star_id = star["star_id"].as_str().unwrap().to_string();

    let (status, audit) = app
        .request(
            Method::POST,
            "/api/v1/audits",
            Some(&user_token),
            Some(json!({
                "action": "delete",
                "star_name": "Vega",
                "star_id": star_id
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let audit_id = audit["audit_id"].as_str().unwrap().to_string();

    let (status, decided) = app
        .request(
            Method::PUT,
            &format!("/api/v1/audits/{audit_id}/reject"),
            Some(&admin_token),
            Some(json!({ "comment": "still observable" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decided["status"], "rejected");

    // The rejection applied no mutation.
    let (_, body) = app.request(Method::GET, "/api/v1/stars", None, None).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["stars"][0]["name"], "Vega");
}

#[tokio::test]
async fn audit_list_filters_by_status() {
    let app = TestApp::new();
    let (_, user_token) = app.seeded_user("nadia", Role::User).await;
    let (_, admin_token) = app.seeded_user("root", Role::Admin).await;

    for name in ["Vega", "Altair"] {
        app.request(
            Method::POST,
            "/api/v1/audits",
            Some(&user_token),
            Some(json!({ "action": "create", "star_name": name, "tier": 1 })),
        )
        .await;
    }

    let (_, listing) = app
        .request(Method::GET, "/api/v1/audits", Some(&admin_token), None)
        .await;
    let first_id = listing["audits"][0]["audit_id"].as_str().unwrap().to_string();

    app.request(
        Method::PUT,
        &format!("/api/v1/audits/{first_id}/reject"),
        Some(&admin_token),
        Some(json!({})),
    )
    .await;

    let (status, body) = app
        .request(
            Method::GET,
            "/api/v1/audits?status=pending",
            Some(&admin_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);

    let (_, body) = app
        .request(
            Method::GET,
            "/api/v1/audits?status=rejected",
            Some(&admin_token),
            None,
        )
        .await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["audits"][0]["audit_id"], first_id.as_str());
}

// ============================================================================
// HEALTH
// ============================================================================

#[tokio::test]
async fn health_probes_respond() {
    let app = TestApp::new();

    let (status, body) = app.request(Method::GET, "/health/live", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, _) = app.request(Method::GET, "/health/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
}
