//! Shared test harness: an in-memory application with a capturing mailer.

// Each test binary includes this file; not all of them use every helper.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use starpick_api::auth::{generate_jwt_token, AuthConfig};
use starpick_api::create_api_router;
use starpick_api::email::Mailer;
use starpick_api::error::ApiResult;
use starpick_api::password::hash_password;
use starpick_api::ApiConfig;
use starpick_core::{new_entity_id, Role, User};
use starpick_storage::{AppStore, MemoryStore, UserStore};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Mailer that records every passcode instead of sending it.
#[derive(Clone, Default)]
pub struct CapturingMailer {
    pub sent: Arc<Mutex<Vec<(String, String)>>>,
}

#[async_trait]
impl Mailer for CapturingMailer {
    async fn send_otp(&self, to: &str, _username: &str, otp: &str) -> ApiResult<()> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), otp.to_string()));
        Ok(())
    }
}

impl CapturingMailer {
    /// The most recent passcode sent to `email`.
    pub fn last_otp_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, otp)| otp.clone())
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub mailer: CapturingMailer,
    pub auth: Arc<AuthConfig>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let mailer = CapturingMailer::default();
        let auth = Arc::new(AuthConfig::default());
        let config = Arc::new(ApiConfig::default());

        let dyn_store: Arc<dyn AppStore> = store.clone();
        let router = create_api_router(
            dyn_store,
            Arc::new(mailer.clone()),
            config,
            auth.clone(),
        );

        Self {
            router,
            store,
            mailer,
            auth,
        }
    }

    /// Insert a verified user directly and mint a token for them.
    pub async fn seeded_user(&self, username: &str, role: Role) -> (User, String) {
        let user = User {
            user_id: new_entity_id(),
            username: username.to_string(),
            email: format!("{username}@gmail.com"),
            password_hash: hash_password("Sup3rSecret").unwrap(),
            role,
            email_verified: true,
            created_at: Utc::now(),
        };
        self.store.user_insert(&user).await.unwrap();
        let token = generate_jwt_token(&self.auth, &user).unwrap();
        (user, token)
    }

    /// Send a request and return status + parsed JSON body.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };
        (status, json)
    }
}
