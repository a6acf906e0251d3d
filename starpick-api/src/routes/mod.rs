//! API Route Composition
//!
//! Each resource owns a sub-router with its own state; this module stitches
//! them into the full application router and applies the cross-cutting
//! layers (CORS, request tracing).

pub mod account;
pub mod audit;
pub mod health;
pub mod star;

pub use account::AccountState;
pub use audit::AuditState;
pub use health::HealthState;
pub use star::StarState;

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use starpick_storage::AppStore;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::config::ApiConfig;
use crate::email::Mailer;

/// Build the full application router.
pub fn create_api_router(
    store: Arc<dyn AppStore>,
    mailer: Arc<dyn Mailer>,
    config: Arc<ApiConfig>,
    auth: Arc<AuthConfig>,
) -> Router {
    let star_state = Arc::new(StarState {
        store: store.clone(),
        auth: auth.clone(),
    });
    let audit_state = Arc::new(AuditState {
        store: store.clone(),
        auth: auth.clone(),
    });
    let account_state = Arc::new(AccountState {
        store: store.clone(),
        auth,
        mailer,
        config: config.clone(),
    });
    let health_state = Arc::new(HealthState { store });

    let router = Router::new()
        .nest("/api/v1/stars", star::create_router(star_state))
        .nest("/api/v1/audits", audit::create_router(audit_state))
        .nest("/auth", account::create_router(account_state))
        .nest("/health", health::create_router(health_state));

    #[cfg(feature = "openapi")]
    let router = router.merge(crate::openapi::create_router());

    router
        .layer(cors_layer(&config))
        .layer(TraceLayer::new_for_http())
}

/// CORS layer from configured origins. No configured origins (dev mode) or
/// an explicit `*` means any origin, which disables credentials per the
/// fetch spec.
fn cors_layer(config: &ApiConfig) -> CorsLayer {
    let wildcard =
        config.cors_origins.is_empty() || config.cors_origins.iter().any(|o| o == "*");

    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if wildcard {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|origin| {
                origin
                    .parse()
                    .map_err(|_| tracing::warn!(%origin, "Ignoring unparsable CORS origin"))
                    .ok()
            })
            .collect();
        layer
            .allow_origin(AllowOrigin::list(origins))
            .allow_credentials(true)
    }
}
