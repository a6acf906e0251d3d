//! OpenAPI Documentation
//!
//! Aggregates the `#[utoipa::path]` annotations on the route handlers into
//! one document, served at `/openapi.json`.

use axum::{routing::get, Json, Router};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::routes;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Starpick API",
        description = "Star catalog with recency-aware random picks and an audited change workflow",
        license(name = "MIT")
    ),
    paths(
        routes::star::list_stars,
        routes::star::search_stars,
        routes::star::random_star,
        routes::star::create_star,
        routes::star::update_star,
        routes::star::delete_star,
        routes::star::bulk_create_stars,
        routes::star::import_stars_csv,
        routes::audit::submit_audit,
        routes::audit::list_audits,
        routes::audit::approve_audit,
        routes::audit::reject_audit,
        routes::account::signup,
        routes::account::verify_email,
        routes::account::resend_otp,
        routes::account::login,
        routes::account::logout,
        routes::account::me,
        routes::health::liveness,
        routes::health::readiness,
    ),
    components(schemas(
        starpick_core::Star,
        starpick_core::Tier,
        starpick_core::AuditRequest,
        starpick_core::AuditAction,
        starpick_core::AuditStatus,
        starpick_core::Role,
        crate::error::ApiError,
        crate::error::ErrorCode,
        crate::types::CreateStarRequest,
        crate::types::UpdateStarRequest,
        crate::types::StarListResponse,
        crate::types::StarUpload,
        crate::types::BulkFailure,
        crate::types::BulkUploadResponse,
        crate::types::SubmitAuditRequest,
        crate::types::DecisionRequest,
        crate::types::AuditListResponse,
        crate::types::SignupRequest,
        crate::types::VerifyEmailRequest,
        crate::types::ResendOtpRequest,
        crate::types::LoginRequest,
        crate::types::LoginResponse,
        crate::types::UserProfile,
        crate::types::MessageResponse,
        routes::health::HealthResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "stars", description = "Star catalog"),
        (name = "audits", description = "Audited change workflow"),
        (name = "auth", description = "Accounts and sessions"),
        (name = "health", description = "Health probes"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
            components.add_security_scheme(
                "cookie_auth",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(
                    crate::middleware::SESSION_COOKIE,
                ))),
            );
        }
    }
}

/// Router serving the generated document.
pub fn create_router() -> Router {
    Router::new().route("/openapi.json", get(serve_openapi))
}

async fn serve_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_builds_and_carries_security_schemes() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components present");
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(components.security_schemes.contains_key("cookie_auth"));
        assert!(components.schemas.contains_key("Tier"));
        assert!(!doc.paths.paths.is_empty());
    }
}
