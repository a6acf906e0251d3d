//! Audit Workflow Routes
//!
//! Submitting and listing audit requests needs any authenticated session;
//! approving and rejecting is admin-only (enforced in the service).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use starpick_core::{AuditId, AuditRequest, AuditStatus};
use starpick_storage::{AppStore, AuditFilter};
use std::sync::Arc;

use crate::auth::AuthConfig;
use crate::error::{ApiError, ApiResult};
use crate::impl_auth_from_ref;
use crate::middleware::AuthSession;
use crate::services::{self, AuditSubmission};
use crate::types::{AuditListParams, AuditListResponse, DecisionRequest, SubmitAuditRequest};
use crate::validation::{validate_star_name, validate_tier};

/// State for audit workflow routes.
#[derive(Clone)]
pub struct AuditState {
    pub store: Arc<dyn AppStore>,
    pub auth: Arc<AuthConfig>,
}

impl_auth_from_ref!(AuditState);

/// Create the audit workflow router.
pub fn create_router(state: Arc<AuditState>) -> Router {
    Router::new()
        .route("/", get(list_audits).post(submit_audit))
        .route("/:audit_id/approve", put(approve_audit))
        .route("/:audit_id/reject", put(reject_audit))
        .with_state(state)
}

// ============================================================================
// HANDLERS
// ============================================================================

/// Submit a proposed catalog change for review.
#[utoipa::path(
    post,
    path = "/api/v1/audits",
    tag = "audits",
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    request_body = SubmitAuditRequest,
    responses(
        (status = 201, description = "Request submitted", body = AuditRequest),
        (status = 400, description = "Malformed submission", body = ApiError),
        (status = 404, description = "Referenced star not found", body = ApiError)
    )
)]
pub(crate) async fn submit_audit(
    State(state): State<Arc<AuditState>>,
    AuthSession(session): AuthSession,
    Json(request): Json<SubmitAuditRequest>,
) -> ApiResult<(StatusCode, Json<AuditRequest>)> {
    // Checked in a stable order: name, then tier, then the per-action
    // target rules (in the service).
    let raw = request
        .star_name
        .as_deref()
        .ok_or_else(|| ApiError::missing_field("star_name"))?;
    let star_name = validate_star_name(raw)?.to_string();
    let tier = request.tier.map(validate_tier).transpose()?;

    let submission = AuditSubmission {
        action: request.action,
        star_name,
        tier,
        star_id: request.star_id,
        comment: request.comment.unwrap_or_default(),
    };

    let audit = services::submit_audit(state.store.as_ref(), session.user_id, submission).await?;
    Ok((StatusCode::CREATED, Json(audit)))
}

/// List audit requests, newest first, optionally filtered.
#[utoipa::path(
    get,
    path = "/api/v1/audits",
    tag = "audits",
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    params(AuditListParams),
    responses(
        (status = 200, description = "Audit requests", body = AuditListResponse)
    )
)]
pub(crate) async fn list_audits(
    State(state): State<Arc<AuditState>>,
    AuthSession(_session): AuthSession,
    Query(params): Query<AuditListParams>,
) -> ApiResult<Json<AuditListResponse>> {
    let filter = AuditFilter {
        status: params.status,
        action: params.action,
    };
    let audits = state.store.audit_list(filter).await?;
    Ok(Json(AuditListResponse::new(audits)))
}

/// Approve a pending request, applying the proposed change.
#[utoipa::path(
    put,
    path = "/api/v1/audits/{audit_id}/approve",
    tag = "audits",
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    params(("audit_id" = String, Path, description = "Audit request ID")),
    request_body = DecisionRequest,
    responses(
        (status = 200, description = "Request approved and applied", body = AuditRequest),
        (status = 403, description = "Not an admin", body = ApiError),
        (status = 404, description = "Request not found", body = ApiError),
        (status = 409, description = "Already decided or mutation conflict", body = ApiError)
    )
)]
pub(crate) async fn approve_audit(
    State(state): State<Arc<AuditState>>,
    AuthSession(session): AuthSession,
    Path(audit_id): Path<AuditId>,
    Json(request): Json<DecisionRequest>,
) -> ApiResult<Json<AuditRequest>> {
    decide(state.store.as_ref(), &session, audit_id, AuditStatus::Approved, request).await
}

/// Reject a pending request without touching the catalog.
#[utoipa::path(
    put,
    path = "/api/v1/audits/{audit_id}/reject",
    tag = "audits",
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    params(("audit_id" = String, Path, description = "Audit request ID")),
    request_body = DecisionRequest,
    responses(
        (status = 200, description = "Request rejected", body = AuditRequest),
        (status = 403, description = "Not an admin", body = ApiError),
        (status = 404, description = "Request not found", body = ApiError),
        (status = 409, description = "Already decided", body = ApiError)
    )
)]
pub(crate) async fn reject_audit(
    State(state): State<Arc<AuditState>>,
    AuthSession(session): AuthSession,
    Path(audit_id): Path<AuditId>,
    Json(request): Json<DecisionRequest>,
) -> ApiResult<Json<AuditRequest>> {
    decide(state.store.as_ref(), &session, audit_id, AuditStatus::Rejected, request).await
}

async fn decide(
    store: &dyn AppStore,
    session: &crate::auth::Session,
    audit_id: AuditId,
    status: AuditStatus,
    request: DecisionRequest,
) -> ApiResult<Json<AuditRequest>> {
    let audit =
        services::decide_audit(store, session, audit_id, status, request.comment.as_deref())
            .await?;
    Ok(Json(audit))
}
