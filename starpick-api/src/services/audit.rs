//! Audit Workflow Service
//!
//! Catalog changes proposed by non-admin users go through a two-step
//! workflow: anyone authenticated submits a request describing the change,
//! and an admin later approves or rejects it. Approval applies the catalog
//! mutation first and finalizes the request second, so a failed mutation
//! (name collision, vanished target) leaves the request pending and
//! decidable again.

use chrono::Utc;
use starpick_core::{
    new_entity_id, AuditAction, AuditId, AuditRequest, AuditStatus, StarId, Tier, UserId,
};
use starpick_storage::AppStore;

use crate::auth::Session;
use crate::error::{ApiError, ApiResult};

// ============================================================================
// SUBMISSION
// ============================================================================

/// A validated audit submission, shape-checked per action before storage.
#[derive(Debug, Clone)]
pub struct AuditSubmission {
    pub action: AuditAction,
    pub star_name: String,
    pub tier: Option<Tier>,
    pub star_id: Option<StarId>,
    pub comment: String,
}

/// Submit a new audit request.
///
/// Shape rules per action:
/// - `create`: requires `tier`; `star_id` must be absent.
/// - `update`: requires `star_id` and `tier`; the target must exist now
///   (it may still vanish before the decision).
/// - `delete`: requires `star_id` and an existing target; `tier` is
///   dropped since the proposed change carries no ranking.
pub async fn submit_audit(
    store: &dyn AppStore,
    submitted_by: UserId,
    submission: AuditSubmission,
) -> ApiResult<AuditRequest> {
    let AuditSubmission {
        action,
        star_name,
        mut tier,
        star_id,
        comment,
    } = submission;

    match action {
        AuditAction::Create => {
            if tier.is_none() {
                return Err(ApiError::missing_field("tier"));
            }
            if star_id.is_some() {
                return Err(ApiError::invalid_input(
                    "A create request must not reference an existing star",
                ));
            }
        }
        AuditAction::Update => {
            // Tier before target, keeping the field checks in one stable
            // order across actions.
            if tier.is_none() {
                return Err(ApiError::missing_field("tier"));
            }
            let id = star_id.ok_or_else(|| ApiError::missing_field("star_id"))?;
            if store.star_get(id).await?.is_none() {
                return Err(ApiError::star_not_found(id));
            }
        }
        AuditAction::Delete => {
            let id = star_id.ok_or_else(|| ApiError::missing_field("star_id"))?;
            if store.star_get(id).await?.is_none() {
                return Err(ApiError::star_not_found(id));
            }
            tier = None;
        }
    }

    let now = Utc::now();
    let audit = AuditRequest {
        audit_id: new_entity_id(),
        action,
        star_name,
        tier,
        star_id,
        comment,
        status: AuditStatus::Pending,
        submitted_by,
        created_at: now,
        updated_at: now,
    };

    store.audit_insert(&audit).await?;
    tracing::info!(audit_id = %audit.audit_id, action = %audit.action, "Audit request submitted");
    Ok(audit)
}

// ============================================================================
// DECISION
// ============================================================================

/// Decide a pending audit request. Admin only.
///
/// On approval the proposed mutation is applied before the request is
/// finalized; any mutation failure propagates and the request stays
/// pending. Finalization itself is a compare-and-set, so of two racing
/// decisions exactly one wins and the loser gets `AlreadyDecided`.
pub async fn decide_audit(
    store: &dyn AppStore,
    session: &Session,
    audit_id: AuditId,
    decision: AuditStatus,
    comment: Option<&str>,
) -> ApiResult<AuditRequest> {
    session.require_admin()?;

    debug_assert!(decision.is_terminal());

    let audit = store
        .audit_get(audit_id)
        .await?
        .ok_or_else(|| ApiError::audit_not_found(audit_id))?;

    if audit.status.is_terminal() {
        return Err(ApiError::already_decided(audit_id));
    }

    if decision == AuditStatus::Approved {
        apply_mutation(store, &audit).await?;
    }

    let finalized = store
        .audit_finalize(audit_id, decision, comment, Utc::now())
        .await?
        .ok_or_else(|| ApiError::already_decided(audit_id))?;

    tracing::info!(
        audit_id = %audit_id,
        status = %decision,
        decided_by = %session.user_id,
        "Audit request decided"
    );
    Ok(finalized)
}

/// Apply the catalog mutation an approved request describes.
async fn apply_mutation(store: &dyn AppStore, audit: &AuditRequest) -> ApiResult<()> {
    match audit.action {
        AuditAction::Create => {
            let tier = audit
                .tier
                .ok_or_else(|| ApiError::internal_error("Create request stored without a tier"))?;
            store.star_create(&audit.star_name, tier).await?;
        }
        AuditAction::Update => {
            let id = audit.star_id.ok_or_else(|| {
                ApiError::internal_error("Update request stored without a target")
            })?;
            let tier = audit
                .tier
                .ok_or_else(|| ApiError::internal_error("Update request stored without a tier"))?;
            store.star_update(id, &audit.star_name, tier).await?;
        }
        AuditAction::Delete => {
            let id = audit.star_id.ok_or_else(|| {
                ApiError::internal_error("Delete request stored without a target")
            })?;
            store.star_delete(id).await?;
        }
    }
    Ok(())
}
