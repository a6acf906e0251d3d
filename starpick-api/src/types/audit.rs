//! Audit workflow request/response types

use serde::{Deserialize, Serialize};
use starpick_core::{AuditAction, AuditRequest, AuditStatus, StarId};

/// Request body for submitting an audit request.
///
/// `star_name` is required for every action; `tier` is required for
/// create/update and dropped for delete; `star_id` is required for
/// update/delete and must be absent for create.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SubmitAuditRequest {
    pub action: AuditAction,
    #[serde(default)]
    pub star_name: Option<String>,
    #[serde(default)]
    pub tier: Option<i16>,
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "uuid"))]
    pub star_id: Option<StarId>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Query parameters for listing audit requests.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct AuditListParams {
    pub status: Option<AuditStatus>,
    pub action: Option<AuditAction>,
}

/// Request body for approving or rejecting an audit request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DecisionRequest {
    /// Optional reviewer comment; overwrites the submitter's comment.
    #[serde(default)]
    pub comment: Option<String>,
}

/// Response for audit listings, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AuditListResponse {
    pub audits: Vec<AuditRequest>,
    pub total: usize,
}

impl AuditListResponse {
    pub fn new(audits: Vec<AuditRequest>) -> Self {
        let total = audits.len();
        Self { audits, total }
    }
}
