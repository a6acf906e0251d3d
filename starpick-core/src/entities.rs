//! Core entity structures

use crate::{AuditAction, AuditId, AuditStatus, CacheScope, Role, StarId, Tier, Timestamp, UserId};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Star - a ranked catalog entry. Names are globally unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Star {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub star_id: StarId,
    pub name: String,
    pub tier: Tier,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
}

impl Star {
    /// Create a new star with a fresh id and current timestamp.
    pub fn new(name: impl Into<String>, tier: Tier) -> Self {
        Self {
            star_id: crate::new_entity_id(),
            name: name.into(),
            tier,
            updated_at: Utc::now(),
        }
    }
}

/// Exclusion memory for one random-pick scope.
///
/// `recent_ids` is ordered oldest-first; picks append to the back and
/// eviction removes from the front. The bound is recomputed against the live
/// catalog size on every pick, so a shrinking catalog can force multiple
/// evictions in one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecencyCacheState {
    pub scope: CacheScope,
    pub recent_ids: Vec<StarId>,
    pub updated_at: Timestamp,
}

impl RecencyCacheState {
    /// Empty state for a scope, created lazily on first pick.
    pub fn empty(scope: CacheScope) -> Self {
        Self {
            scope,
            recent_ids: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Window bound for a catalog of `total_items`: floor(0.8 x total).
    pub fn capacity_for(total_items: u64) -> usize {
        (total_items as usize) * 4 / 5
    }

    /// Record a pick: append the chosen id, then evict from the front until
    /// the window fits the bound.
    ///
    /// The just-picked id is always retained even when `capacity` is zero,
    /// so a single-star catalog excludes its only star after one pick
    /// instead of serving it back immediately.
    pub fn note_pick(&mut self, star_id: StarId, capacity: usize) {
        self.recent_ids.push(star_id);
        let bound = capacity.max(1);
        if self.recent_ids.len() > bound {
            let excess = self.recent_ids.len() - bound;
            self.recent_ids.drain(..excess);
        }
        self.updated_at = Utc::now();
    }
}

/// AuditRequest - a proposed catalog mutation awaiting an admin decision.
///
/// Once the status leaves `Pending` the requested action and its target
/// fields are immutable; only the reviewer comment may have been overwritten
/// as part of the deciding write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AuditRequest {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub audit_id: AuditId,
    pub action: AuditAction,
    pub star_name: String,
    /// Required for create/update, absent for delete.
    pub tier: Option<Tier>,
    /// Non-owning reference; required for update/delete, absent for create.
    /// The referenced star may vanish before the request is decided.
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "uuid"))]
    pub star_id: Option<StarId>,
    pub comment: String,
    pub status: AuditStatus,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub submitted_by: UserId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
}

/// Registered account. The password hash is a PHC string (argon2id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub email_verified: bool,
    pub created_at: Timestamp,
}

/// Pending one-time passcode for email verification.
///
/// At most one record exists per user (resends overwrite); records older
/// than the verification window are treated as expired at check time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailVerification {
    pub user_id: UserId,
    pub email: String,
    pub otp: String,
    pub created_at: Timestamp,
}
