//! Starpick Core - Entity Types
//!
//! Pure data structures with no behavior beyond small invariant-preserving
//! helpers. All other crates depend on this. This crate contains ONLY data
//! types - no routing, storage, or business logic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod entities;
pub mod error;

pub use entities::{AuditRequest, EmailVerification, RecencyCacheState, Star, User};
pub use error::{StoreError, StoreResult};

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Entity identifier using UUIDv7 for timestamp-sortable IDs.
/// UUIDv7 embeds a Unix timestamp, making IDs naturally sortable by creation time.
pub type EntityId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Identifier of a catalog star.
pub type StarId = EntityId;

/// Identifier of an audit request.
pub type AuditId = EntityId;

/// Identifier of a registered user.
pub type UserId = EntityId;

/// Generate a new UUIDv7 EntityId (timestamp-sortable).
pub fn new_entity_id() -> EntityId {
    Uuid::now_v7()
}

// ============================================================================
// TIER
// ============================================================================

/// Star ranking tier, valid range 1..=5.
///
/// The range invariant is enforced at construction; a `Tier` value in hand
/// is always valid, so storage and services never re-check it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "openapi", schema(value_type = i32))]
#[serde(try_from = "i16", into = "i16")]
pub struct Tier(i16);

impl Tier {
    pub const MIN: i16 = 1;
    pub const MAX: i16 = 5;

    /// Create a tier, rejecting values outside 1..=5.
    pub fn new(value: i16) -> Result<Self, TierOutOfRange> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(TierOutOfRange { value })
        }
    }

    /// The raw tier value.
    pub fn value(&self) -> i16 {
        self.0
    }
}

impl TryFrom<i16> for Tier {
    type Error = TierOutOfRange;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Tier> for i16 {
    fn from(tier: Tier) -> Self {
        tier.0
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when a tier value falls outside 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("tier must be between {} and {}, got {value}", Tier::MIN, Tier::MAX)]
pub struct TierOutOfRange {
    pub value: i16,
}

// ============================================================================
// ENUMS
// ============================================================================

/// Catalog mutation proposed by an audit request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(AuditAction::Create),
            "update" => Ok(AuditAction::Update),
            "delete" => Ok(AuditAction::Delete),
            other => Err(format!("unknown audit action '{other}'")),
        }
    }
}

/// Lifecycle state of an audit request.
///
/// `Pending` is the only entry point; `Approved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Pending,
    Approved,
    Rejected,
}

impl AuditStatus {
    /// Whether this status allows no further transitions.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AuditStatus::Pending)
    }
}

impl std::fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AuditStatus::Pending => "pending",
            AuditStatus::Approved => "approved",
            AuditStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for AuditStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AuditStatus::Pending),
            "approved" => Ok(AuditStatus::Approved),
            "rejected" => Ok(AuditStatus::Rejected),
            other => Err(format!("unknown audit status '{other}'")),
        }
    }
}

/// Role of a registered user. Admins decide audit requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::User => "user",
            Role::Admin => "admin",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

// ============================================================================
// CACHE SCOPE
// ============================================================================

/// Which recency-exclusion window a random pick uses.
///
/// The observed deployment uses a single global window; the per-user variant
/// exists so the state is a keyed mapping rather than a singleton record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CacheScope {
    Global,
    User(UserId),
}

impl CacheScope {
    /// Stable storage key for this scope.
    pub fn as_key(&self) -> String {
        match self {
            CacheScope::Global => "global".to_string(),
            CacheScope::User(id) => format!("user:{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_accepts_valid_range() {
        for v in 1..=5 {
            assert_eq!(Tier::new(v).unwrap().value(), v);
        }
    }

    #[test]
    fn tier_rejects_out_of_range() {
        assert!(Tier::new(0).is_err());
        assert!(Tier::new(6).is_err());
        assert!(Tier::new(-3).is_err());
    }

    #[test]
    fn tier_serde_round_trip_validates() {
        let tier: Tier = serde_json::from_str("3").unwrap();
        assert_eq!(tier.value(), 3);
        assert_eq!(serde_json::to_string(&tier).unwrap(), "3");

        let bad: Result<Tier, _> = serde_json::from_str("9");
        assert!(bad.is_err());
    }

    #[test]
    fn audit_enums_round_trip_as_lowercase() {
        assert_eq!(
            serde_json::to_string(&AuditAction::Create).unwrap(),
            "\"create\""
        );
        assert_eq!(
            serde_json::from_str::<AuditStatus>("\"rejected\"").unwrap(),
            AuditStatus::Rejected
        );
        assert_eq!("approved".parse::<AuditStatus>().unwrap(), AuditStatus::Approved);
    }

    #[test]
    fn terminal_statuses() {
        assert!(!AuditStatus::Pending.is_terminal());
        assert!(AuditStatus::Approved.is_terminal());
        assert!(AuditStatus::Rejected.is_terminal());
    }

    #[test]
    fn cache_scope_keys_are_distinct() {
        let user = new_entity_id();
        assert_eq!(CacheScope::Global.as_key(), "global");
        assert_eq!(CacheScope::User(user).as_key(), format!("user:{user}"));
    }
}
