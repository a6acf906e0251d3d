//! Starpick Storage - Storage Traits and In-Memory Implementation
//!
//! Defines the storage abstraction layer the services operate over. The
//! production PostgreSQL implementation lives in starpick-api's `DbClient`;
//! the in-memory implementation here backs unit, property, and router tests.

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use starpick_core::{
    AuditAction, AuditId, AuditRequest, AuditStatus, CacheScope, EmailVerification,
    RecencyCacheState, Star, StarId, StoreResult, Tier, Timestamp, User, UserId,
};

// ============================================================================
// FILTERS
// ============================================================================

/// Filter for listing audit requests. Empty filter matches everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuditFilter {
    pub status: Option<AuditStatus>,
    pub action: Option<AuditAction>,
}

impl AuditFilter {
    /// Whether an audit request satisfies this filter.
    pub fn matches(&self, audit: &AuditRequest) -> bool {
        self.status.is_none_or(|s| audit.status == s)
            && self.action.is_none_or(|a| audit.action == a)
    }
}

// ============================================================================
// CATALOG STORE
// ============================================================================

/// Persistence for the star catalog.
///
/// The count/sample pair is the oracle the random picker depends on:
/// `star_sample_excluding` returns the k-th member (catalog enumeration
/// order, zero-indexed) of the subset whose ids are not in `excluded`, or
/// `None` when `k` fell out of range because the catalog changed between the
/// caller's count and the sample. Callers retry with a fresh snapshot.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Insert a new star. Fails with `DuplicateName` on a name collision.
    async fn star_create(&self, name: &str, tier: Tier) -> StoreResult<Star>;

    /// Get a star by id.
    async fn star_get(&self, id: StarId) -> StoreResult<Option<Star>>;

    /// Overwrite name and tier, refreshing `updated_at`. Fails with
    /// `NotFound` for a missing star and `DuplicateName` when the new name
    /// collides with a different star.
    async fn star_update(&self, id: StarId, name: &str, tier: Tier) -> StoreResult<Star>;

    /// Delete a star. Fails with `NotFound` when absent.
    async fn star_delete(&self, id: StarId) -> StoreResult<()>;

    /// All stars, catalog enumeration order.
    async fn star_list(&self) -> StoreResult<Vec<Star>>;

    /// Stars matching a case-insensitive name substring and/or tier set.
    async fn star_search(&self, key: Option<&str>, tiers: &[Tier]) -> StoreResult<Vec<Star>>;

    /// Total number of stars.
    async fn star_count(&self) -> StoreResult<u64>;

    /// Number of stars whose id is not in `excluded`.
    async fn star_count_excluding(&self, excluded: &[StarId]) -> StoreResult<u64>;

    /// The `index`-th star (zero-indexed) not in `excluded`, or `None` when
    /// the index is out of range for the current catalog.
    async fn star_sample_excluding(
        &self,
        excluded: &[StarId],
        index: u64,
    ) -> StoreResult<Option<Star>>;
}

// ============================================================================
// RECENCY CACHE STORE
// ============================================================================

/// Persistence for the per-scope recency-exclusion windows.
#[async_trait]
pub trait RecencyCacheStore: Send + Sync {
    /// Load the state for a scope, lazily initializing an empty window on
    /// first use.
    async fn cache_load_or_init(&self, scope: CacheScope) -> StoreResult<RecencyCacheState>;

    /// Persist a scope's state. Last write wins; concurrent picks on the
    /// same scope are not serialized (the window self-corrects on the next
    /// pick).
    async fn cache_save(&self, state: &RecencyCacheState) -> StoreResult<()>;
}

// ============================================================================
// AUDIT STORE
// ============================================================================

/// Persistence for audit requests.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Insert a newly submitted request (status must be `Pending`).
    async fn audit_insert(&self, audit: &AuditRequest) -> StoreResult<()>;

    /// Get a request by id.
    async fn audit_get(&self, id: AuditId) -> StoreResult<Option<AuditRequest>>;

    /// List requests matching `filter`, newest first.
    async fn audit_list(&self, filter: AuditFilter) -> StoreResult<Vec<AuditRequest>>;

    /// Compare-and-set finalization: transition the request to `status`
    /// only if it is currently `Pending`, optionally overwriting the
    /// comment. Returns the updated request, or `None` when the request is
    /// missing or already decided (the caller lost the decision race).
    async fn audit_finalize(
        &self,
        id: AuditId,
        status: AuditStatus,
        comment: Option<&str>,
        decided_at: Timestamp,
    ) -> StoreResult<Option<AuditRequest>>;
}

// ============================================================================
// USER STORE
// ============================================================================

/// Persistence for registered accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. Fails with `DuplicateName` when the username or
    /// email is already taken.
    async fn user_insert(&self, user: &User) -> StoreResult<()>;

    /// Get a user by id.
    async fn user_get(&self, id: UserId) -> StoreResult<Option<User>>;

    /// Find a user by email (stored lowercase).
    async fn user_find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Find a user by username.
    async fn user_find_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// Mark a user's email as verified. Fails with `NotFound` when absent.
    async fn user_mark_verified(&self, id: UserId) -> StoreResult<()>;

    /// Delete a user. Fails with `NotFound` when absent. Signup uses this
    /// to roll back an account whose verification mail could not be sent.
    async fn user_delete(&self, id: UserId) -> StoreResult<()>;
}

// ============================================================================
// VERIFICATION STORE
// ============================================================================

/// Persistence for pending email-verification OTPs (one per user, resends
/// overwrite).
#[async_trait]
pub trait VerificationStore: Send + Sync {
    async fn verification_upsert(&self, verification: &EmailVerification) -> StoreResult<()>;

    async fn verification_get(&self, user_id: UserId) -> StoreResult<Option<EmailVerification>>;

    async fn verification_delete(&self, user_id: UserId) -> StoreResult<()>;
}

// ============================================================================
// APP STORE
// ============================================================================

/// Everything the API needs from storage, as one object-safe bound so route
/// state can hold a single `Arc<dyn AppStore>`.
pub trait AppStore:
    CatalogStore + RecencyCacheStore + AuditStore + UserStore + VerificationStore
{
}

impl<T> AppStore for T where
    T: CatalogStore + RecencyCacheStore + AuditStore + UserStore + VerificationStore
{
}
