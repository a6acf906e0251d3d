//! In-memory storage implementation.
//!
//! Backs unit, property, and router tests, and doubles as a dev backend.
//! All maps live behind one `RwLock` so a single call sees a consistent
//! snapshot, which is exactly the consistency the picker's count/sample
//! pair requires.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use starpick_core::{
    AuditId, AuditRequest, AuditStatus, CacheScope, EmailVerification, RecencyCacheState, Star,
    StarId, StoreError, StoreResult, Tier, Timestamp, User, UserId,
};

use crate::{
    AuditFilter, AuditStore, CatalogStore, RecencyCacheStore, UserStore, VerificationStore,
};

#[derive(Debug, Default)]
struct Inner {
    /// Insertion order doubles as the catalog enumeration order.
    stars: Vec<Star>,
    caches: HashMap<String, RecencyCacheState>,
    audits: Vec<AuditRequest>,
    users: Vec<User>,
    verifications: HashMap<UserId, EmailVerification>,
}

/// In-memory implementation of every storage trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, Inner>> {
        self.inner.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, Inner>> {
        self.inner.write().map_err(|_| StoreError::LockPoisoned)
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn star_create(&self, name: &str, tier: Tier) -> StoreResult<Star> {
        let mut inner = self.write()?;
        if inner.stars.iter().any(|s| s.name == name) {
            return Err(StoreError::duplicate_name(name));
        }
        let star = Star::new(name, tier);
        inner.stars.push(star.clone());
        Ok(star)
    }

    async fn star_get(&self, id: StarId) -> StoreResult<Option<Star>> {
        let inner = self.read()?;
        Ok(inner.stars.iter().find(|s| s.star_id == id).cloned())
    }

    async fn star_update(&self, id: StarId, name: &str, tier: Tier) -> StoreResult<Star> {
        let mut inner = self.write()?;
        if inner
            .stars
            .iter()
            .any(|s| s.name == name && s.star_id != id)
        {
            return Err(StoreError::duplicate_name(name));
        }
        let star = inner
            .stars
            .iter_mut()
            .find(|s| s.star_id == id)
            .ok_or(StoreError::not_found("star", id))?;
        star.name = name.to_string();
        star.tier = tier;
        star.updated_at = Utc::now();
        Ok(star.clone())
    }

    async fn star_delete(&self, id: StarId) -> StoreResult<()> {
        let mut inner = self.write()?;
        let position = inner
            .stars
            .iter()
            .position(|s| s.star_id == id)
            .ok_or(StoreError::not_found("star", id))?;
        inner.stars.remove(position);
        Ok(())
    }

    async fn star_list(&self) -> StoreResult<Vec<Star>> {
        Ok(self.read()?.stars.clone())
    }

    async fn star_search(&self, key: Option<&str>, tiers: &[Tier]) -> StoreResult<Vec<Star>> {
        let inner = self.read()?;
        let needle = key.map(|k| k.to_lowercase());
        Ok(inner
            .stars
            .iter()
            .filter(|s| {
                needle
                    .as_ref()
                    .is_none_or(|n| s.name.to_lowercase().contains(n))
                    && (tiers.is_empty() || tiers.contains(&s.tier))
            })
            .cloned()
            .collect())
    }

    async fn star_count(&self) -> StoreResult<u64> {
        Ok(self.read()?.stars.len() as u64)
    }

    async fn star_count_excluding(&self, excluded: &[StarId]) -> StoreResult<u64> {
        let inner = self.read()?;
        Ok(inner
            .stars
            .iter()
            .filter(|s| !excluded.contains(&s.star_id))
            .count() as u64)
    }

    async fn star_sample_excluding(
        &self,
        excluded: &[StarId],
        index: u64,
    ) -> StoreResult<Option<Star>> {
        let inner = self.read()?;
        Ok(inner
            .stars
            .iter()
            .filter(|s| !excluded.contains(&s.star_id))
            .nth(index as usize)
            .cloned())
    }
}

#[async_trait]
impl RecencyCacheStore for MemoryStore {
    async fn cache_load_or_init(&self, scope: CacheScope) -> StoreResult<RecencyCacheState> {
        let mut inner = self.write()?;
        Ok(inner
            .caches
            .entry(scope.as_key())
            .or_insert_with(|| RecencyCacheState::empty(scope))
            .clone())
    }

    async fn cache_save(&self, state: &RecencyCacheState) -> StoreResult<()> {
        let mut inner = self.write()?;
        inner.caches.insert(state.scope.as_key(), state.clone());
        Ok(())
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn audit_insert(&self, audit: &AuditRequest) -> StoreResult<()> {
        let mut inner = self.write()?;
        inner.audits.push(audit.clone());
        Ok(())
    }

    async fn audit_get(&self, id: AuditId) -> StoreResult<Option<AuditRequest>> {
        let inner = self.read()?;
        Ok(inner.audits.iter().find(|a| a.audit_id == id).cloned())
    }

    async fn audit_list(&self, filter: AuditFilter) -> StoreResult<Vec<AuditRequest>> {
        let inner = self.read()?;
        let mut audits: Vec<_> = inner
            .audits
            .iter()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        audits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(audits)
    }

    async fn audit_finalize(
        &self,
        id: AuditId,
        status: AuditStatus,
        comment: Option<&str>,
        decided_at: Timestamp,
    ) -> StoreResult<Option<AuditRequest>> {
        let mut inner = self.write()?;
        let Some(audit) = inner.audits.iter_mut().find(|a| a.audit_id == id) else {
            return Ok(None);
        };
        // The compare half of the compare-and-set: only pending moves.
        if audit.status != AuditStatus::Pending {
            return Ok(None);
        }
        audit.status = status;
        if let Some(comment) = comment {
            audit.comment = comment.to_string();
        }
        audit.updated_at = decided_at;
        Ok(Some(audit.clone()))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn user_insert(&self, user: &User) -> StoreResult<()> {
        let mut inner = self.write()?;
        if inner
            .users
            .iter()
            .any(|u| u.username == user.username || u.email == user.email)
        {
            return Err(StoreError::duplicate_name(&user.username));
        }
        inner.users.push(user.clone());
        Ok(())
    }

    async fn user_get(&self, id: UserId) -> StoreResult<Option<User>> {
        let inner = self.read()?;
        Ok(inner.users.iter().find(|u| u.user_id == id).cloned())
    }

    async fn user_find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let inner = self.read()?;
        Ok(inner.users.iter().find(|u| u.email == email).cloned())
    }

    async fn user_find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let inner = self.read()?;
        Ok(inner.users.iter().find(|u| u.username == username).cloned())
    }

    async fn user_mark_verified(&self, id: UserId) -> StoreResult<()> {
        let mut inner = self.write()?;
        let user = inner
            .users
            .iter_mut()
            .find(|u| u.user_id == id)
            .ok_or(StoreError::not_found("user", id))?;
        user.email_verified = true;
        Ok(())
    }

    async fn user_delete(&self, id: UserId) -> StoreResult<()> {
        let mut inner = self.write()?;
        let position = inner
            .users
            .iter()
            .position(|u| u.user_id == id)
            .ok_or(StoreError::not_found("user", id))?;
        inner.users.remove(position);
        inner.verifications.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl VerificationStore for MemoryStore {
    async fn verification_upsert(&self, verification: &EmailVerification) -> StoreResult<()> {
        let mut inner = self.write()?;
        inner
            .verifications
            .insert(verification.user_id, verification.clone());
        Ok(())
    }

    async fn verification_get(&self, user_id: UserId) -> StoreResult<Option<EmailVerification>> {
        let inner = self.read()?;
        Ok(inner.verifications.get(&user_id).cloned())
    }

    async fn verification_delete(&self, user_id: UserId) -> StoreResult<()> {
        let mut inner = self.write()?;
        inner.verifications.remove(&user_id);
        Ok(())
    }
}
