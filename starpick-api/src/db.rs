//! Database Connection Pool Module
//!
//! PostgreSQL connection pooling using deadpool-postgres, and the production
//! implementation of the storage traits from starpick-storage. The table
//! layout lives in `schema.sql` next to this crate's manifest.
//!
//! Name uniqueness and the finalize compare-and-set are enforced by the
//! database (unique index, conditional UPDATE), not by read-then-write in
//! this client, so concurrent requests cannot slip past them.

use async_trait::async_trait;
use chrono::Utc;
use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use starpick_core::{
    AuditAction, AuditId, AuditRequest, AuditStatus, CacheScope, EmailVerification,
    RecencyCacheState, Star, StarId, StoreError, StoreResult, Tier, Timestamp, User, UserId,
};
use starpick_storage::{
    AuditFilter, AuditStore, CatalogStore, RecencyCacheStore, UserStore, VerificationStore,
};
use std::time::Duration;
use tokio_postgres::error::SqlState;
use tokio_postgres::{NoTls, Row};

use crate::error::{ApiError, ApiResult};

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Connection timeout
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "starpick".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("STARPICK_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("STARPICK_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5432),
            dbname: std::env::var("STARPICK_DB_NAME").unwrap_or_else(|_| "starpick".to_string()),
            user: std::env::var("STARPICK_DB_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("STARPICK_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("STARPICK_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(16),
            timeout: Duration::from_secs(
                std::env::var("STARPICK_DB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());
        cfg.connect_timeout = Some(self.timeout);

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))?;

        Ok(pool)
    }
}

// ============================================================================
// DATABASE CLIENT
// ============================================================================

/// Database client wrapping a connection pool. Implements every storage
/// trait so route state can hold it behind `Arc<dyn AppStore>`.
#[derive(Clone)]
pub struct DbClient {
    pool: Pool,
}

impl DbClient {
    /// Create a new database client with the given pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a new database client from configuration.
    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(pool))
    }

    /// Connectivity probe for the readiness endpoint.
    pub async fn ping(&self) -> ApiResult<()> {
        let conn = self.pool.get().await?;
        conn.query_one("SELECT 1", &[]).await?;
        Ok(())
    }

    /// Apply `schema.sql`. Every statement is `IF NOT EXISTS`, so this is
    /// safe to run on every boot.
    pub async fn ensure_schema(&self) -> ApiResult<()> {
        let conn = self.pool.get().await?;
        conn.batch_execute(include_str!("../schema.sql")).await?;
        tracing::debug!("Database schema ensured");
        Ok(())
    }

    /// Get a connection from the pool.
    async fn get_conn(&self) -> StoreResult<deadpool_postgres::Object> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::backend(format!("Failed to acquire connection: {}", e)))
    }
}

/// Map a tokio_postgres error, surfacing unique violations as name
/// collisions.
fn map_pg_error(err: tokio_postgres::Error, name: &str) -> StoreError {
    if err.code() == Some(&SqlState::UNIQUE_VIOLATION) {
        StoreError::duplicate_name(name)
    } else {
        StoreError::backend(err.to_string())
    }
}

fn pg_backend(err: tokio_postgres::Error) -> StoreError {
    StoreError::backend(err.to_string())
}

// ============================================================================
// ROW MAPPERS
// ============================================================================

fn row_to_star(row: &Row) -> StoreResult<Star> {
    let tier_raw: i16 = row.get("tier");
    let tier = Tier::new(tier_raw)
        .map_err(|e| StoreError::backend(format!("invalid tier in storage: {}", e)))?;
    Ok(Star {
        star_id: row.get("star_id"),
        name: row.get("name"),
        tier,
        updated_at: row.get("updated_at"),
    })
}

fn row_to_audit(row: &Row) -> StoreResult<AuditRequest> {
    let action_raw: String = row.get("action");
    let status_raw: String = row.get("status");
    let tier_raw: Option<i16> = row.get("tier");

    let action = action_raw
        .parse::<AuditAction>()
        .map_err(StoreError::backend)?;
    let status = status_raw
        .parse::<AuditStatus>()
        .map_err(StoreError::backend)?;
    let tier = tier_raw
        .map(Tier::new)
        .transpose()
        .map_err(|e| StoreError::backend(format!("invalid tier in storage: {}", e)))?;

    Ok(AuditRequest {
        audit_id: row.get("audit_id"),
        action,
        star_name: row.get("star_name"),
        tier,
        star_id: row.get("star_id"),
        comment: row.get("comment"),
        status,
        submitted_by: row.get("submitted_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_user(row: &Row) -> StoreResult<User> {
    let role_raw: String = row.get("role");
    let role = role_raw.parse().map_err(StoreError::backend)?;
    Ok(User {
        user_id: row.get("user_id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role,
        email_verified: row.get("email_verified"),
        created_at: row.get("created_at"),
    })
}

fn row_to_verification(row: &Row) -> EmailVerification {
    EmailVerification {
        user_id: row.get("user_id"),
        email: row.get("email"),
        otp: row.get("otp"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// CATALOG STORE
// ============================================================================

#[async_trait]
impl CatalogStore for DbClient {
    async fn star_create(&self, name: &str, tier: Tier) -> StoreResult<Star> {
        let conn = self.get_conn().await?;
        let star = Star::new(name, tier);

        conn.execute(
            "INSERT INTO stars (star_id, name, tier, updated_at) VALUES ($1, $2, $3, $4)",
            &[&star.star_id, &star.name, &star.tier.value(), &star.updated_at],
        )
        .await
        .map_err(|e| map_pg_error(e, name))?;

        Ok(star)
    }

    async fn star_get(&self, id: StarId) -> StoreResult<Option<Star>> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_opt(
                "SELECT star_id, name, tier, updated_at FROM stars WHERE star_id = $1",
                &[&id],
            )
            .await
            .map_err(pg_backend)?;

        row.as_ref().map(row_to_star).transpose()
    }

    async fn star_update(&self, id: StarId, name: &str, tier: Tier) -> StoreResult<Star> {
        let conn = self.get_conn().await?;
        let now = Utc::now();

        let row = conn
            .query_opt(
                "UPDATE stars SET name = $2, tier = $3, updated_at = $4
                 WHERE star_id = $1
                 RETURNING star_id, name, tier, updated_at",
                &[&id, &name, &tier.value(), &now],
            )
            .await
            .map_err(|e| map_pg_error(e, name))?;

        match row {
            Some(row) => row_to_star(&row),
            None => Err(StoreError::not_found("star", id)),
        }
    }

    async fn star_delete(&self, id: StarId) -> StoreResult<()> {
        let conn = self.get_conn().await?;
        let deleted = conn
            .execute("DELETE FROM stars WHERE star_id = $1", &[&id])
            .await
            .map_err(pg_backend)?;

        if deleted == 0 {
            return Err(StoreError::not_found("star", id));
        }
        Ok(())
    }

    async fn star_list(&self) -> StoreResult<Vec<Star>> {
        let conn = self.get_conn().await?;
        let rows = conn
            .query(
                "SELECT star_id, name, tier, updated_at FROM stars ORDER BY star_id",
                &[],
            )
            .await
            .map_err(pg_backend)?;

        rows.iter().map(row_to_star).collect()
    }

    async fn star_search(&self, key: Option<&str>, tiers: &[Tier]) -> StoreResult<Vec<Star>> {
        let conn = self.get_conn().await?;
        let pattern = key.map(|k| format!("%{}%", k));
        let tier_values: Vec<i16> = tiers.iter().map(|t| t.value()).collect();

        let rows = conn
            .query(
                "SELECT star_id, name, tier, updated_at FROM stars
                 WHERE ($1::text IS NULL OR name ILIKE $1)
                   AND (cardinality($2::smallint[]) = 0 OR tier = ANY($2))
                 ORDER BY star_id",
                &[&pattern, &tier_values],
            )
            .await
            .map_err(pg_backend)?;

        rows.iter().map(row_to_star).collect()
    }

    async fn star_count(&self) -> StoreResult<u64> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_one("SELECT COUNT(*) FROM stars", &[])
            .await
            .map_err(pg_backend)?;
        let count: i64 = row.get(0);
        Ok(count as u64)
    }

    async fn star_count_excluding(&self, excluded: &[StarId]) -> StoreResult<u64> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_one(
                "SELECT COUNT(*) FROM stars WHERE NOT (star_id = ANY($1))",
                &[&excluded],
            )
            .await
            .map_err(pg_backend)?;
        let count: i64 = row.get(0);
        Ok(count as u64)
    }

    async fn star_sample_excluding(
        &self,
        excluded: &[StarId],
        index: u64,
    ) -> StoreResult<Option<Star>> {
        let conn = self.get_conn().await?;
        let offset = index as i64;

        let row = conn
            .query_opt(
                "SELECT star_id, name, tier, updated_at FROM stars
                 WHERE NOT (star_id = ANY($1))
                 ORDER BY star_id
                 OFFSET $2 LIMIT 1",
                &[&excluded, &offset],
            )
            .await
            .map_err(pg_backend)?;

        row.as_ref().map(row_to_star).transpose()
    }
}

// ============================================================================
// RECENCY CACHE STORE
// ============================================================================

#[async_trait]
impl RecencyCacheStore for DbClient {
    async fn cache_load_or_init(&self, scope: CacheScope) -> StoreResult<RecencyCacheState> {
        let conn = self.get_conn().await?;
        let key = scope.as_key();
        let empty = RecencyCacheState::empty(scope);

        conn.execute(
            "INSERT INTO recency_caches (scope_key, recent_ids, updated_at)
             VALUES ($1, $2, $3)
             ON CONFLICT (scope_key) DO NOTHING",
            &[&key, &empty.recent_ids, &empty.updated_at],
        )
        .await
        .map_err(pg_backend)?;

        let row = conn
            .query_one(
                "SELECT recent_ids, updated_at FROM recency_caches WHERE scope_key = $1",
                &[&key],
            )
            .await
            .map_err(pg_backend)?;

        Ok(RecencyCacheState {
            scope,
            recent_ids: row.get("recent_ids"),
            updated_at: row.get("updated_at"),
        })
    }

    async fn cache_save(&self, state: &RecencyCacheState) -> StoreResult<()> {
        let conn = self.get_conn().await?;
        conn.execute(
            "INSERT INTO recency_caches (scope_key, recent_ids, updated_at)
             VALUES ($1, $2, $3)
             ON CONFLICT (scope_key)
             DO UPDATE SET recent_ids = EXCLUDED.recent_ids,
                           updated_at = EXCLUDED.updated_at",
            &[&state.scope.as_key(), &state.recent_ids, &state.updated_at],
        )
        .await
        .map_err(pg_backend)?;
        Ok(())
    }
}

// ============================================================================
// AUDIT STORE
// ============================================================================

#[async_trait]
impl AuditStore for DbClient {
    async fn audit_insert(&self, audit: &AuditRequest) -> StoreResult<()> {
        let conn = self.get_conn().await?;
        conn.execute(
            "INSERT INTO audit_requests
               (audit_id, action, star_name, tier, star_id, comment, status,
                submitted_by, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            &[
                &audit.audit_id,
                &audit.action.to_string(),
                &audit.star_name,
                &audit.tier.map(|t| t.value()),
                &audit.star_id,
                &audit.comment,
                &audit.status.to_string(),
                &audit.submitted_by,
                &audit.created_at,
                &audit.updated_at,
            ],
        )
        .await
        .map_err(pg_backend)?;
        Ok(())
    }

    async fn audit_get(&self, id: AuditId) -> StoreResult<Option<AuditRequest>> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_opt(
                "SELECT audit_id, action, star_name, tier, star_id, comment, status,
                        submitted_by, created_at, updated_at
                 FROM audit_requests WHERE audit_id = $1",
                &[&id],
            )
            .await
            .map_err(pg_backend)?;

        row.as_ref().map(row_to_audit).transpose()
    }

    async fn audit_list(&self, filter: AuditFilter) -> StoreResult<Vec<AuditRequest>> {
        let conn = self.get_conn().await?;
        let status = filter.status.map(|s| s.to_string());
        let action = filter.action.map(|a| a.to_string());

        let rows = conn
            .query(
                "SELECT audit_id, action, star_name, tier, star_id, comment, status,
                        submitted_by, created_at, updated_at
                 FROM audit_requests
                 WHERE ($1::text IS NULL OR status = $1)
                   AND ($2::text IS NULL OR action = $2)
                 ORDER BY created_at DESC",
                &[&status, &action],
            )
            .await
            .map_err(pg_backend)?;

        rows.iter().map(row_to_audit).collect()
    }

    async fn audit_finalize(
        &self,
        id: AuditId,
        status: AuditStatus,
        comment: Option<&str>,
        decided_at: Timestamp,
    ) -> StoreResult<Option<AuditRequest>> {
        let conn = self.get_conn().await?;

        // The WHERE clause is the compare half of the compare-and-set; a
        // concurrent decision leaves zero rows updated.
        let row = conn
            .query_opt(
                "UPDATE audit_requests
                 SET status = $2, comment = COALESCE($3, comment), updated_at = $4
                 WHERE audit_id = $1 AND status = 'pending'
                 RETURNING audit_id, action, star_name, tier, star_id, comment, status,
                           submitted_by, created_at, updated_at",
                &[&id, &status.to_string(), &comment, &decided_at],
            )
            .await
            .map_err(pg_backend)?;

        row.as_ref().map(row_to_audit).transpose()
    }
}

// ============================================================================
// USER STORE
// ============================================================================

#[async_trait]
impl UserStore for DbClient {
    async fn user_insert(&self, user: &User) -> StoreResult<()> {
        let conn = self.get_conn().await?;
        conn.execute(
            "INSERT INTO users
               (user_id, username, email, password_hash, role, email_verified, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
            &[
                &user.user_id,
                &user.username,
                &user.email,
                &user.password_hash,
                &user.role.to_string(),
                &user.email_verified,
                &user.created_at,
            ],
        )
        .await
        .map_err(|e| map_pg_error(e, &user.username))?;
        Ok(())
    }

    async fn user_get(&self, id: UserId) -> StoreResult<Option<User>> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_opt(
                "SELECT user_id, username, email, password_hash, role, email_verified, created_at
                 FROM users WHERE user_id = $1",
                &[&id],
            )
            .await
            .map_err(pg_backend)?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn user_find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_opt(
                "SELECT user_id, username, email, password_hash, role, email_verified, created_at
                 FROM users WHERE email = $1",
                &[&email],
            )
            .await
            .map_err(pg_backend)?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn user_find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_opt(
                "SELECT user_id, username, email, password_hash, role, email_verified, created_at
                 FROM users WHERE username = $1",
                &[&username],
            )
            .await
            .map_err(pg_backend)?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn user_mark_verified(&self, id: UserId) -> StoreResult<()> {
        let conn = self.get_conn().await?;
        let updated = conn
            .execute(
                "UPDATE users SET email_verified = TRUE WHERE user_id = $1",
                &[&id],
            )
            .await
            .map_err(pg_backend)?;

        if updated == 0 {
            return Err(StoreError::not_found("user", id));
        }
        Ok(())
    }

    async fn user_delete(&self, id: UserId) -> StoreResult<()> {
        let conn = self.get_conn().await?;
        // The verification row goes with it via ON DELETE CASCADE.
        let deleted = conn
            .execute("DELETE FROM users WHERE user_id = $1", &[&id])
            .await
            .map_err(pg_backend)?;

        if deleted == 0 {
            return Err(StoreError::not_found("user", id));
        }
        Ok(())
    }
}

// ============================================================================
// VERIFICATION STORE
// ============================================================================

#[async_trait]
impl VerificationStore for DbClient {
    async fn verification_upsert(&self, verification: &EmailVerification) -> StoreResult<()> {
        let conn = self.get_conn().await?;
        conn.execute(
            "INSERT INTO email_verifications (user_id, email, otp, created_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (user_id)
             DO UPDATE SET email = EXCLUDED.email,
                           otp = EXCLUDED.otp,
                           created_at = EXCLUDED.created_at",
            &[
                &verification.user_id,
                &verification.email,
                &verification.otp,
                &verification.created_at,
            ],
        )
        .await
        .map_err(pg_backend)?;
        Ok(())
    }

    async fn verification_get(&self, user_id: UserId) -> StoreResult<Option<EmailVerification>> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_opt(
                "SELECT user_id, email, otp, created_at
                 FROM email_verifications WHERE user_id = $1",
                &[&user_id],
            )
            .await
            .map_err(pg_backend)?;

        Ok(row.as_ref().map(row_to_verification))
    }

    async fn verification_delete(&self, user_id: UserId) -> StoreResult<()> {
        let conn = self.get_conn().await?;
        conn.execute(
            "DELETE FROM email_verifications WHERE user_id = $1",
            &[&user_id],
        )
        .await
        .map_err(pg_backend)?;
        Ok(())
    }
}
