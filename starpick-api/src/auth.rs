//! Authentication Module
//!
//! JWT session tokens for the starpick API. Tokens are issued at login and
//! carried either in an HttpOnly `token` cookie (browser clients) or an
//! `Authorization: Bearer` header (programmatic clients).

use crate::error::{ApiError, ApiResult};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use starpick_core::{Role, User, UserId};
use std::sync::Arc;
use uuid::Uuid;

// ============================================================================
// CLOCK ABSTRACTION (FOR DETERMINISTIC TESTS + CI ROBUSTNESS)
// ============================================================================

/// Clock abstraction for JWT time validation.
///
/// This allows us to inject time in tests and handle broken CI environments
/// where `SystemTime::now()` might return pre-epoch times (causing panics).
///
/// By owning time validation ourselves (instead of letting `jsonwebtoken` do it),
/// we avoid the `SystemTime::now().duration_since(UNIX_EPOCH).expect()` panic
/// path and make tests fully deterministic.
pub trait JwtClock: Send + Sync {
    /// Get current time as Unix epoch seconds.
    fn now_epoch_secs(&self) -> i64;
}

/// Production clock using system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl JwtClock for SystemClock {
    fn now_epoch_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Fixed clock for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl JwtClock for FixedClock {
    fn now_epoch_secs(&self) -> i64 {
        self.0
    }
}

// ============================================================================
// JWT SECRET (TYPE-SAFE)
// ============================================================================

/// Type-safe JWT secret that prevents accidental logging.
///
/// This wraps the secret in a `secrecy::SecretString` to ensure it's never
/// accidentally logged or displayed.
#[derive(Clone)]
pub struct JwtSecret(SecretString);

impl JwtSecret {
    /// Create a new JWT secret with validation.
    ///
    /// # Errors
    /// Returns error if the secret is empty.
    pub fn new(secret: String) -> ApiResult<Self> {
        if secret.is_empty() {
            return Err(ApiError::missing_field("jwt_secret"));
        }
        Ok(Self(SecretString::new(secret.into())))
    }

    /// Expose the secret value (use sparingly, only for cryptographic operations).
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Get the length of the secret without exposing it.
    pub fn len(&self) -> usize {
        self.0.expose_secret().len()
    }

    /// Check if the secret is empty without exposing it.
    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }

    /// Check if the secret is the insecure default.
    pub fn is_insecure_default(&self) -> bool {
        self.0.expose_secret() == INSECURE_DEFAULT_SECRET
    }
}

impl std::fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JwtSecret([REDACTED, {} chars])", self.len())
    }
}

const INSECURE_DEFAULT_SECRET: &str = "INSECURE_DEFAULT_SECRET_CHANGE_IN_PRODUCTION";

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Authentication configuration.
#[derive(Clone)]
pub struct AuthConfig {
    /// JWT secret key for signing and verification
    pub jwt_secret: JwtSecret,

    /// JWT algorithm (default: HS256)
    pub jwt_algorithm: Algorithm,

    /// JWT token expiration in seconds (default: 1 day, matching the
    /// session cookie lifetime)
    pub jwt_expiration_secs: i64,

    /// JWT clock skew tolerance in seconds (default: 60)
    pub jwt_clock_skew_secs: i64,

    /// Clock for JWT time validation (injected for testing)
    pub clock: Arc<dyn JwtClock>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret)
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field("jwt_expiration_secs", &self.jwt_expiration_secs)
            .field("jwt_clock_skew_secs", &self.jwt_clock_skew_secs)
            .field("clock", &"<JwtClock>")
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        let secret_str = std::env::var("STARPICK_JWT_SECRET")
            .unwrap_or_else(|_| INSECURE_DEFAULT_SECRET.to_string());

        Self {
            jwt_secret: build_jwt_secret(secret_str),
            jwt_algorithm: Algorithm::HS256,
            jwt_expiration_secs: 86_400, // 1 day
            jwt_clock_skew_secs: 60,
            clock: Arc::new(SystemClock),
        }
    }
}

impl AuthConfig {
    /// Create authentication configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `STARPICK_JWT_SECRET`: JWT signing secret
    /// - `STARPICK_JWT_EXPIRATION_SECS`: JWT token expiration (default: 86400)
    /// - `STARPICK_JWT_CLOCK_SKEW_SECS`: JWT clock skew tolerance (default: 60)
    pub fn from_env() -> Self {
        let secret_str = std::env::var("STARPICK_JWT_SECRET")
            .unwrap_or_else(|_| INSECURE_DEFAULT_SECRET.to_string());

        Self {
            jwt_secret: build_jwt_secret(secret_str),
            jwt_algorithm: Algorithm::HS256,
            jwt_expiration_secs: std::env::var("STARPICK_JWT_EXPIRATION_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(86_400),
            jwt_clock_skew_secs: std::env::var("STARPICK_JWT_CLOCK_SKEW_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
            clock: Arc::new(SystemClock),
        }
    }

    /// Validate the authentication configuration for production use.
    ///
    /// This function should be called at server startup to ensure that
    /// insecure defaults are not being used in production environments.
    /// In development mode, warnings are logged but the server continues.
    pub fn validate_for_production(&self) -> ApiResult<()> {
        let environment = std::env::var("STARPICK_ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase();

        let is_production = environment == "production" || environment == "prod";

        if self.jwt_secret.is_insecure_default() {
            if is_production {
                return Err(ApiError::invalid_input(format!(
                    "Cannot start server in production with insecure JWT secret. \
                     Set STARPICK_JWT_SECRET to a secure value. \
                     STARPICK_ENVIRONMENT={}",
                    environment
                )));
            } else {
                tracing::warn!(
                    "SECURITY WARNING: Using insecure default JWT secret. \
                     Set STARPICK_JWT_SECRET to a secure random value \
                     (minimum 32 characters) before deploying."
                );
            }
        }

        if self.jwt_secret.len() < 32 {
            if is_production {
                return Err(ApiError::invalid_input(format!(
                    "JWT secret is too short for production use ({} chars). \
                     It must be at least 32 characters long.",
                    self.jwt_secret.len()
                )));
            } else if !self.jwt_secret.is_insecure_default() {
                tracing::warn!(
                    "SECURITY WARNING: JWT secret is short ({} chars). \
                     For production, use at least 32 characters.",
                    self.jwt_secret.len()
                );
            }
        }

        Ok(())
    }
}

fn build_jwt_secret(secret_str: String) -> JwtSecret {
    let normalized = if secret_str.trim().is_empty() {
        INSECURE_DEFAULT_SECRET.to_string()
    } else {
        secret_str
    };

    match JwtSecret::new(normalized) {
        Ok(secret) => secret,
        Err(_) => JwtSecret(SecretString::new(INSECURE_DEFAULT_SECRET.to_string().into())),
    }
}

// ============================================================================
// JWT CLAIMS
// ============================================================================

/// JWT claims structure.
///
/// Standard claims plus the username and role the rest of the API needs
/// without a user lookup on every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,

    /// Username for display and logging
    pub username: String,

    /// User role ("user" or "admin")
    pub role: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Create new claims for a user using a clock.
    pub fn new(user: &User, expiration_secs: i64, clock: &dyn JwtClock) -> Self {
        let now = clock.now_epoch_secs();

        Self {
            sub: user.user_id.to_string(),
            username: user.username.clone(),
            role: user.role.to_string(),
            iat: now,
            exp: now + expiration_secs,
        }
    }

    /// Check if the token has expired according to a clock.
    pub fn is_expired(&self, clock: &dyn JwtClock) -> bool {
        self.exp < clock.now_epoch_secs()
    }
}

// ============================================================================
// AUTHENTICATED SESSION
// ============================================================================

/// Authenticated session derived from validated JWT claims.
///
/// Route handlers receive this via the `AuthSession` extractor in
/// `crate::middleware`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
}

impl Session {
    /// Build a session from validated claims, rejecting malformed subjects.
    pub fn from_claims(claims: &Claims) -> ApiResult<Self> {
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ApiError::invalid_token("Token subject is not a valid user id"))?;
        let role = claims
            .role
            .parse::<Role>()
            .map_err(|_| ApiError::invalid_token("Token carries an unknown role"))?;

        Ok(Self {
            user_id,
            username: claims.username.clone(),
            role,
        })
    }

    /// Whether this session belongs to an admin.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Reject non-admin sessions.
    pub fn require_admin(&self) -> ApiResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden("Admin role required"))
        }
    }
}

// ============================================================================
// TOKEN FUNCTIONS
// ============================================================================

/// Validate JWT claim times using our own clock logic.
///
/// Separated from signature validation so tests are fully deterministic with
/// injected clocks and clock skew policy lives in one place.
fn validate_claim_times(now: i64, exp: i64, leeway_secs: i64) -> ApiResult<()> {
    if exp < now - leeway_secs {
        return Err(ApiError::token_expired());
    }
    Ok(())
}

/// Validate a JWT token and extract claims.
///
/// This performs signature validation ONLY (no time validation) to avoid
/// the `SystemTime::now().duration_since(UNIX_EPOCH).expect()` panic path
/// in `jsonwebtoken`. We do our own time validation with injected clocks.
pub fn validate_jwt_token(config: &AuthConfig, token: &str) -> ApiResult<Claims> {
    let decoding_key = DecodingKey::from_secret(config.jwt_secret.expose().as_bytes());

    // Decode with signature validation ONLY (skip exp validation)
    let mut validation = Validation::new(config.jwt_algorithm);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.required_spec_claims = std::collections::HashSet::from(["exp".to_string()]);

    let token_data =
        decode::<Claims>(token, &decoding_key, &validation).map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::InvalidToken => {
                ApiError::invalid_token("Token is invalid")
            }
            jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                ApiError::invalid_token("Token signature is invalid")
            }
            _ => ApiError::invalid_token(format!("Token validation failed: {}", e)),
        })?;

    let claims = token_data.claims;

    let now = config.clock.now_epoch_secs();

    // Fail loud if production clock returns pre-epoch time
    if now < 0 {
        tracing::error!(
            timestamp = now,
            "System clock returned pre-epoch time - server time is broken"
        );
        return Err(ApiError::internal_error(
            "Server time configuration error - please contact support",
        ));
    }

    validate_claim_times(now, claims.exp, config.jwt_clock_skew_secs)?;

    Ok(claims)
}

/// Generate a JWT session token for a user.
pub fn generate_jwt_token(config: &AuthConfig, user: &User) -> ApiResult<String> {
    let claims = Claims::new(user, config.jwt_expiration_secs, &*config.clock);

    let encoding_key = EncodingKey::from_secret(config.jwt_secret.expose().as_bytes());
    let header = Header::new(config.jwt_algorithm);

    encode(&header, &claims, &encoding_key)
        .map_err(|e| ApiError::internal_error(format!("Failed to generate token: {}", e)))
}

/// Authenticate a bearer token or cookie token into a session.
pub fn authenticate_token(config: &AuthConfig, token: &str) -> ApiResult<Session> {
    let claims = validate_jwt_token(config, token)?;
    Session::from_claims(&claims)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use starpick_core::new_entity_id;

    /// 2024-01-01 00:00:00 UTC - always valid for tests
    fn valid_clock() -> FixedClock {
        FixedClock(1704067200)
    }

    fn test_user(role: Role) -> User {
        User {
            user_id: new_entity_id(),
            username: "nadia".to_string(),
            email: "nadia@gmail.com".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            role,
            email_verified: true,
            created_at: Utc::now(),
        }
    }

    fn test_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: JwtSecret::new("test_secret".to_string()).expect("valid test secret"),
            clock: Arc::new(valid_clock()),
            ..Default::default()
        }
    }

    #[test]
    fn test_jwt_generation_and_validation() -> ApiResult<()> {
        let config = test_config();
        let user = test_user(Role::Admin);

        let token = generate_jwt_token(&config, &user)?;
        let claims = validate_jwt_token(&config, &token)?;

        assert_eq!(claims.sub, user.user_id.to_string());
        assert_eq!(claims.username, "nadia");
        assert_eq!(claims.role, "admin");
        assert!(!claims.is_expired(&valid_clock()));
        Ok(())
    }

    #[test]
    fn test_session_from_claims_round_trip() -> ApiResult<()> {
        let config = test_config();
        let user = test_user(Role::User);

        let token = generate_jwt_token(&config, &user)?;
        let session = authenticate_token(&config, &token)?;

        assert_eq!(session.user_id, user.user_id);
        assert_eq!(session.username, user.username);
        assert_eq!(session.role, Role::User);
        assert!(!session.is_admin());
        assert!(session.require_admin().is_err());
        Ok(())
    }

    #[test]
    fn test_expired_token() -> ApiResult<()> {
        let mut config = test_config();
        config.jwt_expiration_secs = -120; // Already expired beyond leeway

        let token = generate_jwt_token(&config, &test_user(Role::User))?;

        let result = validate_jwt_token(&config, &token);
        assert!(result.is_err());
        if let Err(e) = result {
            assert_eq!(e.code, crate::error::ErrorCode::TokenExpired);
        }
        Ok(())
    }

    #[test]
    fn test_clock_skew_tolerance() -> ApiResult<()> {
        let mut config = test_config();
        config.jwt_clock_skew_secs = 60;
        config.jwt_expiration_secs = 100;

        let token = generate_jwt_token(&config, &test_user(Role::User))?;

        // 30 seconds past expiry is within the 60 second leeway.
        config.clock = Arc::new(FixedClock(valid_clock().0 + 130));
        assert!(validate_jwt_token(&config, &token).is_ok());

        // 200 seconds past expiry is not.
        config.clock = Arc::new(FixedClock(valid_clock().0 + 300));
        assert!(validate_jwt_token(&config, &token).is_err());
        Ok(())
    }

    #[test]
    fn test_tampered_token_rejected() -> ApiResult<()> {
        let config = test_config();
        let token = generate_jwt_token(&config, &test_user(Role::User))?;

        let mut other = test_config();
        other.jwt_secret = JwtSecret::new("another_secret".to_string())?;

        assert!(validate_jwt_token(&other, &token).is_err());
        Ok(())
    }

    #[test]
    fn test_pre_epoch_clock_fails_loud() -> ApiResult<()> {
        let mut config = test_config();
        let token = generate_jwt_token(&config, &test_user(Role::User))?;

        config.clock = Arc::new(FixedClock(-1000));

        let result = validate_jwt_token(&config, &token);
        assert!(result.is_err());
        if let Err(e) = result {
            assert_eq!(e.code, crate::error::ErrorCode::InternalError);
        }
        Ok(())
    }
}
