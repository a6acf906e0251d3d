//! API Configuration Module
//!
//! CORS, session cookie, and verification-window settings. Configuration is
//! loaded from environment variables with sensible defaults for development.

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// API configuration for CORS and session hardening.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    /// Whether the session cookie carries the `Secure` attribute.
    /// Should be true everywhere TLS terminates in front of the API.
    pub cookie_secure: bool,

    /// Session cookie lifetime in seconds. Matches the JWT expiration.
    pub cookie_max_age_secs: i64,

    /// How long a signup OTP stays valid, in seconds.
    pub otp_ttl_secs: i64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(), // Empty = allow all
            cors_max_age_secs: 86_400,
            cookie_secure: false,
            cookie_max_age_secs: 86_400, // 1 day
            otp_ttl_secs: 600,           // 10 minutes
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `STARPICK_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `STARPICK_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `STARPICK_COOKIE_SECURE`: "true" or "false" (default: false)
    /// - `STARPICK_COOKIE_MAX_AGE_SECS`: Session cookie lifetime (default: 86400)
    /// - `STARPICK_OTP_TTL_SECS`: OTP validity window (default: 600)
    pub fn from_env() -> Self {
        let cors_origins = std::env::var("STARPICK_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let cors_max_age_secs = std::env::var("STARPICK_CORS_MAX_AGE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(86_400);

        let cookie_secure = std::env::var("STARPICK_COOKIE_SECURE")
            .ok()
            .map(|s| s.to_lowercase() == "true")
            .unwrap_or(false);

        let cookie_max_age_secs = std::env::var("STARPICK_COOKIE_MAX_AGE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(86_400);

        let otp_ttl_secs = std::env::var("STARPICK_OTP_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(600);

        Self {
            cors_origins,
            cors_max_age_secs,
            cookie_secure,
            cookie_max_age_secs,
            otp_ttl_secs,
        }
    }

    /// Check if running in production mode (strict CORS).
    pub fn is_production(&self) -> bool {
        !self.cors_origins.is_empty()
    }
}
