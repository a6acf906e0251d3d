//! Authentication Extractor
//!
//! Route handlers opt into authentication by taking an `AuthSession`
//! parameter. The extractor reads the session token from either the
//! HttpOnly `token` cookie (browser clients) or the `Authorization: Bearer`
//! header (programmatic clients), validates it, and yields the session.
//!
//! Because catalog reads are public while mutations are not, authentication
//! is enforced per-handler via this extractor rather than as a router-wide
//! middleware layer: the type signature of each handler documents whether
//! the route is protected.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use std::sync::Arc;

use crate::auth::{authenticate_token, AuthConfig, Session};
use crate::error::ApiError;

/// Name of the session cookie set at login.
pub const SESSION_COOKIE: &str = "token";

/// Local handle to the shared auth configuration, extractable from any
/// route state wired up with `impl_auth_from_ref!`.
///
/// A crate-local newtype is required here: `FromRef` and `Arc` are both
/// foreign, so `Arc<AuthConfig>` itself cannot be the `FromRef` target.
#[derive(Debug, Clone)]
pub struct AuthConfigRef(pub Arc<AuthConfig>);

// ============================================================================
// TYPED EXTRACTOR
// ============================================================================

/// Typed Axum extractor for the authenticated session.
///
/// Using this in a handler signature makes authentication required by the
/// type system; unauthenticated requests are rejected with 401 before the
/// handler body runs.
///
/// # Example
///
/// ```ignore
/// async fn random_star(
///     State(state): State<Arc<StarState>>,
///     AuthSession(session): AuthSession,
/// ) -> ApiResult<Json<Star>> {
///     // session.user_id, session.role are validated here
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthSession(pub Session);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthSession
where
    AuthConfigRef: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthConfigRef(config) = AuthConfigRef::from_ref(state);

        let token = bearer_token(parts)
            .or_else(|| cookie_token(parts))
            .ok_or_else(|| {
                ApiError::unauthorized(
                    "Authentication required: provide a session cookie or Authorization header",
                )
            })?;

        let session = authenticate_token(&config, &token)?;
        Ok(AuthSession(session))
    }
}

// Implement Deref to make it easier to access the inner Session
impl std::ops::Deref for AuthSession {
    type Target = Session;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// ============================================================================
// TOKEN EXTRACTION
// ============================================================================

/// Extract a Bearer token from the Authorization header.
fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Extract the session token from the Cookie header.
fn cookie_token(parts: &Parts) -> Option<String> {
    let cookies = parts
        .headers
        .get(header::COOKIE)
        .and_then(|h| h.to_str().ok())?;

    cookies.split(';').find_map(|pair| {
        pair.trim()
            .strip_prefix(SESSION_COOKIE)
            .and_then(|rest| rest.strip_prefix('='))
            .map(str::to_string)
    })
}

// ============================================================================
// COOKIE BUILDERS
// ============================================================================

/// Build the Set-Cookie value that establishes a session.
pub fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Build the Set-Cookie value that clears the session at logout.
pub fn clear_session_cookie(secure: bool) -> String {
    let mut cookie = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(header_name: header::HeaderName, value: &str) -> Parts {
        let request = Request::builder()
            .header(header_name, value)
            .body(())
            .expect("valid request");
        request.into_parts().0
    }

    #[test]
    fn bearer_token_extraction() {
        let parts = parts_with(header::AUTHORIZATION, "Bearer abc.def.ghi");
        assert_eq!(bearer_token(&parts), Some("abc.def.ghi".to_string()));

        let parts = parts_with(header::AUTHORIZATION, "Basic dXNlcg==");
        assert_eq!(bearer_token(&parts), None);
    }

    #[test]
    fn cookie_token_extraction() {
        let parts = parts_with(header::COOKIE, "theme=dark; token=abc.def.ghi; lang=en");
        assert_eq!(cookie_token(&parts), Some("abc.def.ghi".to_string()));

        // A cookie whose name merely starts with "token" must not match.
        let parts = parts_with(header::COOKIE, "tokenish=nope");
        assert_eq!(cookie_token(&parts), None);
    }

    #[test]
    fn cookie_attributes() {
        let cookie = session_cookie("abc", 86_400, true);
        assert!(cookie.starts_with("token=abc"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=86400"));
        assert!(cookie.contains("Secure"));

        let cleared = clear_session_cookie(false);
        assert!(cleared.contains("Max-Age=0"));
        assert!(!cleared.contains("Secure"));
    }
}
