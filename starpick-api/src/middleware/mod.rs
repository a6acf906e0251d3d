//! Axum extractors and session plumbing for authentication.

pub mod auth;

pub use auth::{
    clear_session_cookie, session_cookie, AuthConfigRef, AuthSession, SESSION_COOKIE,
};
