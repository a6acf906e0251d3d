//! Starpick API - REST Layer
//!
//! HTTP surface for the star catalog service: catalog CRUD and search,
//! recency-aware random picks, bulk JSON/CSV import, the audited change
//! workflow, and account management with JWT sessions.
//!
//! Storage is abstracted behind `starpick_storage::AppStore`; the binary
//! wires in the PostgreSQL-backed `DbClient`, tests wire in `MemoryStore`.

pub mod auth;
pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod macros;
pub mod middleware;
#[cfg(feature = "openapi")]
pub mod openapi;
pub mod password;
pub mod routes;
pub mod services;
pub mod types;
pub mod validation;

pub use auth::{AuthConfig, JwtSecret, Session};
pub use config::ApiConfig;
pub use db::{DbClient, DbConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::create_api_router;
