//! Business Logic Services
//!
//! Services hold the domain logic that spans more than one storage call:
//! the recency-aware random picker, the audit decision workflow, and bulk
//! catalog import. Handlers stay thin and delegate here; everything takes
//! `&dyn AppStore` so the same code runs against PostgreSQL and the
//! in-memory store used by tests.

pub mod audit;
pub mod import;
pub mod picker;

pub use audit::{decide_audit, submit_audit, AuditSubmission};
pub use import::{import_stars, parse_csv, BulkOutcome};
pub use picker::pick_random_star;
