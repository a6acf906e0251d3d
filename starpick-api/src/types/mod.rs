//! Request and Response Types
//!
//! Wire-facing DTOs for the REST surface. Numeric fields that carry domain
//! invariants (tier) arrive as raw integers and are validated in handlers,
//! so a bad value produces a structured 400 instead of a serde rejection.

pub mod account;
pub mod audit;
pub mod star;

pub use account::{
    LoginRequest, LoginResponse, MessageResponse, ResendOtpRequest, SignupRequest, UserProfile,
    VerifyEmailRequest,
};
pub use audit::{AuditListParams, AuditListResponse, DecisionRequest, SubmitAuditRequest};
pub use star::{
    BulkFailure, BulkUploadResponse, CreateStarRequest, SearchParams, StarListResponse,
    StarUpload, UpdateStarRequest,
};
