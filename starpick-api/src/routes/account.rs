//! Account Routes
//!
//! Signup with email verification, login/logout with an HttpOnly session
//! cookie, and the current-user profile. Login failures for a missing user
//! and a wrong password are indistinguishable on the wire.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::AppendHeaders,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use rand::Rng;
use starpick_core::{new_entity_id, EmailVerification, Role, StoreError, User};
use starpick_storage::AppStore;
use std::sync::Arc;

use crate::auth::{generate_jwt_token, AuthConfig};
use crate::config::ApiConfig;
use crate::email::Mailer;
use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::impl_auth_from_ref;
use crate::middleware::{clear_session_cookie, session_cookie, AuthSession};
use crate::password::{hash_password, verify_password};
use crate::types::{
    LoginRequest, LoginResponse, MessageResponse, ResendOtpRequest, SignupRequest, UserProfile,
    VerifyEmailRequest,
};
use crate::validation::{validate_email, validate_password, validate_username};

/// State for account routes.
#[derive(Clone)]
pub struct AccountState {
    pub store: Arc<dyn AppStore>,
    pub auth: Arc<AuthConfig>,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<ApiConfig>,
}

impl_auth_from_ref!(AccountState);

/// Create the account router.
pub fn create_router(state: Arc<AccountState>) -> Router {
    Router::new()
        .route("/signup", post(signup))
        .route("/verify-email", post(verify_email))
        .route("/resend-otp", post(resend_otp))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .with_state(state)
}

/// Six-digit passcode, zero-padded.
fn generate_otp() -> String {
    format!("{:06}", rand::rng().random_range(0..1_000_000u32))
}

// ============================================================================
// SIGNUP AND VERIFICATION
// ============================================================================

/// Register an account and mail a verification passcode.
#[utoipa::path(
    post,
    path = "/auth/signup",
    tag = "auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created, passcode mailed", body = MessageResponse),
        (status = 400, description = "Invalid username, email, or password", body = ApiError),
        (status = 409, description = "Username or email already registered", body = ApiError)
    )
)]
pub(crate) async fn signup(
    State(state): State<Arc<AccountState>>,
    Json(request): Json<SignupRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    validate_username(&request.username)?;
    let email = validate_email(&request.email)?;
    validate_password(&request.password)?;

    let user = User {
        user_id: new_entity_id(),
        username: request.username,
        email: email.clone(),
        password_hash: hash_password(&request.password)?,
        role: Role::User,
        email_verified: false,
        created_at: Utc::now(),
    };

    state.store.user_insert(&user).await.map_err(|e| match e {
        StoreError::DuplicateName { .. } => ApiError::new(
            ErrorCode::DuplicateName,
            "Username or email is already registered",
        ),
        other => other.into(),
    })?;

    let otp = generate_otp();
    state
        .store
        .verification_upsert(&EmailVerification {
            user_id: user.user_id,
            email: email.clone(),
            otp: otp.clone(),
            created_at: Utc::now(),
        })
        .await?;

    // If the passcode cannot go out the account is unusable, so roll the
    // signup back and let the address try again.
    if let Err(err) = state.mailer.send_otp(&email, &user.username, &otp).await {
        tracing::error!(user_id = %user.user_id, error = %err, "Verification mail failed, rolling back signup");
        if let Err(cleanup) = state.store.user_delete(user.user_id).await {
            tracing::error!(user_id = %user.user_id, error = %cleanup, "Signup rollback failed");
        }
        return Err(err);
    }

    tracing::info!(user_id = %user.user_id, username = %user.username, "Account created");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(
            "Account created, check your email for the verification code",
        )),
    ))
}

/// Verify an email address with the mailed passcode. Success logs the user
/// straight in.
#[utoipa::path(
    post,
    path = "/auth/verify-email",
    tag = "auth",
    request_body = VerifyEmailRequest,
    responses(
        (status = 200, description = "Email verified, session established", body = LoginResponse),
        (status = 400, description = "Wrong or expired passcode, or already verified", body = ApiError),
        (status = 404, description = "No such account", body = ApiError)
    )
)]
pub(crate) async fn verify_email(
    State(state): State<Arc<AccountState>>,
    Json(request): Json<VerifyEmailRequest>,
) -> ApiResult<(
    AppendHeaders<[(header::HeaderName, String); 1]>,
    Json<LoginResponse>,
)> {
    let email = validate_email(&request.email)?;
    let mut user = state
        .store
        .user_find_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::user_not_found("No account with this email"))?;

    if user.email_verified {
        return Err(ApiError::invalid_input("Email is already verified"));
    }

    let verification = state
        .store
        .verification_get(user.user_id)
        .await?
        .ok_or_else(|| {
            ApiError::invalid_input("No pending verification, request a new code")
        })?;

    let age = Utc::now().signed_duration_since(verification.created_at);
    if age.num_seconds() > state.config.otp_ttl_secs as i64 {
        return Err(ApiError::invalid_input(
            "Verification code expired, request a new one",
        ));
    }
    if verification.otp != request.otp {
        return Err(ApiError::invalid_input("Incorrect verification code"));
    }

    state.store.user_mark_verified(user.user_id).await?;
    state.store.verification_delete(user.user_id).await?;
    user.email_verified = true;

    let token = generate_jwt_token(&state.auth, &user)?;
    let cookie = session_cookie(
        &token,
        state.config.cookie_max_age_secs,
        state.config.cookie_secure,
    );

    tracing::info!(user_id = %user.user_id, "Email verified");
    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(LoginResponse {
            token,
            user: UserProfile::from(&user),
        }),
    ))
}

/// Re-send the verification passcode, replacing the old one.
#[utoipa::path(
    post,
    path = "/auth/resend-otp",
    tag = "auth",
    request_body = ResendOtpRequest,
    responses(
        (status = 200, description = "Passcode re-sent", body = MessageResponse),
        (status = 400, description = "Email already verified", body = ApiError),
        (status = 404, description = "No such account", body = ApiError)
    )
)]
pub(crate) async fn resend_otp(
    State(state): State<Arc<AccountState>>,
    Json(request): Json<ResendOtpRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let email = validate_email(&request.email)?;
    let user = state
        .store
        .user_find_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::user_not_found("No account with this email"))?;

    if user.email_verified {
        return Err(ApiError::invalid_input("Email is already verified"));
    }

    let otp = generate_otp();
    state
        .store
        .verification_upsert(&EmailVerification {
            user_id: user.user_id,
            email: email.clone(),
            otp: otp.clone(),
            created_at: Utc::now(),
        })
        .await?;
    state.mailer.send_otp(&email, &user.username, &otp).await?;

    Ok(Json(MessageResponse::new("Verification code re-sent")))
}

// ============================================================================
// SESSION
// ============================================================================

/// Log in, establishing the session cookie.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Bad credentials", body = ApiError),
        (status = 403, description = "Email not verified", body = ApiError)
    )
)]
pub(crate) async fn login(
    State(state): State<Arc<AccountState>>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<(
    AppendHeaders<[(header::HeaderName, String); 1]>,
    Json<LoginResponse>,
)> {
    // The identifier doubles as username or email; addresses are stored
    // lowercase.
    let user = if request.username.contains('@') {
        state
            .store
            .user_find_by_email(&request.username.to_lowercase())
            .await?
    } else {
        state.store.user_find_by_username(&request.username).await?
    }
    .ok_or_else(|| ApiError::unauthorized("Invalid username or password"))?;

    if !verify_password(&request.password, &user.password_hash)? {
        return Err(ApiError::unauthorized("Invalid username or password"));
    }
    if !user.email_verified {
        return Err(ApiError::forbidden("Verify your email before logging in"));
    }

    let token = generate_jwt_token(&state.auth, &user)?;
    let cookie = session_cookie(
        &token,
        state.config.cookie_max_age_secs,
        state.config.cookie_secure,
    );

    tracing::info!(user_id = %user.user_id, username = %user.username, "Login");
    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(LoginResponse {
            token,
            user: UserProfile::from(&user),
        }),
    ))
}

/// Log out by clearing the session cookie.
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse)
    )
)]
pub(crate) async fn logout(
    State(state): State<Arc<AccountState>>,
) -> (
    AppendHeaders<[(header::HeaderName, String); 1]>,
    Json<MessageResponse>,
) {
    (
        AppendHeaders([(
            header::SET_COOKIE,
            clear_session_cookie(state.config.cookie_secure),
        )]),
        Json(MessageResponse::new("Logged out")),
    )
}

/// The authenticated user's profile.
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = UserProfile),
        (status = 401, description = "Not authenticated", body = ApiError)
    )
)]
pub(crate) async fn me(
    State(state): State<Arc<AccountState>>,
    AuthSession(session): AuthSession,
) -> ApiResult<Json<UserProfile>> {
    let user = state
        .store
        .user_get(session.user_id)
        .await?
        .ok_or_else(|| ApiError::user_not_found("Account no longer exists"))?;
    Ok(Json(UserProfile::from(&user)))
}
