//! Star Catalog Routes
//!
//! REST endpoints for the star catalog. Reads (list, search) are public;
//! every mutation and the random pick require an authenticated session.
//! Bulk import accepts either a JSON array or an uploaded CSV file.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use starpick_core::{CacheScope, Star, StarId};
use starpick_storage::AppStore;
use std::sync::Arc;

use crate::auth::AuthConfig;
use crate::error::{ApiError, ApiResult};
use crate::impl_auth_from_ref;
use crate::middleware::AuthSession;
use crate::services;
use crate::types::{
    BulkUploadResponse, CreateStarRequest, SearchParams, StarListResponse, StarUpload,
    UpdateStarRequest,
};
use crate::validation::{validate_star_name, validate_tier};

/// State for star catalog routes.
#[derive(Clone)]
pub struct StarState {
    pub store: Arc<dyn AppStore>,
    pub auth: Arc<AuthConfig>,
}

impl_auth_from_ref!(StarState);

/// Create the star catalog router.
pub fn create_router(state: Arc<StarState>) -> Router {
    Router::new()
        .route("/", get(list_stars).post(create_star))
        .route("/search", get(search_stars))
        .route("/random", get(random_star))
        .route("/bulk", post(bulk_create_stars))
        .route("/import", post(import_stars_csv))
        .route("/:star_id", put(update_star).delete(delete_star))
        .with_state(state)
}

// ============================================================================
// READ HANDLERS
// ============================================================================

/// List the whole catalog.
#[utoipa::path(
    get,
    path = "/api/v1/stars",
    tag = "stars",
    responses(
        (status = 200, description = "Full catalog", body = StarListResponse)
    )
)]
pub(crate) async fn list_stars(State(state): State<Arc<StarState>>) -> ApiResult<Json<StarListResponse>> {
    let stars = state.store.star_list().await?;
    Ok(Json(StarListResponse::new(stars)))
}

/// Search the catalog by name substring and/or tier set.
#[utoipa::path(
    get,
    path = "/api/v1/stars/search",
    tag = "stars",
    params(SearchParams),
    responses(
        (status = 200, description = "Matching stars", body = StarListResponse),
        (status = 400, description = "No search criteria or bad tier list", body = ApiError)
    )
)]
pub(crate) async fn search_stars(
    State(state): State<Arc<StarState>>,
    axum::extract::Query(params): axum::extract::Query<SearchParams>,
) -> ApiResult<Json<StarListResponse>> {
    if params.is_empty() {
        return Err(ApiError::validation_failed(
            "Provide at least one of 'key' or 'tier'",
        ));
    }

    let tiers = params.tiers()?;
    let key = params.key.as_deref().filter(|k| !k.is_empty());
    let stars = state.store.star_search(key, &tiers).await?;
    Ok(Json(StarListResponse::new(stars)))
}

/// Pick a random star, avoiding recent picks.
#[utoipa::path(
    get,
    path = "/api/v1/stars/random",
    tag = "stars",
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    responses(
        (status = 200, description = "The picked star", body = Star),
        (status = 401, description = "Not authenticated", body = ApiError),
        (status = 404, description = "Catalog is empty", body = ApiError)
    )
)]
pub(crate) async fn random_star(
    State(state): State<Arc<StarState>>,
    AuthSession(_session): AuthSession,
) -> ApiResult<Json<Star>> {
    let star = services::pick_random_star(state.store.as_ref(), CacheScope::Global).await?;
    Ok(Json(star))
}

// ============================================================================
// MUTATION HANDLERS
// ============================================================================

/// Create a star.
#[utoipa::path(
    post,
    path = "/api/v1/stars",
    tag = "stars",
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    request_body = CreateStarRequest,
    responses(
        (status = 201, description = "Star created", body = Star),
        (status = 400, description = "Invalid name or tier", body = ApiError),
        (status = 409, description = "Name already taken", body = ApiError)
    )
)]
pub(crate) async fn create_star(
    State(state): State<Arc<StarState>>,
    AuthSession(session): AuthSession,
    Json(request): Json<CreateStarRequest>,
) -> ApiResult<(StatusCode, Json<Star>)> {
    let name = validate_star_name(&request.name)?;
    let tier = validate_tier(request.tier)?;

    let star = state.store.star_create(name, tier).await?;
    tracing::info!(star_id = %star.star_id, name = %star.name, by = %session.username, "Star created");
    Ok((StatusCode::CREATED, Json(star)))
}

/// Overwrite a star's name and tier.
#[utoipa::path(
    put,
    path = "/api/v1/stars/{star_id}",
    tag = "stars",
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    params(("star_id" = String, Path, description = "Star ID")),
    request_body = UpdateStarRequest,
    responses(
        (status = 200, description = "Star updated", body = Star),
        (status = 404, description = "Star not found", body = ApiError),
        (status = 409, description = "Name already taken", body = ApiError)
    )
)]
pub(crate) async fn update_star(
    State(state): State<Arc<StarState>>,
    AuthSession(_session): AuthSession,
    Path(star_id): Path<StarId>,
    Json(request): Json<UpdateStarRequest>,
) -> ApiResult<Json<Star>> {
    let name = validate_star_name(&request.name)?;
    let tier = validate_tier(request.tier)?;

    let star = state.store.star_update(star_id, name, tier).await?;
    Ok(Json(star))
}

/// Delete a star.
#[utoipa::path(
    delete,
    path = "/api/v1/stars/{star_id}",
    tag = "stars",
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    params(("star_id" = String, Path, description = "Star ID")),
    responses(
        (status = 204, description = "Star deleted"),
        (status = 404, description = "Star not found", body = ApiError)
    )
)]
pub(crate) async fn delete_star(
    State(state): State<Arc<StarState>>,
    AuthSession(_session): AuthSession,
    Path(star_id): Path<StarId>,
) -> ApiResult<StatusCode> {
    state.store.star_delete(star_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// BULK IMPORT HANDLERS
// ============================================================================

/// Bulk-create stars from a JSON array.
#[utoipa::path(
    post,
    path = "/api/v1/stars/bulk",
    tag = "stars",
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    request_body = Vec<StarUpload>,
    responses(
        (status = 200, description = "Empty upload", body = BulkUploadResponse),
        (status = 201, description = "Every row imported", body = BulkUploadResponse),
        (status = 207, description = "Some rows imported", body = BulkUploadResponse),
        (status = 400, description = "No rows imported", body = ApiError)
    )
)]
pub(crate) async fn bulk_create_stars(
    State(state): State<Arc<StarState>>,
    AuthSession(_session): AuthSession,
    Json(rows): Json<Vec<StarUpload>>,
) -> ApiResult<(StatusCode, Json<BulkUploadResponse>)> {
    apply_bulk(state.store.as_ref(), rows).await
}

/// Bulk-create stars from an uploaded CSV file (multipart field `file`).
#[utoipa::path(
    post,
    path = "/api/v1/stars/import",
    tag = "stars",
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    responses(
        (status = 200, description = "No usable rows in the file", body = BulkUploadResponse),
        (status = 201, description = "Every row imported", body = BulkUploadResponse),
        (status = 207, description = "Some rows imported", body = BulkUploadResponse),
        (status = 400, description = "Missing file or no rows imported", body = ApiError)
    )
)]
pub(crate) async fn import_stars_csv(
    State(state): State<Arc<StarState>>,
    AuthSession(_session): AuthSession,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<BulkUploadResponse>)> {
    let mut data = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::invalid_input(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            data = Some(field.bytes().await.map_err(|e| {
                ApiError::invalid_input(format!("Failed to read uploaded file: {}", e))
            })?);
            break;
        }
    }

    let data = data.ok_or_else(|| ApiError::missing_field("file"))?;
    let rows = services::parse_csv(&data)?;
    apply_bulk(state.store.as_ref(), rows).await
}

/// Shared tail of both bulk paths: import and map the outcome to a status.
async fn apply_bulk(
    store: &dyn AppStore,
    rows: Vec<StarUpload>,
) -> ApiResult<(StatusCode, Json<BulkUploadResponse>)> {
    let outcome = services::import_stars(store, rows).await?;

    if outcome.all_failed() {
        return Err(ApiError::validation_failed("No rows were imported")
            .with_details(serde_json::json!({ "failures": outcome.failures })));
    }

    let status = if outcome.is_empty() {
        // Nothing offered, nothing imported.
        StatusCode::OK
    } else if outcome.is_partial() {
        StatusCode::MULTI_STATUS
    } else {
        StatusCode::CREATED
    };
    Ok((
        status,
        Json(BulkUploadResponse {
            created: outcome.created,
            failures: outcome.failures,
        }),
    ))
}
