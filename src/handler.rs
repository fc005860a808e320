//! HTTP request handlers for the URL shortener API
//!
//! Handlers take validated payloads, call into [`crate::service::LinkService`]
//! or [`crate::auth::AuthService`] and shape the response. All failures are
//! [`crate::error::AppError`]s and render through its `IntoResponse` impl.

use axum::{
    extract::State,
    http::{header::LOCATION, Method, StatusCode, Uri},
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;

use crate::auth::AuthUser;
use crate::error::{AppError, Result};
use crate::extract::{PathParam, ValidJson};
use crate::model::{
    CreateUrlRequest, LinkStats, PublicUser, ShortLink, SignInRequest, SignInResponse,
    SignUpRequest, UpdateUrlRequest,
};
use crate::state::AppState;

/// Creates a new short URL owned by the caller
///
/// # Request Body
///
/// ```json
/// {
///   "longUrl": "https://example.com/very/long/url",
///   "slug": "my-link"  // Optional
/// }
/// ```
///
/// # Response
///
/// - **201 Created** - the stored link
/// - **400 Bad Request** - invalid URL or slug
/// - **409 Conflict** - slug already exists
pub async fn create_short_url(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ValidJson(payload): ValidJson<CreateUrlRequest>,
) -> Result<(StatusCode, Json<ShortLink>)> {
    let link = state.links.create(payload, Some(user.user_id)).await?;
    Ok((StatusCode::CREATED, Json(link)))
}

/// Redirects a short URL to its original destination
///
/// Every successful lookup counts one click.
///
/// # Response
///
/// - **302 Found** - `Location` set to the target URL
/// - **404 Not Found** - unknown slug
pub async fn redirect_url(
    PathParam(slug): PathParam<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    let long_url = state.links.resolve_and_count(&slug).await?;
    Ok((StatusCode::FOUND, [(LOCATION, long_url)]))
}

/// Lists the caller's links, oldest first
pub async fn list_urls(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<ShortLink>>> {
    Ok(Json(state.links.list_for_owner(user.user_id).await?))
}

/// Changes the slug and/or target of a link
///
/// # Response
///
/// - **200 OK** - the updated link
/// - **403 Forbidden** - caller is not the owner
/// - **404 Not Found** - unknown id
/// - **409 Conflict** - new slug already exists
pub async fn update_short_url(
    PathParam(id): PathParam<u64>,
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ValidJson(payload): ValidJson<UpdateUrlRequest>,
) -> Result<Json<ShortLink>> {
    Ok(Json(state.links.update(id, payload, user.user_id).await?))
}

/// Deletes a link; answers 200 with an empty body
pub async fn delete_short_url(
    PathParam(id): PathParam<u64>,
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<StatusCode> {
    state.links.delete(id, user.user_id).await?;
    Ok(StatusCode::OK)
}

pub async fn url_stats(
    PathParam(id): PathParam<u64>,
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<LinkStats>> {
    Ok(Json(state.links.stats(id, user.user_id).await?))
}

pub async fn sign_up(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<SignUpRequest>,
) -> Result<(StatusCode, Json<PublicUser>)> {
    let user = state.auth.sign_up(payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn sign_in(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<SignInRequest>,
) -> Result<(StatusCode, Json<SignInResponse>)> {
    let response = state.auth.sign_in(payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Echoes the authenticated caller
pub async fn validate_token(Extension(user): Extension<AuthUser>) -> impl IntoResponse {
    Json(json!({
        "valid": true,
        "user": user,
    }))
}

/// Answers unmatched routes with the JSON error body
pub async fn route_not_found(method: Method, uri: Uri) -> AppError {
    AppError::NotFound(format!("Cannot {} {}", method, uri.path()))
}
