//! Route definitions for the URL shortener API
//!
//! This module configures all HTTP routes and maps them to their respective handlers.

use axum::http::{header, HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::handler::{
    create_short_url, delete_short_url, list_urls, redirect_url, route_not_found, sign_in,
    sign_up, update_short_url, url_stats, validate_token,
};
use crate::middleware::{require_auth, throttle};
use crate::state::AppState;

/// Creates and configures the Axum application router with all routes
///
/// # Route Definitions
///
/// - `POST /auth/sign-up` - Registers an account
/// - `POST /auth/sign-in` - Exchanges credentials for a bearer token
/// - `GET /auth/validate` - Echoes the authenticated caller
/// - `GET /urls` / `POST /urls` - Lists / creates the caller's links
/// - `PATCH /urls/{id}` / `DELETE /urls/{id}` - Owner-only update / delete
/// - `GET /urls/{id}/stats` - Owner-only click count
/// - `GET /{slug}` - Public redirect, never throttled
///
/// Anything else is answered with a JSON 404.
///
/// Throttling runs before authentication, so unauthenticated floods are
/// limited too.
pub fn create_app(state: AppState) -> Router {
    let protected = Router::new()
        .route("/auth/validate", get(validate_token))
        .route("/urls", get(list_urls).post(create_short_url))
        .route("/urls/{id}", patch(update_short_url).delete(delete_short_url))
        .route("/urls/{id}/stats", get(url_stats))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let public = Router::new()
        .route("/auth/sign-up", post(sign_up))
        .route("/auth/sign-in", post(sign_in));

    Router::new()
        .merge(protected)
        .merge(public)
        .route_layer(from_fn_with_state(state.clone(), throttle))
        // Added after the throttle layer, so redirects are not counted.
        .route("/{slug}", get(redirect_url))
        .fallback(route_not_found)
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) if origin != "*" => Some(value),
            _ => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}
