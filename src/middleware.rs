use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, MatchedPath, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::error::AppError;
use crate::state::AppState;

/// Middleware that requires a valid `Authorization: Bearer <token>` header
///
/// On success the caller is inserted into the request extensions as an
/// [`crate::auth::AuthUser`]; otherwise the request is answered with 401.
pub async fn require_auth(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = headers
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Unauthorized".to_string()))?;

    let user = state.auth.verify_token(token)?;
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Identifies the client for throttling: the peer address when the server
/// runs with connect info, else the first `X-Forwarded-For` entry.
fn client_key(request: &Request) -> String {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|ip| ip.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware applying the per-route throttling policy
pub async fn throttle(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let method = request.method().clone();
    let client = client_key(&request);

    let limiter = state.limits.limiter_for(&method, &route);
    if let Err(err) = limiter.check(&format!("{}:{}:{}", client, method, route)) {
        tracing::warn!(%client, %method, %route, "request throttled");
        return Err(err);
    }

    Ok(next.run(request).await)
}
