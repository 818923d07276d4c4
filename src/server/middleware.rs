//! HTTP middleware for contacts-api
//!
//! This module provides middleware layers for:
//! - Bearer-token authentication (resolving the current user)
//! - Request/response logging

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

use crate::auth::AuthService;
use crate::database::Database;
use crate::models::CurrentUser;

use super::router::ApiError;

/// Paths that should skip authentication
///
/// Everything under these prefixes is either public by design (register,
/// login, the token-driven flows) or operational (health).
const AUTH_SKIP_PATHS: &[&str] = &[
    "/health",
    "/auth/register",
    "/auth/login",
    "/auth/refresh",
    "/auth/verify-email",
    "/auth/resend-verification",
    "/auth/reset-password-request",
    "/auth/reset-password-confirm",
];

/// Authenticated user extension for requests
#[derive(Clone, Debug)]
pub struct AuthenticatedUser(pub CurrentUser);

/// Raw bearer token extension for requests
///
/// Logout needs the presented token back to blacklist it.
#[derive(Clone, Debug)]
pub struct BearerToken(pub String);

/// Authentication middleware function
///
/// This middleware:
/// 1. Checks if the path should skip authentication
/// 2. Extracts the Authorization header
/// 3. Resolves the current user through the authentication core
/// 4. Adds the user and the raw token to the request extensions
pub async fn auth_middleware<D: Database + 'static>(
    State(auth): State<Arc<AuthService<D>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let path = request.uri().path();

    // Skip authentication for public paths
    if AUTH_SKIP_PATHS.iter().any(|p| path.starts_with(p)) {
        return Ok(next.run(request).await);
    }

    // Get authorization header
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let token = match auth_header {
        Some(header) if header.starts_with("Bearer ") => {
            header.trim_start_matches("Bearer ").to_string()
        }
        Some(_) => return Err(ApiError::unsupported_scheme()),
        None => return Err(ApiError::missing_auth()),
    };

    let user = auth.resolve_current_user(&token).await?;

    // Add the resolved user and raw token to request extensions
    request.extensions_mut().insert(AuthenticatedUser(user));
    request.extensions_mut().insert(BearerToken(token));

    Ok(next.run(request).await)
}

/// Logging middleware function
///
/// Logs request and response details including:
/// - Method and path
/// - Status code
/// - Response time
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    let status = response.status();

    tracing::info!(
        method = %method,
        path = %uri.path(),
        status = %status.as_u16(),
        duration_ms = %elapsed.as_millis(),
        "Request completed"
    );

    response
}
