//! HTTP router for contacts-api
//!
//! This module defines the axum router for the authentication surface:
//! registration, login, refresh, logout, email verification, password
//! reset, and the current-user endpoint. Contact CRUD mounts beside these
//! routes and consumes the same resolved user.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, patch, post},
    Extension, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::{guard, AuthService, RegisterRequest};
use crate::database::Database;
use crate::error::AuthError;
use crate::models::{CurrentUser, TokenPair};

use super::middleware::{auth_middleware, AuthenticatedUser, BearerToken};

/// Shared application state
pub struct AppState<D: Database> {
    /// Authentication core
    pub auth: Arc<AuthService<D>>,
}

impl<D: Database> Clone for AppState<D> {
    fn clone(&self) -> Self {
        Self {
            auth: Arc::clone(&self.auth),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Generic message response
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Login input
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Refresh input
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Email-only input (resend verification, reset request)
#[derive(Debug, Serialize, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

/// Password reset confirmation input
#[derive(Debug, Serialize, Deserialize)]
pub struct ResetConfirmRequest {
    pub token: String,
    pub new_password: String,
}

/// Avatar update input
#[derive(Debug, Serialize, Deserialize)]
pub struct AvatarRequest {
    pub avatar_url: String,
}

/// Error response produced by handlers and the auth middleware
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub(crate) fn missing_auth() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: "Missing authorization header".to_string(),
        }
    }

    pub(crate) fn unsupported_scheme() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: "Unsupported authentication scheme".to_string(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        let status = match &error {
            AuthError::AlreadyRegistered => StatusCode::CONFLICT,
            AuthError::InvalidCredentials
            | AuthError::TokenRevoked
            | AuthError::PasswordChanged
            | AuthError::InvalidRefreshToken => StatusCode::UNAUTHORIZED,
            AuthError::InvalidToken => StatusCode::BAD_REQUEST,
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
            AuthError::RoleRequired(_) => StatusCode::FORBIDDEN,
            AuthError::Database(_) | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Server-side failures are not echoed back to the client.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %error, "Internal error");
            "Internal server error".to_string()
        } else {
            error.to_string()
        };

        Self { status, message }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message
        });
        (self.status, Json(body)).into_response()
    }
}

/// Build the main application router
///
/// # Arguments
///
/// * `state` - Application state containing the authentication core
///
/// # Returns
///
/// An axum Router configured with all endpoints
pub fn build_router<D: Database + 'static>(state: AppState<D>) -> Router {
    Router::new()
        // Health endpoint (no auth required)
        .route("/health", get(health_handler))
        // Public authentication endpoints
        .route("/auth/register", post(register_handler::<D>))
        .route("/auth/login", post(login_handler::<D>))
        .route("/auth/refresh", post(refresh_handler::<D>))
        .route("/auth/verify-email/:token", get(verify_email_handler::<D>))
        .route(
            "/auth/resend-verification",
            post(resend_verification_handler::<D>),
        )
        .route(
            "/auth/reset-password-request",
            post(reset_password_request_handler::<D>),
        )
        .route(
            "/auth/reset-password-confirm",
            post(reset_password_confirm_handler::<D>),
        )
        // Protected endpoints
        .route("/auth/logout", post(logout_handler::<D>))
        .route("/auth/me", get(me_handler))
        .route("/auth/avatar", patch(avatar_handler::<D>))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state.auth),
            auth_middleware::<D>,
        ))
        .with_state(state)
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint handler
async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Register a new account
async fn register_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<CurrentUser>), ApiError> {
    let user = state.auth.register(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Log in and receive an access/refresh token pair
async fn login_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let pair = state.auth.login(&request.email, &request.password).await?;
    Ok(Json(pair))
}

/// Exchange a refresh token for a new pair
async fn refresh_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let pair = state.auth.refresh(&request.refresh_token).await?;
    Ok(Json(pair))
}

/// Log out the current session
async fn logout_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    Extension(BearerToken(token)): Extension<BearerToken>,
) -> Result<StatusCode, ApiError> {
    state.auth.logout(&user, &token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Confirm an email address
async fn verify_email_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Path(token): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.auth.verify_email(&token).await?;
    Ok(Json(MessageResponse {
        message: "Email verified successfully".to_string(),
    }))
}

/// Re-send the verification email
async fn resend_verification_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Json(request): Json<EmailRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.auth.resend_verification(&request.email).await?;
    // Same payload whether or not the account exists.
    Ok(Json(MessageResponse {
        message: "If the address is registered and unverified, a new link has been sent"
            .to_string(),
    }))
}

/// Start a password reset
async fn reset_password_request_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Json(request): Json<EmailRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.auth.request_password_reset(&request.email).await?;
    // Same payload whether or not the account exists.
    Ok(Json(MessageResponse {
        message: "If the address is registered, a reset link has been sent".to_string(),
    }))
}

/// Complete a password reset
async fn reset_password_confirm_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Json(request): Json<ResetConfirmRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .auth
        .confirm_password_reset(&request.token, &request.new_password)
        .await?;
    Ok(Json(MessageResponse {
        message: "Password updated successfully".to_string(),
    }))
}

/// Return the resolved current user
async fn me_handler(
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
) -> Json<CurrentUser> {
    Json(user)
}

/// Update the current user's avatar (admin only)
async fn avatar_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    Json(request): Json<AvatarRequest>,
) -> Result<Json<CurrentUser>, ApiError> {
    guard::require_admin(&user)?;
    let updated = state.auth.update_avatar(&user, &request.avatar_url).await?;
    Ok(Json(updated))
}
