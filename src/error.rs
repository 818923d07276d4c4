//! Application error types for contacts-api
//!
//! This module defines common error types used throughout the application.
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

use crate::models::UserRole;

/// Authentication and authorization errors
///
/// Variants carry the internal failure reason; the HTTP layer maps the
/// credential-shaped ones to a uniform 401 so callers cannot distinguish
/// which precondition failed.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Duplicate email on registration
    #[error("Email already registered")]
    AlreadyRegistered,

    /// Bad credentials, or bad/expired/unknown-subject access token
    #[error("Could not validate credentials")]
    InvalidCredentials,

    /// Access token explicitly revoked via the blacklist
    #[error("Token has been revoked")]
    TokenRevoked,

    /// Access token issued before the account's last password change
    #[error("Token invalidated due to password change")]
    PasswordChanged,

    /// Refresh token failed decode or does not match the stored value
    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    /// Email-verification or password-reset token failed decode
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Token was valid but the referenced account no longer exists
    #[error("User not found")]
    UserNotFound,

    /// Resolved user does not hold the required role
    #[error("Access denied. {0} role required.")]
    RoleRequired(UserRole),

    /// Persistence failure
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Unexpected internal failure (hashing worker, task join)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Token codec errors
///
/// Decode failures are deliberately collapsed into a single variant:
/// signature, structure, expiry and type mismatches must be
/// indistinguishable to callers.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Signature invalid, token malformed, expired, or wrong type
    #[error("Invalid token")]
    Invalid,

    /// Token could not be signed
    #[error("Failed to encode token: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),
}

/// Password hashing errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HashError {
    /// Hashing failed
    #[error("Hash failed: {0}")]
    HashFailed(String),
}

/// Cache-related errors
///
/// These never escape the session cache: they are converted to the
/// documented fail-open defaults inside `SessionCache`.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Backend command or connection failure
    #[error("Cache backend error: {0}")]
    Backend(#[from] redis::RedisError),

    /// Backend unreachable
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    /// Serialization error for a cached value
    #[error("Cache serialization error: {0}")]
    Serialization(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DbError {
    /// SQLite error
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection task error
    #[error("Database connection error: {0}")]
    Connection(#[from] tokio_rusqlite::Error),

    /// Record not found
    #[error("Record not found")]
    NotFound,

    /// Constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Email delivery errors
///
/// Delivery is fire-and-forget: these are logged by the caller and never
/// roll back the state change that triggered the send.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EmailError {
    /// Message could not be handed to the transport
    #[error("Email delivery failed: {0}")]
    Delivery(String),
}

/// Application-level error type
///
/// Aggregates all domain-specific error types; used at the binary boundary.
#[derive(Debug, Error)]
pub enum AppError {
    /// Authentication error
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// Cache error
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Malformed input shape
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test 1: AuthError message formatting
    #[test]
    fn test_auth_error_messages() {
        assert_eq!(
            AuthError::AlreadyRegistered.to_string(),
            "Email already registered"
        );
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "Could not validate credentials"
        );
        assert_eq!(
            AuthError::TokenRevoked.to_string(),
            "Token has been revoked"
        );
        assert_eq!(
            AuthError::PasswordChanged.to_string(),
            "Token invalidated due to password change"
        );
        assert_eq!(
            AuthError::InvalidRefreshToken.to_string(),
            "Invalid refresh token"
        );
        assert_eq!(AuthError::UserNotFound.to_string(), "User not found");
    }

    // Test 2: RoleRequired interpolates the role name
    #[test]
    fn test_role_required_message() {
        assert_eq!(
            AuthError::RoleRequired(UserRole::Admin).to_string(),
            "Access denied. admin role required."
        );
        assert_eq!(
            AuthError::RoleRequired(UserRole::User).to_string(),
            "Access denied. user role required."
        );
    }

    // Test 3: TokenError decode failures share one message
    #[test]
    fn test_token_error_uniform_message() {
        assert_eq!(TokenError::Invalid.to_string(), "Invalid token");
    }

    // Test 4: From trait conversion for AuthError
    #[test]
    fn test_auth_error_from_db_error() {
        let db_err = DbError::NotFound;
        let auth_err: AuthError = db_err.into();

        match auth_err {
            AuthError::Database(DbError::NotFound) => (),
            _ => panic!("Expected AuthError::Database(DbError::NotFound)"),
        }
    }

    // Test 5: DbError messages
    #[test]
    fn test_db_error_messages() {
        assert_eq!(DbError::NotFound.to_string(), "Record not found");
        assert_eq!(
            DbError::ConstraintViolation("users.email".to_string()).to_string(),
            "Constraint violation: users.email"
        );
    }

    // Test 6: DbError from rusqlite::Error
    #[test]
    fn test_db_error_from_sqlite() {
        let sqlite_err = rusqlite::Error::InvalidParameterName("test".to_string());
        let db_err: DbError = sqlite_err.into();

        match db_err {
            DbError::Sqlite(_) => (),
            _ => panic!("Expected DbError::Sqlite"),
        }
    }

    // Test 7: CacheError variants
    #[test]
    fn test_cache_error_messages() {
        assert_eq!(
            CacheError::Unavailable("connection refused".to_string()).to_string(),
            "Cache unavailable: connection refused"
        );
        assert_eq!(
            CacheError::Serialization("bad json".to_string()).to_string(),
            "Cache serialization error: bad json"
        );
    }

    // Test 8: EmailError message
    #[test]
    fn test_email_error_message() {
        assert_eq!(
            EmailError::Delivery("smtp timeout".to_string()).to_string(),
            "Email delivery failed: smtp timeout"
        );
    }

    // Test 9: AppError display includes source error
    #[test]
    fn test_app_error_display() {
        let app_err = AppError::Auth(AuthError::InvalidCredentials);
        assert_eq!(
            app_err.to_string(),
            "Authentication failed: Could not validate credentials"
        );

        let app_err = AppError::Validation("days must be within 1..=365".to_string());
        assert_eq!(
            app_err.to_string(),
            "Validation failed: days must be within 1..=365"
        );
    }

    // Test 10: AppError Config and Internal variants
    #[test]
    fn test_app_error_config_and_internal() {
        let config_err = AppError::Config("missing secret_key".to_string());
        assert_eq!(
            config_err.to_string(),
            "Configuration error: missing secret_key"
        );

        let internal_err = AppError::Internal("unexpected state".to_string());
        assert_eq!(internal_err.to_string(), "Internal error: unexpected state");
    }

    // Test 11: HashError Clone and PartialEq
    #[test]
    fn test_hash_error_clone_and_eq() {
        let err1 = HashError::HashFailed("salt".to_string());
        let err2 = err1.clone();
        assert_eq!(err1, err2);
    }
}
