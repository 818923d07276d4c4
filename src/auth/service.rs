//! Authentication core
//!
//! Orchestrates the credential hasher, token codec, session cache and the
//! persistence and email collaborators to implement registration, login,
//! refresh-token rotation, logout, email verification, password reset, and
//! the resolve-current-user check run on every protected request.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cache::SessionCache;
use crate::database::Database;
use crate::email::EmailSender;
use crate::error::{AuthError, DbError};
use crate::models::{CurrentUser, NewUser, TokenPair, User};

use super::jwt::{TokenCodec, TokenType};
use super::password::{hash_password, verify_password};

/// Registration input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Email address, the canonical subject identity
    pub email: String,

    /// Plaintext password (hashed before it reaches storage)
    pub password: String,

    /// Optional given name
    #[serde(default)]
    pub first_name: Option<String>,

    /// Optional family name
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Authentication core
///
/// All dependencies are injected at construction so tests can substitute
/// fakes without touching process-wide state. Constructed once at the
/// composition root and shared by reference.
pub struct AuthService<D: Database> {
    db: Arc<D>,
    cache: Arc<SessionCache>,
    codec: TokenCodec,
    mailer: Arc<dyn EmailSender>,
    /// Hash verified against when the email is unknown, so both login
    /// failure paths burn equivalent work.
    dummy_hash: String,
}

impl<D: Database> AuthService<D> {
    /// Create a new authentication core
    pub fn new(
        db: Arc<D>,
        cache: Arc<SessionCache>,
        codec: TokenCodec,
        mailer: Arc<dyn EmailSender>,
    ) -> Self {
        let dummy_hash = hash_password("decoy-credential").unwrap_or_default();
        Self {
            db,
            cache,
            codec,
            mailer,
            dummy_hash,
        }
    }

    /// The token codec in use
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// The session cache in use
    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    /// Register a new account
    ///
    /// Fails with [`AuthError::AlreadyRegistered`] when the email is taken.
    /// On success a verification token is issued and handed to the email
    /// collaborator; a send failure is logged and does not fail the
    /// registration.
    pub async fn register(&self, request: RegisterRequest) -> Result<CurrentUser, AuthError> {
        if self.db.email_exists(&request.email).await? {
            return Err(AuthError::AlreadyRegistered);
        }

        let hashed_password = hash_on_worker(request.password).await?;

        let mut new_user = NewUser::new(request.email, hashed_password);
        if let Some(first_name) = request.first_name {
            new_user = new_user.with_first_name(first_name);
        }
        if let Some(last_name) = request.last_name {
            new_user = new_user.with_last_name(last_name);
        }

        let user = match self.db.create_user(&new_user).await {
            Ok(user) => user,
            // Concurrent registration lost the race after the exists check.
            Err(DbError::ConstraintViolation(_)) => return Err(AuthError::AlreadyRegistered),
            Err(e) => return Err(e.into()),
        };

        info!(email = %user.email, id = user.id, "Account registered");
        self.send_verification(&user).await;

        Ok(CurrentUser::from(&user))
    }

    /// Authenticate with email and password and issue a token pair
    ///
    /// The failure is identical for an unknown email and a wrong password.
    /// On success the new refresh token replaces any stored one and the
    /// user cache is warmed.
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, AuthError> {
        let user = match self.db.find_user_by_email(email).await? {
            Some(user) => user,
            None => {
                let _ = verify_on_worker(password.to_string(), self.dummy_hash.clone()).await;
                return Err(AuthError::InvalidCredentials);
            }
        };

        let password_ok =
            verify_on_worker(password.to_string(), user.hashed_password.clone()).await?;
        if !password_ok {
            return Err(AuthError::InvalidCredentials);
        }

        let pair = self.issue_pair(&user.email)?;
        self.db
            .update_refresh_token(user.id, &pair.refresh_token)
            .await?;

        let current = CurrentUser::from(&user);
        self.cache.set_cached_user(&user.email, &current).await;

        info!(email = %user.email, "Login succeeded");
        Ok(pair)
    }

    /// Exchange a refresh token for a new access/refresh pair
    ///
    /// The presented token must equal the account's stored refresh token;
    /// this rejects reuse of a superseded token. The new refresh token
    /// replaces the old one (single-use rotation).
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self
            .codec
            .decode(refresh_token, TokenType::Refresh)
            .map_err(|_| AuthError::InvalidRefreshToken)?;

        let user = self
            .db
            .find_user_by_email(&claims.sub)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        match user.refresh_token.as_deref() {
            Some(stored) if stored == refresh_token => {}
            _ => return Err(AuthError::InvalidRefreshToken),
        }

        let pair = self.issue_pair(&user.email)?;
        self.db
            .update_refresh_token(user.id, &pair.refresh_token)
            .await?;

        Ok(pair)
    }

    /// Log out: revoke the session server-side
    ///
    /// Clears the stored refresh token, invalidates the cached user, and
    /// blacklists the presented access token for its remaining lifetime.
    pub async fn logout(&self, user: &CurrentUser, access_token: &str) -> Result<(), AuthError> {
        self.db.clear_refresh_token(user.id).await?;
        self.cache.invalidate_user(&user.email).await;

        if let Ok(claims) = self.codec.decode(access_token, TokenType::Access) {
            let remaining = claims.exp - Utc::now().timestamp();
            if remaining > 0 {
                // TTL at least the remaining lifetime, so the marker
                // outlives the token.
                self.cache
                    .blacklist_token(access_token, StdDuration::from_secs(remaining as u64 + 1))
                    .await;
            }
        }

        info!(email = %user.email, "Logout");
        Ok(())
    }

    /// Resolve the principal behind a bearer token
    ///
    /// Sequential gates, short-circuiting on the first failure:
    /// 1. the token must not be blacklisted,
    /// 2. it must decode as a live access token,
    /// 3. it must not predate the account's last password change,
    /// 4. a cached snapshot short-circuits persistence,
    /// 5. otherwise the account is loaded and the cache populated.
    pub async fn resolve_current_user(&self, token: &str) -> Result<CurrentUser, AuthError> {
        if self.cache.is_token_blacklisted(token).await {
            return Err(AuthError::TokenRevoked);
        }

        let claims = self
            .codec
            .decode(token, TokenType::Access)
            .map_err(|_| AuthError::InvalidCredentials)?;

        if let (Some(changed_at), Some(iat)) = (
            self.cache.password_change_time(&claims.sub).await,
            claims.iat,
        ) {
            let issued_at =
                DateTime::from_timestamp(iat, 0).ok_or(AuthError::InvalidCredentials)?;
            if issued_at < changed_at {
                return Err(AuthError::PasswordChanged);
            }
        }

        if let Some(user) = self.cache.get_cached_user(&claims.sub).await {
            return Ok(user);
        }

        let user = self
            .db
            .find_user_by_email(&claims.sub)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let current = CurrentUser::from(&user);
        self.cache.set_cached_user(&user.email, &current).await;

        Ok(current)
    }

    /// Confirm an email address from a verification token
    pub async fn verify_email(&self, token: &str) -> Result<CurrentUser, AuthError> {
        let claims = self
            .codec
            .decode(token, TokenType::EmailVerification)
            .map_err(|_| AuthError::InvalidToken)?;

        let user = self
            .db
            .confirm_email(&claims.sub)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        self.cache.invalidate_user(&user.email).await;

        info!(email = %user.email, "Email verified");
        Ok(CurrentUser::from(&user))
    }

    /// Re-send the verification email
    ///
    /// Always succeeds with a generic outcome: whether the account exists
    /// or is already confirmed is not disclosed.
    pub async fn resend_verification(&self, email: &str) -> Result<(), AuthError> {
        if let Some(user) = self.db.find_user_by_email(email).await? {
            if !user.is_confirmed {
                self.send_verification(&user).await;
            }
        }
        Ok(())
    }

    /// Start a password reset
    ///
    /// Always succeeds with a generic outcome regardless of whether the
    /// account exists; a reset token is issued and mailed only when it does.
    pub async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        if let Some(user) = self.db.find_user_by_email(email).await? {
            match self.codec.issue(&user.email, TokenType::PasswordReset) {
                Ok(token) => {
                    if let Err(e) = self
                        .mailer
                        .send_password_reset_email(&user.email, user.display_name(), &token)
                        .await
                    {
                        warn!(email = %user.email, error = %e, "Failed to send password reset email");
                    }
                }
                Err(e) => {
                    warn!(email = %user.email, error = %e, "Failed to issue password reset token");
                }
            }
        }
        Ok(())
    }

    /// Complete a password reset from a reset token
    ///
    /// Stores the new hash, clears the stored refresh token (forcing a
    /// re-login everywhere), invalidates the cached user, and records the
    /// password-change instant — the step that retroactively revokes every
    /// access token issued before the reset.
    pub async fn confirm_password_reset(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let claims = self
            .codec
            .decode(token, TokenType::PasswordReset)
            .map_err(|_| AuthError::InvalidToken)?;

        let hashed_password = hash_on_worker(new_password.to_string()).await?;

        let user = self
            .db
            .reset_password(&claims.sub, &hashed_password)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        self.cache.invalidate_user(&user.email).await;
        self.cache.record_password_change(&user.email).await;

        info!(email = %user.email, "Password reset");
        Ok(())
    }

    /// Update the account's avatar reference
    pub async fn update_avatar(
        &self,
        user: &CurrentUser,
        avatar_url: &str,
    ) -> Result<CurrentUser, AuthError> {
        let updated = self
            .db
            .update_avatar(user.id, avatar_url)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        // Invalidate only after the row is committed, so a concurrent
        // reader cannot re-cache the old snapshot afterwards.
        self.cache.invalidate_user(&updated.email).await;

        Ok(CurrentUser::from(&updated))
    }

    fn issue_pair(&self, email: &str) -> Result<TokenPair, AuthError> {
        let access = self
            .codec
            .issue(email, TokenType::Access)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        let refresh = self
            .codec
            .issue(email, TokenType::Refresh)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        Ok(TokenPair::bearer(access, refresh))
    }

    async fn send_verification(&self, user: &User) {
        let token = match self.codec.issue(&user.email, TokenType::EmailVerification) {
            Ok(token) => token,
            Err(e) => {
                warn!(email = %user.email, error = %e, "Failed to issue verification token");
                return;
            }
        };

        if let Err(e) = self
            .mailer
            .send_verification_email(&user.email, user.display_name(), &token)
            .await
        {
            warn!(email = %user.email, error = %e, "Failed to send verification email");
        }
    }
}

/// Run a password hash on the blocking pool
///
/// Hashing is CPU-bound and must not stall the async scheduler.
async fn hash_on_worker(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AuthError::Internal(format!("hashing task failed: {}", e)))?
        .map_err(|e| AuthError::Internal(e.to_string()))
}

/// Run a password verification on the blocking pool
async fn verify_on_worker(password: String, hash: String) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AuthError::Internal(format!("hashing task failed: {}", e)))
}
