//! Database layer for contacts-api
//!
//! This module defines the database trait and SQLite implementation.

pub mod migrations;
pub mod sqlite;

pub use sqlite::SqliteDatabase;

use async_trait::async_trait;

use crate::error::DbError;
use crate::models::{NewUser, User};

/// Database trait for account persistence
///
/// This trait defines all persistence operations the authentication core
/// needs. It uses `async_trait` for async methods and `mockall::automock`
/// for testing. The database row is the system of record; the session
/// cache in front of it is advisory.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Database: Send + Sync {
    /// Insert a new account and return the stored row
    ///
    /// Fails with [`DbError::ConstraintViolation`] when the email is taken.
    async fn create_user(&self, new_user: &NewUser) -> Result<User, DbError>;

    /// Look up an account by email
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DbError>;

    /// Look up an account by ID
    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, DbError>;

    /// Check whether an account with this email exists
    async fn email_exists(&self, email: &str) -> Result<bool, DbError>;

    /// Store a new refresh token, overwriting any previous one
    async fn update_refresh_token(&self, id: i64, refresh_token: &str) -> Result<(), DbError>;

    /// Clear the stored refresh token
    async fn clear_refresh_token(&self, id: i64) -> Result<(), DbError>;

    /// Mark an account's email as confirmed
    ///
    /// Returns the updated row, or `None` if no such account exists.
    async fn confirm_email(&self, email: &str) -> Result<Option<User>, DbError>;

    /// Update an account's avatar URL
    ///
    /// Returns the updated row, or `None` if no such account exists.
    async fn update_avatar(&self, id: i64, avatar_url: &str) -> Result<Option<User>, DbError>;

    /// Replace an account's password hash and clear its refresh token
    ///
    /// Returns the updated row, or `None` if no such account exists.
    async fn reset_password(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> Result<Option<User>, DbError>;
}
