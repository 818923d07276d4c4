//! User-related domain models
//!
//! This module defines the persisted account record, the resolved principal
//! attached to authenticated requests, and the token pair returned by login
//! and refresh.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a registered account
///
/// Exact-match set, no hierarchy: `Admin` does not imply `User`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Regular account (default at registration)
    #[default]
    User,
    /// Administrative account
    Admin,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::User => write!(f, "user"),
            UserRole::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(UserRole::User),
            "admin" => Ok(UserRole::Admin),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// Registered account as stored in the database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique account ID
    pub id: i64,

    /// Unique, case-sensitive email (the canonical subject identity)
    pub email: String,

    /// Optional given name
    pub first_name: Option<String>,

    /// Optional family name
    pub last_name: Option<String>,

    /// Argon2id password hash (PHC format), never the plaintext
    pub hashed_password: String,

    /// Account role
    pub role: UserRole,

    /// Whether the email address has been verified
    pub is_confirmed: bool,

    /// Optional avatar URL
    pub avatar: Option<String>,

    /// Currently valid refresh token, if any
    ///
    /// At most one live refresh token per account: every login and refresh
    /// overwrites this value, silently invalidating the previous one.
    pub refresh_token: Option<String>,

    /// When the account was created
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Name used when addressing the user in emails
    pub fn display_name(&self) -> &str {
        match &self.first_name {
            Some(name) if !name.is_empty() => name,
            _ => &self.email,
        }
    }
}

/// Fields required to create a new account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    /// Email address
    pub email: String,

    /// Optional given name
    pub first_name: Option<String>,

    /// Optional family name
    pub last_name: Option<String>,

    /// Pre-hashed password
    pub hashed_password: String,
}

impl NewUser {
    /// Create a new-account record
    pub fn new(email: impl Into<String>, hashed_password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            first_name: None,
            last_name: None,
            hashed_password: hashed_password.into(),
        }
    }

    /// Set the given name
    pub fn with_first_name(mut self, first_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self
    }

    /// Set the family name
    pub fn with_last_name(mut self, last_name: impl Into<String>) -> Self {
        self.last_name = Some(last_name.into());
        self
    }
}

/// Resolved principal attached to authenticated requests
///
/// Carries everything handlers need and nothing they must not see: the
/// password hash and the stored refresh token stay in the database row.
/// This is also the shape cached by the session cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Account ID
    pub id: i64,

    /// Email address
    pub email: String,

    /// Optional given name
    pub first_name: Option<String>,

    /// Optional family name
    pub last_name: Option<String>,

    /// Account role
    pub role: UserRole,

    /// Whether the email address has been verified
    pub is_confirmed: bool,

    /// Optional avatar URL
    pub avatar: Option<String>,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
            is_confirmed: user.is_confirmed,
            avatar: user.avatar.clone(),
        }
    }
}

impl CurrentUser {
    /// Check whether the user holds the admin role
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Access/refresh token pair returned by login and refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Short-lived access token
    pub access_token: String,

    /// Longer-lived refresh token
    pub refresh_token: String,

    /// Token scheme, always "bearer"
    pub token_type: String,
}

impl TokenPair {
    /// Create a bearer token pair
    pub fn bearer(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            token_type: "bearer".to_string(),
        }
    }
}
