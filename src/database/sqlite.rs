//! SQLite implementation of the Database trait
//!
//! This module provides a SQLite-based implementation of the Database trait
//! using rusqlite and tokio-rusqlite for async operations.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use super::migrations::CREATE_SCHEMA;
use super::Database;
use crate::error::DbError;
use crate::models::{NewUser, User, UserRole};

/// Column list shared by every user query
const USER_COLUMNS: &str =
    "id, email, first_name, last_name, hashed_password, role, is_confirmed, avatar, refresh_token, created_at";

/// SQLite database implementation
pub struct SqliteDatabase {
    conn: Connection,
}

impl SqliteDatabase {
    /// Create a new SQLite database connection
    ///
    /// Use `:memory:` for an in-memory database or a file path for
    /// persistent storage. The initial schema is applied at open.
    pub async fn new(path: &str) -> Result<Self, DbError> {
        let conn = Connection::open(path).await?;

        conn.call(|conn| {
            conn.execute_batch(CREATE_SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    /// Create a new in-memory database (useful for testing)
    pub async fn in_memory() -> Result<Self, DbError> {
        Self::new(":memory:").await
    }
}

/// Map a SELECT row to a User
fn map_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        hashed_password: row.get(4)?,
        role: row
            .get::<_, String>(5)?
            .parse::<UserRole>()
            .unwrap_or_default(),
        is_confirmed: row.get::<_, i64>(6)? != 0,
        avatar: row.get(7)?,
        refresh_token: row.get(8)?,
        created_at: parse_datetime(row.get::<_, Option<String>>(9)?),
    })
}

/// Parse a stored timestamp, accepting RFC 3339 and SQLite's default format
fn parse_datetime(raw: Option<String>) -> DateTime<Utc> {
    let Some(raw) = raw else {
        return Utc::now();
    };

    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S").map(|dt| dt.and_utc())
        })
        .unwrap_or_else(|_| Utc::now())
}

/// Translate a unique-constraint failure into DbError::ConstraintViolation
fn map_insert_error(err: tokio_rusqlite::Error) -> DbError {
    if let tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(code, ref message)) = err
    {
        if code.code == rusqlite::ErrorCode::ConstraintViolation {
            return DbError::ConstraintViolation(
                message.clone().unwrap_or_else(|| "unique".to_string()),
            );
        }
    }
    err.into()
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn create_user(&self, new_user: &NewUser) -> Result<User, DbError> {
        let email = new_user.email.clone();
        let first_name = new_user.first_name.clone();
        let last_name = new_user.last_name.clone();
        let hashed_password = new_user.hashed_password.clone();
        let created_at = Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO users (email, first_name, last_name, hashed_password, role, is_confirmed, created_at)
                    VALUES (?1, ?2, ?3, ?4, 'user', 0, ?5)
                    "#,
                    rusqlite::params![email, first_name, last_name, hashed_password, created_at],
                )?;

                let id = conn.last_insert_rowid();
                let user = conn.query_row(
                    &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
                    [id],
                    map_user_row,
                )?;

                Ok(user)
            })
            .await
            .map_err(map_insert_error)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        let email = email.to_string();

        self.conn
            .call(move |conn| {
                let user = conn
                    .query_row(
                        &format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS),
                        [&email],
                        map_user_row,
                    )
                    .optional()?;

                Ok(user)
            })
            .await
            .map_err(Into::into)
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, DbError> {
        self.conn
            .call(move |conn| {
                let user = conn
                    .query_row(
                        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
                        [id],
                        map_user_row,
                    )
                    .optional()?;

                Ok(user)
            })
            .await
            .map_err(Into::into)
    }

    async fn email_exists(&self, email: &str) -> Result<bool, DbError> {
        let email = email.to_string();

        self.conn
            .call(move |conn| {
                let exists = conn
                    .query_row(
                        "SELECT 1 FROM users WHERE email = ?1 LIMIT 1",
                        [&email],
                        |_| Ok(()),
                    )
                    .optional()?
                    .is_some();

                Ok(exists)
            })
            .await
            .map_err(Into::into)
    }

    async fn update_refresh_token(&self, id: i64, refresh_token: &str) -> Result<(), DbError> {
        let refresh_token = refresh_token.to_string();

        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE users SET refresh_token = ?1 WHERE id = ?2",
                    rusqlite::params![refresh_token, id],
                )?;
                Ok(())
            })
            .await?;

        Ok(())
    }

    async fn clear_refresh_token(&self, id: i64) -> Result<(), DbError> {
        self.conn
            .call(move |conn| {
                conn.execute("UPDATE users SET refresh_token = NULL WHERE id = ?1", [id])?;
                Ok(())
            })
            .await?;

        Ok(())
    }

    async fn confirm_email(&self, email: &str) -> Result<Option<User>, DbError> {
        let email = email.to_string();

        self.conn
            .call(move |conn| {
                let affected = conn.execute(
                    "UPDATE users SET is_confirmed = 1 WHERE email = ?1",
                    [&email],
                )?;
                if affected == 0 {
                    return Ok(None);
                }

                let user = conn
                    .query_row(
                        &format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS),
                        [&email],
                        map_user_row,
                    )
                    .optional()?;

                Ok(user)
            })
            .await
            .map_err(Into::into)
    }

    async fn update_avatar(&self, id: i64, avatar_url: &str) -> Result<Option<User>, DbError> {
        let avatar_url = avatar_url.to_string();

        self.conn
            .call(move |conn| {
                let affected = conn.execute(
                    "UPDATE users SET avatar = ?1 WHERE id = ?2",
                    rusqlite::params![avatar_url, id],
                )?;
                if affected == 0 {
                    return Ok(None);
                }

                let user = conn
                    .query_row(
                        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
                        [id],
                        map_user_row,
                    )
                    .optional()?;

                Ok(user)
            })
            .await
            .map_err(Into::into)
    }

    async fn reset_password(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> Result<Option<User>, DbError> {
        let email = email.to_string();
        let hashed_password = hashed_password.to_string();

        self.conn
            .call(move |conn| {
                // Clearing the refresh token in the same statement forces a
                // re-login on every device once the reset lands.
                let affected = conn.execute(
                    "UPDATE users SET hashed_password = ?1, refresh_token = NULL WHERE email = ?2",
                    rusqlite::params![hashed_password, email],
                )?;
                if affected == 0 {
                    return Ok(None);
                }

                let user = conn
                    .query_row(
                        &format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS),
                        [&email],
                        map_user_row,
                    )
                    .optional()?;

                Ok(user)
            })
            .await
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> SqliteDatabase {
        SqliteDatabase::in_memory().await.unwrap()
    }

    fn alice() -> NewUser {
        NewUser::new("alice@example.com", "$argon2id$hash").with_first_name("Alice")
    }

    // Test 1: create_user returns the stored row with defaults applied
    #[tokio::test]
    async fn test_create_user() {
        let db = test_db().await;

        let user = db.create_user(&alice()).await.unwrap();

        assert!(user.id > 0);
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.first_name, Some("Alice".to_string()));
        assert_eq!(user.role, UserRole::User);
        assert!(!user.is_confirmed);
        assert!(user.refresh_token.is_none());
    }

    // Test 2: duplicate email is a constraint violation
    #[tokio::test]
    async fn test_create_user_duplicate_email() {
        let db = test_db().await;

        db.create_user(&alice()).await.unwrap();
        let result = db.create_user(&alice()).await;

        assert!(matches!(result, Err(DbError::ConstraintViolation(_))));
    }

    // Test 3: email is case-sensitive
    #[tokio::test]
    async fn test_email_case_sensitive() {
        let db = test_db().await;
        db.create_user(&alice()).await.unwrap();

        assert!(db
            .find_user_by_email("alice@example.com")
            .await
            .unwrap()
            .is_some());
        assert!(db
            .find_user_by_email("Alice@example.com")
            .await
            .unwrap()
            .is_none());
    }

    // Test 4: find_user_by_id and email_exists
    #[tokio::test]
    async fn test_lookups() {
        let db = test_db().await;
        let created = db.create_user(&alice()).await.unwrap();

        let by_id = db.find_user_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, created.email);

        assert!(db.email_exists("alice@example.com").await.unwrap());
        assert!(!db.email_exists("ghost@example.com").await.unwrap());
        assert!(db.find_user_by_id(9999).await.unwrap().is_none());
    }

    // Test 5: refresh token overwrite and clear
    #[tokio::test]
    async fn test_refresh_token_lifecycle() {
        let db = test_db().await;
        let user = db.create_user(&alice()).await.unwrap();

        db.update_refresh_token(user.id, "first").await.unwrap();
        let stored = db.find_user_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_token, Some("first".to_string()));

        // A second write overwrites: at most one live refresh token.
        db.update_refresh_token(user.id, "second").await.unwrap();
        let stored = db.find_user_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_token, Some("second".to_string()));

        db.clear_refresh_token(user.id).await.unwrap();
        let stored = db.find_user_by_id(user.id).await.unwrap().unwrap();
        assert!(stored.refresh_token.is_none());
    }

    // Test 6: confirm_email flips the flag
    #[tokio::test]
    async fn test_confirm_email() {
        let db = test_db().await;
        db.create_user(&alice()).await.unwrap();

        let user = db
            .confirm_email("alice@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(user.is_confirmed);

        assert!(db
            .confirm_email("ghost@example.com")
            .await
            .unwrap()
            .is_none());
    }

    // Test 7: update_avatar
    #[tokio::test]
    async fn test_update_avatar() {
        let db = test_db().await;
        let user = db.create_user(&alice()).await.unwrap();

        let updated = db
            .update_avatar(user.id, "https://cdn.example.com/a.png")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            updated.avatar,
            Some("https://cdn.example.com/a.png".to_string())
        );

        assert!(db.update_avatar(9999, "x").await.unwrap().is_none());
    }

    // Test 8: reset_password swaps the hash and clears the refresh token
    #[tokio::test]
    async fn test_reset_password() {
        let db = test_db().await;
        let user = db.create_user(&alice()).await.unwrap();
        db.update_refresh_token(user.id, "live-session").await.unwrap();

        let updated = db
            .reset_password("alice@example.com", "$argon2id$new")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.hashed_password, "$argon2id$new");
        assert!(updated.refresh_token.is_none());

        assert!(db
            .reset_password("ghost@example.com", "$argon2id$new")
            .await
            .unwrap()
            .is_none());
    }

    // Test 9: stored timestamps parse back
    #[tokio::test]
    async fn test_created_at_round_trip() {
        let db = test_db().await;
        let before = Utc::now() - chrono::Duration::seconds(1);

        let user = db.create_user(&alice()).await.unwrap();

        assert!(user.created_at >= before);
        assert!(user.created_at <= Utc::now() + chrono::Duration::seconds(1));
    }

    // Test 10: parse_datetime accepts both stored formats
    #[test]
    fn test_parse_datetime_formats() {
        let rfc = parse_datetime(Some("2025-06-01T12:30:00+00:00".to_string()));
        assert_eq!(rfc.to_rfc3339(), "2025-06-01T12:30:00+00:00");

        let sqlite = parse_datetime(Some("2025-06-01 12:30:00".to_string()));
        assert_eq!(sqlite.to_rfc3339(), "2025-06-01T12:30:00+00:00");
    }

    // Test 11: retired role values fall back to the default role
    #[tokio::test]
    async fn test_retired_role_reads_as_user() {
        let db = test_db().await;
        let user = db.create_user(&alice()).await.unwrap();

        db.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE users SET role = 'manager' WHERE id = ?1",
                    [user.id],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let stored = db
            .find_user_by_email("alice@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.role, UserRole::User);
    }
}
