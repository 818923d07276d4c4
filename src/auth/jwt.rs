//! Token issuance and verification
//!
//! Signs and verifies the four kinds of tokens used by the authentication
//! core (access, refresh, email verification, password reset) as
//! HMAC-SHA256 JWTs keyed by a single shared secret. A token's `type` claim
//! must match the operation consuming it; a cross-type replay fails decode.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::config::AuthTokenConfig;
use crate::error::TokenError;

/// Kind of token, carried in the `type` claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived credential presented on every protected call
    Access,
    /// Longer-lived credential exchanged for a new token pair
    Refresh,
    /// One-shot token mailed out to confirm an email address
    EmailVerification,
    /// One-shot token mailed out to authorize a password reset
    PasswordReset,
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenType::Access => write!(f, "access"),
            TokenType::Refresh => write!(f, "refresh"),
            TokenType::EmailVerification => write!(f, "email_verification"),
            TokenType::PasswordReset => write!(f, "password_reset"),
        }
    }
}

/// Claims embedded in every issued token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the account email
    pub sub: String,

    /// Absolute expiry (Unix epoch seconds)
    pub exp: i64,

    /// Issued-at (Unix epoch seconds); access tokens only, used for
    /// password-change invalidation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Unique token ID; refresh tokens only
    ///
    /// Two refresh tokens minted in the same second would otherwise be
    /// byte-identical, which would defeat single-use rotation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,

    /// Token kind
    #[serde(rename = "type")]
    pub token_type: TokenType,
}

/// Generate a unique token ID (16 random bytes, URL-safe Base64)
fn generate_token_id() -> String {
    let mut id_bytes = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut id_bytes);
    URL_SAFE_NO_PAD.encode(id_bytes)
}

/// Token codec: issues and verifies all token kinds
///
/// Holds the shared signing secret and the per-kind TTLs. Constructed once
/// at the composition root and shared by reference.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    verification_ttl: Duration,
    reset_ttl: Duration,
}

impl TokenCodec {
    /// Create a codec with the default TTLs
    /// (access 30 min, refresh 7 days, verification 24 h, reset 1 h)
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl: Duration::minutes(30),
            refresh_ttl: Duration::days(7),
            verification_ttl: Duration::hours(24),
            reset_ttl: Duration::hours(1),
        }
    }

    /// Create a codec from application configuration
    pub fn from_config(config: &AuthTokenConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret_key.as_bytes()),
            access_ttl: Duration::minutes(config.access_token_expire_minutes),
            refresh_ttl: Duration::days(config.refresh_token_expire_days),
            verification_ttl: Duration::hours(config.verification_token_expire_hours),
            reset_ttl: Duration::hours(config.reset_token_expire_hours),
        }
    }

    /// Configured TTL for a token kind
    pub fn ttl_for(&self, token_type: TokenType) -> Duration {
        match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
            TokenType::EmailVerification => self.verification_ttl,
            TokenType::PasswordReset => self.reset_ttl,
        }
    }

    /// Issue a token with the configured TTL for its kind
    ///
    /// Access tokens additionally embed `iat`, which the authentication
    /// core compares against the account's last password-change timestamp.
    pub fn issue(&self, subject: &str, token_type: TokenType) -> Result<String, TokenError> {
        self.issue_with_ttl(subject, token_type, self.ttl_for(token_type))
    }

    /// Issue a token with an explicit TTL
    pub fn issue_with_ttl(
        &self,
        subject: &str,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            exp: (now + ttl).timestamp(),
            iat: matches!(token_type, TokenType::Access).then(|| now.timestamp()),
            jti: matches!(token_type, TokenType::Refresh).then(generate_token_id),
            token_type,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Verify a token and return its claims
    ///
    /// Fails with [`TokenError::Invalid`] when the signature is invalid, the
    /// token is structurally malformed, the expiry is in the past, or the
    /// `type` claim does not equal `expected`. The four conditions are
    /// indistinguishable to the caller.
    pub fn decode(&self, token: &str, expected: TokenType) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // No clock leeway: a token expired by one second is already dead.
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|_| TokenError::Invalid)?;

        if data.claims.token_type != expected {
            return Err(TokenError::Invalid);
        }

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_codec() -> TokenCodec {
        TokenCodec::new("test-secret-key-for-unit-tests")
    }

    // Test 1: issue and decode an access token
    #[test]
    fn test_issue_and_decode_access_token() {
        let codec = test_codec();
        let token = codec.issue("alice@example.com", TokenType::Access).unwrap();

        let claims = codec.decode(&token, TokenType::Access).unwrap();
        assert_eq!(claims.sub, "alice@example.com");
        assert_eq!(claims.token_type, TokenType::Access);
    }

    // Test 2: access tokens carry iat, other kinds do not
    #[test]
    fn test_iat_only_on_access_tokens() {
        let codec = test_codec();

        let access = codec.issue("a@example.com", TokenType::Access).unwrap();
        let claims = codec.decode(&access, TokenType::Access).unwrap();
        assert!(claims.iat.is_some());

        let refresh = codec.issue("a@example.com", TokenType::Refresh).unwrap();
        let claims = codec.decode(&refresh, TokenType::Refresh).unwrap();
        assert!(claims.iat.is_none());
    }

    // Test 2b: refresh tokens issued back-to-back are distinct
    #[test]
    fn test_refresh_tokens_are_unique() {
        let codec = test_codec();

        let first = codec.issue("a@example.com", TokenType::Refresh).unwrap();
        let second = codec.issue("a@example.com", TokenType::Refresh).unwrap();

        assert_ne!(first, second);

        let claims = codec.decode(&first, TokenType::Refresh).unwrap();
        assert!(claims.jti.is_some());
    }

    // Test 3: an access token is rejected where a refresh token is expected
    #[test]
    fn test_cross_type_replay_rejected() {
        let codec = test_codec();

        let access = codec.issue("a@example.com", TokenType::Access).unwrap();
        assert!(matches!(
            codec.decode(&access, TokenType::Refresh),
            Err(TokenError::Invalid)
        ));

        let refresh = codec.issue("a@example.com", TokenType::Refresh).unwrap();
        assert!(matches!(
            codec.decode(&refresh, TokenType::Access),
            Err(TokenError::Invalid)
        ));
    }

    // Test 4: a reset token cannot be used for email verification
    #[test]
    fn test_reset_token_not_valid_for_verification() {
        let codec = test_codec();
        let reset = codec
            .issue("a@example.com", TokenType::PasswordReset)
            .unwrap();

        assert!(codec.decode(&reset, TokenType::EmailVerification).is_err());
        assert!(codec.decode(&reset, TokenType::PasswordReset).is_ok());
    }

    // Test 5: an already-expired token fails decode immediately
    #[test]
    fn test_expired_token_rejected() {
        let codec = test_codec();
        let token = codec
            .issue_with_ttl("a@example.com", TokenType::Access, Duration::seconds(-1))
            .unwrap();

        assert!(matches!(
            codec.decode(&token, TokenType::Access),
            Err(TokenError::Invalid)
        ));
    }

    // Test 6: garbage input fails decode
    #[test]
    fn test_malformed_token_rejected() {
        let codec = test_codec();
        assert!(codec.decode("not.a.jwt", TokenType::Access).is_err());
        assert!(codec.decode("", TokenType::Access).is_err());
    }

    // Test 7: a token signed with a different secret fails decode
    #[test]
    fn test_wrong_secret_rejected() {
        let codec1 = TokenCodec::new("secret-one");
        let codec2 = TokenCodec::new("secret-two");

        let token = codec1.issue("a@example.com", TokenType::Access).unwrap();
        assert!(matches!(
            codec2.decode(&token, TokenType::Access),
            Err(TokenError::Invalid)
        ));
    }

    // Test 8: default TTLs per kind
    #[test]
    fn test_default_ttls() {
        let codec = test_codec();
        assert_eq!(codec.ttl_for(TokenType::Access), Duration::minutes(30));
        assert_eq!(codec.ttl_for(TokenType::Refresh), Duration::days(7));
        assert_eq!(
            codec.ttl_for(TokenType::EmailVerification),
            Duration::hours(24)
        );
        assert_eq!(codec.ttl_for(TokenType::PasswordReset), Duration::hours(1));
    }

    // Test 9: TTLs are configurable
    #[test]
    fn test_ttls_from_config() {
        let config = AuthTokenConfig {
            secret_key: "configured-secret".to_string(),
            access_token_expire_minutes: 5,
            refresh_token_expire_days: 1,
            verification_token_expire_hours: 2,
            reset_token_expire_hours: 3,
        };
        let codec = TokenCodec::from_config(&config);

        assert_eq!(codec.ttl_for(TokenType::Access), Duration::minutes(5));
        assert_eq!(codec.ttl_for(TokenType::Refresh), Duration::days(1));
        assert_eq!(
            codec.ttl_for(TokenType::EmailVerification),
            Duration::hours(2)
        );
        assert_eq!(codec.ttl_for(TokenType::PasswordReset), Duration::hours(3));
    }

    // Test 10: token type serialization matches the wire names
    #[test]
    fn test_token_type_serialization() {
        let values = vec![
            (TokenType::Access, r#""access""#),
            (TokenType::Refresh, r#""refresh""#),
            (TokenType::EmailVerification, r#""email_verification""#),
            (TokenType::PasswordReset, r#""password_reset""#),
        ];

        for (value, expected_json) in values {
            let json = serde_json::to_string(&value).unwrap();
            assert_eq!(json, expected_json);

            let parsed: TokenType = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, value);
        }
    }

    // Test 11: issued tokens are URL-safe strings
    #[test]
    fn test_token_is_url_safe() {
        let codec = test_codec();
        let token = codec.issue("a@example.com", TokenType::Access).unwrap();

        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_'));
    }
}
