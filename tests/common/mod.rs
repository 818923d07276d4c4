//! Common test utilities and helpers for integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use contacts_api::auth::{AuthService, RegisterRequest, TokenCodec};
use contacts_api::cache::{CacheBackend, MemoryBackend, SessionCache};
use contacts_api::database::SqliteDatabase;
use contacts_api::email::EmailSender;
use contacts_api::error::{CacheError, EmailError};
use contacts_api::models::CurrentUser;
use contacts_api::server::{build_router, AppState};

/// Signing secret shared by every integration test
pub const TEST_SECRET: &str = "integration-test-secret";

/// Which message a recorded send was
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    Verification,
    PasswordReset,
}

/// One recorded outbound email
#[derive(Debug, Clone)]
pub struct SentEmail {
    pub kind: EmailKind,
    pub to: String,
    pub token: String,
}

/// Mailer that records every send instead of delivering
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentEmail>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn verification_tokens(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|m| m.kind == EmailKind::Verification)
            .map(|m| m.token)
            .collect()
    }

    pub fn reset_tokens(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|m| m.kind == EmailKind::PasswordReset)
            .map(|m| m.token)
            .collect()
    }
}

#[async_trait]
impl EmailSender for RecordingMailer {
    async fn send_verification_email(
        &self,
        to: &str,
        _name: &str,
        token: &str,
    ) -> Result<(), EmailError> {
        self.sent.lock().unwrap().push(SentEmail {
            kind: EmailKind::Verification,
            to: to.to_string(),
            token: token.to_string(),
        });
        Ok(())
    }

    async fn send_password_reset_email(
        &self,
        to: &str,
        _name: &str,
        token: &str,
    ) -> Result<(), EmailError> {
        self.sent.lock().unwrap().push(SentEmail {
            kind: EmailKind::PasswordReset,
            to: to.to_string(),
            token: token.to_string(),
        });
        Ok(())
    }
}

/// Cache backend that fails every operation, simulating an outage
pub struct FailingBackend;

#[async_trait]
impl CacheBackend for FailingBackend {
    fn name(&self) -> &str {
        "failing"
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    async fn set(
        &self,
        _key: &str,
        _value: &str,
        _ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    async fn exists(&self, _key: &str) -> Result<bool, CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    async fn flush(&self) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }
}

/// Everything a test needs to drive the authentication core
pub struct TestHarness {
    pub service: Arc<AuthService<SqliteDatabase>>,
    pub mailer: Arc<RecordingMailer>,
    pub database: Arc<SqliteDatabase>,
}

/// Create an in-memory database for testing
pub async fn create_test_database() -> Arc<SqliteDatabase> {
    Arc::new(
        SqliteDatabase::in_memory()
            .await
            .expect("Failed to create test database"),
    )
}

/// Create a harness over an in-memory database and memory cache
pub async fn create_test_harness() -> TestHarness {
    let cache = Arc::new(SessionCache::new(Arc::new(MemoryBackend::new())));
    create_test_harness_with_cache(cache).await
}

/// Create a harness with an explicit session cache
pub async fn create_test_harness_with_cache(cache: Arc<SessionCache>) -> TestHarness {
    let database = create_test_database().await;
    let mailer = Arc::new(RecordingMailer::new());

    let service = Arc::new(AuthService::new(
        Arc::clone(&database),
        cache,
        TokenCodec::new(TEST_SECRET),
        Arc::clone(&mailer) as Arc<dyn EmailSender>,
    ));

    TestHarness {
        service,
        mailer,
        database,
    }
}

/// Register an account and return the created user
pub async fn register_user(
    harness: &TestHarness,
    email: &str,
    password: &str,
) -> CurrentUser {
    harness
        .service
        .register(RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            first_name: Some("Test".to_string()),
            last_name: None,
        })
        .await
        .expect("Registration should succeed")
}

/// Run a test server in the background and return the address
/// The server will be shut down when the returned shutdown sender is dropped or sent
pub async fn run_test_server(
    harness: &TestHarness,
) -> (std::net::SocketAddr, tokio::sync::oneshot::Sender<()>) {
    use tokio::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr = listener.local_addr().expect("Failed to get local address");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let app = build_router(AppState {
        auth: Arc::clone(&harness.service),
    });

    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
            .expect("Server error");
    });

    // Give the server a moment to start (100ms is sufficient for slow CI systems)
    tokio::time::sleep(Duration::from_millis(100)).await;

    (addr, shutdown_tx)
}
