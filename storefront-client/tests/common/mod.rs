//! Shared fixtures for client integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};

use async_trait::async_trait;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use storefront_client::config::{ApiSettings, AuthSettings, Settings, StorageSettings};
use storefront_client::credentials::{CredentialStore, MemoryCredentialStore, ACCESS_TOKEN_KEY};
use storefront_client::services::{
    ApiClient, AuthStrategy, LogoutHandler, RecordingNavigator,
};
use wiremock::MockServer;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,storefront_client=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

#[derive(Default)]
pub struct CountingLogout(AtomicUsize);

impl CountingLogout {
    pub fn calls(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LogoutHandler for CountingLogout {
    async fn logout(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// HS256 token the client can decode (it never checks the signature).
pub fn signed_token(claims: Value) -> String {
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"storefront-test-secret"),
    )
    .expect("Failed to sign test token")
}

pub fn live_token(name: &str) -> String {
    signed_token(json!({
        "sub": "buyer@example.com",
        "email": "buyer@example.com",
        "name": name,
        "role": "USER",
        "exp": chrono::Utc::now().timestamp() + 3600,
    }))
}

pub fn expired_token() -> String {
    signed_token(json!({
        "sub": "buyer@example.com",
        "exp": chrono::Utc::now().timestamp() - 3600,
    }))
}

pub fn envelope(data: Value) -> Value {
    json!({ "data": data, "status": 200, "message": "OK" })
}

/// A client wired to in-memory collaborators the test can inspect.
pub struct Harness {
    pub client: ApiClient,
    pub store: Arc<MemoryCredentialStore>,
    pub logout: Arc<CountingLogout>,
    pub navigator: Arc<RecordingNavigator>,
}

impl Harness {
    pub fn new(base_url: &str, strategy: AuthStrategy) -> Self {
        init_tracing();

        let store = Arc::new(MemoryCredentialStore::new());
        let logout = Arc::new(CountingLogout::default());
        let navigator = Arc::new(RecordingNavigator::new());

        let client = ApiClient::builder(base_url, strategy)
            .with_credentials(store.clone())
            .with_logout_handler(logout.clone())
            .with_navigator(navigator.clone())
            .build()
            .expect("Failed to build client");

        Self {
            client,
            store,
            logout,
            navigator,
        }
    }

    /// Primary client mounted under `/api` on the mock server.
    pub fn primary(server: &MockServer) -> Self {
        Self::new(&format!("{}/api", server.uri()), AuthStrategy::BearerWithRefresh)
    }

    pub fn legacy(server: &MockServer) -> Self {
        Self::new(&format!("{}/legacy", server.uri()), AuthStrategy::CookieSessionOnly)
    }

    pub fn secondary(server: &MockServer) -> Self {
        Self::new(&format!("{}/ai", server.uri()), AuthStrategy::None)
    }

    pub fn with_token(self, token: &str) -> Self {
        self.store.set(ACCESS_TOKEN_KEY, token).unwrap();
        self
    }
}

/// Settings pointing all three backends at the mock server.
pub fn settings_for(server: &MockServer) -> Settings {
    Settings {
        primary: ApiSettings {
            base_url: format!("{}/api", server.uri()),
        },
        legacy: ApiSettings {
            base_url: format!("{}/legacy", server.uri()),
        },
        secondary: ApiSettings {
            base_url: format!("{}/ai", server.uri()),
        },
        auth: AuthSettings::default(),
        storage: StorageSettings::default(),
        log_level: "debug".to_string(),
    }
}

/// Number of received requests whose path is `path`.
pub async fn request_count(server: &MockServer, path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == path)
        .count()
}
