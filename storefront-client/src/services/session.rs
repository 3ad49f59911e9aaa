use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::credentials::CredentialStore;
use crate::models::RequestBody;
use crate::services::api_client::ApiClient;

/// Server-side half of signing out: close the session, revoke the token.
#[async_trait]
pub trait LogoutHandler: Send + Sync {
    async fn logout(&self);
}

/// Where the user is sent when their session cannot be recovered.
pub trait Navigator: Send + Sync {
    fn redirect(&self, location: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogout;

#[async_trait]
impl LogoutHandler for NoopLogout {
    async fn logout(&self) {}
}

/// Closes the cookie session on the legacy backend.
///
/// Failures are logged and swallowed; local teardown goes ahead regardless.
pub struct LegacySessionLogout {
    client: ApiClient,
    path: String,
}

impl LegacySessionLogout {
    pub fn new(client: ApiClient, path: impl Into<String>) -> Self {
        Self {
            client,
            path: path.into(),
        }
    }
}

#[async_trait]
impl LogoutHandler for LegacySessionLogout {
    async fn logout(&self) {
        match self
            .client
            .post::<serde_json::Value>(&self.path, RequestBody::Empty)
            .await
        {
            Ok(_) => tracing::info!("Legacy session closed"),
            Err(e) => tracing::error!(error = %e, "Legacy logout request failed"),
        }
    }
}

/// Redirects remembered by [`RecordingNavigator`]; older ones are dropped.
pub const RECORDED_REDIRECTS: usize = 16;

/// Logs every redirect and remembers the most recent ones.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    locations: Mutex<VecDeque<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn locations(&self) -> Vec<String> {
        self.locations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    pub fn last_location(&self) -> Option<String> {
        self.locations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .back()
            .cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, location: &str) {
        tracing::warn!(location = %location, "Redirecting to sign-in");
        let mut locations = self
            .locations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if locations.len() == RECORDED_REDIRECTS {
            locations.pop_front();
        }
        locations.push_back(location.to_string());
    }
}

/// Collaborators every authenticated backend shares.
#[derive(Clone)]
pub(crate) struct SessionContext {
    pub store: Arc<dyn CredentialStore>,
    pub logout: Arc<dyn LogoutHandler>,
    pub navigator: Arc<dyn Navigator>,
    pub login_path: String,
}

impl SessionContext {
    pub fn redirect_to_login(&self) {
        self.navigator.redirect(&self.login_path);
    }

    /// Tear down the local identity after an unrecoverable auth failure.
    pub async fn end(&self) {
        self.logout.logout().await;
        if let Err(e) = self.store.clear() {
            tracing::error!(error = %e, "Failed to clear stored credentials");
        }
        self.redirect_to_login();
    }
}
