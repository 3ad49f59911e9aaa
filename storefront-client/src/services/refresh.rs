//! Single-flight access token refresh.
//!
//! Every request that receives a 401 asks the coordinator for a new token.
//! While a refresh call is in flight, later callers await the same pending
//! future instead of issuing their own. Persisting the new token on success,
//! and tearing the session down on failure, happen once inside that future.

use std::sync::{Mutex, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::{json, Value};

use crate::credentials::{ACCESS_TOKEN_KEY, USER_NAME_KEY};
use crate::error::RefreshError;
use crate::models::envelope::extract_access_token;
use crate::observability::{new_request_id, REQUEST_ID_HEADER};
use crate::services::session::SessionContext;
use crate::utils::jwt::decode_claims;

type PendingRefresh = Shared<BoxFuture<'static, Result<String, RefreshError>>>;

pub(crate) struct RefreshCoordinator {
    http: reqwest::Client,
    refresh_url: String,
    session: SessionContext,
    pending: Mutex<Option<PendingRefresh>>,
}

impl RefreshCoordinator {
    pub fn new(http: reqwest::Client, refresh_url: String, session: SessionContext) -> Self {
        Self {
            http,
            refresh_url,
            session,
            pending: Mutex::new(None),
        }
    }

    /// Token to replay a request with after it was answered with 401.
    ///
    /// `sent_token` is the token the rejected request carried. If the store
    /// already holds a different one, another request refreshed in the
    /// meantime and that token is used without calling the endpoint again.
    pub async fn refreshed_token(&self, sent_token: Option<&str>) -> Result<String, RefreshError> {
        if let Some(current) = self.session.store.access_token() {
            if sent_token != Some(current.as_str()) {
                tracing::debug!("Token already replaced by a concurrent refresh");
                return Ok(current);
            }
        }

        let pending = self.join_or_start();
        let _release = SlotRelease {
            slot: &self.pending,
            pending: pending.clone(),
        };
        pending.await
    }

    fn join_or_start(&self) -> PendingRefresh {
        let mut slot = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pending) = slot.as_ref() {
            tracing::debug!("Joining in-flight token refresh");
            return pending.clone();
        }

        let pending = run_refresh(
            self.http.clone(),
            self.refresh_url.clone(),
            self.session.clone(),
        )
        .boxed()
        .shared();
        *slot = Some(pending.clone());
        pending
    }
}

/// Empties the pending slot when the awaiting caller finishes or is
/// dropped, unless a newer refresh has taken the slot in the meantime.
struct SlotRelease<'a> {
    slot: &'a Mutex<Option<PendingRefresh>>,
    pending: PendingRefresh,
}

impl Drop for SlotRelease<'_> {
    fn drop(&mut self) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|current| current.ptr_eq(&self.pending)) {
            *slot = None;
        }
    }
}

async fn run_refresh(
    http: reqwest::Client,
    refresh_url: String,
    session: SessionContext,
) -> Result<String, RefreshError> {
    let email = session.store.email();

    match request_token(&http, &refresh_url, email.as_deref()).await {
        Ok(token) => {
            if let Err(e) = session.store.set(ACCESS_TOKEN_KEY, &token) {
                tracing::error!(error = %e, "Failed to store refreshed access token");
                session.end().await;
                return Err(RefreshError::Storage(e.to_string()));
            }

            if let Some(name) = decode_claims(&token).and_then(|claims| claims.name) {
                if let Err(e) = session.store.set(USER_NAME_KEY, &name) {
                    tracing::warn!(error = %e, "Failed to store display name");
                }
            }

            tracing::info!("Access token refreshed");
            Ok(token)
        }
        Err(e) => {
            tracing::error!(error = %e, "Token refresh failed, ending session");
            session.end().await;
            Err(e)
        }
    }
}

async fn request_token(
    http: &reqwest::Client,
    refresh_url: &str,
    email: Option<&str>,
) -> Result<String, RefreshError> {
    let body = match email {
        Some(email) => json!({ "email": email }),
        None => json!({}),
    };

    let response = http
        .post(refresh_url)
        .header(REQUEST_ID_HEADER, new_request_id())
        .json(&body)
        .send()
        .await
        .map_err(|e| RefreshError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(RefreshError::Rejected(status.as_u16()));
    }

    let body: Value = response
        .json()
        .await
        .map_err(|e| RefreshError::Malformed(e.to_string()))?;

    extract_access_token(&body).ok_or(RefreshError::MissingToken)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::credentials::{CredentialStore, MemoryCredentialStore, EMAIL_KEY};
    use crate::services::session::{NoopLogout, RecordingNavigator};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn coordinator(server: &MockServer, store: Arc<MemoryCredentialStore>) -> RefreshCoordinator {
        let session = SessionContext {
            store,
            logout: Arc::new(NoopLogout),
            navigator: Arc::new(RecordingNavigator::new()),
            login_path: "/login".to_string(),
        };
        RefreshCoordinator::new(
            reqwest::Client::new(),
            format!("{}/api/auth/refresh", server.uri()),
            session,
        )
    }

    #[tokio::test]
    async fn test_abandoned_refresh_releases_the_slot() {
        let server = MockServer::start().await;
        let store = Arc::new(MemoryCredentialStore::new());
        store.set(EMAIL_KEY, "first@example.com").unwrap();

        Mock::given(method("POST"))
            .and(path("/api/auth/refresh"))
            .and(body_json(serde_json::json!({"email": "first@example.com"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"accessToken": "stale.tok.en"}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/auth/refresh"))
            .and(body_json(serde_json::json!({"email": "second@example.com"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"accessToken": "fresh.tok.en"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let coordinator = coordinator(&server, store.clone());
        let abandoned =
            tokio::time::timeout(Duration::from_millis(100), coordinator.refreshed_token(None)).await;
        assert!(abandoned.is_err());
        assert!(coordinator
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none());

        // A later refresh starts over with the current email
        store.set(EMAIL_KEY, "second@example.com").unwrap();
        let token = coordinator.refreshed_token(None).await.unwrap();
        assert_eq!(token, "fresh.tok.en");
        assert_eq!(store.access_token().as_deref(), Some("fresh.tok.en"));
    }

    #[tokio::test]
    async fn test_settled_refresh_releases_the_slot() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/refresh"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let coordinator = coordinator(&server, Arc::new(MemoryCredentialStore::new()));
        let err = coordinator.refreshed_token(None).await.unwrap_err();

        assert_eq!(err, RefreshError::Rejected(500));
        assert!(coordinator
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none());
    }
}
