//! HTTP client shared by the primary, legacy and secondary backends.
//!
//! The three backends differ only in how they authenticate, which is chosen
//! with [`AuthStrategy`] when the client is built:
//!
//! | Strategy | Bearer header | Cookies | On 401 |
//! |----------|---------------|---------|--------|
//! | `BearerWithRefresh` | attached when usable | yes | refresh once, replay once |
//! | `CookieSessionOnly` | always stripped | yes | redirect to login |
//! | `None` | untouched | no | error is logged and returned |

use std::sync::Arc;

use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::credentials::{CredentialStore, MemoryCredentialStore, ACCESS_TOKEN_KEY};
use crate::error::ClientError;
use crate::models::{ApiRequest, RequestBody};
use crate::observability::{new_request_id, REQUEST_ID_HEADER};
use crate::services::refresh::RefreshCoordinator;
use crate::services::session::{
    LogoutHandler, Navigator, NoopLogout, RecordingNavigator, SessionContext,
};
use crate::utils::jwt::{is_bearer_shaped, is_token_expired};
use crate::utils::url::join_url;

pub const DEFAULT_LOGIN_PATH: &str = "/login";
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStrategy {
    /// Bearer token from the credential store, refreshed once on 401.
    BearerWithRefresh,
    /// Server-side cookie session; never sends a bearer token.
    CookieSessionOnly,
    /// No credentials of any kind.
    None,
}

/// Builder for [`ApiClient`].
pub struct ApiClientBuilder {
    base_url: String,
    strategy: AuthStrategy,
    http: Option<reqwest::Client>,
    cookie_jar: Option<Arc<Jar>>,
    store: Option<Arc<dyn CredentialStore>>,
    logout: Option<Arc<dyn LogoutHandler>>,
    navigator: Option<Arc<dyn Navigator>>,
    login_path: String,
    refresh_path: String,
}

impl ApiClientBuilder {
    fn new(base_url: impl Into<String>, strategy: AuthStrategy) -> Self {
        Self {
            base_url: base_url.into(),
            strategy,
            http: None,
            cookie_jar: None,
            store: None,
            logout: None,
            navigator: None,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
        }
    }

    /// Use a preconfigured `reqwest::Client` instead of building one.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Share a cookie jar with other clients (ignored for `AuthStrategy::None`).
    pub fn with_cookie_jar(mut self, jar: Arc<Jar>) -> Self {
        self.cookie_jar = Some(jar);
        self
    }

    pub fn with_credentials(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_logout_handler(mut self, logout: Arc<dyn LogoutHandler>) -> Self {
        self.logout = Some(logout);
        self
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Location the user is redirected to when the session is lost.
    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    /// Refresh endpoint, relative to the base URL.
    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    pub fn build(self) -> Result<ApiClient, ClientError> {
        url::Url::parse(&self.base_url)?;

        let http = match self.http {
            Some(http) => http,
            None => {
                let mut builder = reqwest::Client::builder();
                if self.strategy != AuthStrategy::None {
                    builder = builder.cookie_provider(self.cookie_jar.unwrap_or_default());
                }
                builder.build()?
            }
        };

        let base_url = self.base_url.trim_end_matches('/').to_string();

        let session = SessionContext {
            store: self
                .store
                .unwrap_or_else(|| Arc::new(MemoryCredentialStore::new())),
            logout: self.logout.unwrap_or_else(|| Arc::new(NoopLogout)),
            navigator: self
                .navigator
                .unwrap_or_else(|| Arc::new(RecordingNavigator::new())),
            login_path: self.login_path,
        };

        let refresher = match self.strategy {
            AuthStrategy::BearerWithRefresh => {
                let refresh_url = join_url(&base_url, &self.refresh_path);
                Some(RefreshCoordinator::new(
                    http.clone(),
                    refresh_url,
                    session.clone(),
                ))
            }
            AuthStrategy::CookieSessionOnly | AuthStrategy::None => None,
        };

        Ok(ApiClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                strategy: self.strategy,
                session,
                refresher,
            }),
        })
    }
}

struct ClientInner {
    http: reqwest::Client,
    base_url: String,
    strategy: AuthStrategy,
    session: SessionContext,
    refresher: Option<RefreshCoordinator>,
}

/// Cheap to clone; clones share the HTTP connection pool and refresh state.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

impl ApiClient {
    pub fn builder(base_url: impl Into<String>, strategy: AuthStrategy) -> ApiClientBuilder {
        ApiClientBuilder::new(base_url, strategy)
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn strategy(&self) -> AuthStrategy {
        self.inner.strategy
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.inner.session.store
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ClientError> {
        self.send(with_params(ApiRequest::get(path), params)).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: impl Into<RequestBody>,
    ) -> Result<T, ClientError> {
        self.send(ApiRequest::post(path).body(body)).await
    }

    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: impl Into<RequestBody>,
    ) -> Result<T, ClientError> {
        self.send(ApiRequest::put(path).body(body)).await
    }

    pub async fn patch<T: DeserializeOwned>(
        &self,
        path: &str,
        body: impl Into<RequestBody>,
    ) -> Result<T, ClientError> {
        self.send(ApiRequest::patch(path).body(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ClientError> {
        self.send(with_params(ApiRequest::delete(path), params)).await
    }

    /// Send `request` and decode the JSON body. An empty body decodes as `null`.
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ClientError> {
        let response = self.execute(request).await?;
        let bytes = response.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::from_slice(b"null")?);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Send `request` under this client's auth strategy.
    ///
    /// Any non-2xx answer that is not recovered becomes `ClientError::Status`.
    pub async fn execute(&self, mut request: ApiRequest) -> Result<Response, ClientError> {
        match self.inner.strategy {
            AuthStrategy::BearerWithRefresh => self.execute_with_refresh(request).await,
            AuthStrategy::CookieSessionOnly => {
                request.headers.remove(AUTHORIZATION);
                let response = self.dispatch(&request).await?;
                if response.status() == StatusCode::UNAUTHORIZED {
                    tracing::warn!(path = %request.path, "Cookie session expired");
                    self.inner.session.redirect_to_login();
                }
                check_status(response).await
            }
            AuthStrategy::None => {
                let response = self.dispatch(&request).await?;
                let result = check_status(response).await;
                if let Err(e) = &result {
                    tracing::error!(path = %request.path, error = %e, "Request failed");
                }
                result
            }
        }
    }

    /// Stored access token, or `None` once it has expired.
    ///
    /// An expired token is removed from the store and the logout handler
    /// runs before `None` is returned. A store that cannot remove it is
    /// logged; the token is still treated as absent.
    pub async fn access_token(&self) -> Option<String> {
        let session = &self.inner.session;
        match session.store.access_token() {
            Some(token) if is_token_expired(&token) => {
                tracing::warn!("Stored access token has expired");
                if let Err(e) = session.store.remove(ACCESS_TOKEN_KEY) {
                    tracing::error!(error = %e, "Failed to remove expired access token");
                }
                session.logout.logout().await;
                None
            }
            token => token,
        }
    }

    async fn execute_with_refresh(&self, mut request: ApiRequest) -> Result<Response, ClientError> {
        let token = self.access_token().await;
        attach_bearer(&mut request.headers, token.as_deref())?;

        let response = self.dispatch(&request).await?;
        if response.status() != StatusCode::UNAUTHORIZED || request.retried {
            return check_status(response).await;
        }

        let original = status_error(response).await;
        request.retried = true;

        let Some(refresher) = &self.inner.refresher else {
            return Err(original);
        };

        match refresher.refreshed_token(token.as_deref()).await {
            Ok(new_token) => {
                attach_bearer(&mut request.headers, Some(&new_token))?;
                tracing::info!(path = %request.path, "Replaying request with refreshed token");
                let response = self.dispatch(&request).await?;
                check_status(response).await
            }
            Err(e) => {
                tracing::warn!(path = %request.path, error = %e, "Session lost");
                Err(original)
            }
        }
    }

    async fn dispatch(&self, request: &ApiRequest) -> Result<Response, ClientError> {
        let url = join_url(&self.inner.base_url, &request.path);

        let mut headers = request.headers.clone();
        // The transport sets multipart/form-data together with its boundary
        if request.body.is_multipart() {
            headers.remove(CONTENT_TYPE);
        }
        let request_id = new_request_id();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_str(&request_id)?);

        let mut builder = self
            .inner
            .http
            .request(request.method.clone(), &url)
            .headers(headers);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(body) => builder.multipart(body.to_form()?),
        };

        tracing::debug!(
            request_id = %request_id,
            method = %request.method,
            url = %url,
            retried = request.retried,
            "Sending request"
        );

        builder.send().await.map_err(|e| {
            tracing::error!(request_id = %request_id, url = %url, error = %e, "HTTP request failed");
            ClientError::Transport(e)
        })
    }
}

fn with_params(mut request: ApiRequest, params: &[(&str, &str)]) -> ApiRequest {
    for (key, value) in params {
        request = request.query(*key, *value);
    }
    request
}

/// Set `Authorization: Bearer <token>` when the token is bearer-shaped,
/// otherwise make sure no Authorization header goes out.
fn attach_bearer(headers: &mut HeaderMap, token: Option<&str>) -> Result<(), ClientError> {
    match token.map(str::trim).filter(|token| is_bearer_shaped(token)) {
        Some(token) => {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        None => {
            headers.remove(AUTHORIZATION);
        }
    }
    Ok(())
}

async fn status_error(response: Response) -> ClientError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    ClientError::Status { status, body }
}

async fn check_status(response: Response) -> Result<Response, ClientError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(status_error(response).await)
    }
}
