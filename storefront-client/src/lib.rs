pub mod config;
pub mod credentials;
pub mod error;
pub mod models;
pub mod observability;
pub mod services;
pub mod utils;

use std::sync::Arc;

use reqwest::cookie::Jar;

use crate::config::Settings;
use crate::credentials::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
use crate::error::ClientError;
use crate::services::{
    ApiClient, AuthService, AuthStrategy, LegacySessionLogout, LogoutHandler, Navigator,
};

/// Clients for every backend the storefront talks to.
///
/// The primary and legacy clients share one cookie jar, so a session cookie
/// set by either is sent to both. Primary responses are wrapped in
/// [`models::ApiResponse`]; legacy and secondary bodies come back as-is.
#[derive(Clone)]
pub struct Backends {
    pub primary: ApiClient,
    pub legacy: ApiClient,
    pub secondary: ApiClient,
    pub auth: Arc<AuthService>,
}

impl Backends {
    pub fn from_settings(
        settings: &Settings,
        store: Arc<dyn CredentialStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ClientError> {
        let jar = Arc::new(Jar::default());

        let legacy = ApiClient::builder(&settings.legacy.base_url, AuthStrategy::CookieSessionOnly)
            .with_cookie_jar(jar.clone())
            .with_credentials(store.clone())
            .with_navigator(navigator.clone())
            .with_login_path(&settings.auth.login_path)
            .build()?;

        let logout: Arc<dyn LogoutHandler> = Arc::new(LegacySessionLogout::new(
            legacy.clone(),
            &settings.auth.logout_path,
        ));

        let primary = ApiClient::builder(&settings.primary.base_url, AuthStrategy::BearerWithRefresh)
            .with_cookie_jar(jar)
            .with_credentials(store)
            .with_logout_handler(logout.clone())
            .with_navigator(navigator)
            .with_login_path(&settings.auth.login_path)
            .with_refresh_path(&settings.auth.refresh_path)
            .build()?;

        let secondary =
            ApiClient::builder(&settings.secondary.base_url, AuthStrategy::None).build()?;

        let auth = Arc::new(AuthService::new(
            primary.clone(),
            logout,
            settings.auth.customer_key_salt.clone(),
        ));

        Ok(Self {
            primary,
            legacy,
            secondary,
            auth,
        })
    }
}

/// Credential store selected by the storage settings.
pub fn open_credential_store(settings: &Settings) -> Result<Arc<dyn CredentialStore>, ClientError> {
    match &settings.storage.credentials_path {
        Some(path) => Ok(Arc::new(FileCredentialStore::open(path)?)),
        None => Ok(Arc::new(MemoryCredentialStore::new())),
    }
}
