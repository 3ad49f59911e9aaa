use std::path::PathBuf;

use secrecy::Secret;
use serde::Deserialize;

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub primary: ApiSettings,
    pub legacy: ApiSettings,
    pub secondary: ApiSettings,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ApiSettings {
    /// Base URL every request path is appended to (e.g. http://localhost:8080/api).
    pub base_url: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct AuthSettings {
    /// Refresh endpoint on the primary API.
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
    /// Where the user is sent after the session is lost.
    #[serde(default = "default_login_path")]
    pub login_path: String,
    /// Cookie-session logout endpoint on the legacy API.
    #[serde(default = "default_logout_path")]
    pub logout_path: String,
    /// Salt for payment customer keys.
    #[serde(default = "default_customer_key_salt")]
    pub customer_key_salt: Secret<String>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            refresh_path: default_refresh_path(),
            login_path: default_login_path(),
            logout_path: default_logout_path(),
            customer_key_salt: default_customer_key_salt(),
        }
    }
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct StorageSettings {
    /// JSON file holding the stored credentials. In-memory when unset.
    #[serde(default)]
    pub credentials_path: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_refresh_path() -> String {
    "/auth/refresh".to_string()
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_logout_path() -> String {
    "/auth/logout".to_string()
}

fn default_customer_key_salt() -> Secret<String> {
    Secret::new("mySecretSalt_".to_string())
}

/// Load settings from an optional `configuration` file in the working
/// directory, overridden by `APP__`-prefixed environment variables
/// (e.g. `APP__PRIMARY__BASE_URL`).
pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    dotenvy::dotenv().ok();

    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}
