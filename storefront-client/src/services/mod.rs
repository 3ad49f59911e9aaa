pub mod api_client;
pub mod auth_service;
mod refresh;
pub mod session;

pub use api_client::{ApiClient, ApiClientBuilder, AuthStrategy};
pub use auth_service::AuthService;
pub use session::{LegacySessionLogout, LogoutHandler, Navigator, NoopLogout, RecordingNavigator};
