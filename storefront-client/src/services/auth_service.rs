use std::sync::Arc;

use secrecy::Secret;
use serde_json::{json, Value};

use crate::credentials::{
    CredentialStore, ACCESS_TOKEN_KEY, EMAIL_KEY, REMEMBERED_EMAIL_KEY, USER_NAME_KEY,
};
use crate::error::ClientError;
use crate::models::{ApiResponse, LoginCredentials, LoginResponse, RequestBody, Role, UserInfo};
use crate::services::api_client::ApiClient;
use crate::services::session::LogoutHandler;
use crate::utils::crypto::customer_key;
use crate::utils::jwt::{decode_claims, is_token_expired};

const LOGIN_ENDPOINT: &str = "/auth/login";
const FORGOT_PASSWORD_ENDPOINT: &str = "/auth/forgot-password";

/// Sign-in, sign-out and identity lookups on top of the primary API client.
pub struct AuthService {
    client: ApiClient,
    logout: Arc<dyn LogoutHandler>,
    customer_key_salt: Secret<String>,
}

impl AuthService {
    pub fn new(
        client: ApiClient,
        logout: Arc<dyn LogoutHandler>,
        customer_key_salt: Secret<String>,
    ) -> Self {
        Self {
            client,
            logout,
            customer_key_salt,
        }
    }

    fn store(&self) -> &Arc<dyn CredentialStore> {
        self.client.credentials()
    }

    pub async fn login(&self, credentials: &LoginCredentials) -> Result<LoginResponse, ClientError> {
        let response: ApiResponse<Option<LoginResponse>> = self
            .client
            .post(LOGIN_ENDPOINT, RequestBody::json(credentials)?)
            .await?;

        let login = match response.data {
            Some(login) if response.status == 200 => login,
            _ => {
                tracing::warn!(status = response.status, "Login rejected");
                return Err(ClientError::Rejected(format!(
                    "Login failed: {}",
                    response.message
                )));
            }
        };

        let store = self.store();
        store.set(ACCESS_TOKEN_KEY, &login.access_token)?;
        store.set(EMAIL_KEY, &credentials.email)?;

        let name = login
            .user
            .as_ref()
            .map(|user| user.name.clone())
            .or_else(|| decode_claims(&login.access_token).and_then(|claims| claims.name));
        if let Some(name) = name {
            store.set(USER_NAME_KEY, &name)?;
        }

        if credentials.remember_me {
            store.set(REMEMBERED_EMAIL_KEY, &credentials.email)?;
        } else {
            store.remove(REMEMBERED_EMAIL_KEY)?;
        }

        tracing::info!(email = %credentials.email, "User logged in successfully");
        Ok(login)
    }

    pub async fn forgot_password(&self, email: &str) -> Result<(), ClientError> {
        let response: ApiResponse<Value> = self
            .client
            .post(FORGOT_PASSWORD_ENDPOINT, json!({ "email": email }))
            .await?;

        if !response.is_ok() {
            return Err(ClientError::Rejected(format!(
                "Password reset request failed: {}",
                response.message
            )));
        }
        Ok(())
    }

    /// Close the server session, then drop the local identity.
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.logout.logout().await;
        self.store().clear()?;
        tracing::info!("User logged out");
        Ok(())
    }

    pub fn remembered_email(&self) -> Option<String> {
        self.store().get(REMEMBERED_EMAIL_KEY)
    }

    /// Signed-in user according to the stored token.
    ///
    /// An expired token is removed and yields `None`, as does a token
    /// missing the email or name claim.
    pub fn current_user(&self) -> Result<Option<UserInfo>, ClientError> {
        let store = self.store();
        let Some(token) = store.access_token() else {
            return Ok(None);
        };

        if is_token_expired(&token) {
            tracing::warn!("Stored access token has expired");
            if let Err(e) = store.remove(ACCESS_TOKEN_KEY) {
                tracing::error!(error = %e, "Failed to remove expired access token");
            }
            return Ok(None);
        }

        let user = decode_claims(&token).and_then(UserInfo::from_claims);
        if user.is_none() {
            tracing::warn!("Access token lacks user claims");
        }
        Ok(user)
    }

    pub fn is_logged_in(&self) -> bool {
        self.store()
            .access_token()
            .is_some_and(|token| !is_token_expired(&token))
    }

    pub fn has_role(&self, role: Role) -> bool {
        matches!(self.current_user(), Ok(Some(user)) if user.has_role(role))
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    pub fn is_seller(&self) -> bool {
        self.has_role(Role::Seller)
    }

    pub fn is_personal_seller(&self) -> bool {
        self.has_role(Role::PersonalSeller)
    }

    pub fn is_user(&self) -> bool {
        self.has_role(Role::User)
    }

    /// Payment customer key for the signed-in user.
    pub fn customer_key(&self) -> Option<String> {
        match self.current_user() {
            Ok(Some(user)) => Some(customer_key(&self.customer_key_salt, &user.email)),
            _ => {
                tracing::warn!("No signed-in user to derive a customer key for");
                None
            }
        }
    }
}
