//! Client-side credential storage.
//!
//! The primary API hands out an access token that the client keeps next to
//! the signed-in user's email and display name. The three values live and
//! die together: they are written on login, the token is replaced on
//! refresh, and all of them are dropped on logout or a lost session.

use crate::error::CredentialError;

mod file;
mod memory;

pub use file::FileCredentialStore;
pub use memory::MemoryCredentialStore;

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const EMAIL_KEY: &str = "email";
pub const USER_NAME_KEY: &str = "userName";
pub const REMEMBERED_EMAIL_KEY: &str = "rememberedEmail";

/// Keys removed together when the local identity is torn down.
pub const IDENTITY_KEYS: [&str; 3] = [ACCESS_TOKEN_KEY, EMAIL_KEY, USER_NAME_KEY];

/// Key/value storage for locally persisted credentials.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<(), CredentialError>;

    fn remove(&self, key: &str) -> Result<(), CredentialError>;

    /// Remove the access token, email and display name.
    fn clear(&self) -> Result<(), CredentialError> {
        for key in IDENTITY_KEYS {
            self.remove(key)?;
        }
        Ok(())
    }

    fn access_token(&self) -> Option<String> {
        self.get(ACCESS_TOKEN_KEY)
    }

    fn email(&self) -> Option<String> {
        self.get(EMAIL_KEY)
    }

    fn user_name(&self) -> Option<String> {
        self.get(USER_NAME_KEY)
    }
}
