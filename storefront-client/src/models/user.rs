use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::jwt::TokenClaims;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
    pub remember_me: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<LoginUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginUser {
    /// Numeric or string depending on the issuing backend.
    #[serde(default)]
    pub id: Value,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Seller,
    PersonalSeller,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Seller => "SELLER",
            Role::PersonalSeller => "PERSONAL_SELLER",
            Role::User => "USER",
        }
    }

    pub fn parse(value: &str) -> Option<Role> {
        match value {
            "ADMIN" => Some(Role::Admin),
            "SELLER" => Some(Role::Seller),
            "PERSONAL_SELLER" => Some(Role::PersonalSeller),
            "USER" => Some(Role::User),
            _ => None,
        }
    }
}

/// Identity of the signed-in user, as read from the access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserInfo {
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub member_id: Option<i64>,
    pub role: Option<String>,
}

impl UserInfo {
    /// Requires both an email and a name claim.
    pub fn from_claims(claims: TokenClaims) -> Option<Self> {
        let email = claims.email.filter(|e| !e.is_empty())?;
        let name = claims.name.filter(|n| !n.is_empty())?;
        Some(Self {
            email,
            name,
            phone: claims.phone,
            member_id: claims.id,
            role: claims.role,
        })
    }

    pub fn role(&self) -> Option<Role> {
        self.role.as_deref().and_then(Role::parse)
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role() == Some(role)
    }

    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        self.role().is_some_and(|role| roles.contains(&role))
    }
}
