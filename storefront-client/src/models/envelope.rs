use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Uniform wrapper the primary API puts around every response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
    pub status: u16,
    #[serde(default)]
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn into_data(self) -> T {
        self.data
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Pull the new access token out of a refresh answer.
///
/// Accepts both `{ "data": { "accessToken": .. } }` and `{ "accessToken": .. }`;
/// the nested form wins when both are present.
pub fn extract_access_token(body: &Value) -> Option<String> {
    body.pointer("/data/accessToken")
        .and_then(Value::as_str)
        .or_else(|| body.get("accessToken").and_then(Value::as_str))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}
