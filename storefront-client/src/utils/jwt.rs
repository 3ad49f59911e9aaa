use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Claims carried in the payload segment of a storefront access token.
///
/// Every field is optional: the primary API has issued tokens with
/// different claim sets over time, and callers only rely on what is there.
/// A claim of an unexpected JSON type reads as absent instead of
/// invalidating the whole payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64", skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64", skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64", skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// Strings as-is, numbers and booleans in their JSON text form.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Integers, floats (truncated) and numeric strings.
fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

impl TokenClaims {
    /// Claims with no `exp` are treated as already expired.
    pub fn is_expired_at(&self, now_millis: i64) -> bool {
        match self.exp {
            Some(exp) => now_millis >= exp.saturating_mul(1000),
            None => true,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(chrono::Utc::now().timestamp_millis())
    }
}

fn strip_bearer_prefix(token: &str) -> &str {
    let trimmed = token.trim();
    match trimmed.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("bearer ") => trimmed[7..].trim_start(),
        _ => trimmed,
    }
}

/// Decode token claims without validation.
///
/// The signature is never checked here; the primary API is the only party
/// that verifies tokens. Any malformed input yields `None`.
pub fn decode_claims(token: &str) -> Option<TokenClaims> {
    let parts: Vec<&str> = strip_bearer_prefix(token).split('.').collect();
    if parts.len() != 3 {
        return None;
    }

    // URL-safe alphabet to standard alphabet, then pad to a multiple of 4
    let mut payload = parts[1].replace('-', "+").replace('_', "/");
    while payload.len() % 4 != 0 {
        payload.push('=');
    }

    let bytes = match general_purpose::STANDARD.decode(payload.as_bytes()) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to decode token payload");
            return None;
        }
    };

    let json = match String::from_utf8(bytes) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!(error = %e, "Token payload is not UTF-8");
            return None;
        }
    };

    match serde_json::from_str(&json) {
        Ok(claims) => Some(claims),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to parse token claims");
            None
        }
    }
}

/// True when the token cannot be decoded, has no expiry, or has expired.
pub fn is_token_expired(token: &str) -> bool {
    decode_claims(token).map_or(true, |claims| claims.is_expired())
}

/// Whether `token` has the header.payload.signature shape worth sending
/// as a bearer credential.
pub fn is_bearer_shaped(token: &str) -> bool {
    let token = token.trim();
    if token.is_empty() || token.chars().any(char::is_whitespace) {
        return false;
    }
    let parts: Vec<&str> = token.split('.').collect();
    parts.len() == 3 && parts.iter().all(|part| !part.is_empty())
}

/// Build an unsigned token carrying `claims`.
///
/// Used by local tooling and test doubles that need a token the client can
/// read back; the primary API will reject it.
pub fn encode_unsigned(claims: &TokenClaims) -> String {
    let header = general_purpose::URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    // Serializing a struct of strings and integers cannot fail
    let body = serde_json::to_vec(claims).unwrap_or_default();
    let payload = general_purpose::URL_SAFE_NO_PAD.encode(body);
    format!("{}.{}.unsigned", header, payload)
}
