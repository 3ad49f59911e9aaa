use secrecy::{ExposeSecret, Secret};
use sha2::{Digest, Sha256};

/// Payment provider customer keys are capped at 50 characters.
const CUSTOMER_KEY_HASH_LEN: usize = 30;

/// Derive the payment-provider customer key for an email address.
///
/// `ck_` followed by the first 30 hex characters of `sha256(salt + email)`.
pub fn customer_key(salt: &Secret<String>, email: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.expose_secret().as_bytes());
    hasher.update(email.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("ck_{}", &digest[..CUSTOMER_KEY_HASH_LEN])
}

/// Strip dashes from a phone number before handing it to the payment SDK.
pub fn format_phone_for_payment(phone: Option<&str>) -> String {
    phone.map(|p| p.replace('-', "")).unwrap_or_default()
}
