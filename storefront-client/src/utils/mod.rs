pub mod crypto;
pub mod jwt;
pub mod url;

pub use self::crypto::{customer_key, format_phone_for_payment};
pub use self::jwt::{decode_claims, encode_unsigned, is_bearer_shaped, is_token_expired, TokenClaims};
pub use self::url::{join_url, normalize_path};
