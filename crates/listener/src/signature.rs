//! `X-Gitee-Token` verification.

use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Checks a delivery token against the shared webhook secret.
///
/// Gitee sends either the secret itself (password mode) or, in signing-key
/// mode, `base64(HMAC-SHA256(secret, "<timestamp>\n<secret>"))` together with
/// an `X-Gitee-Timestamp` header. Both forms are compared in constant time.
/// An empty secret accepts nothing.
#[must_use]
pub fn verify_token(secret: &str, token: &str, timestamp: Option<&str>) -> bool {
    if secret.is_empty() || token.is_empty() {
        return false;
    }

    let plain: bool = token.as_bytes().ct_eq(secret.as_bytes()).into();
    if plain {
        return true;
    }

    let Some(timestamp) = timestamp else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(format!("{timestamp}\n{secret}").as_bytes());
    let expected = base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());

    expected.as_bytes().ct_eq(token.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, timestamp: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{timestamp}\n{secret}").as_bytes());
        base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_plain_secret_accepted() {
        assert!(verify_token("s3cret", "s3cret", None));
        assert!(!verify_token("s3cret", "s3cre", None));
    }

    #[test]
    fn test_signed_token_accepted() {
        let token = sign("s3cret", "1576754827988");
        assert!(verify_token("s3cret", &token, Some("1576754827988")));
    }

    #[test]
    fn test_signed_token_bound_to_timestamp() {
        let token = sign("s3cret", "1576754827988");
        assert!(!verify_token("s3cret", &token, Some("1576754827989")));
        assert!(!verify_token("s3cret", &token, None));
        assert!(!verify_token("other", &token, Some("1576754827988")));
    }

    #[test]
    fn test_empty_secret_rejects() {
        assert!(!verify_token("", "", None));
        assert!(!verify_token("", "anything", Some("1")));
    }
}
