//! Request signing for the search-advertising API.

use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// `base64(HMAC-SHA256(secret, "{timestamp}.{method}.{uri}"))`.
///
/// `uri` is the request path without query string.
#[must_use]
pub fn signature(secret: &str, timestamp: &str, method: &str, uri: &str) -> String {
    let message = format!("{timestamp}.{method}.{uri}");
    // HMAC accepts keys of any length.
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.trim().as_bytes()) else {
        return String::new();
    };
    mac.update(message.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_matches_reference_hmac() {
        let sig = signature("secret", "1700000000000", "GET", "/keywordstool");
        assert_eq!(sig, "A6Gzu+sW9C2ovLsH+T+rFrie81KwHy1xrodUFQERKf4=");
    }

    #[test]
    fn signature_depends_on_every_part() {
        let base = signature("secret", "1", "GET", "/keywordstool");
        assert_ne!(base, signature("other", "1", "GET", "/keywordstool"));
        assert_ne!(base, signature("secret", "2", "GET", "/keywordstool"));
        assert_ne!(base, signature("secret", "1", "POST", "/keywordstool"));
        assert_eq!(base, signature(" secret ", "1", "GET", "/keywordstool"));
    }
}
