use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Value of the `X-Hub-Signature-256` header for a given secret and body.
/// Signs the exact bytes handed to it — callers MUST pass the same bytes
/// they later persist, never a re-serialized copy, or verification on
/// replay will disagree with verification at ingestion time.
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts a key of any length");
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

/// Verifies a `X-Hub-Signature-256` header value against the raw body it
/// was computed over. The `sha256=` prefix is optional: a producer may send
/// the bare hex digest instead. Constant-time; rejects malformed headers
/// instead of panicking.
pub fn verify(secret: &str, body: &[u8], header_value: &str) -> bool {
    let hex_digest = header_value.strip_prefix("sha256=").unwrap_or(header_value);
    let Ok(given) = hex::decode(hex_digest) else {
        return false;
    };

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts a key of any length");
    mac.update(body);
    mac.verify_slice(&given).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signs_with_the_sha256_prefix() {
        let sig = sign("secret", b"{\"a\":1}");
        assert!(sig.starts_with("sha256="));
    }

    #[test]
    fn verifies_its_own_signature() {
        let body = br#"{"a":1}"#;
        let sig = sign("secret", body);
        assert!(verify("secret", body, &sig));
    }

    #[test]
    fn rejects_a_mismatched_body() {
        let sig = sign("secret", br#"{"a":1}"#);
        assert!(!verify("secret", br#"{"a":2}"#, &sig));
    }

    #[test]
    fn rejects_a_wrong_secret() {
        let body = br#"{"a":1}"#;
        let sig = sign("secret", body);
        assert!(!verify("other", body, &sig));
    }

    #[test]
    fn verifies_a_digest_sent_without_the_sha256_prefix() {
        let body = br#"{"a":1}"#;
        let sig = sign("secret", body);
        let bare_digest = sig.strip_prefix("sha256=").unwrap();
        assert!(verify("secret", body, bare_digest));
    }

    #[test]
    fn rejects_a_malformed_header() {
        assert!(!verify("secret", b"x", "not-a-signature"));
    }

    #[test]
    fn differs_by_payload() {
        assert_ne!(sign("secret", b"a"), sign("secret", b"b"));
    }
}
