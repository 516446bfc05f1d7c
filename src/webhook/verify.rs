// Inbound webhook signature verification.
//
// The HMAC is computed over the raw request body bytes, before any JSON
// parsing: re-serialized JSON is not guaranteed byte-identical to what the
// sender signed.

use ring::hmac;

const SIGNATURE_PREFIX: &str = "sha256=";

#[derive(Debug, thiserror::Error)]
#[error("webhook signature verification failed: {0}")]
pub struct SignatureError(pub &'static str);

/// Verify an `x-hub-signature-256` style header against the raw body.
///
/// Missing header, malformed header, or missing secret configuration is
/// always invalid, never valid-by-default. The digest comparison is
/// constant-time (`ring::hmac::verify`).
pub fn verify_signature(
    raw_body: &[u8],
    signature_header: Option<&str>,
    secret: &str,
) -> Result<(), SignatureError> {
    if secret.is_empty() {
        return Err(SignatureError("no webhook secret configured"));
    }
    let header = signature_header.ok_or(SignatureError("missing signature header"))?;
    let hex_digest = header
        .strip_prefix(SIGNATURE_PREFIX)
        .ok_or(SignatureError("malformed signature header"))?;
    let claimed = hex::decode(hex_digest).map_err(|_| SignatureError("malformed signature hex"))?;

    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    hmac::verify(&key, raw_body, &claimed).map_err(|_| SignatureError("signature mismatch"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(body: &[u8], secret: &str) -> String {
        let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
        let tag = hmac::sign(&key, body);
        format!("{}{}", SIGNATURE_PREFIX, hex::encode(tag.as_ref()))
    }

    #[test]
    fn test_valid_signature_accepted() {
        let body = br#"{"object":"page","entry":[]}"#;
        let header = sign(body, "s3cret");
        assert!(verify_signature(body, Some(&header), "s3cret").is_ok());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let body = br#"{"object":"page"}"#;
        let header = sign(body, "other");
        assert!(verify_signature(body, Some(&header), "s3cret").is_err());
    }

    #[test]
    fn test_tampered_body_rejected() {
        let header = sign(br#"{"amount":10}"#, "s3cret");
        assert!(verify_signature(br#"{"amount":99}"#, Some(&header), "s3cret").is_err());
    }

    #[test]
    fn test_missing_header_rejected() {
        assert!(verify_signature(b"{}", None, "s3cret").is_err());
    }

    #[test]
    fn test_malformed_header_rejected() {
        assert!(verify_signature(b"{}", Some("md5=abcd"), "s3cret").is_err());
        assert!(verify_signature(b"{}", Some("sha256=nothex"), "s3cret").is_err());
    }

    #[test]
    fn test_missing_secret_is_never_valid() {
        let body = b"{}";
        let header = sign(body, "");
        assert!(verify_signature(body, Some(&header), "").is_err());
    }

    #[test]
    fn test_reserialized_json_would_not_match() {
        // Same JSON value, different bytes: only the original raw body passes
        let original = br#"{"a": 1, "b": 2}"#;
        let reserialized = br#"{"a":1,"b":2}"#;
        let header = sign(original, "s3cret");
        assert!(verify_signature(original, Some(&header), "s3cret").is_ok());
        assert!(verify_signature(reserialized, Some(&header), "s3cret").is_err());
    }
}
