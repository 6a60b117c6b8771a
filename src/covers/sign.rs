//! HMAC-signed cover URLs for the local backend.
//!
//! The local store has no external presigning service, so the server
//! signs its own `/covers/{key}` URLs: an HMAC-SHA256 over the method,
//! path, and expiry timestamp, verified by the cover-serving handlers.

use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Characters percent-encoded in the key segment of a signed URL.
/// Slashes are kept literal so keys stay readable as paths.
const KEY_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'?')
    .add(b'<')
    .add(b'>')
    .add(b'`');

/// Signs and verifies `/covers/{key}` URLs.
#[derive(Clone)]
pub struct UrlSigner {
    secret: String,
    base_url: String,
}

/// Why a presented signature was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyError {
    /// The expiry timestamp has passed.
    Expired,
    /// The signature does not match.
    Mismatch,
}

impl UrlSigner {
    pub fn new(secret: impl Into<String>, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            secret: secret.into(),
            base_url,
        }
    }

    /// Compute the hex signature over `method`, the key path, and the
    /// expiry timestamp.
    pub fn signature(&self, method: &str, key: &str, expires: u64) -> String {
        let string_to_sign = format!("{method}\n/covers/{key}\n{expires}");
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(string_to_sign.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Build a signed URL valid for `expires_in_seconds` from now.
    pub fn signed_url(&self, method: &str, key: &str, expires_in_seconds: u64) -> String {
        let expires = unix_now() + expires_in_seconds;
        let signature = self.signature(method, key, expires);
        let encoded_key = utf8_percent_encode(key, KEY_ENCODE_SET);
        format!(
            "{}/covers/{}?expires={}&signature={}",
            self.base_url, encoded_key, expires, signature
        )
    }

    /// Verify a presented signature for `method` and `key`.
    pub fn verify(
        &self,
        method: &str,
        key: &str,
        expires: u64,
        signature: &str,
    ) -> Result<(), VerifyError> {
        if expires < unix_now() {
            return Err(VerifyError::Expired);
        }
        let expected = self.signature(method, key, expires);
        if expected.as_bytes().ct_eq(signature.as_bytes()).into() {
            Ok(())
        } else {
            Err(VerifyError::Mismatch)
        }
    }
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

// ── Tests ───────────────────────────────────────────────────────────
