use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

use crate::error::{AttachError, AttachResult};

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_PARAM: &str = "signature";

/// Signs canonical attachment paths and verifies inbound tokens.
///
/// Tokens are HMAC-SHA256 over the path, base64url encoded. Verification
/// recomputes the mac and compares in constant time, so a token can not
/// be guessed byte by byte off response timing.
#[derive(Clone)]
pub struct Signer {
    secret: Vec<u8>,
}

impl Signer {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.secret).expect("hmac accepts keys of any length")
    }

    /// Token for a canonical path
    pub fn sign(&self, path: &str) -> String {
        let mut mac = self.mac();
        mac.update(path.as_bytes());
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }

    /// Append a signature query parameter to a canonical path
    pub fn append_signature(&self, path: &str) -> String {
        format!("{}?{}={}", path, SIGNATURE_PARAM, self.sign(path))
    }

    /// Verify a token against a canonical path
    pub fn verify(&self, path: &str, token: &str) -> AttachResult<()> {
        let token_bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| {
                warn!(path, "malformed url signature token");
                AttachError::InvalidSignature
            })?;

        let mut mac = self.mac();
        mac.update(path.as_bytes());
        mac.verify_slice(&token_bytes).map_err(|_| {
            warn!(path, "url signature mismatch");
            AttachError::InvalidSignature
        })
    }

    /// Verify a full request path of the form `path?signature=token`
    pub fn verify_path(&self, request_path: &str) -> AttachResult<()> {
        let (path, query) = request_path.split_once('?').ok_or_else(|| {
            warn!(path = request_path, "missing url signature");
            AttachError::InvalidSignature
        })?;

        let token = query
            .split('&')
            .find_map(|pair| pair.strip_prefix(SIGNATURE_PARAM)?.strip_prefix('='))
            .ok_or_else(|| {
                warn!(path, "missing url signature");
                AttachError::InvalidSignature
            })?;

        self.verify(path, token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_paths_verify() {
        let signer = Signer::new("top secret");
        let token = signer.sign("/cache/abc123/document");
        signer.verify("/cache/abc123/document", &token).unwrap();
    }

    #[test]
    fn signing_is_deterministic() {
        let signer = Signer::new("top secret");
        assert_eq!(signer.sign("/cache/abc/file"), signer.sign("/cache/abc/file"));
        assert_ne!(signer.sign("/cache/abc/file"), signer.sign("/cache/abd/file"));
    }

    #[test]
    fn rejects_a_tampered_path() {
        let signer = Signer::new("top secret");
        let token = signer.sign("/cache/abc123/document");
        let err = signer.verify("/cache/abc999/document", &token).unwrap_err();
        assert!(matches!(err, AttachError::InvalidSignature));
    }

    #[test]
    fn rejects_a_tampered_token() {
        let signer = Signer::new("top secret");
        let mut token = signer.sign("/cache/abc123/document");
        token.pop();
        token.push('A');
        let err = signer.verify("/cache/abc123/document", &token).unwrap_err();
        assert!(matches!(err, AttachError::InvalidSignature));
    }

    #[test]
    fn rejects_a_different_secret() {
        let token = Signer::new("one secret").sign("/cache/abc123/document");
        let err = Signer::new("another secret")
            .verify("/cache/abc123/document", &token)
            .unwrap_err();
        assert!(matches!(err, AttachError::InvalidSignature));
    }

    #[test]
    fn round_trips_through_append_signature() {
        let signer = Signer::new("top secret");
        let url = signer.append_signature("/cache/abc123/document");
        signer.verify_path(&url).unwrap();
    }

    #[test]
    fn rejects_a_request_with_no_signature() {
        let signer = Signer::new("top secret");
        assert!(matches!(
            signer.verify_path("/cache/abc123/document").unwrap_err(),
            AttachError::InvalidSignature
        ));
        assert!(matches!(
            signer
                .verify_path("/cache/abc123/document?other=1")
                .unwrap_err(),
            AttachError::InvalidSignature
        ));
    }
}
