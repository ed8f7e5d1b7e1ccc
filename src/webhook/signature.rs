use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex encoded HMAC-SHA256 of the request body
pub const SIGNATURE_HEADER: &str = "x-cal-signature-256";

/// Checks webhook bodies against the secret shared with the
/// scheduling provider.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: Vec<u8>,
}

impl fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl SignatureVerifier {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self, payload: &[u8]) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts keys of any length");
        mac.update(payload);
        mac
    }

    /// Lower case hex digest, the same thing the sender puts in
    /// `x-cal-signature-256`.
    pub fn sign(&self, payload: &[u8]) -> String {
        hex::encode(self.mac(payload).finalize().into_bytes())
    }

    /// Signatures are checked against the exact bytes received, never
    /// a re-serialized body. The digest comparison is constant time.
    pub fn verify(&self, payload: &[u8], signature: &str) -> bool {
        let Ok(expected) = hex::decode(signature.trim()) else {
            return false;
        };
        self.mac(payload).verify_slice(&expected).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_verifies_its_own_signatures() {
        let verifier = SignatureVerifier::new("whsec");
        for payload in [&b""[..], b"{}", br#"{"triggerEvent":"BOOKING_CREATED"}"#] {
            let sig = verifier.sign(payload);
            assert!(verifier.verify(payload, &sig));
        }
    }

    #[test]
    fn it_matches_a_known_digest() {
        // echo -n 'hello' | openssl dgst -sha256 -hmac 'secret'
        let verifier = SignatureVerifier::new("secret");
        assert_eq!(
            verifier.sign(b"hello"),
            "88aab3ede8d3adf94d26ab90d3bafd4a2083070c3bcce9c014ee04a443847c0b"
        );
    }

    #[test]
    fn it_rejects_a_signature_for_another_payload() {
        let verifier = SignatureVerifier::new("whsec");
        let sig = verifier.sign(b"{\"a\":1}");
        assert!(!verifier.verify(b"{\"a\":2}", &sig));
        // Same JSON, different bytes
        assert!(!verifier.verify(b"{ \"a\": 1 }", &sig));
    }

    #[test]
    fn it_rejects_a_signature_made_with_another_secret() {
        let sig = SignatureVerifier::new("other").sign(b"{}");
        assert!(!SignatureVerifier::new("whsec").verify(b"{}", &sig));
    }

    #[test]
    fn it_rejects_garbage_signatures() {
        let verifier = SignatureVerifier::new("whsec");
        let sig = verifier.sign(b"{}");
        assert!(!verifier.verify(b"{}", ""));
        assert!(!verifier.verify(b"{}", "not hex"));
        assert!(!verifier.verify(b"{}", &sig[..32]));
        assert!(verifier.verify(b"{}", &sig.to_uppercase()));
    }

    #[test]
    fn it_does_not_leak_the_secret_in_debug_output() {
        let verifier = SignatureVerifier::new("whsec");
        assert!(!format!("{:?}", verifier).contains("whsec"));
    }
}
