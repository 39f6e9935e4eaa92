//! Webhook signature generation and verification.
//!
//! Signatures are the lowercase or uppercase hex encoding of an
//! HMAC-SHA256 over the raw body, keyed with the shared signing key. The
//! body must be the exact bytes the sender signed: transport encodings are
//! removed first and the payload is never re-serialized.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::{Choice, ConstantTimeEq};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Reasons a signature fails to verify.
///
/// None of the variants carry the supplied signature or the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// No signature, or an empty one, was supplied.
    #[error("signature missing")]
    MissingSignature,
    /// The signing key is empty or rejected by the MAC.
    #[error("signing key invalid")]
    InvalidKey,
    /// The signature is not hex.
    #[error("signature is not hex")]
    InvalidFormat,
    /// The signature does not match the body.
    #[error("signature mismatch")]
    Mismatch,
}

impl SignatureError {
    /// Short reason suitable for logs.
    pub const fn reason(self) -> &'static str {
        match self {
            Self::MissingSignature => "signature missing",
            Self::InvalidKey => "signing key invalid",
            Self::InvalidFormat => "signature is not hex",
            Self::Mismatch => "signature mismatch",
        }
    }
}

/// Verifies `supplied` against the HMAC-SHA256 of `payload`.
///
/// Returns `false` for an absent or empty signature, an empty key, a
/// non-hex signature, or a mismatch.
///
/// # Example
///
/// ```
/// use hookgate_api::crypto::{sign, verify};
///
/// let body = br#"{"id":"evt_1"}"#;
/// let signature = sign(body, b"signing-key").unwrap();
///
/// assert!(verify(body, Some(&signature), b"signing-key"));
/// assert!(!verify(body, None, b"signing-key"));
/// ```
pub fn verify(payload: &[u8], supplied: Option<&str>, key: &[u8]) -> bool {
    check_signature(payload, supplied, key).is_ok()
}

/// Like [`verify`] but reports why verification failed.
///
/// # Errors
///
/// Returns the `SignatureError` describing the first failed condition.
pub fn check_signature(
    payload: &[u8],
    supplied: Option<&str>,
    key: &[u8],
) -> Result<(), SignatureError> {
    let supplied = match supplied {
        Some(signature) if !signature.is_empty() => signature,
        _ => return Err(SignatureError::MissingSignature),
    };

    if key.is_empty() {
        return Err(SignatureError::InvalidKey);
    }

    let supplied = hex::decode(supplied).map_err(|_| SignatureError::InvalidFormat)?;
    let expected = compute_mac(payload, key)?;

    if constant_time_eq(&expected, &supplied) {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Computes the lowercase hex HMAC-SHA256 signature of `payload`.
///
/// # Errors
///
/// Returns `SignatureError::InvalidKey` if the MAC rejects the key.
pub fn sign(payload: &[u8], key: &[u8]) -> Result<String, SignatureError> {
    compute_mac(payload, key).map(hex::encode)
}

fn compute_mac(payload: &[u8], key: &[u8]) -> Result<Vec<u8>, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| SignatureError::InvalidKey)?;
    mac.update(payload);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Constant-time comparison of an expected MAC with supplied bytes.
///
/// Runs over the full expected length whatever the supplied length, and
/// folds the length check into the result instead of returning early.
fn constant_time_eq(expected: &[u8], supplied: &[u8]) -> bool {
    let same_len = (expected.len() as u64).ct_eq(&(supplied.len() as u64));

    let same_bytes = expected.iter().enumerate().fold(Choice::from(1), |acc, (i, byte)| {
        acc & byte.ct_eq(supplied.get(i).unwrap_or(&0))
    });

    (same_len & same_bytes).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"test_secret";

    #[test]
    fn verify_accepts_correct_signature() {
        let payload = b"test payload";
        let signature = sign(payload, KEY).unwrap();

        assert!(verify(payload, Some(&signature), KEY));
    }

    #[test]
    fn verify_accepts_uppercase_hex() {
        let payload = b"test payload";
        let signature = sign(payload, KEY).unwrap().to_uppercase();

        assert!(verify(payload, Some(&signature), KEY));
    }

    #[test]
    fn verify_rejects_wrong_key() {
        let payload = b"test payload";
        let signature = sign(payload, b"other_secret").unwrap();

        assert_eq!(check_signature(payload, Some(&signature), KEY), Err(SignatureError::Mismatch));
    }

    #[test]
    fn verify_rejects_missing_and_empty() {
        assert_eq!(check_signature(b"x", None, KEY), Err(SignatureError::MissingSignature));
        assert_eq!(check_signature(b"x", Some(""), KEY), Err(SignatureError::MissingSignature));
    }

    #[test]
    fn verify_rejects_empty_key() {
        let signature = sign(b"x", KEY).unwrap();
        assert_eq!(check_signature(b"x", Some(&signature), b""), Err(SignatureError::InvalidKey));
    }

    #[test]
    fn verify_rejects_non_hex() {
        assert_eq!(
            check_signature(b"x", Some("sha256=not-hex"), KEY),
            Err(SignatureError::InvalidFormat)
        );
    }

    #[test]
    fn verify_rejects_truncated_signature() {
        let payload = b"test payload";
        let signature = sign(payload, KEY).unwrap();

        assert_eq!(
            check_signature(payload, Some(&signature[..32]), KEY),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn verify_rejects_extended_signature() {
        let payload = b"test payload";
        let signature = format!("{}00", sign(payload, KEY).unwrap());

        assert_eq!(check_signature(payload, Some(&signature), KEY), Err(SignatureError::Mismatch));
    }

    #[test]
    fn verify_is_sensitive_to_reserialization() {
        let signed = br#"{"id": "evt_1"}"#;
        let reserialized = br#"{"id":"evt_1"}"#;
        let signature = sign(signed, KEY).unwrap();

        assert!(!verify(reserialized, Some(&signature), KEY));
    }

    #[test]
    fn sign_is_consistent() {
        let sig1 = sign(b"payload", KEY).unwrap();
        let sig2 = sign(b"payload", KEY).unwrap();

        assert_eq!(sig1, sig2);
        assert_eq!(sig1.len(), 64);
    }

    #[test]
    fn sign_matches_rfc_4231_case_2() {
        let signature = sign(b"what do ya want for nothing?", b"Jefe").unwrap();
        assert_eq!(signature, "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843");
    }

    #[test]
    fn constant_time_eq_handles_lengths() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"hello", b"hello_world"));
        assert!(!constant_time_eq(b"hello", b"hell"));
        assert!(!constant_time_eq(b"hello", b""));
    }
}
