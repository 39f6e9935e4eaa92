//! Caller authorization against the shared webhook token.
//!
//! The credential is compared with the expected token after hashing both
//! with SHA-256, so the comparison always runs over two 32-byte digests and
//! neither the token's length nor its content shows up in timing.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Checks a caller credential against the expected token.
///
/// An absent credential always fails, as does an empty expected token.
///
/// # Example
///
/// ```
/// use hookgate_api::auth::check;
///
/// assert!(check(Some("token"), "token"));
/// assert!(!check(None, "token"));
/// assert!(!check(Some(""), ""));
/// ```
pub fn check(credential: Option<&str>, expected_token: &str) -> bool {
    let Some(credential) = credential else { return false };

    if expected_token.is_empty() {
        return false;
    }

    let supplied = Sha256::digest(credential.as_bytes());
    let expected = Sha256::digest(expected_token.as_bytes());

    supplied.as_slice().ct_eq(expected.as_slice()).into()
}
