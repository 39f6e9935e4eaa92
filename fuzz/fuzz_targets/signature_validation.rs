#![no_main]

//! Fuzz target for webhook signature validation.
//!
//! Feeds arbitrary payloads, keys and signature strings to the verifier.
//! It must never panic, and must only accept the signature it would itself
//! produce.

use hookgate_api::crypto;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    fuzz_signature_validation(data);
});

fn fuzz_signature_validation(data: &[u8]) {
    // First byte picks the split between key and payload.
    let Some((&split, rest)) = data.split_first() else {
        return;
    };
    let split = usize::from(split).min(rest.len());
    let (key, payload) = rest.split_at(split);

    let supplied = String::from_utf8_lossy(payload);
    let keys: [&[u8]; 4] = [b"", b"secret", &[0u8; 64], key];

    for key in keys {
        if key.is_empty() {
            // Nothing verifies against an empty key
            assert!(!crypto::verify(payload, Some(&supplied), key));
            continue;
        }

        // Arbitrary strings as signatures
        let expected = crypto::sign(payload, key).expect("non-empty key signs");
        if crypto::verify(payload, Some(&supplied), key) {
            assert_eq!(expected, supplied.to_ascii_lowercase());
        }

        // Own signature must round-trip
        assert!(crypto::verify(payload, Some(&expected), key));
        assert!(!crypto::verify(payload, Some(&expected[..expected.len() - 1]), key));
        assert!(!crypto::verify(payload, None, key));
    }
}
