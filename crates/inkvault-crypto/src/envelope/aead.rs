//! Envelope sealing using `AES-256-GCM`
//!
//! Both functions are pure - the nonce is provided by the caller. The
//! randomized entry points live in the parent module.

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit, Payload},
};

use super::{error::EnvelopeError, format::Envelope, kdf::DerivedKey};

/// Nonce size for `AES-256-GCM` (96 bits)
pub const NONCE_LEN: usize = 12;

/// GCM tag size (16 bytes)
pub const TAG_LEN: usize = 16;

/// Seal `plaintext` under `key` with an explicit nonce.
///
/// `aad` is authenticated but not encrypted and is not stored in the
/// envelope; the same bytes must be supplied to [`open`].
///
/// # Security
///
/// Reusing a nonce with the same key breaks confidentiality. Production
/// callers go through [`crate::encrypt`], which draws a fresh nonce from the
/// OS RNG on every call.
pub fn seal(key: &DerivedKey, plaintext: &[u8], nonce: [u8; NONCE_LEN], aad: &[u8]) -> Envelope {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.key()));

    let Ok(ciphertext) = cipher.encrypt(Nonce::from_slice(&nonce), Payload { msg: plaintext, aad })
    else {
        unreachable!("AES-256-GCM encryption cannot fail with valid inputs");
    };

    Envelope::from_parts(key.salt().map(<[u8]>::to_vec), key.iterations(), nonce, ciphertext)
}

/// Open a parsed envelope with a key.
///
/// # Errors
///
/// - `DecryptionFailure`: tag did not verify (wrong key, wrong `aad`, or
///   tampered envelope)
pub fn open(key: &DerivedKey, envelope: &Envelope, aad: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.key()));

    cipher
        .decrypt(Nonce::from_slice(envelope.nonce()), Payload { msg: envelope.ciphertext(), aad })
        .map_err(|_| EnvelopeError::DecryptionFailure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::kdf::KEY_LEN;

    fn test_key(seed: u8) -> DerivedKey {
        let mut key = [0u8; KEY_LEN];
        for (i, byte) in key.iter_mut().enumerate() {
            *byte = (i as u8).wrapping_add(seed);
        }
        DerivedKey::from_raw(key)
    }

    #[test]
    fn matches_known_aes_gcm_output() {
        let key = test_key(0);
        let envelope = seal(&key, b"dear diary", [0x00; NONCE_LEN], &[]);

        // ORACLE: AES-256-GCM, key 00..1f, zero nonce, no associated data
        assert_eq!(envelope.to_string(), ".AAAAAAAAAAAAAAAA.atnUrJVI6tx60SJ9l0uourzL5RVbVDmsZgk=");
    }

    #[test]
    fn seal_open_roundtrip() {
        let key = test_key(0);
        let envelope = seal(&key, b"dear diary", [0xAB; NONCE_LEN], &[]);

        assert_eq!(open(&key, &envelope, &[]).unwrap(), b"dear diary");
    }

    #[test]
    fn empty_plaintext_roundtrip() {
        let key = test_key(0);
        let envelope = seal(&key, b"", [0x00; NONCE_LEN], &[]);

        assert_eq!(envelope.ciphertext().len(), TAG_LEN);
        assert_eq!(open(&key, &envelope, &[]).unwrap(), b"");
    }

    #[test]
    fn ciphertext_is_plaintext_plus_tag() {
        let key = test_key(0);
        let envelope = seal(&key, b"twelve bytes", [0x00; NONCE_LEN], &[]);

        assert_eq!(envelope.ciphertext().len(), 12 + TAG_LEN);
        assert_eq!(envelope.plaintext_len(), 12);
    }

    #[test]
    fn different_nonces_produce_different_ciphertexts() {
        let key = test_key(0);
        let a = seal(&key, b"same", [0x00; NONCE_LEN], &[]);
        let b = seal(&key, b"same", [0xFF; NONCE_LEN], &[]);

        assert_ne!(a.ciphertext(), b.ciphertext());
    }

    #[test]
    fn wrong_key_fails() {
        let envelope = seal(&test_key(0), b"secret", [0x00; NONCE_LEN], &[]);
        let result = open(&test_key(1), &envelope, &[]);

        assert_eq!(result, Err(EnvelopeError::DecryptionFailure));
    }

    #[test]
    fn mismatched_aad_fails() {
        let key = test_key(0);
        let envelope = seal(&key, b"secret", [0x00; NONCE_LEN], b"owner=1;index=0");

        assert!(open(&key, &envelope, b"owner=1;index=0").is_ok());
        assert_eq!(
            open(&key, &envelope, b"owner=1;index=1"),
            Err(EnvelopeError::DecryptionFailure)
        );
    }

    #[test]
    fn sealed_envelope_carries_key_salt() {
        let key = crate::derive_key("pw", Some(&[9u8; 16]), 1_000).unwrap();
        let envelope = seal(&key, b"x", [0x00; NONCE_LEN], &[]);

        assert_eq!(envelope.salt(), Some(&[9u8; 16][..]));
        assert_eq!(envelope.iterations(), 1_000);
    }
}
