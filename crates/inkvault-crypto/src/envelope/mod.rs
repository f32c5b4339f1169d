//! Envelope codec
//!
//! Key derivation ([`derive_key`]), randomized encryption ([`encrypt`]) and
//! decryption by key or password ([`decrypt`]). The `*_bound` variants add
//! associated data that is authenticated but not stored in the envelope.

mod aead;
mod error;
mod format;
mod kdf;

pub use aead::{NONCE_LEN, TAG_LEN, open, seal};
pub use error::EnvelopeError;
pub use format::Envelope;
pub use kdf::{
    DEFAULT_ITERATIONS, DerivedKey, KEY_LEN, MAX_ITERATIONS, MIN_SALT_LEN, SALT_LEN, Secret,
    derive_key,
};

/// Encrypt `plaintext` under `key` with a fresh random nonce.
///
/// The returned envelope carries the key's salt (if any), so it can later be
/// opened with the password alone.
pub fn encrypt(key: &DerivedKey, plaintext: &[u8]) -> Envelope {
    encrypt_bound(key, plaintext, &[])
}

/// Encrypt with associated data.
///
/// `aad` is not stored; [`decrypt_bound`] must be given the same bytes.
pub fn encrypt_bound(key: &DerivedKey, plaintext: &[u8], aad: &[u8]) -> Envelope {
    let mut nonce = [0u8; NONCE_LEN];
    fill_random(&mut nonce);
    seal(key, plaintext, nonce, aad)
}

/// Decrypt envelope text with a key or a password.
///
/// # Errors
///
/// - `MalformedEnvelope`: the text is not a well-formed envelope
/// - `MissingSalt`: a password was given but the envelope has no salt
/// - `KeyDerivationFailure`: the embedded salt or iteration count is unusable
/// - `DecryptionFailure`: wrong key or password, or tampered envelope
pub fn decrypt(secret: Secret<'_>, envelope: &str) -> Result<Vec<u8>, EnvelopeError> {
    decrypt_bound(secret, envelope, &[])
}

/// Decrypt envelope text that was sealed with associated data.
///
/// # Errors
///
/// Same as [`decrypt`]. A mismatched `aad` is a `DecryptionFailure`.
pub fn decrypt_bound(
    secret: Secret<'_>,
    envelope: &str,
    aad: &[u8],
) -> Result<Vec<u8>, EnvelopeError> {
    let envelope: Envelope = envelope.parse()?;

    match secret {
        Secret::Key(key) => open(key, &envelope, aad),
        Secret::Password(password) => {
            let salt = envelope.salt().ok_or(EnvelopeError::MissingSalt)?;
            let key = derive_key(password, Some(salt), envelope.iterations())?;
            open(&key, &envelope, aad)
        },
    }
}

/// Fill `buffer` from the OS cryptographic RNG.
///
/// # Panics
///
/// Panics if the OS RNG fails. Sealing without working randomness would risk
/// nonce reuse, which is worse than aborting.
#[allow(clippy::expect_used)]
pub(crate) fn fill_random(buffer: &mut [u8]) {
    getrandom::fill(buffer).expect("invariant: OS RNG failure is unrecoverable for sealing");
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAST: u32 = 1_000;

    #[test]
    fn password_roundtrip_uses_embedded_salt() {
        let key = derive_key("hunter2", None, FAST).unwrap();
        let envelope = encrypt(&key, b"first entry").to_string();

        let plaintext = decrypt(Secret::Password("hunter2"), &envelope).unwrap();
        assert_eq!(plaintext, b"first entry");
    }

    #[test]
    fn key_roundtrip() {
        let key = derive_key("hunter2", None, FAST).unwrap();
        let envelope = encrypt(&key, b"first entry").to_string();

        assert_eq!(decrypt(Secret::Key(&key), &envelope).unwrap(), b"first entry");
    }

    #[test]
    fn default_iteration_password_roundtrip() {
        let key = derive_key("hunter2", None, DEFAULT_ITERATIONS).unwrap();
        let envelope = encrypt(&key, b"slow path").to_string();

        assert_eq!(envelope.matches('.').count(), 2);
        assert_eq!(decrypt(Secret::Password("hunter2"), &envelope).unwrap(), b"slow path");
    }

    #[test]
    fn opens_envelope_written_by_browser_client() {
        // salt 00..0f, nonce a0..ab, PBKDF2-SHA256 at 200 000 iterations, AES-256-GCM
        let envelope = "AAECAwQFBgcICQoLDA0ODw==.oKGio6Slpqeoqaqr.\
                        6ZI9X/8f62kOgHgQDV+QtV1M1gosLflxYoznjx5DuCs=";

        let password = Secret::Password("correct horse battery staple");
        assert_eq!(decrypt(password, envelope).unwrap(), b"Went for a walk.");

        assert_eq!(
            decrypt(Secret::Password("correct horse battery stapler"), envelope),
            Err(EnvelopeError::DecryptionFailure)
        );
    }

    #[test]
    fn foreign_iteration_count_above_cap_is_refused_before_derivation() {
        let key = derive_key("pw", None, FAST).unwrap();
        let text = encrypt(&key, b"x").to_string();
        let (salt, rest) = text.split_once('$').unwrap();
        let (_, tail) = rest.split_once('.').unwrap();
        let hostile = format!("{salt}${}.{tail}", u32::MAX);

        assert!(matches!(
            decrypt(Secret::Password("pw"), &hostile),
            Err(EnvelopeError::MalformedEnvelope { .. })
        ));
    }

    #[test]
    fn wrong_password_is_decryption_failure() {
        let key = derive_key("hunter2", None, FAST).unwrap();
        let envelope = encrypt(&key, b"secret").to_string();

        assert_eq!(
            decrypt(Secret::Password("hunter3"), &envelope),
            Err(EnvelopeError::DecryptionFailure)
        );
    }

    #[test]
    fn password_without_salt_is_missing_salt() {
        let key = derive_key("hunter2", None, FAST).unwrap().without_salt();
        let envelope = encrypt(&key, b"secret").to_string();

        assert_eq!(
            decrypt(Secret::Password("hunter2"), &envelope),
            Err(EnvelopeError::MissingSalt)
        );
        assert_eq!(decrypt(Secret::Key(&key), &envelope).unwrap(), b"secret");
    }

    #[test]
    fn stale_session_key_still_decrypts_when_salt_travels() {
        let old = derive_key("pw", None, FAST).unwrap();
        let envelope = encrypt(&old, b"written last week").to_string();

        let _newer = derive_key("pw", None, FAST).unwrap();
        let _newest = derive_key("pw", None, FAST).unwrap();

        assert_eq!(decrypt(Secret::Password("pw"), &envelope).unwrap(), b"written last week");
    }

    #[test]
    fn bound_roundtrip_requires_same_aad() {
        let key = derive_key("pw", None, FAST).unwrap();
        let envelope = encrypt_bound(&key, b"bound", b"slot-0").to_string();

        assert_eq!(decrypt_bound(Secret::Key(&key), &envelope, b"slot-0").unwrap(), b"bound");
        assert_eq!(decrypt(Secret::Key(&key), &envelope), Err(EnvelopeError::DecryptionFailure));
    }

    #[test]
    fn fill_random_fills_buffer() {
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        fill_random(&mut a);
        fill_random(&mut b);

        assert_ne!(a, b);
    }
}
