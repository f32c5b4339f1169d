//! Password-based key derivation using PBKDF2-HMAC-SHA256

use std::fmt;

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroize;

use super::{error::EnvelopeError, fill_random};

/// Default PBKDF2 iteration count.
///
/// Envelopes produced with this count omit it from the salt segment, keeping
/// them byte-compatible with the plain `salt.nonce.ciphertext` format.
pub const DEFAULT_ITERATIONS: u32 = 200_000;

/// Largest PBKDF2 iteration count accepted.
///
/// Envelopes name their own count, so an unbounded count would let whoever
/// wrote an envelope stall every reader.
pub const MAX_ITERATIONS: u32 = 10_000_000;

/// Length of a freshly generated salt (16 bytes)
pub const SALT_LEN: usize = 16;

/// Shortest caller-supplied salt accepted for derivation
pub const MIN_SALT_LEN: usize = 8;

/// Symmetric key length (256 bits)
pub const KEY_LEN: usize = 32;

/// A symmetric key derived from a password, plus the parameters needed to
/// derive it again.
///
/// `salt` is `None` for keys constructed from raw bytes; envelopes sealed
/// with such a key have an empty salt segment and can only be opened with
/// the key itself.
#[derive(Clone)]
pub struct DerivedKey {
    key: [u8; KEY_LEN],
    salt: Option<Vec<u8>>,
    iterations: u32,
}

impl DerivedKey {
    /// Wrap raw key bytes that have no originating salt.
    pub fn from_raw(key: [u8; KEY_LEN]) -> Self {
        Self { key, salt: None, iterations: DEFAULT_ITERATIONS }
    }

    /// 32-byte key for AES-256-GCM.
    pub fn key(&self) -> &[u8; KEY_LEN] {
        &self.key
    }

    /// Salt this key was derived with, if known.
    pub fn salt(&self) -> Option<&[u8]> {
        self.salt.as_deref()
    }

    /// PBKDF2 iteration count this key was derived with.
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Same key bytes, detached from the salt that produced them.
    pub fn without_salt(&self) -> Self {
        Self { key: self.key, salt: None, iterations: self.iterations }
    }
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedKey")
            .field("salt_len", &self.salt.as_ref().map(Vec::len))
            .field("iterations", &self.iterations)
            .finish_non_exhaustive()
    }
}

/// Key material accepted by [`crate::decrypt`].
#[derive(Clone, Copy)]
pub enum Secret<'a> {
    /// Use an already-derived key as-is, ignoring the envelope's salt
    Key(&'a DerivedKey),
    /// Re-derive the key from the salt and iteration count in the envelope
    Password(&'a str),
}

impl fmt::Debug for Secret<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.debug_tuple("Key").field(key).finish(),
            Self::Password(_) => f.write_str("Password(..)"),
        }
    }
}

/// Derive a 256-bit key from a password.
///
/// When `salt` is `None` a fresh random [`SALT_LEN`]-byte salt is generated,
/// so two sessions deriving from the same password get unrelated keys.
/// Deterministic for a fixed (password, salt, iterations).
///
/// An empty password is accepted; password policy belongs to the caller.
///
/// # Errors
///
/// - `KeyDerivationFailure`: `iterations` is zero or above [`MAX_ITERATIONS`],
///   or the salt is shorter than [`MIN_SALT_LEN`]
pub fn derive_key(
    password: &str,
    salt: Option<&[u8]>,
    iterations: u32,
) -> Result<DerivedKey, EnvelopeError> {
    if iterations == 0 {
        return Err(EnvelopeError::KeyDerivationFailure(
            "iteration count must be non-zero".to_string(),
        ));
    }
    if iterations > MAX_ITERATIONS {
        return Err(EnvelopeError::KeyDerivationFailure(format!(
            "iteration count {iterations} exceeds {MAX_ITERATIONS}"
        )));
    }

    let salt = match salt {
        Some(salt) if salt.len() < MIN_SALT_LEN => {
            return Err(EnvelopeError::KeyDerivationFailure(format!(
                "salt must be at least {MIN_SALT_LEN} bytes, got {}",
                salt.len()
            )));
        },
        Some(salt) => salt.to_vec(),
        None => {
            let mut salt = vec![0u8; SALT_LEN];
            fill_random(&mut salt);
            salt
        },
    };

    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut key);

    Ok(DerivedKey { key, salt: Some(salt), iterations })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAST: u32 = 1_000;

    #[test]
    fn derive_is_deterministic_for_fixed_salt() {
        let salt = [7u8; SALT_LEN];
        let a = derive_key("correct horse", Some(&salt), FAST).unwrap();
        let b = derive_key("correct horse", Some(&salt), FAST).unwrap();

        assert_eq!(a.key(), b.key(), "same inputs must produce same key");
    }

    #[test]
    fn fresh_salts_produce_unrelated_keys() {
        let a = derive_key("correct horse", None, FAST).unwrap();
        let b = derive_key("correct horse", None, FAST).unwrap();

        assert_ne!(a.salt(), b.salt());
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn generated_salt_has_expected_length() {
        let key = derive_key("pw", None, FAST).unwrap();
        assert_eq!(key.salt().map(<[u8]>::len), Some(SALT_LEN));
        assert_eq!(key.iterations(), FAST);
    }

    #[test]
    fn iteration_count_changes_key() {
        let salt = [1u8; SALT_LEN];
        let a = derive_key("pw", Some(&salt), FAST).unwrap();
        let b = derive_key("pw", Some(&salt), FAST + 1).unwrap();

        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn empty_password_is_allowed() {
        let key = derive_key("", Some(&[0u8; SALT_LEN]), FAST).unwrap();
        assert_eq!(key.key().len(), KEY_LEN);
    }

    #[test]
    fn zero_iterations_rejected() {
        let result = derive_key("pw", None, 0);
        assert!(matches!(result, Err(EnvelopeError::KeyDerivationFailure(_))));
    }

    #[test]
    fn excessive_iterations_rejected() {
        let result = derive_key("pw", Some(&[0u8; SALT_LEN]), MAX_ITERATIONS + 1);
        assert!(matches!(
            result,
            Err(EnvelopeError::KeyDerivationFailure(reason)) if reason.contains("exceeds")
        ));
    }

    #[test]
    fn short_salt_rejected() {
        let result = derive_key("pw", Some(&[0u8; MIN_SALT_LEN - 1]), FAST);
        assert!(matches!(
            result,
            Err(EnvelopeError::KeyDerivationFailure(reason)) if reason.contains("salt")
        ));
    }

    #[test]
    fn debug_never_prints_key_bytes() {
        let key = DerivedKey::from_raw([0xAB; KEY_LEN]);
        let rendered = format!("{key:?}");

        assert!(!rendered.contains("171"), "key byte leaked: {rendered}");
        assert!(!rendered.to_lowercase().contains("ab, ab"));
    }

    #[test]
    fn without_salt_keeps_key_bytes() {
        let key = derive_key("pw", None, FAST).unwrap();
        let detached = key.without_salt();

        assert_eq!(detached.key(), key.key());
        assert_eq!(detached.salt(), None);
    }
}
