//! Session key management.
//!
//! A [`Keyring`] is unlocked once per session: the password is stretched into
//! one key with a fresh salt and that key seals every envelope the session
//! writes. Envelopes written by earlier sessions carry their own salt, so
//! opening them derives (and caches) the key for that salt.
//!
//! Salts and nonces are drawn from the session's [`Environment`], so a seeded
//! environment reproduces every envelope exactly.

use std::collections::VecDeque;

use inkvault_core::Environment;
use inkvault_crypto::{
    DEFAULT_ITERATIONS, DerivedKey, Envelope, EnvelopeError, NONCE_LEN, SALT_LEN, derive_key, open,
    seal,
};
use zeroize::Zeroizing;

use crate::error::ClientError;

/// Most keys kept for salts other than the session's own.
pub const MAX_CACHED_KEYS: usize = 32;

struct CachedKey {
    salt: Vec<u8>,
    iterations: u32,
    key: DerivedKey,
}

/// Password-derived keys for one journal session.
pub struct Keyring<E: Environment> {
    env: E,
    password: Zeroizing<String>,
    current: DerivedKey,
    cache: VecDeque<CachedKey>,
}

impl<E: Environment> Keyring<E> {
    /// Unlock with the default iteration count.
    ///
    /// # Errors
    ///
    /// - `InvalidInput`: password is empty or whitespace
    pub fn unlock(env: E, password: &str) -> Result<Self, ClientError> {
        Self::with_iterations(env, password, DEFAULT_ITERATIONS)
    }

    /// Unlock with an explicit PBKDF2 iteration count.
    ///
    /// Envelopes written by this session record the count, so readers need
    /// no configuration to open them.
    ///
    /// # Errors
    ///
    /// - `InvalidInput`: password is empty or whitespace
    /// - `Envelope(KeyDerivationFailure)`: iteration count out of range
    pub fn with_iterations(env: E, password: &str, iterations: u32) -> Result<Self, ClientError> {
        if password.trim().is_empty() {
            return Err(ClientError::InvalidInput("password must not be empty".to_string()));
        }

        let mut salt = [0u8; SALT_LEN];
        env.random_bytes(&mut salt);
        let current = derive_key(password, Some(&salt), iterations)?;
        tracing::debug!(iterations, "keyring unlocked");

        Ok(Self {
            env,
            password: Zeroizing::new(password.to_string()),
            current,
            cache: VecDeque::new(),
        })
    }

    /// Seal `plaintext` with the session key.
    pub fn encrypt(&self, plaintext: &[u8]) -> String {
        self.encrypt_bound(plaintext, &[])
    }

    /// Seal `plaintext` bound to `aad`; opening needs the same `aad`.
    pub fn encrypt_bound(&self, plaintext: &[u8], aad: &[u8]) -> String {
        let mut nonce = [0u8; NONCE_LEN];
        self.env.random_bytes(&mut nonce);
        seal(&self.current, plaintext, nonce, aad).to_string()
    }

    /// Open an envelope written by any session that used this password.
    ///
    /// # Errors
    ///
    /// - `Envelope(MalformedEnvelope)`: not an envelope, or its iteration
    ///   count is out of range
    /// - `Envelope(DecryptionFailure)`: wrong password or tampered envelope
    pub fn decrypt(&mut self, envelope: &str) -> Result<Vec<u8>, ClientError> {
        self.decrypt_bound(envelope, &[])
    }

    /// Open an envelope sealed with [`Self::encrypt_bound`].
    pub fn decrypt_bound(&mut self, envelope: &str, aad: &[u8]) -> Result<Vec<u8>, ClientError> {
        let envelope: Envelope = envelope.parse()?;
        let key = self.key_for(&envelope)?;
        Ok(open(key, &envelope, aad)?)
    }

    /// Number of keys derived for foreign salts and still cached.
    pub fn cached_keys(&self) -> usize {
        self.cache.len()
    }

    fn key_for(&mut self, envelope: &Envelope) -> Result<&DerivedKey, EnvelopeError> {
        let Some(salt) = envelope.salt() else {
            return Ok(&self.current);
        };
        let iterations = envelope.iterations();

        if self.current.salt() == Some(salt) && self.current.iterations() == iterations {
            return Ok(&self.current);
        }

        let position =
            self.cache.iter().position(|c| c.salt == salt && c.iterations == iterations);
        let position = match position {
            Some(position) => position,
            None => {
                let key = derive_key(&self.password, Some(salt), iterations)?;
                tracing::debug!(iterations, "derived key for foreign salt");

                if self.cache.len() >= MAX_CACHED_KEYS {
                    self.cache.pop_front();
                }
                self.cache.push_back(CachedKey { salt: salt.to_vec(), iterations, key });
                self.cache.len() - 1
            },
        };

        self.cache
            .get(position)
            .map(|cached| &cached.key)
            .ok_or_else(|| EnvelopeError::KeyDerivationFailure("key cache miss".to_string()))
    }
}

impl<E: Environment> std::fmt::Debug for Keyring<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keyring")
            .field("current", &self.current)
            .field("cached_keys", &self.cache.len())
            .finish_non_exhaustive()
    }
}
