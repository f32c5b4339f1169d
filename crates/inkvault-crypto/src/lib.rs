//! Inkvault Envelope Cryptography
//!
//! Turns a human password into a reusable symmetric key and a plaintext into
//! a portable, self-describing, integrity-checked text envelope. Nothing in
//! this crate knows about the record store; the envelope is an opaque blob
//! once it leaves here.
//!
//! # Key Lifecycle
//!
//! ```text
//! Password + Salt (16 random bytes)
//!        │
//!        ▼
//! PBKDF2-HMAC-SHA256 (iterations) → 256-bit key
//!        │
//!        ▼
//! AES-256-GCM (fresh 96-bit nonce per call) → ciphertext || tag
//!        │
//!        ▼
//! "<salt>.<nonce>.<ciphertext>" (each segment base64)
//! ```
//!
//! A key is derived once per session and reused for many encryptions. Each
//! envelope carries the salt its key was derived from, so a reader holding
//! only the password can always re-derive the right key, even when the
//! session that wrote the envelope used a different salt.
//!
//! # Security
//!
//! Confidentiality:
//! - Nonces come from the OS RNG on every call and are never reused for a key
//! - Salts make every derivation session produce an unrelated key
//!
//! Integrity:
//! - GCM tag covers the ciphertext and any associated data
//! - Wrong password and tampered envelope fail identically
//!   ([`EnvelopeError::DecryptionFailure`]), so a failed decrypt is never a
//!   password oracle
//!
//! Key hygiene:
//! - [`DerivedKey`] zeroizes its bytes on drop and never prints them

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod envelope;

pub use envelope::{
    DEFAULT_ITERATIONS, DerivedKey, Envelope, EnvelopeError, KEY_LEN, MAX_ITERATIONS,
    MIN_SALT_LEN, NONCE_LEN, SALT_LEN, Secret, TAG_LEN, decrypt, decrypt_bound, derive_key,
    encrypt, encrypt_bound, open, seal,
};
