//! Envelope codec errors.

use thiserror::Error;

/// Errors produced by key derivation, encryption and decryption.
///
/// Every authentication failure collapses into [`Self::DecryptionFailure`].
/// A wrong password, a wrong key, and a flipped ciphertext bit are
/// indistinguishable to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    /// Envelope text does not have the `salt.nonce.ciphertext` shape, or a
    /// segment does not decode.
    #[error("malformed envelope: {reason}")]
    MalformedEnvelope {
        /// What was wrong with the envelope
        reason: String,
    },

    /// Password decryption requested but the envelope carries no salt.
    #[error("envelope has no salt to derive a key from the password")]
    MissingSalt,

    /// Authentication tag did not verify.
    #[error("decryption failed")]
    DecryptionFailure,

    /// Key derivation parameters were malformed.
    #[error("key derivation failed: {0}")]
    KeyDerivationFailure(String),
}

impl EnvelopeError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedEnvelope { reason: reason.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decryption_failure_display_has_no_detail() {
        assert_eq!(EnvelopeError::DecryptionFailure.to_string(), "decryption failed");
    }

    #[test]
    fn malformed_display_includes_reason() {
        let err = EnvelopeError::malformed("missing nonce segment");
        assert_eq!(err.to_string(), "malformed envelope: missing nonce segment");
    }
}
