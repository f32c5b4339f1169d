//! Envelope text format
//!
//! `<salt>.<nonce>.<ciphertext>`, each segment standard base64 (padded).
//!
//! The salt segment is empty when the sealing key had no originating salt.
//! When the key was derived with a non-default iteration count the count is
//! appended to the salt segment as `<salt>$<iterations>`; `$` is outside the
//! base64 alphabet, so the split is unambiguous. Envelopes without a count
//! were derived with [`DEFAULT_ITERATIONS`].

use std::{fmt, str::FromStr};

use base64::{Engine as _, engine::general_purpose::STANDARD};

use super::{
    aead::{NONCE_LEN, TAG_LEN},
    error::EnvelopeError,
    kdf::{DEFAULT_ITERATIONS, MAX_ITERATIONS},
};

/// Separates the three envelope segments
const SEGMENT_DELIMITER: char = '.';

/// Separates the salt from an embedded iteration count
const ITERATIONS_DELIMITER: char = '$';

/// A parsed ciphertext envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    salt: Option<Vec<u8>>,
    iterations: u32,
    nonce: [u8; NONCE_LEN],
    ciphertext: Vec<u8>,
}

impl Envelope {
    pub(crate) fn from_parts(
        salt: Option<Vec<u8>>,
        iterations: u32,
        nonce: [u8; NONCE_LEN],
        ciphertext: Vec<u8>,
    ) -> Self {
        debug_assert!(ciphertext.len() >= TAG_LEN);
        Self { salt, iterations, nonce, ciphertext }
    }

    /// Salt the sealing key was derived with, if carried.
    pub fn salt(&self) -> Option<&[u8]> {
        self.salt.as_deref()
    }

    /// PBKDF2 iteration count to re-derive the key with.
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// 96-bit AEAD nonce.
    pub fn nonce(&self) -> &[u8; NONCE_LEN] {
        &self.nonce
    }

    /// Ciphertext including the 16-byte GCM tag.
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Plaintext length (ciphertext length minus authentication tag).
    pub fn plaintext_len(&self) -> usize {
        self.ciphertext.len().saturating_sub(TAG_LEN)
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(salt) = &self.salt {
            f.write_str(&STANDARD.encode(salt))?;
            if self.iterations != DEFAULT_ITERATIONS {
                write!(f, "{ITERATIONS_DELIMITER}{}", self.iterations)?;
            }
        }

        write!(
            f,
            "{SEGMENT_DELIMITER}{}{SEGMENT_DELIMITER}{}",
            STANDARD.encode(self.nonce),
            STANDARD.encode(&self.ciphertext)
        )
    }
}

impl FromStr for Envelope {
    type Err = EnvelopeError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut segments = text.split(SEGMENT_DELIMITER);

        let salt_segment = segments.next().unwrap_or_default();
        let nonce_segment = segments
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| EnvelopeError::malformed("missing nonce segment"))?;
        let ciphertext_segment = segments
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| EnvelopeError::malformed("missing ciphertext segment"))?;

        if segments.next().is_some() {
            return Err(EnvelopeError::malformed("unexpected extra segment"));
        }

        let (salt, iterations) = parse_salt_segment(salt_segment)?;

        let nonce: [u8; NONCE_LEN] =
            decode_segment("nonce", nonce_segment)?.try_into().map_err(|bytes: Vec<u8>| {
                EnvelopeError::malformed(format!(
                    "nonce must be {NONCE_LEN} bytes, got {}",
                    bytes.len()
                ))
            })?;

        let ciphertext = decode_segment("ciphertext", ciphertext_segment)?;
        if ciphertext.len() < TAG_LEN {
            return Err(EnvelopeError::malformed(format!(
                "ciphertext shorter than {TAG_LEN}-byte tag"
            )));
        }

        Ok(Self { salt, iterations, nonce, ciphertext })
    }
}

fn parse_salt_segment(segment: &str) -> Result<(Option<Vec<u8>>, u32), EnvelopeError> {
    if segment.is_empty() {
        return Ok((None, DEFAULT_ITERATIONS));
    }

    let (salt_b64, iterations) = match segment.split_once(ITERATIONS_DELIMITER) {
        Some((salt_b64, count)) => {
            let iterations = count
                .parse::<u32>()
                .ok()
                .filter(|&n| n > 0)
                .ok_or_else(|| EnvelopeError::malformed("invalid iteration count"))?;
            if iterations > MAX_ITERATIONS {
                return Err(EnvelopeError::malformed(format!(
                    "iteration count {iterations} exceeds {MAX_ITERATIONS}"
                )));
            }
            (salt_b64, iterations)
        },
        None => (segment, DEFAULT_ITERATIONS),
    };

    let salt = decode_segment("salt", salt_b64)?;
    if salt.is_empty() {
        return Err(EnvelopeError::malformed("empty salt"));
    }

    Ok((Some(salt), iterations))
}

fn decode_segment(name: &str, segment: &str) -> Result<Vec<u8>, EnvelopeError> {
    STANDARD
        .decode(segment)
        .map_err(|e| EnvelopeError::malformed(format!("{name} segment is not base64: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(salt: Option<Vec<u8>>, iterations: u32) -> Envelope {
        Envelope::from_parts(salt, iterations, [0x11; NONCE_LEN], vec![0x22; TAG_LEN + 4])
    }

    #[test]
    fn default_iterations_use_plain_three_part_format() {
        let text = sample(Some(vec![0x33; 16]), DEFAULT_ITERATIONS).to_string();

        assert_eq!(text.matches('.').count(), 2);
        assert!(!text.contains('$'));
    }

    #[test]
    fn custom_iterations_are_embedded_in_salt_segment() {
        let envelope = sample(Some(vec![0x33; 16]), 50_000);
        let text = envelope.to_string();

        let salt_segment = text.split('.').next().unwrap();
        assert!(salt_segment.ends_with("$50000"));

        let parsed: Envelope = text.parse().unwrap();
        assert_eq!(parsed.iterations(), 50_000);
        assert_eq!(parsed, envelope);
    }

    #[test]
    fn saltless_envelope_has_empty_first_segment() {
        let text = sample(None, DEFAULT_ITERATIONS).to_string();
        assert!(text.starts_with('.'));

        let parsed: Envelope = text.parse().unwrap();
        assert_eq!(parsed.salt(), None);
    }

    #[test]
    fn missing_nonce_is_malformed() {
        let result = "c2FsdA==..AAAA".parse::<Envelope>();
        assert!(matches!(
            result,
            Err(EnvelopeError::MalformedEnvelope { reason }) if reason.contains("nonce")
        ));
    }

    #[test]
    fn missing_ciphertext_is_malformed() {
        let result = "c2FsdA==.ERERERERERERERERERERERER".parse::<Envelope>();
        assert!(matches!(
            result,
            Err(EnvelopeError::MalformedEnvelope { reason }) if reason.contains("ciphertext")
        ));
    }

    #[test]
    fn single_segment_is_malformed() {
        assert!(matches!(
            "not-an-envelope".parse::<Envelope>(),
            Err(EnvelopeError::MalformedEnvelope { .. })
        ));
    }

    #[test]
    fn extra_segment_is_malformed() {
        let text = format!("{}.AAAA", sample(None, DEFAULT_ITERATIONS));
        assert!(matches!(text.parse::<Envelope>(), Err(EnvelopeError::MalformedEnvelope { .. })));
    }

    #[test]
    fn wrong_nonce_length_is_malformed() {
        let text = format!(".{}.{}", STANDARD.encode([0u8; 8]), STANDARD.encode([0u8; 32]));
        let result = text.parse::<Envelope>();
        assert!(matches!(
            result,
            Err(EnvelopeError::MalformedEnvelope { reason }) if reason.contains("12 bytes")
        ));
    }

    #[test]
    fn truncated_ciphertext_is_malformed() {
        let text =
            format!(".{}.{}", STANDARD.encode([0u8; NONCE_LEN]), STANDARD.encode([0u8; 4]));
        assert!(matches!(text.parse::<Envelope>(), Err(EnvelopeError::MalformedEnvelope { .. })));
    }

    #[test]
    fn bad_iteration_count_is_malformed() {
        for count in ["0", "-5", "lots", ""] {
            let text = format!(
                "{}${count}.{}.{}",
                STANDARD.encode([1u8; 16]),
                STANDARD.encode([0u8; NONCE_LEN]),
                STANDARD.encode([0u8; TAG_LEN])
            );
            assert!(
                matches!(text.parse::<Envelope>(), Err(EnvelopeError::MalformedEnvelope { .. })),
                "count {count:?} should be rejected"
            );
        }
    }

    #[test]
    fn iteration_count_above_cap_is_malformed() {
        for count in [MAX_ITERATIONS + 1, u32::MAX] {
            let text = format!(
                "{}${count}.{}.{}",
                STANDARD.encode([1u8; 16]),
                STANDARD.encode([0u8; NONCE_LEN]),
                STANDARD.encode([0u8; TAG_LEN])
            );
            let result = text.parse::<Envelope>();
            let rejected = matches!(
                &result,
                Err(EnvelopeError::MalformedEnvelope { reason }) if reason.contains("exceeds")
            );
            assert!(rejected, "count {count} should be rejected, got {result:?}");
        }

        let at_cap = sample(Some(vec![1u8; 16]), MAX_ITERATIONS).to_string();
        assert_eq!(at_cap.parse::<Envelope>().unwrap().iterations(), MAX_ITERATIONS);
    }

    #[test]
    fn invalid_base64_is_malformed() {
        let result = "!!!.ERERERERERERERERERERERER.AAAA".parse::<Envelope>();
        assert!(matches!(result, Err(EnvelopeError::MalformedEnvelope { .. })));
    }
}
