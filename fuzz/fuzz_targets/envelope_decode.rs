//! Fuzz target for envelope parsing and opening
//!
//! Feeds arbitrary text to the envelope parser and, when it parses, to the
//! AEAD open path.
//!
//! # Invariants
//!
//! - Parsing NEVER panics; malformed text is `MalformedEnvelope`
//! - A parsed envelope re-encodes to text that parses to the same value
//! - Opening a parsed envelope with an unrelated key fails cleanly

#![no_main]

use inkvault_crypto::{DerivedKey, Envelope, KEY_LEN, open};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);

    let Ok(envelope) = text.parse::<Envelope>() else {
        return;
    };

    let reencoded = envelope.to_string();
    let reparsed: Envelope = reencoded.parse().expect("re-encoded envelope must parse");
    assert_eq!(reparsed, envelope, "re-encoding changed the envelope");

    let key = DerivedKey::from_raw([0x5a; KEY_LEN]);
    let _ = open(&key, &envelope, b"");
});
