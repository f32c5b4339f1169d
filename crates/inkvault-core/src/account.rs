//! Account identifiers.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Account identifier length (20 bytes, address-sized)
pub const ACCOUNT_LEN: usize = 20;

/// An opaque, globally unique account identifier.
///
/// Supplied by the identity layer; this crate never creates or destroys
/// accounts. Renders as `0x`-prefixed lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Account([u8; ACCOUNT_LEN]);

impl Account {
    /// Wrap raw identifier bytes.
    pub const fn from_bytes(bytes: [u8; ACCOUNT_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw identifier bytes.
    pub fn as_bytes(&self) -> &[u8; ACCOUNT_LEN] {
        &self.0
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Account({self})")
    }
}

/// Errors from parsing an account string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountParseError {
    /// Hex digits did not decode to exactly [`ACCOUNT_LEN`] bytes
    #[error("account must be {ACCOUNT_LEN} bytes, got {0}")]
    WrongLength(usize),

    /// Input contained a non-hex character
    #[error("account is not valid hex: {0}")]
    InvalidHex(String),
}

impl FromStr for Account {
    type Err = AccountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);

        let bytes = hex::decode(digits).map_err(|e| AccountParseError::InvalidHex(e.to_string()))?;
        let bytes: [u8; ACCOUNT_LEN] =
            bytes.try_into().map_err(|b: Vec<u8>| AccountParseError::WrongLength(b.len()))?;

        Ok(Self(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_parse_roundtrip() {
        let account = Account::from_bytes([0xAB; ACCOUNT_LEN]);
        let text = account.to_string();

        assert_eq!(text, format!("0x{}", "ab".repeat(ACCOUNT_LEN)));
        assert_eq!(text.parse::<Account>().unwrap(), account);
    }

    #[test]
    fn parse_accepts_mixed_case_and_missing_prefix() {
        let upper = format!("0X{}", "AB".repeat(ACCOUNT_LEN));
        let bare = "ab".repeat(ACCOUNT_LEN);

        assert_eq!(upper.parse::<Account>().unwrap(), bare.parse::<Account>().unwrap());
    }

    #[test]
    fn parse_rejects_wrong_length() {
        assert_eq!("0xabcd".parse::<Account>(), Err(AccountParseError::WrongLength(2)));
    }

    #[test]
    fn parse_rejects_non_hex() {
        let text = format!("0x{}", "zz".repeat(ACCOUNT_LEN));
        assert!(matches!(text.parse::<Account>(), Err(AccountParseError::InvalidHex(_))));
    }
}
