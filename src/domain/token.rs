//! Solana token addresses
//!
//! A mint address is the base58 encoding of a 32-byte public key.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Wrapped SOL mint
pub const SOL_MINT: &str = "So11111111111111111111111111111111111111112";
/// USDC mint
pub const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

const PUBKEY_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenAddressError {
    #[error("Token address is empty")]
    Empty,
    #[error("Token address is not valid base58: {0}")]
    InvalidBase58(String),
    #[error("Token address decodes to {0} bytes (expected 32)")]
    InvalidLength(usize),
}

/// Validated token mint address
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TokenAddress(String);

impl TokenAddress {
    pub fn parse(raw: &str) -> Result<Self, TokenAddressError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TokenAddressError::Empty);
        }

        let bytes = bs58::decode(trimmed)
            .into_vec()
            .map_err(|e| TokenAddressError::InvalidBase58(e.to_string()))?;

        if bytes.len() != PUBKEY_LEN {
            return Err(TokenAddressError::InvalidLength(bytes.len()));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shortened form for log lines, e.g. `So11..1112`
    pub fn short(&self) -> String {
        if self.0.len() <= 10 {
            return self.0.clone();
        }
        format!("{}..{}", &self.0[..4], &self.0[self.0.len() - 4..])
    }
}

impl FromStr for TokenAddress {
    type Err = TokenAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TokenAddress {
    type Error = TokenAddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TokenAddress> for String {
    fn from(value: TokenAddress) -> Self {
        value.0
    }
}

impl fmt::Display for TokenAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_mints_parse() {
        assert!(TokenAddress::parse(SOL_MINT).is_ok());
        assert!(TokenAddress::parse(USDC_MINT).is_ok());
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        let addr = TokenAddress::parse(&format!("  {}\n", USDC_MINT)).unwrap();
        assert_eq!(addr.as_str(), USDC_MINT);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert_eq!(TokenAddress::parse(""), Err(TokenAddressError::Empty));
        // '0' and 'l' are outside the base58 alphabet
        assert!(matches!(
            TokenAddress::parse("0l0l0l"),
            Err(TokenAddressError::InvalidBase58(_))
        ));
        assert!(matches!(
            TokenAddress::parse("abc"),
            Err(TokenAddressError::InvalidLength(_))
        ));
    }

    #[test]
    fn test_short_form() {
        let addr = TokenAddress::parse(SOL_MINT).unwrap();
        assert_eq!(addr.short(), "So11..1112");
    }

    #[test]
    fn test_serde_validates() {
        let ok: Result<TokenAddress, _> = serde_json::from_str(&format!("\"{}\"", SOL_MINT));
        assert!(ok.is_ok());

        let bad: Result<TokenAddress, _> = serde_json::from_str("\"nope\"");
        assert!(bad.is_err());
    }
}
