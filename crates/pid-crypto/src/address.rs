//! Short peer addresses.
//!
//! An address is the first 40 bits of the SHA-512 digest of the packed
//! public key, written as 10 lowercase hex digits.

use std::fmt;
use std::str::FromStr;

use crate::c25519::PublicKey;
use crate::hash::sha512;

/// Address length in bytes.
pub const ADDRESS_LENGTH: usize = 5;
/// Address length in hex digits.
pub const ADDRESS_HEX_LENGTH: usize = ADDRESS_LENGTH * 2;

/// Addresses starting with this byte are reserved.
pub const RESERVED_PREFIX: u8 = 0xff;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("invalid address length: expected 10 hex digits, got {0}")]
    InvalidLength(usize),
    #[error("address is not hex")]
    InvalidHex,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// Derive the address belonging to `public`.
    pub fn derive(public: &PublicKey) -> Self {
        let digest = sha512(&public.to_bytes());
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes.copy_from_slice(&digest[..ADDRESS_LENGTH]);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Zero and `ff`-prefixed addresses are never assigned to identities.
    pub fn is_reserved(&self) -> bool {
        self.0 == [0u8; ADDRESS_LENGTH] || self.0[0] == RESERVED_PREFIX
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != ADDRESS_HEX_LENGTH {
            return Err(AddressError::InvalidLength(s.len()));
        }
        let mut bytes = [0u8; ADDRESS_LENGTH];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| AddressError::InvalidHex)?;
        Ok(Self(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::c25519;

    #[test]
    fn test_derive_is_digest_prefix() {
        let pair = c25519::generate().unwrap();
        let address = Address::derive(&pair.public);
        let digest = sha512(&pair.public.to_bytes());
        assert_eq!(address.as_bytes(), &digest[..5]);
    }

    #[test]
    fn test_derive_deterministic() {
        let pair = c25519::generate().unwrap();
        assert_eq!(Address::derive(&pair.public), Address::derive(&pair.public));
    }

    #[test]
    fn test_display_and_parse() {
        let address = Address::from_bytes([0x89, 0xe9, 0x2c, 0xee, 0xe5]);
        assert_eq!(address.to_string(), "89e92ceee5");
        assert_eq!("89e92ceee5".parse::<Address>().unwrap(), address);
        assert_eq!("89E92CEEE5".parse::<Address>().unwrap(), address);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(
            "89e92ceee".parse::<Address>().unwrap_err(),
            AddressError::InvalidLength(9)
        );
        assert_eq!(
            "89e92ceeez".parse::<Address>().unwrap_err(),
            AddressError::InvalidHex
        );
        assert!("".parse::<Address>().is_err());
    }

    #[test]
    fn test_reserved() {
        assert!(Address::from_bytes([0; 5]).is_reserved());
        assert!(Address::from_bytes([0xff, 1, 2, 3, 4]).is_reserved());
        assert!(!Address::from_bytes([0x01, 0, 0, 0, 0]).is_reserved());
    }
}
