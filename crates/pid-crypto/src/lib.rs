#![forbid(unsafe_code)]

pub mod hash;

pub mod c25519;
pub mod address;
pub mod identity;
pub mod seal;

#[cfg(test)]
mod proptests;

pub use address::{Address, ADDRESS_LENGTH};
pub use c25519::{CryptoError, KeyPair, PrivateKey, PublicKey, Signature, SIGNATURE_LEN};
pub use identity::{Identity, IdentityError};
