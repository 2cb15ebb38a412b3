//! Peer identities.
//!
//! An [`Identity`] is an address plus a C25519 public key, optionally
//! accompanied by the private key. Identities are immutable; the public-only
//! view of a full identity is produced with [`Identity::public_only`].
//!
//! # Text format
//!
//! ```text
//! <address>:0:<public key hex>[:<private key hex>]
//! ```
//!
//! `address` is 10 hex digits, `0` is the key type (C25519) and both keys are
//! 128 hex digits (agreement half first, then signing half).

use std::fmt;
use std::str::FromStr;

use rand_core::{CryptoRng, OsRng, RngCore};
use zeroize::Zeroizing;

use crate::address::{Address, ADDRESS_LENGTH};
use crate::c25519::{
    self, CryptoError, KeyPair, PrivateKey, PublicKey, Signature, PRIVATE_KEY_LEN,
    PUBLIC_KEY_LEN,
};
use crate::hash::sha512_parts;
use crate::seal;

/// Key type field for C25519 identities.
pub const KEY_TYPE_C25519: &str = "0";

/// Generation gives up after this many reserved addresses in a row.
pub const MAX_GENERATION_ATTEMPTS: usize = 64;

const FIELD_SEPARATOR: char = ':';
const SELF_TEST_DOMAIN: &[u8] = b"pid-identity-self-test-v1";
const MAX_TEXT_LEN: usize = 10 + 3 + PUBLIC_KEY_LEN * 2 + 1 + PRIVATE_KEY_LEN * 2;

/// Error type for identity operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("malformed identity: {0}")]
    Malformed(&'static str),
    #[error("identity has no private key")]
    MissingPrivate,
    #[error("could not generate an identity with an unreserved address")]
    Generation,
    #[error("encryption failed")]
    Encrypt,
    #[error("decryption failed")]
    Decrypt,
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

#[derive(Clone, PartialEq, Eq)]
enum Keys {
    Public(PublicKey),
    Pair(KeyPair),
}

/// A peer identity.
#[derive(Clone)]
pub struct Identity {
    address: Address,
    keys: Keys,
}

impl Identity {
    /// Generate a new identity using the operating system's random source.
    pub fn generate() -> Result<Self, IdentityError> {
        Self::generate_with(&mut OsRng)
    }

    /// Generate a new identity using `rng`.
    ///
    /// Key pairs whose address is reserved are discarded. A failing random
    /// source aborts immediately.
    pub fn generate_with<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self, IdentityError> {
        for _ in 0..MAX_GENERATION_ATTEMPTS {
            let pair = c25519::generate_with(rng)?;
            let address = Address::derive(&pair.public);
            if !address.is_reserved() {
                return Ok(Self {
                    address,
                    keys: Keys::Pair(pair),
                });
            }
        }
        Err(IdentityError::Generation)
    }

    /// Wrap an existing key pair.
    pub fn from_key_pair(pair: KeyPair) -> Self {
        Self {
            address: Address::derive(&pair.public),
            keys: Keys::Pair(pair),
        }
    }

    /// Wrap a remote peer's public key.
    pub fn from_public(public: PublicKey) -> Self {
        Self {
            address: Address::derive(&public),
            keys: Keys::Public(public),
        }
    }

    /// Parse the text form. See the module docs for the format.
    ///
    /// Address and key consistency is not checked here; use
    /// [`Identity::locally_validate`] for that.
    pub fn from_text(text: &str) -> Result<Self, IdentityError> {
        let fields: Vec<&str> = text.trim().split(FIELD_SEPARATOR).collect();
        if fields.len() != 3 && fields.len() != 4 {
            return Err(IdentityError::Malformed("wrong field count"));
        }

        let address: Address = fields[0]
            .parse()
            .map_err(|_| IdentityError::Malformed("bad address"))?;
        if fields[1] != KEY_TYPE_C25519 {
            return Err(IdentityError::Malformed("unsupported key type"));
        }

        let public_bytes = decode_fixed::<PUBLIC_KEY_LEN>(fields[2])
            .ok_or(IdentityError::Malformed("bad public key"))?;
        let public = PublicKey::from_bytes(&public_bytes);

        let keys = match fields.get(3) {
            Some(private_hex) => {
                let private_bytes = decode_fixed::<PRIVATE_KEY_LEN>(private_hex)
                    .ok_or(IdentityError::Malformed("bad private key"))?;
                Keys::Pair(KeyPair {
                    public,
                    private: PrivateKey::from_bytes(&private_bytes),
                })
            }
            None => Keys::Public(public),
        };

        Ok(Self { address, keys })
    }

    /// Serialize to text, with the private key only if `include_private` is
    /// set and this identity has one.
    pub fn to_text(&self, include_private: bool) -> Zeroizing<String> {
        let mut out = Zeroizing::new(String::with_capacity(MAX_TEXT_LEN));
        let buf: &mut String = &mut out;
        buf.push_str(&hex::encode(self.address.as_bytes()));
        buf.push(FIELD_SEPARATOR);
        buf.push_str(KEY_TYPE_C25519);
        buf.push(FIELD_SEPARATOR);
        buf.push_str(&hex::encode(self.public().to_bytes()));

        if include_private {
            if let Some(private) = self.private() {
                buf.push(FIELD_SEPARATOR);
                let private_hex = Zeroizing::new(hex::encode(&private.to_bytes()[..]));
                buf.push_str(&private_hex);
            }
        }
        out
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn public(&self) -> &PublicKey {
        match &self.keys {
            Keys::Public(public) => public,
            Keys::Pair(pair) => &pair.public,
        }
    }

    pub fn private(&self) -> Option<&PrivateKey> {
        self.key_pair().map(|pair| &pair.private)
    }

    pub fn key_pair(&self) -> Option<&KeyPair> {
        match &self.keys {
            Keys::Public(_) => None,
            Keys::Pair(pair) => Some(pair),
        }
    }

    pub fn has_private(&self) -> bool {
        matches!(self.keys, Keys::Pair(_))
    }

    /// The same identity without private material.
    pub fn public_only(&self) -> Self {
        Self {
            address: self.address,
            keys: Keys::Public(*self.public()),
        }
    }

    /// Check that this identity is internally consistent.
    ///
    /// Always checks that the address is unreserved and derived from the
    /// public key, and that both public halves are valid points. With
    /// `thorough`, an identity holding a private key must also re-derive its
    /// public key and pass a sign/verify self-test.
    pub fn locally_validate(&self, thorough: bool) -> bool {
        let public = self.public();
        if self.address.is_reserved()
            || self.address != Address::derive(public)
            || !public.is_well_formed()
        {
            return false;
        }

        if thorough {
            if let Some(pair) = self.key_pair() {
                if !c25519::public_keys_match(&pair.private.public_key(), public) {
                    return false;
                }
                let nonce = sha512_parts(&[
                    SELF_TEST_DOMAIN,
                    self.address.as_bytes(),
                    &public.to_bytes(),
                ]);
                let signature = c25519::sign(pair, &nonce);
                if !c25519::verify(public, &nonce, signature.as_ref()) {
                    return false;
                }
            }
        }
        true
    }

    /// Sign `message`. Fails on a public-only identity.
    pub fn sign(&self, message: &[u8]) -> Result<Signature, IdentityError> {
        let pair = self.key_pair().ok_or(IdentityError::MissingPrivate)?;
        Ok(c25519::sign(pair, message))
    }

    /// Verify a signature made by this identity.
    ///
    /// Inputs no longer than an address are rejected before any curve work.
    pub fn verify_signature(&self, message: &[u8], signature: &[u8]) -> bool {
        if signature.len() <= ADDRESS_LENGTH {
            return false;
        }
        c25519::verify(self.public(), message, signature)
    }

    /// Derive `out_len` bytes of shared key with `their`.
    pub fn agree(
        &self,
        their: &Identity,
        out_len: usize,
    ) -> Result<Zeroizing<Vec<u8>>, IdentityError> {
        let pair = self.key_pair().ok_or(IdentityError::MissingPrivate)?;
        Ok(c25519::agree(pair, their.public(), out_len)?)
    }

    /// Encrypt `plaintext` from this identity to `recipient`.
    pub fn encrypt(&self, recipient: &Identity, plaintext: &[u8]) -> Result<Vec<u8>, IdentityError> {
        seal::seal(&mut OsRng, self, recipient, plaintext)
    }

    /// Like [`Identity::encrypt`], drawing the nonce from `rng`.
    pub fn encrypt_with<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        recipient: &Identity,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, IdentityError> {
        seal::seal(rng, self, recipient, plaintext)
    }

    /// Decrypt a message `sender` encrypted to this identity.
    ///
    /// Every authentication or format failure is reported as
    /// [`IdentityError::Decrypt`].
    pub fn decrypt(&self, sender: &Identity, ciphertext: &[u8]) -> Result<Vec<u8>, IdentityError> {
        seal::open(self, sender, ciphertext)
    }
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address && self.keys == other.keys
    }
}

impl Eq for Identity {}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text(false))
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("address", &self.address)
            .field("public", self.public())
            .field("has_private", &self.has_private())
            .finish()
    }
}

impl FromStr for Identity {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_text(s)
    }
}

fn decode_fixed<const N: usize>(s: &str) -> Option<Zeroizing<[u8; N]>> {
    if s.len() != N * 2 {
        return None;
    }
    let mut out = Zeroizing::new([0u8; N]);
    hex::decode_to_slice(s, &mut out[..]).ok()?;
    Some(out)
}
