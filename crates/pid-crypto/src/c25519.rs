//! C25519 key pairs: X25519 key agreement and Ed25519 signatures.
//!
//! Each side of a key pair is 64 bytes packed as two 32-byte halves, the
//! agreement key first and the signing key second. The halves are kept in
//! separately named fields so agreement material is never fed to the signer
//! or the other way round.
//!
//! Everything here is a pure function of its arguments. Randomness only
//! enters through the generator passed to [`generate_with`].

use std::fmt;

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand_core::{CryptoRng, OsRng, RngCore};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::hash::{expand_sha512, sha512};
use constant_time_eq::constant_time_eq;

/// Length of one agreement or signing half-key.
pub const SUBKEY_LEN: usize = 32;
/// Packed public key length (agreement || signing).
pub const PUBLIC_KEY_LEN: usize = 64;
/// Packed private key length (agreement || signing).
pub const PRIVATE_KEY_LEN: usize = 64;
/// Ed25519 signature plus the 32-byte message digest prefix it covers.
pub const SIGNATURE_LEN: usize = 96;

const ED25519_SIGNATURE_LEN: usize = 64;
const SIGNED_DIGEST_LEN: usize = 32;

/// Error type for curve operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    #[error("secure random source failed")]
    RandomSource,
    #[error("key agreement produced a non-contributory secret")]
    WeakAgreement,
    #[error("invalid key length: expected {expected}, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },
}

/// Public half of a key pair.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey {
    /// X25519 public key (Montgomery u-coordinate)
    pub agreement: [u8; SUBKEY_LEN],
    /// Ed25519 verifying key (compressed Edwards point)
    pub signing: [u8; SUBKEY_LEN],
}

impl PublicKey {
    pub fn from_bytes(bytes: &[u8; PUBLIC_KEY_LEN]) -> Self {
        let mut agreement = [0u8; SUBKEY_LEN];
        let mut signing = [0u8; SUBKEY_LEN];
        agreement.copy_from_slice(&bytes[..SUBKEY_LEN]);
        signing.copy_from_slice(&bytes[SUBKEY_LEN..]);
        Self { agreement, signing }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: &[u8; PUBLIC_KEY_LEN] =
            bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
                expected: PUBLIC_KEY_LEN,
                got: bytes.len(),
            })?;
        Ok(Self::from_bytes(arr))
    }

    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_LEN] {
        let mut out = [0u8; PUBLIC_KEY_LEN];
        out[..SUBKEY_LEN].copy_from_slice(&self.agreement);
        out[SUBKEY_LEN..].copy_from_slice(&self.signing);
        out
    }

    /// True when both halves are usable curve points.
    ///
    /// The agreement key must be a canonical, non-zero field element and the
    /// signing key must decompress to a point outside the small-order subgroup.
    pub fn is_well_formed(&self) -> bool {
        is_canonical_u(&self.agreement)
            && VerifyingKey::from_bytes(&self.signing)
                .map(|vk| !vk.is_weak())
                .unwrap_or(false)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("agreement", &hex::encode(self.agreement))
            .field("signing", &hex::encode(self.signing))
            .finish()
    }
}

/// u < 2^255 - 19 and u != 0, little-endian.
fn is_canonical_u(u: &[u8; SUBKEY_LEN]) -> bool {
    if u[31] & 0x80 != 0 {
        return false;
    }
    let at_least_p = u[31] == 0x7f && u[1..31].iter().all(|&b| b == 0xff) && u[0] >= 0xed;
    !at_least_p && u.iter().any(|&b| b != 0)
}

/// Secret half of a key pair. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey {
    agreement: [u8; SUBKEY_LEN],
    signing: [u8; SUBKEY_LEN],
}

impl PrivateKey {
    pub fn from_bytes(bytes: &[u8; PRIVATE_KEY_LEN]) -> Self {
        let mut key = Self {
            agreement: [0u8; SUBKEY_LEN],
            signing: [0u8; SUBKEY_LEN],
        };
        key.agreement.copy_from_slice(&bytes[..SUBKEY_LEN]);
        key.signing.copy_from_slice(&bytes[SUBKEY_LEN..]);
        key
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: &[u8; PRIVATE_KEY_LEN] =
            bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
                expected: PRIVATE_KEY_LEN,
                got: bytes.len(),
            })?;
        Ok(Self::from_bytes(arr))
    }

    pub fn to_bytes(&self) -> Zeroizing<[u8; PRIVATE_KEY_LEN]> {
        let mut out = Zeroizing::new([0u8; PRIVATE_KEY_LEN]);
        out[..SUBKEY_LEN].copy_from_slice(&self.agreement);
        out[SUBKEY_LEN..].copy_from_slice(&self.signing);
        out
    }

    /// Derive the matching public key.
    pub fn public_key(&self) -> PublicKey {
        let agreement = X25519PublicKey::from(&self.agreement_secret()).to_bytes();
        let signing = self.signing_key().verifying_key().to_bytes();
        PublicKey { agreement, signing }
    }

    fn agreement_secret(&self) -> StaticSecret {
        StaticSecret::from(self.agreement)
    }

    fn signing_key(&self) -> SigningKey {
        SigningKey::from_bytes(&self.signing)
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        constant_time_eq(&self.to_bytes()[..], &other.to_bytes()[..])
    }
}

impl Eq for PrivateKey {}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// A public key together with its private key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyPair {
    pub public: PublicKey,
    pub private: PrivateKey,
}

impl KeyPair {
    /// Build a key pair whose public half is derived from `private`.
    pub fn from_private(private: PrivateKey) -> Self {
        let public = private.public_key();
        Self { public, private }
    }
}

/// 96-byte signature: Ed25519 signature over the first 32 bytes of the
/// message's SHA-512 digest, followed by those 32 digest bytes.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; SIGNATURE_LEN]);

impl Signature {
    pub fn from_bytes(bytes: [u8; SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", hex::encode(self.0))
    }
}

/// Generate a key pair from the operating system's secure random source.
pub fn generate() -> Result<KeyPair, CryptoError> {
    generate_with(&mut OsRng)
}

/// Generate a key pair from `rng`.
///
/// A failing generator returns [`CryptoError::RandomSource`]; no key
/// material is produced from a partially filled buffer.
pub fn generate_with<R: RngCore + CryptoRng>(rng: &mut R) -> Result<KeyPair, CryptoError> {
    let mut seed = Zeroizing::new([0u8; PRIVATE_KEY_LEN]);
    rng.try_fill_bytes(&mut seed[..])
        .map_err(|_| CryptoError::RandomSource)?;
    Ok(KeyPair::from_private(PrivateKey::from_bytes(&seed)))
}

/// Perform X25519 agreement and expand the result to `out_len` key bytes.
///
/// The raw shared secret is run through the SHA-512 chain of
/// [`expand_sha512`], so `agree(a, b.public, n)` is a prefix of
/// `agree(a, b.public, m)` for `n <= m`, and both parties obtain the same
/// bytes.
pub fn agree(
    mine: &KeyPair,
    their: &PublicKey,
    out_len: usize,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let shared = mine
        .private
        .agreement_secret()
        .diffie_hellman(&X25519PublicKey::from(their.agreement));
    if !shared.was_contributory() {
        return Err(CryptoError::WeakAgreement);
    }

    let mut key = Zeroizing::new(vec![0u8; out_len]);
    expand_sha512(shared.as_bytes(), &mut key[..]);
    Ok(key)
}

/// Sign `message` with the signing half of `mine`.
pub fn sign(mine: &KeyPair, message: &[u8]) -> Signature {
    let digest = sha512(message);
    let ed_sig = mine.private.signing_key().sign(&digest[..SIGNED_DIGEST_LEN]);

    let mut out = [0u8; SIGNATURE_LEN];
    out[..ED25519_SIGNATURE_LEN].copy_from_slice(&ed_sig.to_bytes());
    out[ED25519_SIGNATURE_LEN..].copy_from_slice(&digest[..SIGNED_DIGEST_LEN]);
    Signature(out)
}

/// Verify a signature produced by [`sign`].
///
/// Returns false for any malformed input, including signatures of the
/// wrong length and signing keys that are not valid points.
pub fn verify(their: &PublicKey, message: &[u8], signature: &[u8]) -> bool {
    let Ok(sig) = <&[u8; SIGNATURE_LEN]>::try_from(signature) else {
        return false;
    };

    let digest = sha512(message);
    if !constant_time_eq(&sig[ED25519_SIGNATURE_LEN..], &digest[..SIGNED_DIGEST_LEN]) {
        return false;
    }

    let Ok(verifying_key) = VerifyingKey::from_bytes(&their.signing) else {
        return false;
    };
    if verifying_key.is_weak() {
        return false;
    }

    let mut ed_bytes = [0u8; ED25519_SIGNATURE_LEN];
    ed_bytes.copy_from_slice(&sig[..ED25519_SIGNATURE_LEN]);
    let ed_sig = ed25519_dalek::Signature::from_bytes(&ed_bytes);
    verifying_key
        .verify_strict(&digest[..SIGNED_DIGEST_LEN], &ed_sig)
        .is_ok()
}

/// Constant-time equality on public keys.
pub fn public_keys_match(a: &PublicKey, b: &PublicKey) -> bool {
    constant_time_eq(&a.to_bytes(), &b.to_bytes())
}

#[cfg(test)]
pub(crate) mod test_rng {
    use rand_core::{CryptoRng, Error, RngCore};
    use std::num::NonZeroU32;

    use crate::hash::expand_sha512;

    /// Deterministic generator for reproducible tests.
    pub struct SeededRng {
        seed: [u8; 32],
        counter: u64,
    }

    impl SeededRng {
        pub fn new(seed: u8) -> Self {
            Self { seed: [seed; 32], counter: 0 }
        }
    }

    impl RngCore for SeededRng {
        fn next_u32(&mut self) -> u32 {
            let mut b = [0u8; 4];
            self.fill_bytes(&mut b);
            u32::from_le_bytes(b)
        }

        fn next_u64(&mut self) -> u64 {
            let mut b = [0u8; 8];
            self.fill_bytes(&mut b);
            u64::from_le_bytes(b)
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            let mut ikm = self.seed.to_vec();
            ikm.extend_from_slice(&self.counter.to_le_bytes());
            self.counter += 1;
            expand_sha512(&ikm, dest);
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    impl CryptoRng for SeededRng {}

    /// Generator whose every call fails.
    pub struct FailingRng;

    impl RngCore for FailingRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0);
        }

        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), Error> {
            let code = NonZeroU32::new(Error::CUSTOM_START).expect("non-zero error code");
            Err(Error::from(code))
        }
    }

    impl CryptoRng for FailingRng {}
}
