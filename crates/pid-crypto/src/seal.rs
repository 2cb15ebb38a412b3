//! Sealed messages between two identities.
//!
//! The key is 32 bytes of C25519 agreement between the two parties, so
//! either side can compute it. Messages are XChaCha20-Poly1305 with a random
//! nonce, and the AAD binds sender and recipient addresses so a message
//! cannot be replayed in the opposite direction.
//!
//! Wire format: `version (1) || nonce (24) || ciphertext || tag (16)`.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    Key, XChaCha20Poly1305, XNonce,
};
use rand_core::{CryptoRng, RngCore};

use crate::address::{Address, ADDRESS_LENGTH};
use crate::c25519::{self, CryptoError};
use crate::identity::{Identity, IdentityError};

pub const SEAL_VERSION: u8 = 1;
pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 24;
pub const TAG_LEN: usize = 16;
pub const HEADER_LEN: usize = 1 + NONCE_LEN;
/// Bytes added to every plaintext.
pub const OVERHEAD: usize = HEADER_LEN + TAG_LEN;

const AAD_DOMAIN: &[u8] = b"pid-seal-v1";
const AAD_LEN: usize = AAD_DOMAIN.len() + 2 * ADDRESS_LENGTH;

fn seal_aad(sender: &Address, recipient: &Address) -> [u8; AAD_LEN] {
    let mut aad = [0u8; AAD_LEN];
    let (domain, rest) = aad.split_at_mut(AAD_DOMAIN.len());
    domain.copy_from_slice(AAD_DOMAIN);
    rest[..ADDRESS_LENGTH].copy_from_slice(sender.as_bytes());
    rest[ADDRESS_LENGTH..].copy_from_slice(recipient.as_bytes());
    aad
}

fn cipher_for(me: &Identity, peer: &Identity) -> Result<XChaCha20Poly1305, IdentityError> {
    let pair = me.key_pair().ok_or(IdentityError::MissingPrivate)?;
    let key = c25519::agree(pair, peer.public(), KEY_LEN)?;
    Ok(XChaCha20Poly1305::new(Key::from_slice(&key[..])))
}

/// Encrypt `plaintext` from `sender` (which must hold a private key) to
/// `recipient`.
pub fn seal<R: RngCore + CryptoRng>(
    rng: &mut R,
    sender: &Identity,
    recipient: &Identity,
    plaintext: &[u8],
) -> Result<Vec<u8>, IdentityError> {
    let cipher = cipher_for(sender, recipient).map_err(|e| match e {
        IdentityError::MissingPrivate => e,
        _ => IdentityError::Encrypt,
    })?;

    let mut nonce = [0u8; NONCE_LEN];
    rng.try_fill_bytes(&mut nonce)
        .map_err(|_| CryptoError::RandomSource)?;

    let aad = seal_aad(sender.address(), recipient.address());
    let ct = cipher
        .encrypt(
            XNonce::from_slice(&nonce),
            Payload {
                msg: plaintext,
                aad: &aad,
            },
        )
        .map_err(|_| IdentityError::Encrypt)?;

    let mut out = Vec::with_capacity(HEADER_LEN + ct.len());
    out.push(SEAL_VERSION);
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ct);
    Ok(out)
}

/// Authenticate and decrypt a message `sender` sealed to `recipient`.
pub fn open(
    recipient: &Identity,
    sender: &Identity,
    sealed: &[u8],
) -> Result<Vec<u8>, IdentityError> {
    if !recipient.has_private() {
        return Err(IdentityError::MissingPrivate);
    }
    if sealed.len() < OVERHEAD || sealed[0] != SEAL_VERSION {
        return Err(IdentityError::Decrypt);
    }

    let cipher = cipher_for(recipient, sender).map_err(|_| IdentityError::Decrypt)?;
    let (header, ct) = sealed.split_at(HEADER_LEN);
    let aad = seal_aad(sender.address(), recipient.address());
    cipher
        .decrypt(
            XNonce::from_slice(&header[1..]),
            Payload { msg: ct, aad: &aad },
        )
        .map_err(|_| IdentityError::Decrypt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::c25519::test_rng::{FailingRng, SeededRng};

    fn pair() -> (Identity, Identity) {
        (Identity::generate().unwrap(), Identity::generate().unwrap())
    }

    #[test]
    fn test_round_trip() {
        let (alice, bob) = pair();
        let ct = alice.encrypt(&bob.public_only(), b"Hello, Bob").unwrap();
        assert_eq!(ct.len(), b"Hello, Bob".len() + OVERHEAD);
        assert_eq!(ct[0], SEAL_VERSION);
        let pt = bob.decrypt(&alice.public_only(), &ct).unwrap();
        assert_eq!(pt, b"Hello, Bob");
    }

    #[test]
    fn test_empty_message() {
        let (alice, bob) = pair();
        let ct = alice.encrypt(&bob, b"").unwrap();
        assert_eq!(ct.len(), OVERHEAD);
        assert!(bob.decrypt(&alice, &ct).unwrap().is_empty());
    }

    #[test]
    fn test_large_message() {
        let (alice, bob) = pair();
        let msg: Vec<u8> = (0..300_000u32).map(|i| (i % 251) as u8).collect();
        let ct = alice.encrypt(&bob, &msg).unwrap();
        assert_eq!(bob.decrypt(&alice, &ct).unwrap(), msg);
    }

    #[test]
    fn test_nonce_is_fresh() {
        let (alice, bob) = pair();
        let a = alice.encrypt(&bob, b"same").unwrap();
        let b = alice.encrypt(&bob, b"same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_encrypt_with_seeded_rng_is_deterministic() {
        let (alice, bob) = pair();
        let a = alice.encrypt_with(&mut SeededRng::new(3), &bob, b"m").unwrap();
        let b = alice.encrypt_with(&mut SeededRng::new(3), &bob, b"m").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_encrypt_with_failing_rng() {
        let (alice, bob) = pair();
        assert_eq!(
            alice.encrypt_with(&mut FailingRng, &bob, b"m").unwrap_err(),
            IdentityError::Crypto(CryptoError::RandomSource)
        );
    }

    #[test]
    fn test_bit_flip_rejected() {
        let (alice, bob) = pair();
        let ct = alice.encrypt(&bob, b"attack at dawn").unwrap();
        for i in 0..ct.len() * 8 {
            let mut tampered = ct.clone();
            tampered[i / 8] ^= 1 << (i % 8);
            assert_eq!(
                bob.decrypt(&alice, &tampered).unwrap_err(),
                IdentityError::Decrypt,
                "bit {i} accepted"
            );
        }
    }

    #[test]
    fn test_truncated_rejected() {
        let (alice, bob) = pair();
        let ct = alice.encrypt(&bob, b"message").unwrap();
        for len in [0, 1, HEADER_LEN, OVERHEAD - 1, ct.len() - 1] {
            assert_eq!(
                bob.decrypt(&alice, &ct[..len]).unwrap_err(),
                IdentityError::Decrypt
            );
        }
    }

    #[test]
    fn test_wrong_parties_rejected() {
        let (alice, bob) = pair();
        let carol = Identity::generate().unwrap();
        let ct = alice.encrypt(&bob, b"for bob").unwrap();

        assert_eq!(carol.decrypt(&alice, &ct).unwrap_err(), IdentityError::Decrypt);
        assert_eq!(bob.decrypt(&carol, &ct).unwrap_err(), IdentityError::Decrypt);
        // reflected back at the sender
        assert_eq!(alice.decrypt(&bob, &ct).unwrap_err(), IdentityError::Decrypt);
    }

    #[test]
    fn test_requires_private() {
        let (alice, bob) = pair();
        assert_eq!(
            alice.public_only().encrypt(&bob, b"m").unwrap_err(),
            IdentityError::MissingPrivate
        );
        let ct = alice.encrypt(&bob, b"m").unwrap();
        assert_eq!(
            bob.public_only().decrypt(&alice, &ct).unwrap_err(),
            IdentityError::MissingPrivate
        );
    }

    #[test]
    fn test_weak_recipient_key() {
        let (alice, _) = pair();
        let mut public = *Identity::generate().unwrap().public();
        public.agreement = [0u8; 32];
        let weak = Identity::from_public(public);
        assert_eq!(alice.encrypt(&weak, b"m").unwrap_err(), IdentityError::Encrypt);
    }

    #[test]
    fn test_aad_layout() {
        let a = Address::from_bytes([1, 2, 3, 4, 5]);
        let b = Address::from_bytes([6, 7, 8, 9, 10]);
        let aad = seal_aad(&a, &b);
        assert_eq!(&aad[..AAD_DOMAIN.len()], AAD_DOMAIN);
        assert_eq!(&aad[AAD_DOMAIN.len()..], &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        assert_ne!(seal_aad(&a, &b), seal_aad(&b, &a));
    }
}
