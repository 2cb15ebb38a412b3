
#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::c25519::{self, KeyPair, PrivateKey};
    use crate::hash::expand_sha512;
    use crate::identity::Identity;

    fn pair_from_seed(seed: [u8; 64]) -> KeyPair {
        KeyPair::from_private(PrivateKey::from_bytes(&seed))
    }

    fn seed() -> impl Strategy<Value = [u8; 64]> {
        prop::collection::vec(any::<u8>(), 64).prop_map(|v| {
            let mut out = [0u8; 64];
            out.copy_from_slice(&v);
            out
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        // Signature round-trip and single-bit tamper rejection
        #[test]
        fn test_sign_verify_property(
            s in seed(),
            message in any::<Vec<u8>>(),
            flip in any::<prop::sample::Index>()
        ) {
            let pair = pair_from_seed(s);
            let sig = c25519::sign(&pair, &message);
            prop_assert!(c25519::verify(&pair.public, &message, sig.as_ref()));

            let mut bad_sig = sig.to_vec();
            let bit = flip.index(bad_sig.len() * 8);
            bad_sig[bit / 8] ^= 1 << (bit % 8);
            prop_assert!(!c25519::verify(&pair.public, &message, &bad_sig));

            if !message.is_empty() {
                let mut bad_msg = message.clone();
                let bit = flip.index(bad_msg.len() * 8);
                bad_msg[bit / 8] ^= 1 << (bit % 8);
                prop_assert!(!c25519::verify(&pair.public, &bad_msg, sig.as_ref()));
            }
        }

        // Agreement commutativity for arbitrary output lengths
        #[test]
        fn test_agree_commutative_property(
            a in seed(),
            b in seed(),
            len in 0usize..600
        ) {
            let alice = pair_from_seed(a);
            let bob = pair_from_seed(b);
            let ab = c25519::agree(&alice, &bob.public, len).unwrap();
            let ba = c25519::agree(&bob, &alice.public, len).unwrap();
            prop_assert_eq!(&ab[..], &ba[..]);
        }

        // Key stream prefix stability
        #[test]
        fn test_expand_prefix_property(
            ikm in any::<Vec<u8>>(),
            short in 0usize..300,
            extra in 0usize..300
        ) {
            let mut a = vec![0u8; short];
            let mut b = vec![0u8; short + extra];
            expand_sha512(&ikm, &mut a);
            expand_sha512(&ikm, &mut b);
            prop_assert_eq!(&b[..short], &a[..]);
        }

        // Text round-trip, private and public forms
        #[test]
        fn test_identity_text_round_trip(s in seed()) {
            let id = Identity::from_key_pair(pair_from_seed(s));
            let full = Identity::from_text(&id.to_text(true)).unwrap();
            let public = Identity::from_text(&id.to_text(false)).unwrap();
            prop_assert_eq!(&full, &id);
            prop_assert_eq!(&public, &id.public_only());
        }

        // Parsing arbitrary text never panics
        #[test]
        fn test_identity_parse_never_panics(text in ".{0,300}") {
            let _ = Identity::from_text(&text);
        }

        // Seal/open round-trip
        #[test]
        fn test_seal_open_property(
            a in seed(),
            b in seed(),
            plaintext in any::<Vec<u8>>()
        ) {
            let alice = Identity::from_key_pair(pair_from_seed(a));
            let bob = Identity::from_key_pair(pair_from_seed(b));
            let ct = alice.encrypt(&bob.public_only(), &plaintext).unwrap();
            let pt = bob.decrypt(&alice.public_only(), &ct).unwrap();
            prop_assert_eq!(pt, plaintext);
        }

        // Opening arbitrary bytes fails cleanly
        #[test]
        fn test_open_garbage_property(
            a in seed(),
            b in seed(),
            garbage in any::<Vec<u8>>()
        ) {
            let alice = Identity::from_key_pair(pair_from_seed(a));
            let bob = Identity::from_key_pair(pair_from_seed(b));
            prop_assert!(bob.decrypt(&alice, &garbage).is_err());
        }
    }
}
