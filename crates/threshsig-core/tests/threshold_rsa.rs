//! End-to-end tests for threshold RSA signing
//!
//! One 512-bit 6-of-13 dealing is shared by most tests; shares go through
//! wrap/unwrap before use, as they would when handed to participants.

use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};
use rayon::prelude::*;
use rsa::Pkcs1v15Sign;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;
use threshsig_core::{Dealer, Error, GroupKey, KeyShare, SigShare, ShareIndex, MIN_KEY_SIZE};

const K: usize = 6;
const L: usize = 13;

const S1: [ShareIndex; K] = [3, 5, 1, 2, 10, 7];
const S2: [ShareIndex; K] = [8, 9, 7, 6, 1, 12];

struct Fixture {
    group_key: GroupKey,
    shares: Vec<KeyShare>,
    message: Vec<u8>,
}

fn fixture() -> &'static Fixture {
    static FIXTURE: OnceLock<Fixture> = OnceLock::new();
    FIXTURE.get_or_init(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let mut rng = ChaCha20Rng::from_seed([0x5a; 32]);
        let mut dealer = Dealer::new(MIN_KEY_SIZE).unwrap();
        let group_key = dealer
            .generate_keys_with_rng(K, L, &mut rng)
            .unwrap()
            .clone();

        let shares = dealer
            .take_shares()
            .iter()
            .map(|share| KeyShare::unwrap(&share.wrap().unwrap()).unwrap())
            .collect();
        dealer.destroy();

        let mut message = vec![0u8; 1024];
        rng.fill_bytes(&mut message);

        Fixture {
            group_key,
            shares,
            message,
        }
    })
}

fn share(index: ShareIndex) -> &'static KeyShare {
    &fixture().shares[index - 1]
}

fn sign_with(indices: &[ShareIndex], message: &[u8]) -> Vec<SigShare> {
    indices
        .iter()
        .map(|&i| share(i).sign(message).unwrap())
        .collect()
}

#[test]
fn test_dealing_shape() {
    let fx = fixture();
    assert_eq!(fx.group_key.bits(), MIN_KEY_SIZE);
    assert_eq!(fx.shares.len(), L);
    for (pos, share) in fx.shares.iter().enumerate() {
        assert_eq!(share.index(), pos + 1);
        assert_eq!(share.group_key(), fx.group_key);
        assert!(share.check_verification_value());
    }
}

#[test]
fn test_first_subset_verifies() {
    let fx = fixture();
    let sigs = sign_with(&S1, &fx.message);
    let signature = SigShare::combine(&fx.message, &sigs, K, L, &fx.group_key).unwrap();

    assert_eq!(signature.len(), fx.group_key.size());
    fx.group_key.verify(&fx.message, &signature).unwrap();

    // Any standard verifier accepts it
    let public_key = fx.group_key.to_public_key().unwrap();
    let hashed = Sha256::digest(&fx.message);
    public_key
        .verify(Pkcs1v15Sign::new::<Sha256>(), &hashed, &signature)
        .unwrap();
}

#[test]
fn test_subsets_yield_identical_signature() {
    let fx = fixture();
    let first =
        SigShare::combine(&fx.message, &sign_with(&S1, &fx.message), K, L, &fx.group_key)
            .unwrap();
    let second =
        SigShare::combine(&fx.message, &sign_with(&S2, &fx.message), K, L, &fx.group_key)
            .unwrap();

    fx.group_key.verify(&fx.message, &second).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_extra_shares_are_ignored() {
    let fx = fixture();
    let mut indices = S2.to_vec();
    indices.extend([13, 4]);

    let signature =
        SigShare::combine(&fx.message, &sign_with(&indices, &fx.message), K, L, &fx.group_key)
            .unwrap();
    fx.group_key.verify(&fx.message, &signature).unwrap();
}

#[test]
fn test_signature_is_message_bound() {
    let fx = fixture();
    let other = b"a different message";
    let signature =
        SigShare::combine(other, &sign_with(&S1, other), K, L, &fx.group_key).unwrap();

    fx.group_key.verify(other, &signature).unwrap();
    assert!(matches!(
        fx.group_key.verify(&fx.message, &signature),
        Err(Error::InvalidSignature)
    ));
}

#[test]
fn test_corrupted_share_propagates() {
    // The combiner does not check shares: the bad one only shows up when the
    // result is verified
    let fx = fixture();
    let mut sigs = sign_with(&S2, &fx.message);
    sigs[3] = share(S2[3]).sign(b"corrupt data").unwrap();

    let signature = SigShare::combine(&fx.message, &sigs, K, L, &fx.group_key).unwrap();
    assert!(fx.group_key.verify(&fx.message, &signature).is_err());
}

#[test]
fn test_tampered_value_propagates() {
    let fx = fixture();
    let mut sigs = sign_with(&S1, &fx.message);
    let tampered = sigs[0].value() + 1u32;
    sigs[0] = SigShare::new(sigs[0].index(), tampered);

    let signature = SigShare::combine(&fx.message, &sigs, K, L, &fx.group_key).unwrap();
    assert!(fx.group_key.verify(&fx.message, &signature).is_err());
}

#[test]
fn test_below_threshold_rejected() {
    let fx = fixture();
    let sigs = sign_with(&S1[..K - 1], &fx.message);

    assert!(matches!(
        SigShare::combine(&fx.message, &sigs, K, L, &fx.group_key),
        Err(Error::InsufficientShares {
            required: K,
            actual: 5
        })
    ));
}

#[test]
fn test_bad_indices_rejected() {
    let fx = fixture();
    let mut sigs = sign_with(&S1, &fx.message);

    let mut out_of_range = sigs.clone();
    out_of_range[2] = SigShare::new(L + 1, sigs[2].value().clone());
    assert!(matches!(
        SigShare::combine(&fx.message, &out_of_range, K, L, &fx.group_key),
        Err(Error::InvalidIndex { index: 14, .. })
    ));

    sigs[4] = sigs[0].clone();
    assert!(matches!(
        SigShare::combine(&fx.message, &sigs, K, L, &fx.group_key),
        Err(Error::InvalidIndex { index: 3, .. })
    ));
}

#[test]
fn test_bad_parameters_rejected() {
    let fx = fixture();
    let sigs = sign_with(&S1, &fx.message);

    assert!(matches!(
        SigShare::combine(&fx.message, &sigs, 0, L, &fx.group_key),
        Err(Error::InvalidParameter(_))
    ));
    assert!(matches!(
        SigShare::combine(&fx.message, &sigs, L + 1, L, &fx.group_key),
        Err(Error::InvalidParameter(_))
    ));
}

#[test]
fn test_stored_group_key_combines() {
    let fx = fixture();
    let json = serde_json::to_string_pretty(&fx.group_key).unwrap();
    let restored: GroupKey = serde_json::from_str(&json).unwrap();

    let signature =
        SigShare::combine(&fx.message, &sign_with(&S1, &fx.message), K, L, &restored).unwrap();
    fx.group_key.verify(&fx.message, &signature).unwrap();

    // A zero modulus never reaches the combiner
    let zero_modulus = r#"{"modulus":[],"public_exponent":[65537]}"#;
    assert!(serde_json::from_str::<GroupKey>(zero_modulus).is_err());
    assert!(matches!(
        GroupKey::new(0u32.into(), 65_537u32.into()),
        Err(Error::InvalidParameter(_))
    ));
}

#[test]
fn test_unwrapped_share_signs_identically() {
    let fx = fixture();
    for share in &fx.shares {
        let restored = KeyShare::unwrap(&share.wrap().unwrap()).unwrap();
        assert_eq!(
            restored.sign(&fx.message).unwrap(),
            share.sign(&fx.message).unwrap()
        );
    }
}

#[test]
fn test_parallel_signing() {
    let fx = fixture();
    let parallel: Vec<SigShare> = S2
        .par_iter()
        .map(|&i| share(i).sign(&fx.message).unwrap())
        .collect();

    assert_eq!(parallel, sign_with(&S2, &fx.message));
    let signature = SigShare::combine(&fx.message, &parallel, K, L, &fx.group_key).unwrap();
    fx.group_key.verify(&fx.message, &signature).unwrap();
}

#[test]
fn test_seeded_dealing_is_deterministic() {
    let deal = |seed: [u8; 32]| {
        let mut dealer = Dealer::new(MIN_KEY_SIZE).unwrap();
        let mut rng = ChaCha20Rng::from_seed(seed);
        let group_key = dealer.generate_keys_with_rng(2, 3, &mut rng).unwrap().clone();
        let wrapped: Vec<Vec<u8>> = dealer
            .shares()
            .iter()
            .map(|s| s.wrap().unwrap())
            .collect();
        (group_key, wrapped)
    };

    let (key_a, shares_a) = deal([11u8; 32]);
    let (key_b, shares_b) = deal([11u8; 32]);
    let (key_c, _) = deal([12u8; 32]);

    assert_eq!(key_a, key_b);
    assert_eq!(shares_a, shares_b);
    assert_ne!(key_a, key_c);
}

#[test]
fn test_edge_thresholds() {
    let message = b"edge thresholds";
    let mut rng = ChaCha20Rng::from_seed([77u8; 32]);

    for (k, l, signers) in [(1, 3, vec![2]), (3, 3, vec![3, 1, 2])] {
        let mut dealer = Dealer::new(MIN_KEY_SIZE).unwrap();
        let group_key = dealer.generate_keys_with_rng(k, l, &mut rng).unwrap().clone();
        let shares = dealer.take_shares();

        let sigs: Vec<SigShare> = signers
            .iter()
            .map(|&i: &usize| shares[i - 1].sign(message).unwrap())
            .collect();
        let signature = SigShare::combine(message, &sigs, k, l, &group_key).unwrap();
        group_key.verify(message, &signature).unwrap();
    }
}
