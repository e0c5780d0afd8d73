//! Trusted dealer
//!
//! The dealer is the only party that ever sees the factorization of `n` and
//! the private exponent `d`. Both live in [`DealerSecrets`], which is wiped on
//! [`Dealer::destroy`], on re-generation and on drop. Intermediate values of
//! share evaluation and of the inversion of `e` modulo `m` are wiped as
//! they are replaced; allocator-internal copies made when num-bigint grows a
//! buffer are outside that reach.

use super::primes::generate_safe_prime;
use crate::math::{eval_polynomial, mod_inverse, SecretInt};
use crate::{DealerConfig, Error, GroupKey, KeyShare, Result, ThresholdParams};
use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::One;
use rand::rngs::OsRng;
use rand_core::{CryptoRng, RngCore};
use std::time::Instant;
use tracing::{debug, info, instrument};
use zeroize::Zeroize;

#[cfg(feature = "multi-thread")]
use rayon::prelude::*;

/// Statistical hiding margin of the polynomial coefficients, in bits
const HIDING_BITS: usize = 128;

/// Fresh (p, q) pairs tried before giving up
const MAX_MODULUS_ATTEMPTS: usize = 8;

/// Dealer-private state
#[derive(Zeroize)]
struct DealerSecrets {
    p: SecretInt,
    q: SecretInt,
    p_prime: SecretInt,
    q_prime: SecretInt,
    /// m = p'·q'
    m: SecretInt,
    /// e·d ≡ 1 (mod m)
    d: SecretInt,
    /// a_1 .. a_{k-1}
    coefficients: Vec<SecretInt>,
}

impl DealerSecrets {
    fn is_consistent(&self, group_key: &GroupKey, params: &ThresholdParams) -> bool {
        let (p, q) = (self.p.expose(), self.q.expose());
        let (p_prime, q_prime) = (self.p_prime.expose(), self.q_prime.expose());
        let m = self.m.expose();

        p * q == *group_key.modulus()
            && *p == (p_prime << 1u32) + 1u32
            && *q == (q_prime << 1u32) + 1u32
            && *m == p_prime * q_prime
            && (group_key.public_exponent() * self.d.expose()) % m == BigUint::one()
            && self.coefficients.len() == params.threshold() - 1
    }
}

/// Trusted dealer for a (k, l) threshold RSA key
pub struct Dealer {
    config: DealerConfig,
    params: Option<ThresholdParams>,
    group_key: Option<GroupKey>,
    shares: Vec<KeyShare>,
    secrets: Option<DealerSecrets>,
}

impl Dealer {
    /// Create a dealer producing `key_size`-bit moduli
    pub fn new(key_size: usize) -> Result<Self> {
        Self::with_config(DealerConfig::with_key_size(key_size))
    }

    /// Create a dealer from a full configuration
    pub fn with_config(config: DealerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            params: None,
            group_key: None,
            shares: Vec::new(),
            secrets: None,
        })
    }

    pub fn config(&self) -> &DealerConfig {
        &self.config
    }

    /// Parameters of the current dealing
    pub fn params(&self) -> Option<ThresholdParams> {
        self.params
    }

    /// Public key of the current dealing
    pub fn group_key(&self) -> Option<&GroupKey> {
        self.group_key.as_ref()
    }

    /// Key shares of the current dealing, index `i` at position `i - 1`
    pub fn shares(&self) -> &[KeyShare] {
        &self.shares
    }

    /// Hand the key shares over for distribution
    pub fn take_shares(&mut self) -> Vec<KeyShare> {
        std::mem::take(&mut self.shares)
    }

    /// Generate a fresh group key and `l` shares with threshold `k`
    pub fn generate_keys(&mut self, k: usize, l: usize) -> Result<&GroupKey> {
        self.generate_keys_with_rng(k, l, &mut OsRng)
    }

    /// Same as [`Dealer::generate_keys`] with a caller-supplied RNG
    #[instrument(skip(self, rng))]
    pub fn generate_keys_with_rng<R: RngCore + CryptoRng>(
        &mut self,
        k: usize,
        l: usize,
        rng: &mut R,
    ) -> Result<&GroupKey> {
        let params = ThresholdParams::new(k, l)?;
        if l as u64 >= self.config.public_exponent {
            return Err(Error::InvalidParameter(format!(
                "Public exponent {} must exceed the number of shares {}",
                self.config.public_exponent, l
            )));
        }

        self.destroy();
        self.group_key = None;

        let start = Instant::now();
        info!(k, l, key_size = self.config.key_size, "Starting key generation");

        let e = BigUint::from(self.config.public_exponent);
        let mut secrets = self.generate_modulus(&e, rng)?;
        let n = secrets.p.expose() * secrets.q.expose();
        let group_key = GroupKey::new(n, e)?;
        debug!(group = %group_key.fingerprint(), "Modulus generated");

        secrets.coefficients = random_coefficients(secrets.m.expose(), &params, rng);
        let shares = deal_shares(&secrets, &group_key, &params, rng);

        debug_assert!(secrets.is_consistent(&group_key, &params));

        info!(
            k,
            l,
            group = %group_key.fingerprint(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Key generation completed"
        );

        self.params = Some(params);
        self.shares = shares;
        self.secrets = Some(secrets);
        Ok(&*self.group_key.insert(group_key))
    }

    /// Wipe the dealer secrets and drop any undistributed shares
    ///
    /// The group key stays available; it is public.
    pub fn destroy(&mut self) {
        if let Some(mut secrets) = self.secrets.take() {
            secrets.zeroize();
            debug!("Dealer secrets destroyed");
        }
        self.shares.clear();
        self.params = None;
    }

    /// Find safe primes p ≠ q such that e is invertible modulo p'·q'
    fn generate_modulus<R: RngCore + CryptoRng>(
        &self,
        e: &BigUint,
        rng: &mut R,
    ) -> Result<DealerSecrets> {
        let p_bits = self.config.key_size / 2;
        let q_bits = self.config.key_size - p_bits;

        for attempt in 0..MAX_MODULUS_ATTEMPTS {
            let p = generate_safe_prime(p_bits, &self.config, rng)?;
            let q = generate_safe_prime(q_bits, &self.config, rng)?;
            if p.p == q.p {
                debug!(attempt, "Drew the same prime twice, retrying");
                continue;
            }

            let m = SecretInt::new(&p.p_prime * &q.p_prime);
            let Some(d) = mod_inverse(e, m.expose()) else {
                debug!(attempt, "Public exponent not invertible, retrying");
                continue;
            };

            return Ok(DealerSecrets {
                p: SecretInt::new(p.p.clone()),
                q: SecretInt::new(q.p.clone()),
                p_prime: SecretInt::new(p.p_prime.clone()),
                q_prime: SecretInt::new(q.p_prime.clone()),
                m,
                d: SecretInt::new(d),
                coefficients: Vec::new(),
            });
        }

        Err(Error::KeyGeneration(format!(
            "No usable modulus after {} attempts",
            MAX_MODULUS_ATTEMPTS
        )))
    }
}

impl Drop for Dealer {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// a_1 .. a_{k-1} uniform in [0, m·l·2^HIDING_BITS)
///
/// Shares are not reduced modulo m (signers do not know m), so the
/// coefficients must be wide enough to statistically hide f(0) = d in any
/// k - 1 evaluations.
fn random_coefficients<R: RngCore + CryptoRng>(
    m: &BigUint,
    params: &ThresholdParams,
    rng: &mut R,
) -> Vec<SecretInt> {
    let bound = (m * BigUint::from(params.shares())) << HIDING_BITS;
    (1..params.threshold())
        .map(|_| SecretInt::new(rng.gen_biguint_below(&bound)))
        .collect()
}

/// Random square modulo n with a unit root
fn verification_base<R: RngCore + CryptoRng>(n: &BigUint, rng: &mut R) -> BigUint {
    let two = BigUint::from(2u32);
    loop {
        let r = rng.gen_biguint_range(&two, n);
        if r.gcd(n).is_one() {
            let v = r.modpow(&two, n);
            if !v.is_one() {
                return v;
            }
        }
    }
}

/// Evaluate f at 1..=l and attach the verification values
fn deal_shares<R: RngCore + CryptoRng>(
    secrets: &DealerSecrets,
    group_key: &GroupKey,
    params: &ThresholdParams,
    rng: &mut R,
) -> Vec<KeyShare> {
    let n = group_key.modulus();
    let v = verification_base(n, rng);
    let l = params.shares();

    let make_share = |i: usize| {
        let polynomial = std::iter::once(&secrets.d)
            .chain(secrets.coefficients.iter())
            .map(SecretInt::expose);
        let s_i = eval_polynomial(polynomial, i);
        let v_i = v.modpow(s_i.expose(), n);
        KeyShare::new(i, l, group_key, s_i, v.clone(), v_i)
    };

    #[cfg(feature = "multi-thread")]
    let shares = (1..=l).into_par_iter().map(make_share).collect();
    #[cfg(not(feature = "multi-thread"))]
    let shares = (1..=l).map(make_share).collect();

    shares
}
