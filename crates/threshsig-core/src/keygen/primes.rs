//! Primality testing and safe-prime search

use crate::math::wipe;
use crate::{config::DealerConfig, Error, Result};
use num_bigint::{BigUint, RandBigInt};
use num_traits::One;
use rand_core::{CryptoRng, RngCore};
use std::sync::OnceLock;
use tracing::{debug, instrument};

#[cfg(feature = "multi-thread")]
use rayon::prelude::*;

/// Upper bound of the trial-division sieve
const SIEVE_LIMIT: usize = 2048;

/// A safe prime `p = 2·p' + 1` together with its Sophie Germain half `p'`
pub struct SafePrime {
    pub p: BigUint,
    pub p_prime: BigUint,
}

impl Drop for SafePrime {
    fn drop(&mut self) {
        wipe(&mut self.p);
        wipe(&mut self.p_prime);
    }
}

fn small_primes() -> &'static [u32] {
    static PRIMES: OnceLock<Vec<u32>> = OnceLock::new();
    PRIMES.get_or_init(|| {
        let mut composite = vec![false; SIEVE_LIMIT + 1];
        let mut primes = Vec::new();
        for i in 2..=SIEVE_LIMIT {
            if composite[i] {
                continue;
            }
            primes.push(i as u32);
            for j in (i * i..=SIEVE_LIMIT).step_by(i) {
                composite[j] = true;
            }
        }
        primes
    })
}

/// Trial-division primality for word-sized values
pub(crate) fn is_small_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let mut d = 3u64;
    while d * d <= n {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}

/// Miller-Rabin with the first `rounds` primes as witnesses
///
/// Only for the dealer's own random candidates: composites built against
/// fixed witnesses pass this test, so it must not judge untrusted input.
pub(crate) fn is_probable_prime(n: &BigUint, rounds: usize) -> bool {
    let two = BigUint::from(2u32);
    if n < &two {
        return false;
    }
    for &p in small_primes() {
        if n == &BigUint::from(p) {
            return true;
        }
        if residue(n, p) == 0 {
            return false;
        }
    }

    let n_minus_1 = n - 1u32;
    let s = n_minus_1.trailing_zeros().unwrap_or(0);
    let d = &n_minus_1 >> s;

    'witness: for &a in small_primes().iter().take(rounds) {
        let mut x = BigUint::from(a).modpow(&d, n);
        if x.is_one() || x == n_minus_1 {
            continue;
        }
        for _ in 1..s {
            x = x.modpow(&two, n);
            if x == n_minus_1 {
                continue 'witness;
            }
        }
        return false;
    }

    true
}

/// `n mod r` without allocating
fn residue(n: &BigUint, r: u32) -> u32 {
    let r = u64::from(r);
    n.iter_u32_digits()
        .rev()
        .fold(0u64, |acc, digit| ((acc << 32) | u64::from(digit)) % r) as u32
}

/// Cheap filter: neither `p'` nor `2·p' + 1` has a small factor
fn passes_sieve(p_prime: &BigUint) -> bool {
    small_primes().iter().all(|&r| {
        let rho = residue(p_prime, r);
        rho != 0 && (2 * rho + 1) % r != 0
    })
}

fn is_safe_prime_half(p_prime: &BigUint, rounds: usize) -> bool {
    if !passes_sieve(p_prime) {
        return false;
    }
    let p: BigUint = (p_prime << 1u32) + 1u32;

    // Fermat base 2 on p first, it rejects most survivors of the sieve
    let two = BigUint::from(2u32);
    if !two.modpow(&(&p - 1u32), &p).is_one() {
        return false;
    }

    is_probable_prime(p_prime, rounds) && is_probable_prime(&p, rounds)
}

/// Random `bits`-bit odd value with its two top bits set
fn random_candidate<R: RngCore + CryptoRng>(bits: u64, rng: &mut R) -> BigUint {
    let mut candidate = rng.gen_biguint(bits);
    candidate |= BigUint::from(3u32) << (bits - 2);
    candidate |= BigUint::one();
    candidate
}

/// Search for a `bits`-bit safe prime whose two top bits are set
///
/// Candidates are drawn a batch at a time from `rng` and tested in parallel.
/// The first passing candidate in draw order wins, so a seeded RNG always
/// produces the same prime.
#[instrument(skip(config, rng))]
pub fn generate_safe_prime<R: RngCore + CryptoRng>(
    bits: usize,
    config: &DealerConfig,
    rng: &mut R,
) -> Result<SafePrime> {
    if bits < 16 {
        return Err(Error::InvalidParameter(format!(
            "Safe prime size {} is too small",
            bits
        )));
    }
    let half_bits = (bits - 1) as u64;
    let rounds = config.miller_rabin_rounds;

    for round in 0..config.max_prime_rounds {
        let candidates: Vec<BigUint> = (0..config.prime_batch_size)
            .map(|_| random_candidate(half_bits, rng))
            .collect();

        #[cfg(feature = "multi-thread")]
        let found = candidates
            .par_iter()
            .find_first(|c| is_safe_prime_half(c, rounds));
        #[cfg(not(feature = "multi-thread"))]
        let found = candidates.iter().find(|c| is_safe_prime_half(c, rounds));

        if let Some(p_prime) = found {
            debug!(round, bits, "Safe prime found");
            let p_prime = p_prime.clone();
            let p = (&p_prime << 1u32) + 1u32;
            return Ok(SafePrime { p, p_prime });
        }
    }

    Err(Error::KeyGeneration(format!(
        "No {}-bit safe prime found in {} rounds of {} candidates",
        bits, config.max_prime_rounds, config.prime_batch_size
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha20Rng;
    use rand_core::SeedableRng;

    #[test]
    fn test_small_primes() {
        assert!(is_small_prime(2));
        assert!(is_small_prime(65_537));
        assert!(!is_small_prime(1));
        assert!(!is_small_prime(65_535));
        assert_eq!(small_primes()[..5], [2, 3, 5, 7, 11]);
    }

    #[test]
    fn test_residue() {
        let n = (BigUint::one() << 200u32) + 12_345u32;
        for &r in &[3u32, 7, 2039] {
            assert_eq!(BigUint::from(residue(&n, r)), &n % r);
        }
    }

    #[test]
    fn test_miller_rabin() {
        // 2^127 - 1 is a Mersenne prime
        let m127 = (BigUint::one() << 127u32) - 1u32;
        assert!(is_probable_prime(&m127, 16));

        // Carmichael number 561 and a product of two large primes
        assert!(!is_probable_prime(&BigUint::from(561u32), 16));
        let composite = &m127 * BigUint::from(2_305_843_009_213_693_951u64);
        assert!(!is_probable_prime(&composite, 16));
    }

    #[test]
    fn test_safe_prime_structure() {
        let mut rng = ChaCha20Rng::from_seed([7u8; 32]);
        let config = DealerConfig::with_key_size(512);
        let sp = generate_safe_prime(128, &config, &mut rng).unwrap();

        assert_eq!(sp.p.bits(), 128);
        assert_eq!(sp.p, (&sp.p_prime << 1u32) + 1u32);
        assert!(is_probable_prime(&sp.p, 32));
        assert!(is_probable_prime(&sp.p_prime, 32));
    }

    #[test]
    fn test_safe_prime_search_is_seeded() {
        let config = DealerConfig::with_key_size(512);
        let a = generate_safe_prime(96, &config, &mut ChaCha20Rng::from_seed([3u8; 32])).unwrap();
        let b = generate_safe_prime(96, &config, &mut ChaCha20Rng::from_seed([3u8; 32])).unwrap();
        assert_eq!(a.p, b.p);
    }

    #[test]
    fn test_exhausted_budget() {
        let mut config = DealerConfig::with_key_size(512);
        config.max_prime_rounds = 1;
        config.prime_batch_size = 1;

        // A single 512-bit candidate is a safe prime with negligible probability
        let mut rng = ChaCha20Rng::from_seed([1u8; 32]);
        assert!(matches!(
            generate_safe_prime(512, &config, &mut rng),
            Err(Error::KeyGeneration(_))
        ));
    }
}
