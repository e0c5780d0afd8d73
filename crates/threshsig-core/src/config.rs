//! Parameter types for dealing and combination

use crate::{Error, Result, DEFAULT_KEY_SIZE, DEFAULT_PUBLIC_EXPONENT, MAX_SHARES, MIN_KEY_SIZE};
use serde::{Deserialize, Serialize};

/// Threshold parameters: any `k` of `l` shares can sign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdParams {
    k: usize,
    l: usize,
}

impl ThresholdParams {
    /// Create validated threshold parameters
    pub fn new(k: usize, l: usize) -> Result<Self> {
        if k < 1 {
            return Err(Error::InvalidParameter(
                "Threshold must be at least 1".into(),
            ));
        }
        if k > l {
            return Err(Error::InvalidParameter(format!(
                "Threshold {} cannot exceed number of shares {}",
                k, l
            )));
        }
        if l > MAX_SHARES {
            return Err(Error::InvalidParameter(format!(
                "Number of shares {} exceeds maximum {}",
                l, MAX_SHARES
            )));
        }

        Ok(Self { k, l })
    }

    /// Number of shares required to sign
    pub fn threshold(&self) -> usize {
        self.k
    }

    /// Total number of shares
    pub fn shares(&self) -> usize {
        self.l
    }
}

/// Dealer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealerConfig {
    /// Modulus size in bits
    pub key_size: usize,

    /// Public exponent, an odd prime
    pub public_exponent: u64,

    /// Candidate batches tried per safe prime before giving up
    pub max_prime_rounds: usize,

    /// Candidates drawn per batch
    pub prime_batch_size: usize,

    /// Miller-Rabin rounds per primality test
    pub miller_rabin_rounds: usize,
}

impl Default for DealerConfig {
    fn default() -> Self {
        Self {
            key_size: DEFAULT_KEY_SIZE,
            public_exponent: DEFAULT_PUBLIC_EXPONENT,
            max_prime_rounds: 20_000,
            prime_batch_size: 64,
            miller_rabin_rounds: 32,
        }
    }
}

impl DealerConfig {
    /// Default configuration with the given modulus size
    pub fn with_key_size(key_size: usize) -> Self {
        Self {
            key_size,
            ..Self::default()
        }
    }

    /// Check the configuration before any prime search starts
    pub fn validate(&self) -> Result<()> {
        if self.key_size < MIN_KEY_SIZE {
            return Err(Error::InvalidParameter(format!(
                "Key size {} is below the minimum of {} bits",
                self.key_size, MIN_KEY_SIZE
            )));
        }
        if self.public_exponent < 3
            || self.public_exponent > u64::from(u32::MAX)
            || self.public_exponent % 2 == 0
            || !crate::keygen::primes::is_small_prime(self.public_exponent)
        {
            return Err(Error::InvalidParameter(format!(
                "Public exponent {} must be an odd 32-bit prime",
                self.public_exponent
            )));
        }
        if self.max_prime_rounds == 0 || self.prime_batch_size == 0 {
            return Err(Error::InvalidParameter(
                "Prime search budget must be positive".into(),
            ));
        }
        if self.miller_rabin_rounds == 0 {
            return Err(Error::InvalidParameter(
                "At least one Miller-Rabin round is required".into(),
            ));
        }

        Ok(())
    }
}
