//! Trusted dealer key generation
//!
//! The dealer builds a safe-prime RSA modulus, shares the private exponent
//! with an integer polynomial and hands out one [`crate::KeyShare`] per
//! participant.

mod dealer;
pub(crate) mod primes;

pub use dealer::Dealer;
pub use primes::{generate_safe_prime, SafePrime};
