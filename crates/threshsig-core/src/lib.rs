//! # threshsig core
//!
//! Core primitives for (k, l) threshold RSA signatures with a trusted dealer.
//!
//! This crate provides the fundamental building blocks for:
//! - Dealer key generation (safe-prime modulus, integer polynomial sharing)
//! - Partial signing with a single key share
//! - Combination of k partial signatures into a standard RSA signature
//!
//! ## Protocol Overview
//!
//! The private exponent `d` is shared with a degree `k - 1` polynomial over
//! the integers. Every signer raises the padded message to `2·Δ·s_i`, with
//! `Δ = l!`, and any k of those values are combined by Lagrange
//! interpolation in the exponent. The result is an ordinary PKCS#1 v1.5
//! signature that verifies against the group public key alone:
//! - No party, including the combiner, ever sees `d`
//! - Fewer than k shares reveal nothing about `d`
//! - Any k-subset yields the same signature
//!
//! ## Example
//!
//! ```rust,ignore
//! use threshsig_core::{Dealer, SigShare};
//!
//! let mut dealer = Dealer::new(1024)?;
//! dealer.generate_keys(3, 5)?;
//! let group_key = dealer.group_key().cloned().unwrap();
//! let shares = dealer.take_shares();
//! dealer.destroy();
//!
//! let partials = shares[..3]
//!     .iter()
//!     .map(|share| share.sign(message))
//!     .collect::<Result<Vec<_>, _>>()?;
//! let signature = SigShare::combine(message, &partials, 3, 5, &group_key)?;
//! group_key.verify(message, &signature)?;
//! ```

pub mod config;
pub mod encoding;
pub mod error;
pub mod keygen;
pub mod math;
pub mod sign;
pub mod types;
pub mod wire;

pub use config::{DealerConfig, ThresholdParams};
pub use keygen::Dealer;
pub use error::{Error, Result};
pub use sign::SigShareSet;
pub use types::{GroupKey, KeyShare, ShareIndex, SigShare};

/// Protocol version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Smallest modulus size, in bits, accepted by the dealer
pub const MIN_KEY_SIZE: usize = 512;

/// Default modulus size in bits
pub const DEFAULT_KEY_SIZE: usize = 2048;

/// Largest supported number of shares
pub const MAX_SHARES: usize = 4096;

/// Default public exponent (F4)
pub const DEFAULT_PUBLIC_EXPONENT: u64 = 65_537;
