//! Partial signing and signature combination
//!
//! Each key share signs on its own ([`crate::KeyShare::sign`]); any k of the
//! resulting [`SigShare`]s are combined by Lagrange interpolation in the
//! exponent ([`SigShare::combine`]).
//!
//! Combination does not check individual shares. One bad share yields a
//! signature that fails verification; it is not reported at combine time.

mod combine;
mod partial;

use crate::{Error, Result, ShareIndex, SigShare, ThresholdParams};

/// Signature shares with distinct indices in [1, l], at least k of them
///
/// Only the first k shares are kept; interpolation needs no more.
#[derive(Debug, Clone)]
pub struct SigShareSet {
    params: ThresholdParams,
    shares: Vec<SigShare>,
}

impl SigShareSet {
    /// Validate `shares` against `params`
    ///
    /// Out-of-range and duplicate indices are reported before the share
    /// count is checked.
    pub fn new(shares: &[SigShare], params: ThresholdParams) -> Result<Self> {
        let l = params.shares();
        let mut seen = vec![false; l + 1];

        for share in shares {
            let index = share.index();
            if index < 1 || index > l {
                return Err(Error::InvalidIndex {
                    index,
                    reason: "outside [1, l]",
                });
            }
            if seen[index] {
                return Err(Error::InvalidIndex {
                    index,
                    reason: "duplicate",
                });
            }
            seen[index] = true;
        }

        let k = params.threshold();
        if shares.len() < k {
            return Err(Error::InsufficientShares {
                required: k,
                actual: shares.len(),
            });
        }

        Ok(Self {
            params,
            shares: shares[..k].to_vec(),
        })
    }

    pub fn params(&self) -> ThresholdParams {
        self.params
    }

    pub fn shares(&self) -> &[SigShare] {
        &self.shares
    }

    /// Indices of the kept shares, in input order
    pub fn indices(&self) -> Vec<ShareIndex> {
        self.shares.iter().map(SigShare::index).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigUint;

    fn shares(indices: &[usize]) -> Vec<SigShare> {
        indices
            .iter()
            .map(|&i| SigShare::new(i, BigUint::from(i as u32 + 1)))
            .collect()
    }

    #[test]
    fn test_accepts_distinct_indices() {
        let params = ThresholdParams::new(3, 5).unwrap();
        let set = SigShareSet::new(&shares(&[5, 1, 3]), params).unwrap();
        assert_eq!(set.indices(), vec![5, 1, 3]);
    }

    #[test]
    fn test_keeps_first_k() {
        let params = ThresholdParams::new(2, 5).unwrap();
        let set = SigShareSet::new(&shares(&[4, 2, 5]), params).unwrap();
        assert_eq!(set.indices(), vec![4, 2]);
    }

    #[test]
    fn test_insufficient_shares() {
        let params = ThresholdParams::new(3, 5).unwrap();
        assert!(matches!(
            SigShareSet::new(&shares(&[1, 2]), params),
            Err(Error::InsufficientShares {
                required: 3,
                actual: 2
            })
        ));
        assert!(matches!(
            SigShareSet::new(&[], params),
            Err(Error::InsufficientShares { .. })
        ));
    }

    #[test]
    fn test_invalid_indices() {
        let params = ThresholdParams::new(3, 5).unwrap();
        assert!(matches!(
            SigShareSet::new(&shares(&[0, 1, 2]), params),
            Err(Error::InvalidIndex { index: 0, .. })
        ));
        assert!(matches!(
            SigShareSet::new(&shares(&[1, 2, 6]), params),
            Err(Error::InvalidIndex { index: 6, .. })
        ));
        assert!(matches!(
            SigShareSet::new(&shares(&[1, 2, 2]), params),
            Err(Error::InvalidIndex {
                index: 2,
                reason: "duplicate"
            })
        ));

        // Duplicates are reported even when the set is also too small
        assert!(matches!(
            SigShareSet::new(&shares(&[4, 4]), params),
            Err(Error::InvalidIndex { index: 4, .. })
        ));
    }
}
