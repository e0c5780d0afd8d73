//! Signature combination by Lagrange interpolation in the exponent

use super::SigShareSet;
use crate::encoding::encode_message;
use crate::math::{bezout, factorial, lagrange_coefficient, pow_signed, to_fixed_be};
use crate::{Error, GroupKey, Result, SigShare, ThresholdParams};
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::One;
use tracing::{debug, instrument};

impl SigShare {
    /// Combine k signature shares into a full RSA signature over `message`
    ///
    /// Returns the signature as big-endian bytes of the modulus length. Fails
    /// only on bad parameters or indices; a corrupted share produces a
    /// signature that does not verify.
    #[instrument(skip(message, shares, group_key), fields(count = shares.len()))]
    pub fn combine(
        message: &[u8],
        shares: &[SigShare],
        k: usize,
        l: usize,
        group_key: &GroupKey,
    ) -> Result<Vec<u8>> {
        let params = ThresholdParams::new(k, l)?;
        SigShareSet::new(shares, params)?.combine(message, group_key)
    }
}

impl SigShareSet {
    /// Interpolate the validated shares into a signature over `message`
    pub fn combine(&self, message: &[u8], group_key: &GroupKey) -> Result<Vec<u8>> {
        let n = group_key.modulus();
        let delta = factorial(self.params().shares());
        let indices = self.indices();
        debug!(indices = ?indices, group = %group_key.fingerprint(), "Combining signature shares");

        // w = ∏ x_j^{2·λ_j} = H^{4·Δ²·d}
        let mut w = BigUint::one();
        for (j, share) in self.shares().iter().enumerate() {
            let lambda = lagrange_coefficient(&indices, j, &delta);
            let term = pow_signed(share.value(), &(lambda * 2), n).ok_or_else(|| {
                Error::InvalidParameter(format!(
                    "Share {} is not a unit modulo n",
                    share.index()
                ))
            })?;
            w = w * term % n;
        }

        // w^e = H^{e'} with e' = 4·Δ²; a·e' + b·e = 1 gives y = w^a·H^b
        let h = encode_message(message, group_key.size())?;
        let e = BigInt::from_biguint(Sign::Plus, group_key.public_exponent().clone());
        let e_prime = BigInt::from_biguint(Sign::Plus, (&delta * &delta) << 2u32);
        let (g, a, b) = bezout(&e_prime, &e);
        if !g.is_one() {
            return Err(Error::InvalidParameter(format!(
                "Public exponent is not coprime to 4·({}!)²",
                self.params().shares()
            )));
        }

        let w_a = pow_signed(&w, &a, n).ok_or_else(|| {
            Error::InvalidParameter("Interpolated value is not a unit modulo n".into())
        })?;
        let h_b = pow_signed(&h, &b, n).ok_or_else(|| {
            Error::InvalidParameter("Message representative is not a unit modulo n".into())
        })?;
        let y = w_a * h_b % n;

        Ok(to_fixed_be(&y, group_key.size()))
    }
}
