//! Integer arithmetic helpers shared by the dealer and the combiner

use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_traits::{One, Signed, Zero};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// Big integer holding secret material, wiped on zeroize and drop
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretInt(BigUint);

impl SecretInt {
    /// Wrap a secret value
    pub fn new(value: BigUint) -> Self {
        Self(value)
    }

    /// Borrow the secret value
    pub fn expose(&self) -> &BigUint {
        &self.0
    }
}

impl Zeroize for SecretInt {
    fn zeroize(&mut self) {
        wipe(&mut self.0);
    }
}

impl Drop for SecretInt {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl std::fmt::Debug for SecretInt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretInt(..)")
    }
}

/// Overwrite the limbs of `value` in place before releasing them
pub fn wipe(value: &mut BigUint) {
    let digits = value.iter_u32_digits().len();
    value.assign_from_slice(&vec![0u32; digits]);
    value.set_zero();
}

/// [`wipe`] for signed temporaries
pub fn wipe_signed(value: BigInt) {
    let (_, mut magnitude) = value.into_parts();
    wipe(&mut magnitude);
}

/// Δ = l!
pub fn factorial(l: usize) -> BigUint {
    (2..=l as u64).fold(BigUint::one(), |acc, i| acc * i)
}

/// Extended Euclid over signed integers: returns (g, x, y) with a·x + b·y = g
pub fn bezout(a: &BigInt, b: &BigInt) -> (BigInt, BigInt, BigInt) {
    let egcd = a.extended_gcd(b);
    (egcd.gcd, egcd.x, egcd.y)
}

/// Inverse of `a` modulo `m`, if it exists
pub fn mod_inverse(a: &BigUint, m: &BigUint) -> Option<BigUint> {
    if m.is_zero() {
        return None;
    }
    let a = BigInt::from_biguint(Sign::Plus, a % m);
    let m = BigInt::from_biguint(Sign::Plus, m.clone());
    let (g, x, y) = bezout(&a, &m);
    let inverse = if g.is_one() {
        x.mod_floor(&m).to_biguint()
    } else {
        None
    };

    // The dealer inverts modulo the secret m
    for temporary in [a, m, g, x, y] {
        wipe_signed(temporary);
    }
    inverse
}

/// `base^exp mod n` for a signed exponent; negative exponents invert first
pub fn pow_signed(base: &BigUint, exp: &BigInt, n: &BigUint) -> Option<BigUint> {
    let magnitude = exp.magnitude();
    if exp.is_negative() {
        let inv = mod_inverse(base, n)?;
        Some(inv.modpow(magnitude, n))
    } else {
        Some(base.modpow(magnitude, n))
    }
}

/// Integer Lagrange coefficient for evaluating at zero, scaled by `delta`
///
/// λ_j = Δ · ∏_{m≠j} i_m / (i_m − i_j). The division is exact whenever every
/// index lies in [1, l] and `delta` = l!.
pub fn lagrange_coefficient(indices: &[usize], j: usize, delta: &BigUint) -> BigInt {
    let i_j = BigInt::from(indices[j]);
    let mut numerator = BigInt::from_biguint(Sign::Plus, delta.clone());
    let mut denominator = BigInt::one();

    for (m, &i_m) in indices.iter().enumerate() {
        if m == j {
            continue;
        }
        let i_m = BigInt::from(i_m);
        denominator *= &i_m - &i_j;
        numerator *= i_m;
    }

    let (quotient, remainder) = numerator.div_rem(&denominator);
    debug_assert!(remainder.is_zero(), "Δ must clear every denominator");
    quotient
}

/// Evaluate a polynomial at `x` over the integers, coefficients lowest
/// degree first
///
/// Horner accumulators are wiped as soon as the next one exists. Buffers
/// released by reallocation inside num-bigint are not reached.
pub fn eval_polynomial<'a, I>(coefficients: I, x: usize) -> SecretInt
where
    I: DoubleEndedIterator<Item = &'a BigUint>,
{
    let mut acc = BigUint::zero();
    for coef in coefficients.rev() {
        let mut next = &acc * x;
        next += coef;
        wipe(&mut acc);
        acc = next;
    }
    SecretInt::new(acc)
}

/// Fixed-width big-endian encoding of `value`
pub fn to_fixed_be(value: &BigUint, len: usize) -> Vec<u8> {
    let bytes = value.to_bytes_be();
    if bytes.len() >= len {
        return bytes;
    }
    let mut out = vec![0u8; len - bytes.len()];
    out.extend_from_slice(&bytes);
    out
}
