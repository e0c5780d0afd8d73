//! Core types for threshold RSA

use crate::encoding::encode_message;
use crate::math::{factorial, SecretInt};
use crate::wire::KeyShareRecord;
use crate::{Error, Result, MIN_KEY_SIZE};
use num_bigint::BigUint;
use num_integer::Integer;
use rsa::{Pkcs1v15Sign, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// 1-based share index in [1, l]
pub type ShareIndex = usize;

/// Public RSA key common to all participants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GroupKeyFields")]
pub struct GroupKey {
    /// Modulus n = p·q
    modulus: BigUint,
    /// Public exponent e
    public_exponent: BigUint,
}

/// Unchecked group key components as read from serialized input
#[derive(Deserialize)]
struct GroupKeyFields {
    modulus: BigUint,
    public_exponent: BigUint,
}

impl TryFrom<GroupKeyFields> for GroupKey {
    type Error = Error;

    fn try_from(fields: GroupKeyFields) -> Result<Self> {
        Self::new(fields.modulus, fields.public_exponent)
    }
}

/// Structural checks shared by group keys and decoded key shares
pub(crate) fn check_key_components(
    modulus: &BigUint,
    public_exponent: &BigUint,
) -> std::result::Result<(), &'static str> {
    if (modulus.bits() as usize) < MIN_KEY_SIZE || modulus.is_even() {
        return Err("modulus is too small or even");
    }
    if public_exponent < &BigUint::from(3u32) || public_exponent.is_even() {
        return Err("public exponent must be odd and at least 3");
    }
    if public_exponent >= modulus {
        return Err("public exponent must be below the modulus");
    }
    Ok(())
}

impl GroupKey {
    /// Create a group key from its components
    ///
    /// Rejects a modulus below [`MIN_KEY_SIZE`] bits or even, and an even
    /// exponent or one below 3.
    pub fn new(modulus: BigUint, public_exponent: BigUint) -> Result<Self> {
        check_key_components(&modulus, &public_exponent)
            .map_err(|reason| Error::InvalidParameter(format!("Invalid group key: {}", reason)))?;
        Ok(Self {
            modulus,
            public_exponent,
        })
    }

    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    pub fn public_exponent(&self) -> &BigUint {
        &self.public_exponent
    }

    /// Modulus size in bits
    pub fn bits(&self) -> usize {
        self.modulus.bits() as usize
    }

    /// Modulus size in bytes; signatures have exactly this length
    pub fn size(&self) -> usize {
        (self.bits() + 7) / 8
    }

    /// Short hex fingerprint of the modulus, for logs
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.modulus.to_bytes_be());
        hex::encode(&digest[..8])
    }

    /// Convert to a standard RSA public key
    pub fn to_public_key(&self) -> Result<RsaPublicKey> {
        RsaPublicKey::new(
            rsa::BigUint::from_bytes_be(&self.modulus.to_bytes_be()),
            rsa::BigUint::from_bytes_be(&self.public_exponent.to_bytes_be()),
        )
        .map_err(|e| Error::InvalidParameter(format!("Unusable group key: {}", e)))
    }

    /// Verify a `SHA256withRSA` PKCS#1 v1.5 signature over `message`
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<()> {
        let hashed = Sha256::digest(message);
        self.to_public_key()?
            .verify(Pkcs1v15Sign::new::<Sha256>(), &hashed, signature)
            .map_err(|_| Error::InvalidSignature)
    }
}

/// A single participant's share of the private exponent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "KeyShareRecord", into = "KeyShareRecord")]
pub struct KeyShare {
    /// This share's index
    pub(crate) index: ShareIndex,

    /// Total number of shares
    pub(crate) l: usize,

    /// Group modulus
    pub(crate) modulus: BigUint,

    /// Group public exponent
    pub(crate) public_exponent: BigUint,

    /// Share exponent s_i = f(i)
    pub(crate) share: SecretInt,

    /// Δ = l!
    pub(crate) delta: BigUint,

    /// Verification base v, a square mod n shared by the whole dealing
    pub(crate) verification_base: BigUint,

    /// Verification value v^{s_i} mod n
    pub(crate) verification_value: BigUint,
}

impl KeyShare {
    pub(crate) fn new(
        index: ShareIndex,
        l: usize,
        group_key: &GroupKey,
        share: SecretInt,
        verification_base: BigUint,
        verification_value: BigUint,
    ) -> Self {
        Self {
            index,
            l,
            modulus: group_key.modulus.clone(),
            public_exponent: group_key.public_exponent.clone(),
            share,
            delta: factorial(l),
            verification_base,
            verification_value,
        }
    }

    pub fn index(&self) -> ShareIndex {
        self.index
    }

    /// Total number of shares in the dealing
    pub fn share_count(&self) -> usize {
        self.l
    }

    /// Δ = l!
    pub fn delta(&self) -> &BigUint {
        &self.delta
    }

    /// The group key this share belongs to
    pub fn group_key(&self) -> GroupKey {
        // Components were checked when the share was dealt or decoded
        GroupKey {
            modulus: self.modulus.clone(),
            public_exponent: self.public_exponent.clone(),
        }
    }

    pub fn verification_base(&self) -> &BigUint {
        &self.verification_base
    }

    pub fn verification_value(&self) -> &BigUint {
        &self.verification_value
    }

    /// Check on receipt that the share exponent matches its published
    /// verification value
    pub fn check_verification_value(&self) -> bool {
        let expected = self
            .verification_base
            .modpow(self.share.expose(), &self.modulus);
        let len = (self.modulus.bits() as usize + 7) / 8;
        let lhs = crate::math::to_fixed_be(&expected, len);
        let rhs = crate::math::to_fixed_be(&self.verification_value, len);
        lhs.ct_eq(&rhs).into()
    }

    /// Message representative H(m) in Z_n
    pub(crate) fn message_representative(&self, message: &[u8]) -> Result<BigUint> {
        let len = (self.modulus.bits() as usize + 7) / 8;
        encode_message(message, len)
    }
}

/// Partial signature x_i = H(m)^{2·Δ·s_i} mod n
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigShare {
    /// Index of the key share that produced this value
    index: ShareIndex,
    /// Partial signature value
    value: BigUint,
}

impl SigShare {
    pub fn new(index: ShareIndex, value: BigUint) -> Self {
        Self { index, value }
    }

    pub fn index(&self) -> ShareIndex {
        self.index
    }

    pub fn value(&self) -> &BigUint {
        &self.value
    }

    /// Partial signature value as lowercase hex
    pub fn value_hex(&self) -> String {
        self.value.to_str_radix(16)
    }

    /// Rebuild a signature share from its index and hex value
    pub fn from_hex(index: ShareIndex, value: &str) -> Result<Self> {
        let value = BigUint::parse_bytes(value.as_bytes(), 16).ok_or_else(|| {
            Error::Encoding(format!("Signature share {} is not valid hex", index))
        })?;
        Ok(Self::new(index, value))
    }
}
