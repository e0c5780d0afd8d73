//! Key share wire format
//!
//! `wrap` produces `MAGIC || VERSION || bincode(KeyShareRecord)` with every
//! integer stored as big-endian bytes. `unwrap` is total: anything that does
//! not decode to a structurally valid share is a [`Error::MalformedShare`].

use crate::math::{factorial, SecretInt};
use crate::types::{check_key_components, KeyShare};
use crate::{Error, Result, MAX_SHARES};
use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Leading bytes of every wrapped share
pub const MAGIC: [u8; 4] = *b"TRSA";

/// Current wire format version
pub const WIRE_VERSION: u8 = 1;

/// Upper bound on the encoded record size
const MAX_RECORD_BYTES: usize = 1 << 20;

/// Externally safe fields of a key share
#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct KeyShareRecord {
    index: u32,
    l: u32,
    #[serde(with = "bytes_serde")]
    modulus: Vec<u8>,
    #[serde(with = "bytes_serde")]
    public_exponent: Vec<u8>,
    #[serde(with = "bytes_serde")]
    share: Vec<u8>,
    #[serde(with = "bytes_serde")]
    verification_base: Vec<u8>,
    #[serde(with = "bytes_serde")]
    verification_value: Vec<u8>,
}

/// Hex in human-readable formats, raw bytes otherwise
mod bytes_serde {
    use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&hex::encode(bytes))
        } else {
            bytes.serialize(serializer)
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            hex::decode(s).map_err(D::Error::custom)
        } else {
            Vec::<u8>::deserialize(deserializer)
        }
    }
}

impl From<&KeyShare> for KeyShareRecord {
    fn from(share: &KeyShare) -> Self {
        Self {
            index: share.index as u32,
            l: share.l as u32,
            modulus: share.modulus.to_bytes_be(),
            public_exponent: share.public_exponent.to_bytes_be(),
            share: share.share.expose().to_bytes_be(),
            verification_base: share.verification_base.to_bytes_be(),
            verification_value: share.verification_value.to_bytes_be(),
        }
    }
}

impl From<KeyShare> for KeyShareRecord {
    fn from(share: KeyShare) -> Self {
        Self::from(&share)
    }
}

impl TryFrom<KeyShareRecord> for KeyShare {
    type Error = Error;

    fn try_from(mut record: KeyShareRecord) -> Result<Self> {
        let l = record.l as usize;
        if l < 1 || l > MAX_SHARES {
            return Err(Error::MalformedShare(format!(
                "Share count {} outside [1, {}]",
                l, MAX_SHARES
            )));
        }
        let index = record.index as usize;
        if index < 1 || index > l {
            return Err(Error::MalformedShare(format!(
                "Index {} outside [1, {}]",
                index, l
            )));
        }

        let modulus = BigUint::from_bytes_be(&record.modulus);
        let public_exponent = BigUint::from_bytes_be(&record.public_exponent);
        check_key_components(&modulus, &public_exponent)
            .map_err(|reason| Error::MalformedShare(reason.into()))?;

        let share = SecretInt::new(BigUint::from_bytes_be(&std::mem::take(&mut record.share)));
        if share.expose().is_zero() {
            return Err(Error::MalformedShare("Share exponent is zero".into()));
        }

        let verification_base = BigUint::from_bytes_be(&record.verification_base);
        let verification_value = BigUint::from_bytes_be(&record.verification_value);
        for (name, value) in [
            ("verification base", &verification_base),
            ("verification value", &verification_value),
        ] {
            if value.is_zero() || value >= &modulus {
                return Err(Error::MalformedShare(format!("{} outside [1, n)", name)));
            }
        }

        Ok(KeyShare {
            index,
            l,
            modulus,
            public_exponent,
            share,
            delta: factorial(l),
            verification_base,
            verification_value,
        })
    }
}

fn bincode_config() -> impl bincode::config::Config {
    bincode::config::standard().with_limit::<MAX_RECORD_BYTES>()
}

impl KeyShare {
    /// Serialize this share for transport or storage
    pub fn wrap(&self) -> Result<Vec<u8>> {
        let record = KeyShareRecord::from(self);
        let body = bincode::serde::encode_to_vec(&record, bincode_config())?;

        let mut out = Vec::with_capacity(MAGIC.len() + 1 + body.len());
        out.extend_from_slice(&MAGIC);
        out.push(WIRE_VERSION);
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Decode a share produced by [`KeyShare::wrap`]
    pub fn unwrap(bytes: &[u8]) -> Result<KeyShare> {
        if bytes.len() < MAGIC.len() + 1 {
            return Err(Error::MalformedShare(format!(
                "Input of {} bytes is too short",
                bytes.len()
            )));
        }
        let (magic, rest) = bytes.split_at(MAGIC.len());
        if magic != MAGIC {
            return Err(Error::MalformedShare("Bad magic".into()));
        }
        let (version, body) = (rest[0], &rest[1..]);
        if version != WIRE_VERSION {
            return Err(Error::MalformedShare(format!(
                "Unsupported version {}",
                version
            )));
        }

        let (record, consumed): (KeyShareRecord, usize) =
            bincode::serde::decode_from_slice(body, bincode_config())?;
        if consumed != body.len() {
            return Err(Error::MalformedShare(format!(
                "{} trailing bytes",
                body.len() - consumed
            )));
        }

        KeyShare::try_from(record)
    }
}
