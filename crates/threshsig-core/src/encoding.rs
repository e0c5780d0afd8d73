//! Message representative: EMSA-PKCS1-v1_5 over SHA-256

use crate::{Error, Result};
use num_bigint::BigUint;
use rsa::Pkcs1v15Sign;
use sha2::{Digest, Sha256};

/// Minimum `0xff` padding bytes
const MIN_PADDING: usize = 8;

/// Encode `message` into the RSA domain of a modulus `modulus_len` bytes long
///
/// The output is the integer a standard `SHA256withRSA` verifier expects to
/// recover from `signature^e mod n`. The `DigestInfo` prefix is the one the
/// `rsa` crate's verifier checks against.
pub fn encode_message(message: &[u8], modulus_len: usize) -> Result<BigUint> {
    let scheme = Pkcs1v15Sign::new::<Sha256>();
    let digest = Sha256::digest(message);
    let t_len = scheme.prefix.len() + digest.len();

    if modulus_len < t_len + MIN_PADDING + 3 {
        return Err(Error::Encoding(format!(
            "Modulus of {} bytes is too short for a SHA-256 PKCS#1 v1.5 encoding",
            modulus_len
        )));
    }

    let mut em = Vec::with_capacity(modulus_len);
    em.push(0x00);
    em.push(0x01);
    em.resize(modulus_len - t_len - 1, 0xff);
    em.push(0x00);
    em.extend_from_slice(&scheme.prefix);
    em.extend_from_slice(&digest);

    Ok(BigUint::from_bytes_be(&em))
}
