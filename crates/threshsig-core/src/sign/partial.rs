//! Partial signing with a single key share

use crate::math::SecretInt;
use crate::{KeyShare, Result, SigShare};
use tracing::{debug, instrument};

impl KeyShare {
    /// Partially sign `message`: x_i = H(m)^{2·Δ·s_i} mod n
    ///
    /// Pure in `self`; safe to call concurrently from several threads.
    #[instrument(skip_all, fields(index = self.index))]
    pub fn sign(&self, message: &[u8]) -> Result<SigShare> {
        let h = self.message_representative(message)?;
        let exponent = SecretInt::new((self.share.expose() * &self.delta) << 1u32);
        let value = h.modpow(exponent.expose(), &self.modulus);

        debug!(message_len = message.len(), "Partial signature computed");
        Ok(SigShare::new(self.index, value))
    }
}
