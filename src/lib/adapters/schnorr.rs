use alloy_primitives::B256;

use crate::crypto::schnorr;
use crate::domain::keys::{PublicKey, Signature};
use crate::ports::signature::{SignatureError, SignatureScheme};

/// Schnorr verification over Grumpkin; see [`crate::crypto::schnorr`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GrumpkinSchnorr;

impl SignatureScheme for GrumpkinSchnorr {
    fn verify(
        &self,
        public_key: &PublicKey,
        message: &B256,
        signature: &Signature,
    ) -> Result<bool, SignatureError> {
        schnorr::verify(public_key, message, signature)
    }
}
