use alloy_primitives::B256;

use crate::domain::keys::{PublicKey, Signature};

/// Port for verifying transfer signatures.
///
/// `Ok(false)` means the signature is well-formed but does not verify;
/// `Err` means the inputs could not be interpreted at all.
///
/// Implementations:
/// - `GrumpkinSchnorr`
pub trait SignatureScheme: Send + Sync {
    fn verify(
        &self,
        public_key: &PublicKey,
        message: &B256,
        signature: &Signature,
    ) -> Result<bool, SignatureError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("public key is not a valid curve point")]
    InvalidPublicKey,

    #[error("signature commitment is not a valid curve point")]
    InvalidCommitment,

    #[error("signature scalar is not canonical")]
    NonCanonicalScalar,
}
