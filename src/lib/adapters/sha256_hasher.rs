use alloy_primitives::B256;
use sha2::{Digest, Sha256};

use crate::ports::hash::HashFunction;

/// SHA-256 over the raw bytes. Digests are not reduced into the field.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl HashFunction for Sha256Hasher {
    fn hash(&self, data: &[u8]) -> B256 {
        B256::from_slice(&Sha256::digest(data))
    }
}
