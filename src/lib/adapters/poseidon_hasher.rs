use alloy_primitives::B256;

use crate::crypto::poseidon::{hash_bytes, poseidon2};
use crate::ports::hash::HashFunction;

/// BN254 Poseidon (circom parameters).
///
/// Byte strings go through the length-prefixed sponge in
/// [`crate::crypto::poseidon::hash_bytes`]; Merkle nodes hash their two
/// children as field elements with a single 2-input permutation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoseidonHasher;

impl HashFunction for PoseidonHasher {
    fn hash(&self, data: &[u8]) -> B256 {
        hash_bytes(data)
    }

    fn hash_pair(&self, left: &B256, right: &B256) -> B256 {
        poseidon2(*left, *right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::merkle::{build_proof, verify_proof};

    #[test]
    fn test_pair_uses_two_input_permutation() {
        let a = B256::with_last_byte(1);
        let b = B256::with_last_byte(2);
        assert_eq!(PoseidonHasher.hash_pair(&a, &b), poseidon2(a, b));
    }

    #[test]
    fn test_merkle_proof_with_poseidon() {
        let leaves: Vec<B256> = (0..5u8)
            .map(|i| PoseidonHasher.hash(&[i; 160]))
            .collect();
        let proof = build_proof(&PoseidonHasher, &leaves, 4).unwrap();
        assert!(verify_proof(&PoseidonHasher, &proof.root, &proof.path, 4, 5));
    }
}
