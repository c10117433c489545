use alloy_primitives::B256;
use ark_bn254::Fr;
use light_poseidon::{Poseidon, PoseidonHasher};

use crate::domain::field::{fe_from_b256, fe_from_bytes, fe_to_b256};

/// Bytes absorbed per field element; 31 bytes always fit below the BN254 modulus.
const CHUNK_SIZE: usize = 31;

/// Poseidon (circom parameters) over `inputs.len()` field elements.
pub fn poseidon_fr(inputs: &[Fr]) -> Fr {
    let mut hasher =
        Poseidon::<Fr>::new_circom(inputs.len()).expect("Failed to create Poseidon hasher");
    hasher
        .hash(inputs)
        .expect("Failed to compute Poseidon hash")
}

/// Poseidon hash with 2 inputs (for Merkle tree nodes).
pub fn poseidon2(a: B256, b: B256) -> B256 {
    fe_to_b256(&poseidon_fr(&[fe_from_b256(&a), fe_from_b256(&b)]))
}

/// Poseidon hash with 5 inputs (for the Schnorr challenge: R, public key, message).
pub fn poseidon5(a: B256, b: B256, c: B256, d: B256, e: B256) -> B256 {
    let inputs = [
        fe_from_b256(&a),
        fe_from_b256(&b),
        fe_from_b256(&c),
        fe_from_b256(&d),
        fe_from_b256(&e),
    ];
    fe_to_b256(&poseidon_fr(&inputs))
}

/// Sponge-style Poseidon over arbitrary bytes.
///
/// ```text
/// state = len(data)
/// for each 31-byte chunk c: state = poseidon(state, c)
/// ```
///
/// The length prefix separates inputs that differ only by trailing zero bytes.
pub fn hash_bytes(data: &[u8]) -> B256 {
    let mut state = Fr::from(data.len() as u64);
    if data.is_empty() {
        state = poseidon_fr(&[state, Fr::from(0u64)]);
    }
    for chunk in data.chunks(CHUNK_SIZE) {
        state = poseidon_fr(&[state, fe_from_bytes(chunk)]);
    }
    fe_to_b256(&state)
}
