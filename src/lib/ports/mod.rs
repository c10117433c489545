pub mod hash;
pub mod prover;
pub mod signature;

use alloy_primitives::{Bytes, B256};
use serde::{Deserialize, Serialize};

use crate::domain::witness::{CircuitShape, PublicInputs};

/// Output of compiling a circuit for one batch shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvingArtifacts {
    pub shape: CircuitShape,
    /// Identifies the compiled constraint system; proofs are bound to it.
    pub circuit_id: B256,
}

/// A proof for one batch together with the public inputs it attests to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProof {
    pub proof: Bytes,
    pub public_inputs: PublicInputs,
}

impl BatchProof {
    pub fn new(proof: Bytes, public_inputs: PublicInputs) -> Self {
        Self {
            proof,
            public_inputs,
        }
    }
}
