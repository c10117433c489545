use std::future::Future;

use crate::domain::witness::{BatchWitness, CircuitShape, PublicInputs};

use super::{BatchProof, ProvingArtifacts};

/// Port for the succinct-proof backend.
///
/// The backend is a long-running, non-cancellable collaborator: callers await
/// each call to completion and never retry a failed `prove`.
///
/// Implementations:
/// - `MockProver` (checks every constraint natively, commits to the witness with a hash)
pub trait ProofBackend: Send + Sync {
    /// Compile the constraint system for a fixed batch shape.
    fn compile(
        &self,
        shape: &CircuitShape,
    ) -> impl Future<Output = Result<ProvingArtifacts, ProverError>> + Send;

    /// Prove that `witness` satisfies the circuit compiled into `artifacts`.
    fn prove(
        &self,
        artifacts: &ProvingArtifacts,
        witness: &BatchWitness,
    ) -> impl Future<Output = Result<BatchProof, ProverError>> + Send;

    /// Check `proof` against the public inputs it claims.
    fn verify(
        &self,
        artifacts: &ProvingArtifacts,
        proof: &BatchProof,
        public_inputs: &PublicInputs,
    ) -> impl Future<Output = Result<bool, ProverError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProverError {
    #[error("circuit compilation failed: {0}")]
    CompileFailed(String),

    #[error("witness does not match circuit shape: {0}")]
    ShapeMismatch(String),

    #[error("constraint not satisfied in transfer {transfer}: {reason}")]
    UnsatisfiedConstraint { transfer: usize, reason: String },

    #[error("proof generation failed: {0}")]
    ProofFailed(String),
}
