use alloy_primitives::{Bytes, B256};

use crate::domain::field::fe_from_b256;
use crate::domain::keys::{PublicKey, Signature};
use crate::domain::merkle::{verify_proof, MerkleProof};
use crate::domain::transfer::TransferBody;
use crate::domain::witness::{
    AccountSnapshot, BatchWitness, CircuitShape, PublicInputs, TransferWitness,
};
use crate::ports::hash::HashFunction;
use crate::ports::prover::{ProofBackend, ProverError};
use crate::ports::signature::SignatureScheme;
use crate::ports::{BatchProof, ProvingArtifacts};

const DOMAIN_CIRCUIT: &[u8] = b"zk-rollup.circuit";

/// Mock proof backend for testing and the demo binary.
///
/// `prove` evaluates every constraint of the transfer circuit natively and
/// fails on the first unsatisfied one. The "proof" is a hash commitment to
/// the circuit id and the public inputs; it carries no zero-knowledge.
pub struct MockProver<H, S> {
    hasher: H,
    scheme: S,
}

impl<H: HashFunction, S: SignatureScheme> MockProver<H, S> {
    pub fn new(hasher: H, scheme: S) -> Self {
        Self { hasher, scheme }
    }

    fn circuit_id(&self, shape: &CircuitShape) -> B256 {
        let mut buf = Vec::with_capacity(DOMAIN_CIRCUIT.len() + 20);
        buf.extend_from_slice(DOMAIN_CIRCUIT);
        buf.extend_from_slice(&(shape.batch_size as u64).to_be_bytes());
        buf.extend_from_slice(&shape.num_accounts.to_be_bytes());
        buf.extend_from_slice(&shape.depth.to_be_bytes());
        self.hasher.hash(&buf)
    }

    fn commitment(&self, artifacts: &ProvingArtifacts, public_inputs: &PublicInputs) -> B256 {
        let mut buf = Vec::with_capacity(32 * (1 + 2 * public_inputs.len()));
        buf.extend_from_slice(artifacts.circuit_id.as_slice());
        for word in public_inputs.to_words() {
            buf.extend_from_slice(word.as_slice());
        }
        self.hasher.hash(&buf)
    }

    fn check_proof(
        &self,
        shape: &CircuitShape,
        proof: &MerkleProof,
        root: &B256,
        leaf: u64,
        snapshot: &AccountSnapshot,
    ) -> Result<(), String> {
        if proof.path.len() != shape.path_len() || proof.num_leaves != shape.num_accounts {
            return Err(format!("proof for leaf {leaf} has the wrong depth"));
        }
        if proof.root != *root {
            return Err(format!("proof for leaf {leaf} is not against the public root"));
        }
        if proof.leaf_index != leaf || snapshot.index != leaf {
            return Err(format!("proof index does not match leaf {leaf}"));
        }
        if !verify_proof(&self.hasher, root, &proof.path, leaf, shape.num_accounts) {
            return Err(format!("proof for leaf {leaf} does not verify"));
        }
        let encoded = snapshot.to_account().encode();
        if proof.leaf() != Some(&self.hasher.hash(&encoded)) {
            return Err(format!("leaf {leaf} is not the hash of its account"));
        }
        Ok(())
    }

    fn check_transfer(&self, shape: &CircuitShape, w: &TransferWitness) -> Result<(), String> {
        let proofs = [
            (&w.proof_sender_before, &w.root_before, w.leaf_sender, &w.sender_before),
            (&w.proof_receiver_before, &w.root_before, w.leaf_receiver, &w.receiver_before),
            (&w.proof_sender_after, &w.root_after, w.leaf_sender, &w.sender_after),
            (&w.proof_receiver_after, &w.root_after, w.leaf_receiver, &w.receiver_after),
        ];
        for (proof, root, leaf, snapshot) in proofs {
            self.check_proof(shape, proof, root, leaf, snapshot)?;
        }

        let t = &w.transfer;
        if (t.sender_x, t.sender_y) != (w.sender_before.public_key_x, w.sender_before.public_key_y)
        {
            return Err("transfer sender is not the sender account".to_string());
        }
        if (t.receiver_x, t.receiver_y)
            != (w.receiver_before.public_key_x, w.receiver_before.public_key_y)
        {
            return Err("transfer receiver is not the receiver account".to_string());
        }

        let sender_before = w.sender_before.to_account();
        let sender_after = w.sender_after.to_account();
        let receiver_before = w.receiver_before.to_account();
        let receiver_after = w.receiver_after.to_account();

        if sender_after.public_key != sender_before.public_key
            || receiver_after.public_key != receiver_before.public_key
        {
            return Err("public key changed".to_string());
        }
        if sender_before.nonce.checked_add(1) != Some(sender_after.nonce) {
            return Err("sender nonce not incremented".to_string());
        }
        if receiver_after.nonce != receiver_before.nonce {
            return Err("receiver nonce changed".to_string());
        }

        let amount = fe_from_b256(&t.amount);
        if amount > sender_before.balance {
            return Err("amount exceeds sender balance".to_string());
        }
        if sender_after.balance != sender_before.balance - amount {
            return Err("sender balance not debited".to_string());
        }
        if receiver_after.balance != receiver_before.balance + amount {
            return Err("receiver balance not credited".to_string());
        }

        let sender = PublicKey::new(fe_from_b256(&t.sender_x), fe_from_b256(&t.sender_y));
        let receiver = PublicKey::new(fe_from_b256(&t.receiver_x), fe_from_b256(&t.receiver_y));
        let message = TransferBody::new(t.nonce, amount, sender, receiver).message(&self.hasher);
        let signature = Signature {
            r_x: fe_from_b256(&t.signature_r_x),
            r_y: fe_from_b256(&t.signature_r_y),
            s: t.signature_s.0,
        };
        match self.scheme.verify(&sender, &message, &signature) {
            Ok(true) => Ok(()),
            Ok(false) => Err("signature does not verify".to_string()),
            Err(e) => Err(format!("signature malformed: {e}")),
        }
    }
}

impl<H: HashFunction, S: SignatureScheme> ProofBackend for MockProver<H, S> {
    async fn compile(&self, shape: &CircuitShape) -> Result<ProvingArtifacts, ProverError> {
        if shape.batch_size == 0 || shape.num_accounts == 0 {
            return Err(ProverError::CompileFailed(format!(
                "degenerate shape {shape:?}"
            )));
        }
        Ok(ProvingArtifacts {
            shape: *shape,
            circuit_id: self.circuit_id(shape),
        })
    }

    async fn prove(
        &self,
        artifacts: &ProvingArtifacts,
        witness: &BatchWitness,
    ) -> Result<BatchProof, ProverError> {
        let shape = &artifacts.shape;
        if witness.batch_size != shape.batch_size || witness.transfers.len() != shape.batch_size {
            return Err(ProverError::ShapeMismatch(format!(
                "circuit expects {} transfers, witness has {}",
                shape.batch_size,
                witness.transfers.len()
            )));
        }

        for (i, transfer) in witness.transfers.iter().enumerate() {
            if i > 0 && witness.transfers[i - 1].root_after != transfer.root_before {
                return Err(ProverError::UnsatisfiedConstraint {
                    transfer: i,
                    reason: "root_before does not follow the previous root_after".to_string(),
                });
            }
            self.check_transfer(shape, transfer)
                .map_err(|reason| ProverError::UnsatisfiedConstraint {
                    transfer: i,
                    reason,
                })?;
        }

        let public_inputs = witness.public_inputs();
        let digest = self.commitment(artifacts, &public_inputs);
        Ok(BatchProof::new(
            Bytes::copy_from_slice(digest.as_slice()),
            public_inputs,
        ))
    }

    async fn verify(
        &self,
        artifacts: &ProvingArtifacts,
        proof: &BatchProof,
        public_inputs: &PublicInputs,
    ) -> Result<bool, ProverError> {
        if proof.public_inputs != *public_inputs
            || public_inputs.len() != artifacts.shape.batch_size
        {
            return Ok(false);
        }
        let expected = self.commitment(artifacts, public_inputs);
        Ok(proof.proof.as_ref() == expected.as_slice())
    }
}
