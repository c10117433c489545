use std::fmt;

use alloy_primitives::B256;

use crate::domain::account::Account;
use crate::domain::merkle::MerkleProof;
use crate::domain::transfer::Transfer;
use crate::domain::witness::{AccountSnapshot, TransferFields, TransferWitness};
use crate::ledger::{LedgerError, LedgerStore};
use crate::ports::hash::HashFunction;
use crate::transition::Transition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Before,
    After,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Before => f.write_str("before"),
            Stage::After => f.write_str("after"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssemblyError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("account {index} in the ledger differs from the {stage} snapshot")]
    SnapshotMismatch { stage: Stage, index: u64 },

    #[error("{stage} proof for account {index} has root {found}, ledger root is {expected}")]
    RootMismatch {
        stage: Stage,
        index: u64,
        expected: B256,
        found: B256,
    },

    #[error("{stage} proof for account {index} does not verify")]
    ProofMismatch { stage: Stage, index: u64 },

    #[error("{stage} proof leaf for account {index} is not the hash of its snapshot")]
    LeafMismatch { stage: Stage, index: u64 },
}

/// Pre-state evidence, captured before the ledger is touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeforeCapture {
    pub root: B256,
    pub sender: AccountSnapshot,
    pub receiver: AccountSnapshot,
    pub proof_sender: MerkleProof,
    pub proof_receiver: MerkleProof,
}

fn capture_account<H: HashFunction>(
    ledger: &LedgerStore<H>,
    stage: Stage,
    root: B256,
    expected: &Account,
) -> Result<(AccountSnapshot, MerkleProof), AssemblyError> {
    let index = expected.index;
    if ledger.read_account(index)? != *expected {
        return Err(AssemblyError::SnapshotMismatch { stage, index });
    }

    let proof = ledger.prove(index)?;
    if proof.root != root {
        return Err(AssemblyError::RootMismatch {
            stage,
            index,
            expected: root,
            found: proof.root,
        });
    }
    if !proof.verify(ledger.hasher()) {
        return Err(AssemblyError::ProofMismatch { stage, index });
    }
    if proof.leaf() != Some(&ledger.hasher().hash(&expected.encode())) {
        return Err(AssemblyError::LeafMismatch { stage, index });
    }

    Ok((AccountSnapshot::from(expected), proof))
}

/// Snapshot both accounts and prove them against the current root.
pub fn capture_before<H: HashFunction>(
    ledger: &LedgerStore<H>,
    transition: &Transition,
) -> Result<BeforeCapture, AssemblyError> {
    let root = ledger.root()?;
    let (sender, proof_sender) =
        capture_account(ledger, Stage::Before, root, &transition.sender_before)?;
    let (receiver, proof_receiver) =
        capture_account(ledger, Stage::Before, root, &transition.receiver_before)?;

    Ok(BeforeCapture {
        root,
        sender,
        receiver,
        proof_sender,
        proof_receiver,
    })
}

/// Write the post-transfer pair; either both accounts land or neither does.
pub fn commit<H: HashFunction>(
    ledger: &mut LedgerStore<H>,
    transition: &Transition,
) -> Result<(), AssemblyError> {
    ledger.commit_all(&[transition.sender_after, transition.receiver_after])?;
    Ok(())
}

/// Snapshot both accounts against the mutated ledger and complete the witness.
pub fn capture_after<H: HashFunction>(
    ledger: &LedgerStore<H>,
    before: BeforeCapture,
    transition: &Transition,
    transfer: &Transfer,
) -> Result<TransferWitness, AssemblyError> {
    let root = ledger.root()?;
    let (sender_after, proof_sender_after) =
        capture_account(ledger, Stage::After, root, &transition.sender_after)?;
    let (receiver_after, proof_receiver_after) =
        capture_account(ledger, Stage::After, root, &transition.receiver_after)?;

    Ok(TransferWitness {
        root_before: before.root,
        root_after: root,
        leaf_sender: transition.sender_before.index,
        leaf_receiver: transition.receiver_before.index,
        sender_before: before.sender,
        receiver_before: before.receiver,
        sender_after,
        receiver_after,
        proof_sender_before: before.proof_sender,
        proof_receiver_before: before.proof_receiver,
        proof_sender_after,
        proof_receiver_after,
        transfer: TransferFields::from(transfer),
    })
}

/// Run all three steps for one transition.
pub fn assemble<H: HashFunction>(
    ledger: &mut LedgerStore<H>,
    transition: &Transition,
    transfer: &Transfer,
) -> Result<TransferWitness, AssemblyError> {
    let before = capture_before(ledger, transition)?;
    commit(ledger, transition)?;
    capture_after(ledger, before, transition, transfer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::schnorr::GrumpkinSchnorr;
    use crate::adapters::sha256_hasher::Sha256Hasher;
    use crate::crypto::schnorr::KeyPair;
    use crate::domain::field::FieldElement;
    use crate::domain::merkle::verify_proof;
    use crate::domain::transfer::TransferBody;
    use crate::genesis::GenesisBuilder;
    use crate::transition::{validate_transfer, NoncePolicy};

    fn setup(n: u64) -> LedgerStore<Sha256Hasher> {
        let (bytes, count) = GenesisBuilder::demo(n).build();
        LedgerStore::from_provisioning(bytes, count, Sha256Hasher).unwrap()
    }

    fn signed(from: u64, to: u64, nonce: u64, amount: u64) -> Transfer {
        let sender = KeyPair::from_seed(from);
        TransferBody::new(
            nonce,
            FieldElement::from(amount),
            sender.public_key(),
            KeyPair::from_seed(to).public_key(),
        )
        .sign(&sender, &Sha256Hasher)
    }

    fn transition(ledger: &LedgerStore<Sha256Hasher>, transfer: &Transfer) -> Transition {
        validate_transfer(ledger, &GrumpkinSchnorr, NoncePolicy::Ignore, transfer).unwrap()
    }

    #[test]
    fn test_assemble_produces_consistent_witness() {
        let mut ledger = setup(4);
        let root_before = ledger.root().unwrap();
        let transfer = signed(0, 1, 1, 12);
        let t = transition(&ledger, &transfer);

        let w = assemble(&mut ledger, &t, &transfer).unwrap();

        assert_eq!(w.root_before, root_before);
        assert_eq!(w.root_after, ledger.root().unwrap());
        assert_ne!(w.root_before, w.root_after);
        assert_eq!((w.leaf_sender, w.leaf_receiver), (0, 1));

        for (proof, root, index) in [
            (&w.proof_sender_before, w.root_before, 0),
            (&w.proof_receiver_before, w.root_before, 1),
            (&w.proof_sender_after, w.root_after, 0),
            (&w.proof_receiver_after, w.root_after, 1),
        ] {
            assert_eq!(proof.leaf_index, index);
            assert!(verify_proof(&Sha256Hasher, &root, &proof.path, index, 4));
        }

        assert_eq!(w.sender_before.to_account(), t.sender_before);
        assert_eq!(w.sender_after.to_account(), t.sender_after);
        assert_eq!(w.receiver_after.to_account(), t.receiver_after);
        assert_eq!(w.transfer.nonce, 1);
    }

    #[test]
    fn test_before_proofs_stale_after_commit() {
        let mut ledger = setup(4);
        let transfer = signed(2, 3, 1, 5);
        let t = transition(&ledger, &transfer);
        let w = assemble(&mut ledger, &t, &transfer).unwrap();

        assert!(!verify_proof(
            &Sha256Hasher,
            &w.root_after,
            &w.proof_sender_before.path,
            2,
            4
        ));
    }

    #[test]
    fn test_capture_before_detects_stale_transition() {
        let mut ledger = setup(3);
        let transfer = signed(0, 1, 1, 10);
        let t = transition(&ledger, &transfer);
        // Apply once, then try to capture against the already-mutated state
        assemble(&mut ledger, &t, &transfer).unwrap();

        assert_eq!(
            capture_before(&ledger, &t).unwrap_err(),
            AssemblyError::SnapshotMismatch {
                stage: Stage::Before,
                index: 0
            }
        );
    }

    #[test]
    fn test_untouched_accounts_keep_leaves() {
        let mut ledger = setup(5);
        let hashes = ledger.state_hashes().to_vec();
        let transfer = signed(1, 3, 1, 100);
        let t = transition(&ledger, &transfer);
        assemble(&mut ledger, &t, &transfer).unwrap();

        for i in [0usize, 2, 4] {
            assert_eq!(ledger.state_hashes()[i], hashes[i]);
        }
        assert_ne!(ledger.state_hashes()[1], hashes[1]);
        assert_ne!(ledger.state_hashes()[3], hashes[3]);
    }
}
