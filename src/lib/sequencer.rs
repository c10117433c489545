use std::time::Instant;

use alloy_primitives::B256;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::assembler::{self, AssemblyError};
use crate::domain::transfer::Transfer;
use crate::domain::witness::{AccountSnapshot, BatchWitness, CircuitShape, TransferWitness};
use crate::ledger::{LedgerError, LedgerStore};
use crate::ports::hash::HashFunction;
use crate::ports::prover::{ProofBackend, ProverError};
use crate::ports::signature::SignatureScheme;
use crate::ports::{BatchProof, ProvingArtifacts};
use crate::queue::{QueuedTransfer, TransferQueue};
use crate::transition::{validate_transfer, NoncePolicy, Transition, TransitionError};

#[derive(Debug, Clone, thiserror::Error)]
pub enum SequencerError {
    #[error("transfer rejected: {0}")]
    Rejected(#[from] TransitionError),

    #[error("witness assembly failed: {0}")]
    Assembly(#[from] AssemblyError),

    #[error("proof backend failed: {0}")]
    Prover(#[from] ProverError),

    #[error("batch proof did not verify against its public inputs")]
    ProofRejected,

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("sequencer halted")]
    Halted,
}

impl SequencerError {
    /// Whether this error stops the sequencer.
    ///
    /// Rejections are recoverable unless the lookup itself found the store
    /// inconsistent.
    pub fn is_fatal(&self) -> bool {
        match self {
            SequencerError::Rejected(TransitionError::Ledger(e)) => e.is_integrity_failure(),
            SequencerError::Rejected(_) => false,
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerState {
    Idle,
    Validating,
    Committing,
    Witnessing,
    Proving,
    Halted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencerConfig {
    /// Transfers per proof.
    pub batch_size: usize,
    pub nonce_policy: NoncePolicy,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            batch_size: 1,
            nonce_policy: NoncePolicy::Ignore,
        }
    }
}

/// What a submitter gets back once its transfer is applied and proven.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReceipt {
    /// Position in the total order of applied transfers, starting at 0.
    pub sequence: u64,
    pub sender_index: u64,
    pub receiver_index: u64,
    pub root_before: B256,
    pub root_after: B256,
    /// Index of the batch proof covering this transfer.
    pub batch: u64,
}

/// Final state handed back when the queue closes.
pub struct SequencerReport<H> {
    pub ledger: LedgerStore<H>,
    pub processed: u64,
    pub rejected: u64,
    pub batches_proven: u64,
    pub final_root: B256,
    pub last_batch: Option<BatchWitness>,
    pub last_proof: Option<BatchProof>,
}

struct Pending {
    witness: TransferWitness,
    receipt: TransferReceipt,
    entry: QueuedTransfer,
}

pub struct Sequencer<H, S, P> {
    ledger: LedgerStore<H>,
    scheme: S,
    backend: P,
    config: SequencerConfig,
    state: SequencerState,
    artifacts: Option<ProvingArtifacts>,
    processed: u64,
    rejected: u64,
    batches_proven: u64,
    last_batch: Option<BatchWitness>,
    last_proof: Option<BatchProof>,
}

impl<H, S, P> Sequencer<H, S, P>
where
    H: HashFunction,
    S: SignatureScheme,
    P: ProofBackend,
{
    pub fn new(ledger: LedgerStore<H>, scheme: S, backend: P, config: SequencerConfig) -> Self {
        Self {
            ledger,
            scheme,
            backend,
            config,
            state: SequencerState::Idle,
            artifacts: None,
            processed: 0,
            rejected: 0,
            batches_proven: 0,
            last_batch: None,
            last_proof: None,
        }
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn ledger(&self) -> &LedgerStore<H> {
        &self.ledger
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn shape(&self, batch_size: usize) -> CircuitShape {
        CircuitShape::new(batch_size, self.ledger.len())
    }

    fn halt(&mut self, err: &SequencerError) {
        self.state = SequencerState::Halted;
        error!(error = %err, processed = self.processed, "sequencer halted");
    }

    fn halt_with_state(&mut self, err: &SequencerError, transition: &Transition) {
        error!(
            error = %err,
            sender_before = ?AccountSnapshot::from(&transition.sender_before),
            receiver_before = ?AccountSnapshot::from(&transition.receiver_before),
            sender_after = ?AccountSnapshot::from(&transition.sender_after),
            receiver_after = ?AccountSnapshot::from(&transition.receiver_after),
            "integrity failure after validation"
        );
        self.halt(err);
    }

    /// Validate, commit and witness one transfer.
    ///
    /// Nothing is proven here; see [`Sequencer::prove_batch`].
    pub fn process(&mut self, transfer: &Transfer) -> Result<TransferWitness, SequencerError> {
        if self.state == SequencerState::Halted {
            return Err(SequencerError::Halted);
        }
        let started = Instant::now();

        self.state = SequencerState::Validating;
        let transition =
            match validate_transfer(&self.ledger, &self.scheme, self.config.nonce_policy, transfer)
            {
                Ok(t) => t,
                Err(e) => {
                    let err = SequencerError::from(e);
                    if err.is_fatal() {
                        self.halt(&err);
                    } else {
                        self.state = SequencerState::Idle;
                        self.rejected += 1;
                    }
                    return Err(err);
                }
            };

        self.state = SequencerState::Committing;
        let before = match assembler::capture_before(&self.ledger, &transition) {
            Ok(before) => before,
            Err(e) => {
                let err = SequencerError::from(e);
                self.halt_with_state(&err, &transition);
                return Err(err);
            }
        };
        if let Err(e) = assembler::commit(&mut self.ledger, &transition) {
            let err = SequencerError::from(e);
            self.halt_with_state(&err, &transition);
            return Err(err);
        }

        self.state = SequencerState::Witnessing;
        let witness = match assembler::capture_after(&self.ledger, before, &transition, transfer) {
            Ok(w) => w,
            Err(e) => {
                let err = SequencerError::from(e);
                self.halt_with_state(&err, &transition);
                return Err(err);
            }
        };

        self.state = SequencerState::Idle;
        self.processed += 1;
        debug!(
            sequence = self.processed - 1,
            sender = transition.sender_before.index,
            receiver = transition.receiver_before.index,
            root_after = %witness.root_after,
            elapsed_us = started.elapsed().as_micros() as u64,
            "transfer applied"
        );
        Ok(witness)
    }

    async fn artifacts_for(&mut self, batch_size: usize) -> Result<ProvingArtifacts, SequencerError> {
        if let Some(artifacts) = &self.artifacts {
            if artifacts.shape.batch_size == batch_size {
                return Ok(artifacts.clone());
            }
        }
        let shape = self.shape(batch_size);
        let started = Instant::now();
        let artifacts = self.backend.compile(&shape).await?;
        info!(
            batch_size,
            accounts = shape.num_accounts,
            depth = shape.depth,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "circuit compiled"
        );
        if batch_size == self.config.batch_size {
            self.artifacts = Some(artifacts.clone());
        }
        Ok(artifacts)
    }

    /// Compile the configured batch shape ahead of the first batch.
    pub async fn compile(&mut self) -> Result<(), SequencerError> {
        let batch_size = self.config.batch_size;
        match self.artifacts_for(batch_size).await {
            Ok(_) => Ok(()),
            Err(e) => {
                self.halt(&e);
                Err(e)
            }
        }
    }

    /// Prove and verify a batch of consecutive witnesses.
    ///
    /// The proof is bound to a shape compiled for exactly `witnesses.len()`
    /// transfers. Any failure halts the sequencer: the ledger already holds
    /// the batch's mutations.
    pub async fn prove_batch(
        &mut self,
        witnesses: Vec<TransferWitness>,
    ) -> Result<BatchProof, SequencerError> {
        if self.state == SequencerState::Halted {
            return Err(SequencerError::Halted);
        }
        self.state = SequencerState::Proving;
        let batch = BatchWitness::new(witnesses);

        match self.prove_and_verify(&batch).await {
            Ok(proof) => {
                self.state = SequencerState::Idle;
                self.batches_proven += 1;
                self.last_batch = Some(batch);
                self.last_proof = Some(proof.clone());
                Ok(proof)
            }
            Err(e) => {
                self.halt(&e);
                Err(e)
            }
        }
    }

    async fn prove_and_verify(&mut self, batch: &BatchWitness) -> Result<BatchProof, SequencerError> {
        let artifacts = self.artifacts_for(batch.batch_size).await?;
        let started = Instant::now();
        let proof = self.backend.prove(&artifacts, batch).await?;
        let prove_ms = started.elapsed().as_millis() as u64;

        let public_inputs = batch.public_inputs();
        if !self.backend.verify(&artifacts, &proof, &public_inputs).await? {
            return Err(SequencerError::ProofRejected);
        }
        info!(
            batch = self.batches_proven,
            transfers = batch.batch_size,
            prove_ms,
            "batch proven"
        );
        Ok(proof)
    }

    async fn flush(&mut self, pending: &mut Vec<Pending>) -> Result<(), SequencerError> {
        let batch_index = self.batches_proven;
        let entries: Vec<Pending> = std::mem::take(pending);
        let witnesses = entries.iter().map(|p| p.witness.clone()).collect();

        match self.prove_batch(witnesses).await {
            Ok(_) => {
                for p in entries {
                    let mut receipt = p.receipt;
                    receipt.batch = batch_index;
                    p.entry.respond(Ok(receipt));
                }
                Ok(())
            }
            Err(e) => {
                for p in entries {
                    p.entry.respond(Err(e.clone()));
                }
                Err(e)
            }
        }
    }

    async fn drain_halted(queue: &mut TransferQueue) {
        queue.close();
        while let Some(entry) = queue.dequeue().await {
            entry.respond(Err(SequencerError::Halted));
        }
    }

    /// Drain `queue` until every producer handle is dropped.
    ///
    /// Submitters are answered once the batch holding their transfer is
    /// proven. A partial batch left when the queue closes is proven on its
    /// own. Returns the first fatal error, after answering everything still
    /// queued with [`SequencerError::Halted`].
    pub async fn run(
        mut self,
        mut queue: TransferQueue,
    ) -> Result<SequencerReport<H>, SequencerError> {
        let started = Instant::now();
        info!(
            accounts = self.ledger.len(),
            batch_size = self.config.batch_size,
            nonce_policy = ?self.config.nonce_policy,
            "sequencer started"
        );

        if let Err(e) = self.compile().await {
            Self::drain_halted(&mut queue).await;
            return Err(e);
        }

        let mut pending: Vec<Pending> = Vec::with_capacity(self.config.batch_size);

        while let Some(entry) = queue.dequeue().await {
            let sequence = self.processed;
            match self.process(&entry.transfer) {
                Ok(witness) => {
                    let receipt = TransferReceipt {
                        sequence,
                        sender_index: witness.leaf_sender,
                        receiver_index: witness.leaf_receiver,
                        root_before: witness.root_before,
                        root_after: witness.root_after,
                        batch: self.batches_proven,
                    };
                    pending.push(Pending {
                        witness,
                        receipt,
                        entry,
                    });

                    if pending.len() >= self.config.batch_size {
                        if let Err(e) = self.flush(&mut pending).await {
                            Self::drain_halted(&mut queue).await;
                            return Err(e);
                        }
                    }
                }
                Err(e) if !e.is_fatal() => {
                    warn!(error = %e, nonce = entry.transfer.nonce(), "transfer rejected");
                    entry.respond(Err(e));
                }
                Err(e) => {
                    entry.respond(Err(e.clone()));
                    for p in pending.drain(..) {
                        p.entry.respond(Err(SequencerError::Halted));
                    }
                    Self::drain_halted(&mut queue).await;
                    return Err(e);
                }
            }
        }

        if !pending.is_empty() {
            debug!(transfers = pending.len(), "proving partial batch");
            self.flush(&mut pending).await?;
        }

        let final_root = self.ledger.root()?;
        info!(
            processed = self.processed,
            rejected = self.rejected,
            batches = self.batches_proven,
            final_root = %final_root,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "sequencer finished"
        );

        Ok(SequencerReport {
            ledger: self.ledger,
            processed: self.processed,
            rejected: self.rejected,
            batches_proven: self.batches_proven,
            final_root,
            last_batch: self.last_batch,
            last_proof: self.last_proof,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;
    use crate::adapters::mock_prover::MockProver;
    use crate::adapters::schnorr::GrumpkinSchnorr;
    use crate::adapters::sha256_hasher::Sha256Hasher;
    use crate::crypto::schnorr::KeyPair;
    use crate::domain::account::{Account, ACCOUNT_SIZE};
    use crate::domain::field::FieldElement;
    use crate::domain::transfer::TransferBody;
    use crate::genesis::GenesisBuilder;

    type TestSequencer =
        Sequencer<Sha256Hasher, GrumpkinSchnorr, MockProver<Sha256Hasher, GrumpkinSchnorr>>;

    fn sequencer(n: u64, config: SequencerConfig) -> TestSequencer {
        let (bytes, count) = GenesisBuilder::demo(n).build();
        let ledger = LedgerStore::from_provisioning(bytes, count, Sha256Hasher).unwrap();
        Sequencer::new(
            ledger,
            GrumpkinSchnorr,
            MockProver::new(Sha256Hasher, GrumpkinSchnorr),
            config,
        )
    }

    fn signed(from: u64, to: u64, nonce: u64, amount: u64) -> Transfer {
        let keys = KeyPair::from_seed(from);
        TransferBody::new(
            nonce,
            FieldElement::from(amount),
            keys.public_key(),
            KeyPair::from_seed(to).public_key(),
        )
        .sign(&keys, &Sha256Hasher)
    }

    #[test]
    fn test_process_returns_to_idle() {
        let mut seq = sequencer(4, SequencerConfig::default());
        let witness = seq.process(&signed(0, 1, 1, 12)).unwrap();
        assert_eq!(seq.state(), SequencerState::Idle);
        assert_eq!(seq.processed(), 1);
        assert_eq!(witness.root_after, seq.ledger().root().unwrap());
    }

    #[test]
    fn test_rejection_leaves_ledger_untouched() {
        let mut seq = sequencer(4, SequencerConfig::default());
        let before = seq.ledger().state_bytes().to_vec();

        let err = seq.process(&signed(0, 1, 1, 10_000)).unwrap_err();
        assert!(!err.is_fatal());
        assert_eq!(seq.state(), SequencerState::Idle);
        assert_eq!(seq.ledger().state_bytes(), &before[..]);

        // Still usable afterwards
        seq.process(&signed(0, 1, 1, 10)).unwrap();
    }

    #[test]
    fn test_index_mismatch_halts() {
        let (mut bytes, n) = GenesisBuilder::demo(3).build();
        bytes[ACCOUNT_SIZE + 31] = 2;
        let ledger = LedgerStore::from_provisioning(bytes, n, Sha256Hasher).unwrap();
        let mut seq = Sequencer::new(
            ledger,
            GrumpkinSchnorr,
            MockProver::new(Sha256Hasher, GrumpkinSchnorr),
            SequencerConfig::default(),
        );

        let err = seq.process(&signed(0, 1, 1, 10)).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(seq.state(), SequencerState::Halted);
        assert!(matches!(
            seq.process(&signed(0, 2, 1, 10)),
            Err(SequencerError::Halted)
        ));
    }

    /// SHA-256, except that `target` hashes to a fresh digest on every call.
    struct UnstableHasher {
        target: Vec<u8>,
        calls: AtomicU64,
    }

    impl HashFunction for UnstableHasher {
        fn hash(&self, data: &[u8]) -> B256 {
            if data != self.target.as_slice() {
                return Sha256Hasher.hash(data);
            }
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let mut salted = data.to_vec();
            salted.extend_from_slice(&n.to_be_bytes());
            Sha256Hasher.hash(&salted)
        }
    }

    #[test]
    fn test_failure_after_commit_halts() {
        let (bytes, n) = GenesisBuilder::demo(3).build();
        // Sender after paying 12 out of 666
        let sender_after = Account::new(
            0,
            1,
            FieldElement::from(654u64),
            KeyPair::from_seed(0).public_key(),
        );
        let hasher = UnstableHasher {
            target: sender_after.encode().to_vec(),
            calls: AtomicU64::new(0),
        };
        let ledger = LedgerStore::from_provisioning(bytes, n, hasher).unwrap();
        let mut seq = Sequencer::new(
            ledger,
            GrumpkinSchnorr,
            MockProver::new(Sha256Hasher, GrumpkinSchnorr),
            SequencerConfig::default(),
        );

        let err = seq.process(&signed(0, 1, 1, 12)).unwrap_err();
        assert!(matches!(
            err,
            SequencerError::Assembly(AssemblyError::LeafMismatch {
                stage: assembler::Stage::After,
                index: 0,
            })
        ));
        assert!(err.is_fatal());
        assert_eq!(seq.state(), SequencerState::Halted);
        assert_eq!(seq.processed(), 0);
        assert!(matches!(
            seq.process(&signed(1, 2, 1, 10)),
            Err(SequencerError::Halted)
        ));
    }

    #[test]
    fn test_consecutive_witnesses_chain() {
        let mut seq = sequencer(4, SequencerConfig::default());
        let w1 = seq.process(&signed(0, 1, 1, 12)).unwrap();
        let w2 = seq.process(&signed(1, 2, 1, 5)).unwrap();
        assert_eq!(w2.root_before, w1.root_after);
    }

    #[tokio::test]
    async fn test_prove_batch() {
        let config = SequencerConfig {
            batch_size: 2,
            nonce_policy: NoncePolicy::Sequential,
        };
        let mut seq = sequencer(4, config);
        seq.compile().await.unwrap();
        let w1 = seq.process(&signed(0, 1, 1, 12)).unwrap();
        let w2 = seq.process(&signed(0, 1, 2, 12)).unwrap();

        let proof = seq.prove_batch(vec![w1.clone(), w2.clone()]).await.unwrap();
        assert_eq!(proof.public_inputs.roots_before, vec![w1.root_before, w2.root_before]);
        assert_eq!(seq.state(), SequencerState::Idle);
    }

    #[tokio::test]
    async fn test_failed_proof_halts() {
        let mut seq = sequencer(4, SequencerConfig::default());
        let mut w = seq.process(&signed(0, 1, 1, 12)).unwrap();
        w.transfer.amount = B256::with_last_byte(13);

        let err = seq.prove_batch(vec![w]).await.unwrap_err();
        assert!(matches!(err, SequencerError::Prover(_)));
        assert_eq!(seq.state(), SequencerState::Halted);
    }
}
