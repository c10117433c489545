//! End-to-end tests: ledger → queue → sequencer → witness → mock prover.

use zk_rollup_operator::adapters::mock_prover::MockProver;
use zk_rollup_operator::adapters::poseidon_hasher::PoseidonHasher;
use zk_rollup_operator::adapters::schnorr::GrumpkinSchnorr;
use zk_rollup_operator::adapters::sha256_hasher::Sha256Hasher;
use zk_rollup_operator::crypto::schnorr::KeyPair;
use zk_rollup_operator::domain::field::FieldElement;
use zk_rollup_operator::domain::merkle::verify_proof;
use zk_rollup_operator::domain::transfer::{Transfer, TransferBody};
use zk_rollup_operator::genesis::GenesisBuilder;
use zk_rollup_operator::ledger::LedgerStore;
use zk_rollup_operator::ports::hash::HashFunction;
use zk_rollup_operator::queue::{transfer_queue, SubmitError};
use zk_rollup_operator::sequencer::{Sequencer, SequencerConfig, SequencerError, SequencerState};
use zk_rollup_operator::transition::{NoncePolicy, TransitionError};

/// Two accounts: Alice holds 100, Bob holds 0.
fn alice_and_bob<H: HashFunction>(hasher: H) -> (LedgerStore<H>, KeyPair, KeyPair) {
    let alice = KeyPair::from_seed(1000);
    let bob = KeyPair::from_seed(1001);
    let (bytes, n) = GenesisBuilder::new()
        .account(alice.public_key(), FieldElement::from(100u64))
        .account(bob.public_key(), FieldElement::from(0u64))
        .build();
    let ledger = LedgerStore::from_provisioning(bytes, n, hasher).unwrap();
    (ledger, alice, bob)
}

fn pay<H: HashFunction>(
    from: &KeyPair,
    to: &KeyPair,
    nonce: u64,
    amount: u64,
    hasher: &H,
) -> Transfer {
    TransferBody::new(
        nonce,
        FieldElement::from(amount),
        from.public_key(),
        to.public_key(),
    )
    .sign(from, hasher)
}

fn sequencer<H: HashFunction + Clone>(
    ledger: LedgerStore<H>,
    config: SequencerConfig,
) -> Sequencer<H, GrumpkinSchnorr, MockProver<H, GrumpkinSchnorr>> {
    let hasher = ledger.hasher().clone();
    Sequencer::new(
        ledger,
        GrumpkinSchnorr,
        MockProver::new(hasher, GrumpkinSchnorr),
        config,
    )
}

// -------------------------------------------------------------------
// Single transfer
// -------------------------------------------------------------------

#[test]
fn test_transfer_of_30_from_100() {
    let (ledger, alice, bob) = alice_and_bob(PoseidonHasher);
    let mut seq = sequencer(ledger, SequencerConfig::default());

    let witness = seq.process(&pay(&alice, &bob, 1, 30, &PoseidonHasher)).unwrap();

    let sender = seq.ledger().read_account(0).unwrap();
    let receiver = seq.ledger().read_account(1).unwrap();
    assert_eq!(sender.balance, FieldElement::from(70u64));
    assert_eq!(sender.nonce, 1);
    assert_eq!(receiver.balance, FieldElement::from(30u64));
    assert_eq!(receiver.nonce, 0);

    assert_ne!(witness.root_before, witness.root_after);
    assert_eq!(witness.root_after, seq.ledger().root().unwrap());

    for (proof, root) in [
        (&witness.proof_sender_before, witness.root_before),
        (&witness.proof_receiver_before, witness.root_before),
        (&witness.proof_sender_after, witness.root_after),
        (&witness.proof_receiver_after, witness.root_after),
    ] {
        assert!(verify_proof(
            &PoseidonHasher,
            &root,
            &proof.path,
            proof.leaf_index,
            proof.num_leaves
        ));
    }
}

#[test]
fn test_overdraft_leaves_ledger_identical() {
    let (ledger, alice, bob) = alice_and_bob(Sha256Hasher);
    let mut seq = sequencer(ledger, SequencerConfig::default());
    let bytes_before = seq.ledger().state_bytes().to_vec();
    let hashes_before = seq.ledger().state_hashes().to_vec();

    let err = seq.process(&pay(&alice, &bob, 1, 150, &Sha256Hasher)).unwrap_err();

    assert!(matches!(
        err,
        SequencerError::Rejected(TransitionError::InsufficientBalance { index: 0 })
    ));
    assert_eq!(seq.state(), SequencerState::Idle);
    assert_eq!(seq.ledger().state_bytes(), &bytes_before[..]);
    assert_eq!(seq.ledger().state_hashes(), &hashes_before[..]);
}

#[test]
fn test_signature_over_other_hash_rejected() {
    // Signed over the SHA-256 digest, checked against a Poseidon ledger
    let (ledger, alice, bob) = alice_and_bob(PoseidonHasher);
    let mut seq = sequencer(ledger, SequencerConfig::default());
    let err = seq.process(&pay(&alice, &bob, 1, 10, &Sha256Hasher)).unwrap_err();
    assert!(matches!(
        err,
        SequencerError::Rejected(TransitionError::SignatureInvalid(_))
    ));
}

// -------------------------------------------------------------------
// Queue + sequencer
// -------------------------------------------------------------------

#[tokio::test]
async fn test_transfers_are_totally_ordered() {
    let (ledger, alice, bob) = alice_and_bob(Sha256Hasher);
    let (handle, queue) = transfer_queue(4);
    let task = tokio::spawn(sequencer(ledger, SequencerConfig::default()).run(queue));

    let t1 = handle.submit(pay(&alice, &bob, 1, 10, &Sha256Hasher)).await.unwrap();
    let t2 = handle.submit(pay(&alice, &bob, 2, 20, &Sha256Hasher)).await.unwrap();
    drop(handle);

    let r1 = t1.outcome().await.unwrap();
    let r2 = t2.outcome().await.unwrap();
    assert_eq!((r1.sequence, r2.sequence), (0, 1));
    assert_eq!(r2.root_before, r1.root_after);
    assert_eq!((r1.batch, r2.batch), (0, 1));

    let report = task.await.unwrap().unwrap();
    assert_eq!(report.processed, 2);
    assert_eq!(report.batches_proven, 2);
    assert_eq!(report.final_root, r2.root_after);
    assert_eq!(
        report.ledger.read_account(0).unwrap().balance,
        FieldElement::from(70u64)
    );
    assert_eq!(report.ledger.read_account(0).unwrap().nonce, 2);
}

#[tokio::test]
async fn test_rejection_does_not_stop_sequencer() {
    let (ledger, alice, bob) = alice_and_bob(Sha256Hasher);
    let (handle, queue) = transfer_queue(4);
    let task = tokio::spawn(sequencer(ledger, SequencerConfig::default()).run(queue));

    let bad = handle.submit(pay(&alice, &bob, 1, 150, &Sha256Hasher)).await.unwrap();
    let good = handle.submit(pay(&alice, &bob, 1, 30, &Sha256Hasher)).await.unwrap();
    drop(handle);

    assert!(matches!(
        bad.outcome().await,
        Err(SubmitError::Rejected(SequencerError::Rejected(
            TransitionError::InsufficientBalance { .. }
        )))
    ));
    let receipt = good.outcome().await.unwrap();
    assert_eq!(receipt.sequence, 0);

    let report = task.await.unwrap().unwrap();
    assert_eq!((report.processed, report.rejected), (1, 1));
}

#[tokio::test]
async fn test_batches_and_partial_tail() {
    let (bytes, n) = GenesisBuilder::demo(16).build();
    let ledger = LedgerStore::from_provisioning(bytes, n, Sha256Hasher).unwrap();
    let config = SequencerConfig {
        batch_size: 3,
        nonce_policy: NoncePolicy::Sequential,
    };
    let (handle, queue) = transfer_queue(10);
    let task = tokio::spawn(sequencer(ledger, config).run(queue));

    let sender = KeyPair::from_seed(0);
    let receiver = KeyPair::from_seed(1);
    let mut submissions = Vec::new();
    for nonce in 1..=5 {
        let t = pay(&sender, &receiver, nonce, 12, &Sha256Hasher);
        submissions.push(handle.submit(t).await.unwrap());
    }
    drop(handle);

    let mut batches = Vec::new();
    for s in submissions {
        batches.push(s.outcome().await.unwrap().batch);
    }
    assert_eq!(batches, vec![0, 0, 0, 1, 1]);

    let report = task.await.unwrap().unwrap();
    assert_eq!(report.batches_proven, 2);
    let last = report.last_batch.unwrap();
    assert_eq!(last.batch_size, 2);
    assert!(last.is_chained());

    let sender_account = report.ledger.read_account(0).unwrap();
    assert_eq!(sender_account.balance, FieldElement::from(666u64 - 5 * 12));
    assert_eq!(sender_account.nonce, 5);
    assert_eq!(
        report.ledger.read_account(1).unwrap().balance,
        FieldElement::from(1332u64 + 5 * 12)
    );
}

#[tokio::test]
async fn test_full_queue_applies_backpressure() {
    let (ledger, alice, bob) = alice_and_bob(Sha256Hasher);
    let (handle, queue) = transfer_queue(2);

    handle.try_submit(pay(&alice, &bob, 1, 1, &Sha256Hasher)).unwrap();
    handle.try_submit(pay(&alice, &bob, 2, 1, &Sha256Hasher)).unwrap();
    assert!(matches!(
        handle.try_submit(pay(&alice, &bob, 3, 1, &Sha256Hasher)),
        Err(SubmitError::QueueFull)
    ));

    // Draining frees the slots again
    let task = tokio::spawn(sequencer(ledger, SequencerConfig::default()).run(queue));
    let receipt = handle
        .submit_and_wait(pay(&alice, &bob, 3, 1, &Sha256Hasher))
        .await
        .unwrap();
    assert_eq!(receipt.sequence, 2);
    drop(handle);
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_integrity_failure_halts_and_answers_queue() {
    let alice = KeyPair::from_seed(7);
    let bob = KeyPair::from_seed(8);
    let (mut bytes, n) = GenesisBuilder::new()
        .account(alice.public_key(), FieldElement::from(100u64))
        .account(bob.public_key(), FieldElement::from(100u64))
        .build();
    // Slot 1 claims to be account 5
    bytes[160 + 31] = 5;
    let ledger = LedgerStore::from_provisioning(bytes, n, Sha256Hasher).unwrap();

    let (handle, queue) = transfer_queue(4);
    let first = handle.submit(pay(&alice, &bob, 1, 1, &Sha256Hasher)).await.unwrap();
    let second = handle.submit(pay(&alice, &bob, 2, 1, &Sha256Hasher)).await.unwrap();

    let result = sequencer(ledger, SequencerConfig::default()).run(queue).await;
    assert!(matches!(
        result,
        Err(SequencerError::Rejected(TransitionError::Ledger(_)))
    ));

    assert!(matches!(first.outcome().await, Err(SubmitError::Rejected(_))));
    assert!(matches!(
        second.outcome().await,
        Err(SubmitError::Rejected(SequencerError::Halted))
    ));
    assert!(handle.is_closed());
}
