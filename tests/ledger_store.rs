//! Ledger store invariants: leaf hashes stay co-indexed with the account
//! bytes through every commit, and lookups reflect the provisioned slots.

use zk_rollup_operator::adapters::poseidon_hasher::PoseidonHasher;
use zk_rollup_operator::adapters::sha256_hasher::Sha256Hasher;
use zk_rollup_operator::domain::account::{Account, CodecError, ACCOUNT_SIZE};
use zk_rollup_operator::domain::field::FieldElement;
use zk_rollup_operator::genesis::GenesisBuilder;
use zk_rollup_operator::ledger::{LedgerError, LedgerStore};
use zk_rollup_operator::ports::hash::HashFunction;

fn demo_ledger<H: HashFunction>(n: u64, hasher: H) -> LedgerStore<H> {
    let (bytes, count) = GenesisBuilder::demo(n).build();
    LedgerStore::from_provisioning(bytes, count, hasher).unwrap()
}

fn assert_co_indexed<H: HashFunction>(ledger: &LedgerStore<H>) {
    let bytes = ledger.state_bytes();
    for (i, leaf) in ledger.state_hashes().iter().enumerate() {
        let slot = &bytes[i * ACCOUNT_SIZE..(i + 1) * ACCOUNT_SIZE];
        assert_eq!(*leaf, ledger.hasher().hash(slot), "leaf {i} out of sync");
    }
}

// -------------------------------------------------------------------
// Provisioning
// -------------------------------------------------------------------

#[test]
fn test_provisioned_ledger_is_co_indexed() {
    assert_co_indexed(&demo_ledger(16, Sha256Hasher));
    assert_co_indexed(&demo_ledger(5, PoseidonHasher));
}

#[test]
fn test_provisioning_requires_exact_length() {
    let (mut bytes, n) = GenesisBuilder::demo(3).build();
    bytes.push(0);
    assert!(matches!(
        LedgerStore::from_provisioning(bytes, n, Sha256Hasher),
        Err(LedgerError::InvalidProvisioningData {
            accounts: 3,
            expected: 480,
            found: 481
        })
    ));
}

#[test]
fn test_provisioning_rejects_nonzero_padding() {
    let (mut bytes, n) = GenesisBuilder::demo(2).build();
    bytes[0] = 1;
    assert_eq!(
        LedgerStore::from_provisioning(bytes, n, Sha256Hasher).err(),
        Some(LedgerError::Codec(CodecError::NonCanonical { offset: 0 }))
    );
}

#[test]
fn test_provisioning_rejects_unreduced_balance() {
    let (mut bytes, n) = GenesisBuilder::demo(2).build();
    // Slot 1 balance above the field modulus
    bytes[ACCOUNT_SIZE + 64..ACCOUNT_SIZE + 96].fill(0xFF);
    assert!(matches!(
        LedgerStore::from_provisioning(bytes, n, PoseidonHasher),
        Err(LedgerError::Codec(CodecError::NonCanonical { .. }))
    ));
}

#[test]
fn test_every_account_resolvable() {
    let ledger = demo_ledger(8, Sha256Hasher);
    for i in 0..8 {
        let account = ledger.read_account(i).unwrap();
        assert_eq!(account.index, i);
        assert_eq!(ledger.resolve(&account.public_key).unwrap(), account);
    }
}

// -------------------------------------------------------------------
// Commits
// -------------------------------------------------------------------

#[test]
fn test_commit_only_touches_its_slot() {
    let mut ledger = demo_ledger(6, Sha256Hasher);
    let bytes_before = ledger.state_bytes().to_vec();
    let hashes_before = ledger.state_hashes().to_vec();

    let mut account = ledger.read_account(3).unwrap();
    account.balance = FieldElement::from(1u64);
    account.nonce = 42;
    ledger.commit(&account).unwrap();

    assert_co_indexed(&ledger);
    for i in 0..6usize {
        let range = i * ACCOUNT_SIZE..(i + 1) * ACCOUNT_SIZE;
        if i == 3 {
            assert_ne!(ledger.state_bytes()[range.clone()], bytes_before[range]);
            assert_ne!(ledger.state_hashes()[i], hashes_before[i]);
        } else {
            assert_eq!(ledger.state_bytes()[range.clone()], bytes_before[range]);
            assert_eq!(ledger.state_hashes()[i], hashes_before[i]);
        }
    }
}

#[test]
fn test_commit_sequence_keeps_invariant() {
    let mut ledger = demo_ledger(4, PoseidonHasher);
    for round in 0..3u64 {
        for i in 0..4 {
            let mut account = ledger.read_account(i).unwrap();
            account.nonce += 1;
            account.balance += FieldElement::from(round + i);
            ledger.commit(&account).unwrap();
            ledger.check_leaf(i).unwrap();
        }
    }
    assert_co_indexed(&ledger);
    assert_eq!(ledger.read_account(2).unwrap().nonce, 3);
}

#[test]
fn test_root_reflects_state_not_history() {
    let mut ledger = demo_ledger(4, Sha256Hasher);
    let original_root = ledger.root().unwrap();
    let original = ledger.read_account(1).unwrap();

    let mut changed = original;
    changed.balance += FieldElement::from(5u64);
    ledger.commit(&changed).unwrap();
    assert_ne!(ledger.root().unwrap(), original_root);

    ledger.commit(&original).unwrap();
    assert_eq!(ledger.root().unwrap(), original_root);
}

#[test]
fn test_commit_out_of_range() {
    let mut ledger = demo_ledger(2, Sha256Hasher);
    let stray = Account::new(2, 0, FieldElement::from(1u64), Default::default());
    assert_eq!(
        ledger.commit(&stray).unwrap_err(),
        LedgerError::IndexOutOfRange {
            index: 2,
            num_accounts: 2
        }
    );
}
