use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

use super::account::Account;
use super::field::{fe_from_b256, fe_to_b256};
use super::keys::PublicKey;
use super::merkle::MerkleProof;
use super::transfer::Transfer;

/// One account as the circuit sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub index: u64,
    pub nonce: u64,
    pub balance: B256,
    pub public_key_x: B256,
    pub public_key_y: B256,
}

impl AccountSnapshot {
    pub fn to_account(&self) -> Account {
        Account::new(
            self.index,
            self.nonce,
            fe_from_b256(&self.balance),
            PublicKey::new(
                fe_from_b256(&self.public_key_x),
                fe_from_b256(&self.public_key_y),
            ),
        )
    }
}

impl From<&Account> for AccountSnapshot {
    fn from(account: &Account) -> Self {
        Self {
            index: account.index,
            nonce: account.nonce,
            balance: fe_to_b256(&account.balance),
            public_key_x: account.public_key.x_b256(),
            public_key_y: account.public_key.y_b256(),
        }
    }
}

/// Public fields of a signed transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferFields {
    pub nonce: u64,
    pub amount: B256,
    pub sender_x: B256,
    pub sender_y: B256,
    pub receiver_x: B256,
    pub receiver_y: B256,
    pub signature_r_x: B256,
    pub signature_r_y: B256,
    pub signature_s: B256,
}

impl From<&Transfer> for TransferFields {
    fn from(transfer: &Transfer) -> Self {
        let signature = transfer.signature();
        Self {
            nonce: transfer.nonce(),
            amount: fe_to_b256(&transfer.amount()),
            sender_x: transfer.sender().x_b256(),
            sender_y: transfer.sender().y_b256(),
            receiver_x: transfer.receiver().x_b256(),
            receiver_y: transfer.receiver().y_b256(),
            signature_r_x: fe_to_b256(&signature.r_x),
            signature_r_y: fe_to_b256(&signature.r_y),
            signature_s: B256::from(signature.s),
        }
    }
}

/// Complete evidence for one applied transfer.
///
/// All `*_before` proofs verify against `root_before`, all `*_after` proofs
/// against `root_after`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferWitness {
    // ── Public ──
    pub root_before: B256,
    pub root_after: B256,

    // ── Private: accounts ──
    pub leaf_sender: u64,
    pub leaf_receiver: u64,
    pub sender_before: AccountSnapshot,
    pub receiver_before: AccountSnapshot,
    pub sender_after: AccountSnapshot,
    pub receiver_after: AccountSnapshot,

    // ── Private: inclusion proofs ──
    pub proof_sender_before: MerkleProof,
    pub proof_receiver_before: MerkleProof,
    pub proof_sender_after: MerkleProof,
    pub proof_receiver_after: MerkleProof,

    // ── Private: transfer ──
    pub transfer: TransferFields,
}

/// Public inputs of a batch: one `(root_before, root_after)` pair per transfer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PublicInputs {
    pub roots_before: Vec<B256>,
    pub roots_after: Vec<B256>,
}

impl PublicInputs {
    pub fn len(&self) -> usize {
        self.roots_before.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots_before.is_empty()
    }

    /// Flatten as `before_0, after_0, before_1, after_1, ...`.
    pub fn to_words(&self) -> Vec<B256> {
        self.roots_before
            .iter()
            .zip(&self.roots_after)
            .flat_map(|(b, a)| [*b, *a])
            .collect()
    }
}

/// Witnesses for `batch_size` consecutive transfers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchWitness {
    pub batch_size: usize,
    pub transfers: Vec<TransferWitness>,
}

impl BatchWitness {
    pub fn new(transfers: Vec<TransferWitness>) -> Self {
        Self {
            batch_size: transfers.len(),
            transfers,
        }
    }

    pub fn public_inputs(&self) -> PublicInputs {
        PublicInputs {
            roots_before: self.transfers.iter().map(|t| t.root_before).collect(),
            roots_after: self.transfers.iter().map(|t| t.root_after).collect(),
        }
    }

    /// Consecutive transfers must chain: each `root_before` equals the
    /// previous transfer's `root_after`.
    pub fn is_chained(&self) -> bool {
        self.transfers
            .windows(2)
            .all(|pair| pair[0].root_after == pair[1].root_before)
    }
}

/// Fixed dimensions a constraint system is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CircuitShape {
    pub batch_size: usize,
    pub num_accounts: u64,
    /// Sibling levels per proof (`ceil(log2(num_accounts))`).
    pub depth: u32,
}

impl CircuitShape {
    pub fn new(batch_size: usize, num_accounts: u64) -> Self {
        Self {
            batch_size,
            num_accounts,
            depth: super::merkle::tree_depth(num_accounts),
        }
    }

    /// Length every Merkle path in a matching witness must have.
    pub fn path_len(&self) -> usize {
        1 + self.depth as usize
    }
}
