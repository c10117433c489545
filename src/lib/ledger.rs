use std::collections::HashMap;

use alloy_primitives::B256;

use crate::domain::account::{Account, CodecError, ACCOUNT_SIZE};
use crate::domain::keys::{Fingerprint, PublicKey};
use crate::domain::merkle::{build_proof, compute_root, MerkleError, MerkleProof};
use crate::ports::hash::HashFunction;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("invalid provisioning data: {accounts} accounts need {expected} bytes, got {found}")]
    InvalidProvisioningData {
        accounts: u64,
        expected: usize,
        found: usize,
    },

    #[error("account index {index} out of range (num accounts: {num_accounts})")]
    IndexOutOfRange { index: u64, num_accounts: u64 },

    #[error("no account registered for public key {0}")]
    AccountNotFound(Fingerprint),

    #[error("account in slot {slot} records index {stored}")]
    AccountIndexMismatch { slot: u64, stored: u64 },

    #[error("account {index} cannot change its public key")]
    AccountKeyMismatch { index: u64 },

    #[error("leaf hash of account {index} does not match its encoding")]
    LeafHashMismatch { index: u64 },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Merkle(#[from] MerkleError),
}

impl LedgerError {
    /// Errors that mean the store no longer agrees with itself.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            LedgerError::AccountIndexMismatch { .. } | LedgerError::LeafHashMismatch { .. }
        )
    }
}

/// In-memory account store. `state_hash[i] == hash(state[i])` after every commit.
#[derive(Debug)]
pub struct LedgerStore<H> {
    state: Vec<u8>,
    state_hash: Vec<B256>,
    index: HashMap<Fingerprint, u64>,
    num_accounts: u64,
    hasher: H,
}

impl<H: HashFunction> LedgerStore<H> {
    /// Build a store from `num_accounts` encoded records laid out in slot order.
    ///
    /// Every leaf hash and the fingerprint index are computed here. Two slots
    /// with the same fingerprint are not rejected; the later slot wins.
    pub fn from_provisioning(
        bytes: Vec<u8>,
        num_accounts: u64,
        hasher: H,
    ) -> Result<Self, LedgerError> {
        let expected = (num_accounts as usize).saturating_mul(ACCOUNT_SIZE);
        if num_accounts == 0 || bytes.len() != expected {
            return Err(LedgerError::InvalidProvisioningData {
                accounts: num_accounts,
                expected,
                found: bytes.len(),
            });
        }

        let mut state_hash = Vec::with_capacity(num_accounts as usize);
        let mut index = HashMap::with_capacity(num_accounts as usize);

        for (slot, record) in bytes.chunks_exact(ACCOUNT_SIZE).enumerate() {
            let account = Account::decode(record)?;
            state_hash.push(hasher.hash(record));
            index.insert(account.public_key.fingerprint(), slot as u64);
        }

        tracing::debug!(accounts = num_accounts, "ledger provisioned");

        Ok(Self {
            state: bytes,
            state_hash,
            index,
            num_accounts,
            hasher,
        })
    }

    /// Number of account slots.
    pub fn len(&self) -> u64 {
        self.num_accounts
    }

    /// Always false: provisioning rejects an empty ledger.
    pub fn is_empty(&self) -> bool {
        self.num_accounts == 0
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    fn check_range(&self, index: u64) -> Result<usize, LedgerError> {
        if index >= self.num_accounts {
            return Err(LedgerError::IndexOutOfRange {
                index,
                num_accounts: self.num_accounts,
            });
        }
        Ok(index as usize)
    }

    fn slot(&self, index: usize) -> &[u8] {
        let start = index * ACCOUNT_SIZE;
        &self.state[start..start + ACCOUNT_SIZE]
    }

    pub fn read_account(&self, index: u64) -> Result<Account, LedgerError> {
        let slot = self.check_range(index)?;
        Ok(Account::decode(self.slot(slot))?)
    }

    /// Slot registered for `fingerprint`, after checking the account stored
    /// there still records that slot as its index.
    pub fn lookup_by_key(&self, fingerprint: &Fingerprint) -> Result<u64, LedgerError> {
        let slot = *self
            .index
            .get(fingerprint)
            .ok_or(LedgerError::AccountNotFound(*fingerprint))?;

        let account = self.read_account(slot)?;
        if account.index != slot {
            return Err(LedgerError::AccountIndexMismatch {
                slot,
                stored: account.index,
            });
        }
        Ok(slot)
    }

    /// Look up and decode the account owning `public_key`.
    pub fn resolve(&self, public_key: &PublicKey) -> Result<Account, LedgerError> {
        let slot = self.lookup_by_key(&public_key.fingerprint())?;
        self.read_account(slot)
    }

    fn check_commit(&self, account: &Account) -> Result<usize, LedgerError> {
        let slot = self.check_range(account.index)?;
        let current = Account::decode(self.slot(slot))?;
        if current.public_key != account.public_key {
            return Err(LedgerError::AccountKeyMismatch {
                index: account.index,
            });
        }
        Ok(slot)
    }

    fn write(&mut self, slot: usize, account: &Account) {
        let encoded = account.encode();
        let start = slot * ACCOUNT_SIZE;
        self.state[start..start + ACCOUNT_SIZE].copy_from_slice(&encoded);
        self.state_hash[slot] = self.hasher.hash(&encoded);
    }

    /// Overwrite the account's slot and its leaf hash.
    pub fn commit(&mut self, account: &Account) -> Result<(), LedgerError> {
        let slot = self.check_commit(account)?;
        self.write(slot, account);
        Ok(())
    }

    /// Commit several accounts; nothing is written unless every one is valid.
    pub fn commit_all(&mut self, accounts: &[Account]) -> Result<(), LedgerError> {
        let slots = accounts
            .iter()
            .map(|account| self.check_commit(account))
            .collect::<Result<Vec<_>, _>>()?;

        for (slot, account) in slots.into_iter().zip(accounts) {
            self.write(slot, account);
        }
        Ok(())
    }

    pub fn leaf_hash(&self, index: u64) -> Result<B256, LedgerError> {
        let slot = self.check_range(index)?;
        Ok(self.state_hash[slot])
    }

    /// Raw account bytes, `len() * 160` long.
    pub fn state_bytes(&self) -> &[u8] {
        &self.state
    }

    pub fn state_hashes(&self) -> &[B256] {
        &self.state_hash
    }

    pub fn root(&self) -> Result<B256, LedgerError> {
        Ok(compute_root(&self.hasher, &self.state_hash)?)
    }

    /// Inclusion proof for `index` against the current leaf hashes.
    pub fn prove(&self, index: u64) -> Result<MerkleProof, LedgerError> {
        self.check_range(index)?;
        Ok(build_proof(&self.hasher, &self.state_hash, index)?)
    }

    /// Recompute the leaf hash of `index` from its bytes and compare.
    pub fn check_leaf(&self, index: u64) -> Result<(), LedgerError> {
        let slot = self.check_range(index)?;
        if self.hasher.hash(self.slot(slot)) != self.state_hash[slot] {
            return Err(LedgerError::LeafHashMismatch { index });
        }
        Ok(())
    }

    /// Consume the store, returning its raw account bytes.
    pub fn into_state(self) -> Vec<u8> {
        self.state
    }
}
