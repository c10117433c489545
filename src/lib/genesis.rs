//! Provisioning buffers for a fresh ledger.

use crate::crypto::schnorr::KeyPair;
use crate::domain::account::{Account, ACCOUNT_SIZE};
use crate::domain::field::FieldElement;
use crate::domain::keys::PublicKey;

/// Balance step of the demo ledger: account `i` starts with `(i + 1) * 666`.
pub const DEMO_BALANCE_STEP: u64 = 666;

/// Collects `(public key, balance)` entries and assigns slot indices in order.
#[derive(Debug, Clone, Default)]
pub struct GenesisBuilder {
    accounts: Vec<Account>,
}

impl GenesisBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an account with nonce 0 in the next free slot.
    pub fn account(mut self, public_key: PublicKey, balance: FieldElement) -> Self {
        let index = self.accounts.len() as u64;
        self.accounts.push(Account::new(index, 0, balance, public_key));
        self
    }

    /// `n` accounts keyed by [`KeyPair::from_seed`]`(i)` with balance `(i + 1) * 666`.
    pub fn demo(n: u64) -> Self {
        (0..n).fold(Self::new(), |builder, i| {
            builder.account(
                KeyPair::from_seed(i).public_key(),
                FieldElement::from((i + 1) * DEMO_BALANCE_STEP),
            )
        })
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    /// Encoded buffer and its account count, ready for `LedgerStore::from_provisioning`.
    pub fn build(&self) -> (Vec<u8>, u64) {
        let mut bytes = Vec::with_capacity(self.accounts.len() * ACCOUNT_SIZE);
        for account in &self.accounts {
            bytes.extend_from_slice(&account.encode());
        }
        (bytes, self.accounts.len() as u64)
    }
}
