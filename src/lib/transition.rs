use serde::{Deserialize, Serialize};

use crate::domain::account::Account;
use crate::domain::field::FieldElement;
use crate::domain::keys::PublicKey;
use crate::domain::transfer::Transfer;
use crate::ledger::{LedgerError, LedgerStore};
use crate::ports::hash::HashFunction;
use crate::ports::signature::SignatureScheme;

/// Whether a transfer's nonce is checked against the sender's ledger nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoncePolicy {
    /// The transfer nonce is signed over but not compared with the ledger.
    #[default]
    Ignore,
    /// `transfer.nonce` must equal `sender.nonce + 1`.
    Sequential,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("account {index} is registered under a different public key")]
    PublicKeyMismatch { index: u64 },

    #[error("sender and receiver are the same account ({index})")]
    SelfTransfer { index: u64 },

    #[error("insufficient balance in account {index}")]
    InsufficientBalance { index: u64 },

    #[error("nonce mismatch for account {index}: expected {expected}, got {found}")]
    NonceMismatch { index: u64, expected: u64, found: u64 },

    #[error("nonce of account {index} is exhausted")]
    NonceOverflow { index: u64 },

    #[error("signature invalid: {0}")]
    SignatureInvalid(String),
}

/// Sender and receiver before and after one transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub sender_before: Account,
    pub receiver_before: Account,
    pub sender_after: Account,
    pub receiver_after: Account,
}

impl Transition {
    pub fn amount(&self) -> FieldElement {
        self.receiver_after.balance - self.receiver_before.balance
    }
}

fn resolve<H: HashFunction>(
    ledger: &LedgerStore<H>,
    transfer_key: &PublicKey,
) -> Result<Account, TransitionError> {
    let account = ledger.resolve(transfer_key)?;
    // The index is keyed by X only; Y must match as well.
    if account.public_key != *transfer_key {
        return Err(TransitionError::PublicKeyMismatch {
            index: account.index,
        });
    }
    Ok(account)
}

/// Check `transfer` against the current ledger and compute the post-transfer
/// account pair.
///
/// Order: resolve both accounts, balance, nonce policy, signature. Nothing is
/// mutated; on success the ledger is exactly as it was.
pub fn validate_transfer<H, S>(
    ledger: &LedgerStore<H>,
    scheme: &S,
    policy: NoncePolicy,
    transfer: &Transfer,
) -> Result<Transition, TransitionError>
where
    H: HashFunction,
    S: SignatureScheme + ?Sized,
{
    let sender = resolve(ledger, transfer.sender())?;
    let receiver = resolve(ledger, transfer.receiver())?;

    if sender.index == receiver.index {
        return Err(TransitionError::SelfTransfer {
            index: sender.index,
        });
    }

    let amount = transfer.amount();
    if sender.balance < amount {
        return Err(TransitionError::InsufficientBalance {
            index: sender.index,
        });
    }

    let next_nonce = sender
        .nonce
        .checked_add(1)
        .ok_or(TransitionError::NonceOverflow {
            index: sender.index,
        })?;
    if policy == NoncePolicy::Sequential && transfer.nonce() != next_nonce {
        return Err(TransitionError::NonceMismatch {
            index: sender.index,
            expected: next_nonce,
            found: transfer.nonce(),
        });
    }

    let message = transfer.message(ledger.hasher());
    match scheme.verify(transfer.sender(), &message, transfer.signature()) {
        Ok(true) => {}
        Ok(false) => {
            return Err(TransitionError::SignatureInvalid(
                "verification failed".to_string(),
            ))
        }
        Err(e) => return Err(TransitionError::SignatureInvalid(e.to_string())),
    }

    let mut sender_after = sender;
    sender_after.balance -= amount;
    sender_after.nonce = next_nonce;

    let mut receiver_after = receiver;
    receiver_after.balance += amount;

    Ok(Transition {
        sender_before: sender,
        receiver_before: receiver,
        sender_after,
        receiver_after,
    })
}
