//! Fixed-width account record and its binary encoding.
//!
//! Layout (160 bytes, big-endian, five 32-byte chunks):
//!
//! ```text
//! [0..24)    zero        [24..32)   index (u64)
//! [32..56)   zero        [56..64)   nonce (u64)
//! [64..96)   balance
//! [96..128)  public key X
//! [128..160) public key Y
//! ```

use ark_ff::Zero;

use super::field::{fe_from_bytes, fe_to_bytes, FieldElement};
use super::keys::PublicKey;

/// Size of an encoded account in bytes.
pub const ACCOUNT_SIZE: usize = 160;

const INDEX_OFFSET: usize = 24;
const NONCE_OFFSET: usize = 56;
const BALANCE_OFFSET: usize = 64;
const PUBKEY_X_OFFSET: usize = 96;
const PUBKEY_Y_OFFSET: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("malformed account: required {expected} bytes, found {found}")]
    MalformedAccount { expected: usize, found: usize },

    #[error("non-canonical account encoding at byte {offset}")]
    NonCanonical { offset: usize },
}

/// A ledger account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Account {
    /// Slot in the ledger; never changes once provisioned.
    pub index: u64,
    /// Number of transfers sent from this account.
    pub nonce: u64,
    pub balance: FieldElement,
    pub public_key: PublicKey,
}

impl Account {
    pub fn new(index: u64, nonce: u64, balance: FieldElement, public_key: PublicKey) -> Self {
        Self {
            index,
            nonce,
            balance,
            public_key,
        }
    }

    /// Zero every field, public key included.
    pub fn reset(&mut self) {
        self.index = 0;
        self.nonce = 0;
        self.balance = FieldElement::zero();
        self.public_key.x = FieldElement::zero();
        self.public_key.y = FieldElement::zero();
    }

    pub fn encode(&self) -> [u8; ACCOUNT_SIZE] {
        let mut out = [0u8; ACCOUNT_SIZE];
        out[INDEX_OFFSET..INDEX_OFFSET + 8].copy_from_slice(&self.index.to_be_bytes());
        out[NONCE_OFFSET..NONCE_OFFSET + 8].copy_from_slice(&self.nonce.to_be_bytes());
        out[BALANCE_OFFSET..PUBKEY_X_OFFSET].copy_from_slice(&fe_to_bytes(&self.balance));
        out[PUBKEY_X_OFFSET..PUBKEY_Y_OFFSET].copy_from_slice(&fe_to_bytes(&self.public_key.x));
        out[PUBKEY_Y_OFFSET..].copy_from_slice(&fe_to_bytes(&self.public_key.y));
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() != ACCOUNT_SIZE {
            return Err(CodecError::MalformedAccount {
                expected: ACCOUNT_SIZE,
                found: bytes.len(),
            });
        }

        let mut index = [0u8; 8];
        index.copy_from_slice(&bytes[INDEX_OFFSET..INDEX_OFFSET + 8]);
        let mut nonce = [0u8; 8];
        nonce.copy_from_slice(&bytes[NONCE_OFFSET..NONCE_OFFSET + 8]);

        let account = Self {
            index: u64::from_be_bytes(index),
            nonce: u64::from_be_bytes(nonce),
            balance: fe_from_bytes(&bytes[BALANCE_OFFSET..PUBKEY_X_OFFSET]),
            public_key: PublicKey {
                x: fe_from_bytes(&bytes[PUBKEY_X_OFFSET..PUBKEY_Y_OFFSET]),
                y: fe_from_bytes(&bytes[PUBKEY_Y_OFFSET..]),
            },
        };

        // Padding must be zero and every field element reduced.
        if let Some(offset) = account
            .encode()
            .iter()
            .zip(bytes)
            .position(|(a, b)| a != b)
        {
            return Err(CodecError::NonCanonical { offset });
        }
        Ok(account)
    }
}
