use alloy_primitives::B256;

use super::field::{fe_to_bytes, FieldElement};
use super::keys::{PublicKey, Signature};
use crate::crypto::schnorr::KeyPair;
use crate::ports::hash::HashFunction;

/// Length of the canonical transfer message: nonce (8) + five 32-byte fields.
pub const MESSAGE_SIZE: usize = 8 + 5 * 32;

/// Unsigned transfer fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferBody {
    pub nonce: u64,
    pub amount: FieldElement,
    pub sender: PublicKey,
    pub receiver: PublicKey,
}

impl TransferBody {
    pub fn new(nonce: u64, amount: FieldElement, sender: PublicKey, receiver: PublicKey) -> Self {
        Self {
            nonce,
            amount,
            sender,
            receiver,
        }
    }

    /// `nonce ‖ amount ‖ sender.x ‖ sender.y ‖ receiver.x ‖ receiver.y`, big-endian.
    pub fn message_bytes(&self) -> [u8; MESSAGE_SIZE] {
        let mut out = [0u8; MESSAGE_SIZE];
        out[..8].copy_from_slice(&self.nonce.to_be_bytes());
        let fields = [
            &self.amount,
            &self.sender.x,
            &self.sender.y,
            &self.receiver.x,
            &self.receiver.y,
        ];
        for (i, field) in fields.into_iter().enumerate() {
            let start = 8 + i * 32;
            out[start..start + 32].copy_from_slice(&fe_to_bytes(field));
        }
        out
    }

    /// Digest the signature is computed over.
    pub fn message<H: HashFunction>(&self, hasher: &H) -> B256 {
        hasher.hash(&self.message_bytes())
    }

    pub fn sign<H: HashFunction>(self, keys: &KeyPair, hasher: &H) -> Transfer {
        let signature = keys.sign(&self.message(hasher));
        self.into_transfer(signature)
    }

    pub fn into_transfer(self, signature: Signature) -> Transfer {
        Transfer {
            body: self,
            signature,
        }
    }
}

/// A signed transfer. Fields are fixed once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    body: TransferBody,
    signature: Signature,
}

impl Transfer {
    pub fn new(
        nonce: u64,
        amount: FieldElement,
        sender: PublicKey,
        receiver: PublicKey,
        signature: Signature,
    ) -> Self {
        TransferBody::new(nonce, amount, sender, receiver).into_transfer(signature)
    }

    pub fn nonce(&self) -> u64 {
        self.body.nonce
    }

    pub fn amount(&self) -> FieldElement {
        self.body.amount
    }

    pub fn sender(&self) -> &PublicKey {
        &self.body.sender
    }

    pub fn receiver(&self) -> &PublicKey {
        &self.body.receiver
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn body(&self) -> &TransferBody {
        &self.body
    }

    pub fn message<H: HashFunction>(&self, hasher: &H) -> B256 {
        self.body.message(hasher)
    }
}
