use std::fmt;

use alloy_primitives::B256;
use ark_ff::Zero;
use serde::{Deserialize, Serialize};

use super::field::{fe_to_b256, fe_to_bytes, FieldElement};

/// Account public key: an affine curve point given by its two coordinates.
///
/// The coordinates are kept as raw field elements; whether they describe a
/// point on the curve is decided by the signature scheme, not by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PublicKey {
    pub x: FieldElement,
    pub y: FieldElement,
}

impl PublicKey {
    pub fn new(x: FieldElement, y: FieldElement) -> Self {
        Self { x, y }
    }

    /// Lookup key for this public key: the big-endian X coordinate.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint(fe_to_bytes(&self.x))
    }

    /// Both coordinates zero (the state left by `Account::reset`).
    pub fn is_zero(&self) -> bool {
        self.x.is_zero() && self.y.is_zero()
    }

    pub fn x_b256(&self) -> B256 {
        fe_to_b256(&self.x)
    }

    pub fn y_b256(&self) -> B256 {
        fe_to_b256(&self.y)
    }
}

/// Fixed-width account lookup key derived from a public key's X coordinate.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(pub [u8; 32]);

impl Fingerprint {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint(0x{})", hex::encode(self.0))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Transfer authorization: commitment point `R = (r_x, r_y)` and response scalar `s`.
///
/// `s` is kept as big-endian bytes because it lives in the curve's scalar
/// field, which differs from [`FieldElement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Signature {
    pub r_x: FieldElement,
    pub r_y: FieldElement,
    pub s: [u8; 32],
}

impl Signature {
    /// 96-byte encoding `r_x ‖ r_y ‖ s`.
    pub fn to_bytes(&self) -> [u8; 96] {
        let mut out = [0u8; 96];
        out[..32].copy_from_slice(&fe_to_bytes(&self.r_x));
        out[32..64].copy_from_slice(&fe_to_bytes(&self.r_y));
        out[64..].copy_from_slice(&self.s);
        out
    }
}
