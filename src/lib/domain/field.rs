use alloy_primitives::B256;
use ark_ff::{BigInteger, PrimeField};

/// Element of the BN254 scalar field. Balances, amounts and public-key
/// coordinates all live here.
pub type FieldElement = ark_bn254::Fr;

/// Canonical 32-byte big-endian encoding of a field element.
pub fn fe_to_bytes(value: &FieldElement) -> [u8; 32] {
    let bytes = value.into_bigint().to_bytes_be();
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    out
}

/// Interpret big-endian bytes as a field element, reducing modulo the field order.
pub fn fe_from_bytes(bytes: &[u8]) -> FieldElement {
    FieldElement::from_be_bytes_mod_order(bytes)
}

/// Convert a field element to B256.
pub fn fe_to_b256(value: &FieldElement) -> B256 {
    B256::from(fe_to_bytes(value))
}

/// Convert B256 to a field element.
pub fn fe_from_b256(value: &B256) -> FieldElement {
    fe_from_bytes(value.as_slice())
}
