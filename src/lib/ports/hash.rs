use alloy_primitives::B256;

/// Port for the collision-resistant hash used for account leaves, Merkle
/// nodes and transfer message digests.
///
/// Implementations are stateless: every call hashes exactly the given bytes.
///
/// Implementations:
/// - `PoseidonHasher` (BN254 Poseidon, circuit-friendly)
/// - `Sha256Hasher`
pub trait HashFunction: Send + Sync {
    /// Hash arbitrary bytes to a 32-byte digest.
    fn hash(&self, data: &[u8]) -> B256;

    /// Hash two digests as `hash(left ‖ right)`.
    fn hash_pair(&self, left: &B256, right: &B256) -> B256 {
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(left.as_slice());
        buf[32..].copy_from_slice(right.as_slice());
        self.hash(&buf)
    }
}

impl<T: HashFunction + ?Sized> HashFunction for &T {
    fn hash(&self, data: &[u8]) -> B256 {
        (**self).hash(data)
    }
}
