pub mod mock_prover;
pub mod poseidon_hasher;
pub mod schnorr;
pub mod sha256_hasher;
