pub mod poseidon;
pub mod schnorr;
