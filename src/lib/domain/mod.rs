pub mod account;
pub mod field;
pub mod keys;
pub mod merkle;
pub mod transfer;
pub mod witness;
