pub mod adapters;
pub mod assembler;
pub mod config;
pub mod crypto;
pub mod domain;
pub mod genesis;
pub mod ledger;
pub mod ports;
pub mod queue;
pub mod sequencer;
pub mod transition;
