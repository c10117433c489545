//! Operator configuration loaded from TOML.

use std::path::Path;

use serde::Deserialize;

use crate::sequencer::SequencerConfig;
use crate::transition::NoncePolicy;

/// Top-level operator configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RollupConfig {
    pub ledger: LedgerConfig,
    pub queue: QueueConfig,
    pub prover: ProverConfig,
    pub validation: ValidationConfig,
}

/// Which hash function backs leaves, Merkle nodes and message digests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashKind {
    #[default]
    Poseidon,
    Sha256,
}

impl std::fmt::Display for HashKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HashKind::Poseidon => write!(f, "poseidon"),
            HashKind::Sha256 => write!(f, "sha256"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    /// Number of pre-provisioned account slots.
    pub accounts: u64,
    pub hash: HashKind,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            accounts: 16,
            hash: HashKind::Poseidon,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueueConfig {
    /// Pending transfers held before submitters are back-pressured.
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { capacity: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProverConfig {
    /// Transfers per batch proof.
    pub batch_size: usize,
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self { batch_size: 1 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    pub nonce_policy: NoncePolicy,
}

/// Errors from config loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

impl RollupConfig {
    /// Load and validate a config from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // A transfer needs two distinct accounts.
        if self.ledger.accounts < 2 {
            return Err(ConfigError::Validation(format!(
                "ledger.accounts must be at least 2, got {}",
                self.ledger.accounts
            )));
        }
        if self.queue.capacity == 0 {
            return Err(ConfigError::Validation(
                "queue.capacity must be at least 1".into(),
            ));
        }
        if self.prover.batch_size == 0 {
            return Err(ConfigError::Validation(
                "prover.batch_size must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn sequencer(&self) -> SequencerConfig {
        SequencerConfig {
            batch_size: self.prover.batch_size,
            nonce_policy: self.validation.nonce_policy,
        }
    }
}
