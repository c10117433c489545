//! End-to-end operator demo.
//!
//! Provisions a ledger of seeded accounts (balance `(i + 1) * 666`), starts the
//! sequencer with the mock prover, submits signed transfers from account 0 to
//! account 1 and prints the resulting balances and roots.
//!
//! ```text
//! cargo run --bin demo -- --transfers 5 --amount 12
//! RUST_LOG=debug cargo run --bin demo -- --config rollup.example.toml --witness-out batch.json
//! ```

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use zk_rollup_operator::adapters::mock_prover::MockProver;
use zk_rollup_operator::adapters::poseidon_hasher::PoseidonHasher;
use zk_rollup_operator::adapters::schnorr::GrumpkinSchnorr;
use zk_rollup_operator::adapters::sha256_hasher::Sha256Hasher;
use zk_rollup_operator::config::{HashKind, RollupConfig};
use zk_rollup_operator::crypto::schnorr::KeyPair;
use zk_rollup_operator::domain::field::FieldElement;
use zk_rollup_operator::domain::transfer::TransferBody;
use zk_rollup_operator::genesis::GenesisBuilder;
use zk_rollup_operator::ledger::LedgerStore;
use zk_rollup_operator::ports::hash::HashFunction;
use zk_rollup_operator::queue::transfer_queue;
use zk_rollup_operator::sequencer::Sequencer;

#[derive(clap::Parser)]
#[command(name = "demo", about = "Rollup operator demo: sequence, witness and prove transfers")]
struct Args {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override `ledger.accounts`.
    #[arg(long)]
    accounts: Option<u64>,

    /// Number of transfers to submit.
    #[arg(long, default_value_t = 10)]
    transfers: u64,

    /// Amount moved by each transfer.
    #[arg(long, default_value_t = 12)]
    amount: u64,

    /// Write the last proven batch witness as JSON.
    #[arg(long)]
    witness_out: Option<PathBuf>,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => RollupConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => RollupConfig::default(),
    };
    if let Some(accounts) = args.accounts {
        config.ledger.accounts = accounts;
    }
    config.validate()?;

    info!(
        accounts = config.ledger.accounts,
        hash = %config.ledger.hash,
        queue = config.queue.capacity,
        batch_size = config.prover.batch_size,
        "configuration loaded"
    );

    match config.ledger.hash {
        HashKind::Poseidon => run(PoseidonHasher, &config, &args).await,
        HashKind::Sha256 => run(Sha256Hasher, &config, &args).await,
    }
}

async fn run<H>(hasher: H, config: &RollupConfig, args: &Args) -> anyhow::Result<()>
where
    H: HashFunction + Clone + 'static,
{
    let started = Instant::now();

    let (bytes, num_accounts) = GenesisBuilder::demo(config.ledger.accounts).build();
    let ledger = LedgerStore::from_provisioning(bytes, num_accounts, hasher.clone())?;
    info!(root = %ledger.root()?, "ledger provisioned");

    let (handle, queue) = transfer_queue(config.queue.capacity);
    let sequencer = Sequencer::new(
        ledger,
        GrumpkinSchnorr,
        MockProver::new(hasher.clone(), GrumpkinSchnorr),
        config.sequencer(),
    );
    let task = tokio::spawn(sequencer.run(queue));

    let sender = KeyPair::from_seed(0);
    let receiver = KeyPair::from_seed(1).public_key();

    let mut submissions = Vec::with_capacity(args.transfers as usize);
    for nonce in 1..=args.transfers {
        let transfer = TransferBody::new(
            nonce,
            FieldElement::from(args.amount),
            sender.public_key(),
            receiver,
        )
        .sign(&sender, &hasher);
        submissions.push(handle.submit(transfer).await?);
    }
    drop(handle);

    for submission in submissions {
        match submission.outcome().await {
            Ok(receipt) => info!(
                sequence = receipt.sequence,
                batch = receipt.batch,
                root_after = %receipt.root_after,
                "transfer proven"
            ),
            Err(e) => info!(error = %e, "transfer not applied"),
        }
    }

    let report = task.await.context("sequencer task panicked")??;
    let alice = report.ledger.read_account(0)?;
    let bob = report.ledger.read_account(1)?;

    info!(
        processed = report.processed,
        rejected = report.rejected,
        batches = report.batches_proven,
        final_root = %report.final_root,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "done"
    );
    info!("account 0: balance {} nonce {}", alice.balance, alice.nonce);
    info!("account 1: balance {} nonce {}", bob.balance, bob.nonce);

    if let Some(path) = &args.witness_out {
        if let Some(batch) = &report.last_batch {
            let json = serde_json::to_string_pretty(batch)?;
            std::fs::write(path, json)
                .with_context(|| format!("writing witness to {}", path.display()))?;
            info!(path = %path.display(), "witness written");
        }
    }

    Ok(())
}
