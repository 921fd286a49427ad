use anyhow::Result;
use clap::Parser;
use ecovault_execution::governance;
use ecovault_execution::validation::MAX_DEPOSIT_AMOUNT;
use ecovault_execution::{
    process_batch, BatchPolicy, ExecutionContext, GovernanceConfig, ItemOutcome, MemoryBridge,
    RewardPolicy,
};
use ecovault_genesis::create_genesis_state;
use ecovault_types::{Deposit, EsgMetrics, LedgerState, Telemetry, TenantPolicy};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "EcoVault batch load simulation")]
struct Args {
    /// Independent tenants, each with its own vault and ledger.
    #[arg(long, default_value_t = 8)]
    tenants: usize,
    /// Batches processed per tenant.
    #[arg(long, default_value_t = 50)]
    batches: usize,
    #[arg(long, default_value_t = 20)]
    batch_size: usize,
    /// Chance that a generated deposit breaks one bound.
    #[arg(long, default_value_t = 0.05)]
    invalid_rate: f64,
    /// Skip failing deposits instead of aborting their batch.
    #[arg(long)]
    skip_invalid: bool,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct TenantStats {
    batches_committed: u64,
    batches_aborted: u64,
    deposits_rewarded: u64,
    deposits_rejected: u64,
    credentials: u64,
    score_sum: u128,
    tokens_minted: u128,
    max_batch_units: u64,
    vault_amount: u64,
}

impl TenantStats {
    fn merge(mut self, other: Self) -> Self {
        self.batches_committed += other.batches_committed;
        self.batches_aborted += other.batches_aborted;
        self.deposits_rewarded += other.deposits_rewarded;
        self.deposits_rejected += other.deposits_rejected;
        self.credentials += other.credentials;
        self.score_sum += other.score_sum;
        self.tokens_minted += other.tokens_minted;
        self.max_batch_units = self.max_batch_units.max(other.max_batch_units);
        self.vault_amount = self.vault_amount.saturating_add(other.vault_amount);
        self
    }
}

fn random_deposit(rng: &mut StdRng, invalid_rate: f64) -> Deposit {
    let mut depositor = [0u8; 32];
    rng.fill(&mut depositor);
    let mut deposit = Deposit {
        depositor,
        target_chain: rng.gen_range(1..=30),
        amount: rng.gen_range(1..=MAX_DEPOSIT_AMOUNT),
        telemetry: Telemetry {
            contamination: rng.gen_range(0..=10),
            temperature: rng.gen_range(10..=30),
            humidity: rng.gen_range(30..=70),
            vibration: rng.gen_range(0..=10),
            fill_level: rng.gen_range(0..=100),
        },
        esg_metrics: EsgMetrics {
            carbon_offset: rng.gen_range(1..=200),
            recyclability: rng.gen_range(0..=10_000),
        },
        policy: TenantPolicy::default(),
    };
    if rng.gen_bool(invalid_rate.clamp(0.0, 1.0)) {
        match rng.gen_range(0..4) {
            0 => deposit.amount = MAX_DEPOSIT_AMOUNT + 1,
            1 => deposit.telemetry.contamination = 50,
            2 => deposit.telemetry.humidity = 95,
            _ => deposit.esg_metrics.carbon_offset = 0,
        }
    }
    deposit
}

fn destinations_for(tenant: usize, batch: usize, count: usize) -> Vec<[u8; 32]> {
    (0..count * 3)
        .map(|slot| {
            let mut account = [0u8; 32];
            account[..8].copy_from_slice(&(tenant as u64).to_le_bytes());
            account[8..16].copy_from_slice(&(batch as u64).to_le_bytes());
            account[16..24].copy_from_slice(&(slot as u64).to_le_bytes());
            account
        })
        .collect()
}

fn run_tenant(tenant: usize, args: &Args) -> Result<(TenantStats, LedgerState)> {
    let mut rng = StdRng::seed_from_u64(args.seed.wrapping_add(tenant as u64));
    let authority = [tenant as u8; 32];
    let admins = vec![[0xA0; 32], [0xB0; 32]];
    let governance = GovernanceConfig::new(admins.clone(), 2);
    let policy = RewardPolicy {
        batch_policy: if args.skip_invalid {
            BatchPolicy::SkipAndContinue
        } else {
            BatchPolicy::AbortOnFirstFailure
        },
        ..Default::default()
    };

    let mut state = create_genesis_state(authority, 255);
    let mut bridge = MemoryBridge::new();
    let mut stats = TenantStats::default();

    for batch in 0..args.batches {
        if let Some(vault) = state.vault.as_mut() {
            for admin in &admins {
                governance::approve(vault, admin, &governance)?;
            }
        }

        let deposits: Vec<Deposit> = (0..args.batch_size)
            .map(|_| random_deposit(&mut rng, args.invalid_rate))
            .collect();
        let destinations = destinations_for(tenant, batch, deposits.len());

        let result = {
            let mut ctx = ExecutionContext {
                state: &mut state,
                policy: &policy,
                governance: &governance,
                bridge: &mut bridge,
                height: batch as u64 + 1,
                timestamp: 1_700_000_000 + batch as u64,
            };
            process_batch(&mut ctx, &deposits, &destinations)
        };

        match result {
            Ok(receipt) => {
                stats.batches_committed += 1;
                stats.max_batch_units = stats.max_batch_units.max(receipt.compute_units);
                for outcome in &receipt.outcomes {
                    match outcome {
                        ItemOutcome::Rewarded(item) => {
                            stats.deposits_rewarded += 1;
                            stats.score_sum += u128::from(item.score.get());
                            stats.tokens_minted += item.rewards.total();
                            if item.credential.is_some() {
                                stats.credentials += 1;
                            }
                        }
                        ItemOutcome::Rejected { .. } => stats.deposits_rejected += 1,
                    }
                }
            }
            Err(e) => {
                debug!(tenant, batch, error = %e, "batch aborted");
                stats.batches_aborted += 1;
                // approvals survive an aborted batch; drop them so the next
                // round starts from a clean quorum
                if let Some(vault) = state.vault.as_mut() {
                    governance::consume(vault);
                }
            }
        }
    }

    stats.vault_amount = state.vault.map(|v| v.amount).unwrap_or_default();
    Ok((stats, state))
}

fn run_simulation(args: &Args) -> Result<TenantStats> {
    let start = Instant::now();
    let results: Vec<Result<(TenantStats, LedgerState)>> = (0..args.tenants)
        .into_par_iter()
        .map(|tenant| run_tenant(tenant, args))
        .collect();

    let mut total = TenantStats::default();
    for result in results {
        let (stats, state) = result?;
        debug!(root = ?state.root_hash(), "tenant finished");
        total = total.merge(stats);
    }
    let elapsed = start.elapsed();

    let processed = total.deposits_rewarded + total.deposits_rejected;
    let mean_score = if total.deposits_rewarded > 0 {
        total.score_sum / u128::from(total.deposits_rewarded)
    } else {
        0
    };
    info!(?elapsed, processed, "simulation finished");

    println!("=== EcoVault Simulation ===");
    println!("Tenants: {}", args.tenants);
    println!("Batches committed: {}", total.batches_committed);
    println!("Batches aborted: {}", total.batches_aborted);
    println!("Deposits rewarded: {}", total.deposits_rewarded);
    println!("Deposits rejected: {}", total.deposits_rejected);
    println!("Credentials minted: {}", total.credentials);
    println!("Mean compliance score: {}", mean_score);
    println!("Tokens minted: {}", total.tokens_minted);
    println!("Max batch compute units: {}", total.max_batch_units);
    println!("Elapsed: {:.2?}", elapsed);

    Ok(total)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();
    run_simulation(&args)?;
    Ok(())
}
