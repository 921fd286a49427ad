mod outbox;
mod wallet;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use ecovault_crypto::sign;
use ecovault_execution::budget::{estimate_batch_units, max_full_batch};
use ecovault_execution::message::decode_payload;
use ecovault_execution::scoring::compliance_score;
use ecovault_execution::validation::validate_deposit;
use ecovault_execution::{execute_transaction, ExecutionContext, TxReceipt};
use ecovault_genesis::DeploymentConfig;
use ecovault_storage::StateStore;
use ecovault_types::transaction::Transaction;
use ecovault_types::{Deposit, VaultInstruction};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::outbox::OutboxBridge;
use crate::wallet::{parse_key, Wallet};

const DEPLOYMENT_FILE: &str = "deployment.json";

#[derive(Parser, Debug)]
#[command(author, version, about = "EcoVault operator node")]
struct Args {
    #[command(subcommand)]
    command: Commands,
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,
    /// Default filter when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
    /// JSON-lines file the relayer reads published payloads from.
    #[arg(long)]
    outbox: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a fresh ed25519 wallet
    Keygen {
        #[arg(long)]
        out: PathBuf,
    },
    /// Create the vault with the wallet as authority
    Init {
        #[arg(long)]
        wallet: PathBuf,
        #[arg(long, default_value_t = 255)]
        bump: u8,
        /// Reward policy JSON; defaults apply to anything it omits
        #[arg(long)]
        policy: Option<PathBuf>,
        /// Admin public key (hex); repeat for each admin
        #[arg(long = "admin")]
        admins: Vec<String>,
        #[arg(long, default_value_t = 2)]
        quorum: u8,
    },
    /// Record one admin approval toward the mint quorum
    Approve {
        #[arg(long)]
        wallet: PathBuf,
    },
    /// Score and reward a batch file
    Process {
        #[arg(long)]
        wallet: PathBuf,
        #[arg(long)]
        batch: PathBuf,
    },
    /// Compute-unit estimate for a batch file, without touching the ledger
    Estimate {
        #[arg(long)]
        batch: PathBuf,
    },
    /// Print the vault and ledger summary
    Status,
    /// Decode a hex payload from the outbox
    Decode {
        #[arg(long)]
        payload: String,
    },
}

/// On-disk batch request. Destinations are hex account keys, three per deposit.
#[derive(Deserialize, Debug)]
struct BatchFile {
    deposits: Vec<Deposit>,
    destinations: Vec<String>,
}

impl BatchFile {
    fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read batch {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("Failed to parse batch {}", path.display()))
    }

    fn destinations(&self) -> Result<Vec<[u8; 32]>> {
        self.destinations.iter().map(|d| parse_key(d)).collect()
    }
}

fn open_store(data_dir: &Path) -> Result<Box<dyn StateStore>> {
    #[cfg(feature = "rocksdb")]
    {
        let path = data_dir.join("db");
        let storage = ecovault_storage::db::Storage::new(&path.to_string_lossy())
            .context("Failed to initialize storage")?;
        Ok(Box::new(storage))
    }
    #[cfg(not(feature = "rocksdb"))]
    {
        let store = ecovault_storage::FileStore::open(data_dir)
            .context("Failed to initialize storage")?;
        Ok(Box::new(store))
    }
}

fn load_deployment(data_dir: &Path) -> Result<DeploymentConfig> {
    let path = data_dir.join(DEPLOYMENT_FILE);
    if !path.exists() {
        bail!("No deployment at {}; run `init` first", data_dir.display());
    }
    DeploymentConfig::load(&path)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Signs `instruction` with the wallet, executes it and persists the result.
fn submit(args: &Args, wallet: &Path, instruction: VaultInstruction) -> Result<TxReceipt> {
    let deployment = load_deployment(&args.data_dir)?;
    let mut store = open_store(&args.data_dir)?;
    let mut state = store.load_state()?;

    let kp = Wallet::load(wallet)?.to_keypair()?;
    let signer = kp.verifying_key().to_bytes();
    let mut tx = Transaction {
        signer,
        nonce: state.nonces.get(&signer).copied().unwrap_or(0),
        instruction,
        signature: vec![],
    };
    tx.signature = sign(&kp, &tx.signing_bytes());

    let outbox_path = args
        .outbox
        .clone()
        .unwrap_or_else(|| args.data_dir.join("outbox.jsonl"));
    let mut bridge = OutboxBridge::open(&outbox_path)?;

    // one committed transaction per height
    let height = state.nonces.values().sum::<u64>() + 1;
    let receipt = {
        let mut ctx = ExecutionContext {
            state: &mut state,
            policy: &deployment.policy,
            governance: &deployment.governance,
            bridge: &mut bridge,
            height,
            timestamp: unix_now(),
        };
        execute_transaction(&tx, &mut ctx)?
    };

    // messages are staged in the bridge; release them only once the ledger
    // that issued them is on disk
    store.commit(&state, &receipt.events())?;
    let released = bridge.flush().with_context(|| {
        format!(
            "Ledger committed but outbox {} was not written",
            outbox_path.display()
        )
    })?;
    info!(
        released,
        tx = %hex::encode(tx.id()),
        height,
        root = %hex::encode(state.root_hash()),
        "transaction committed"
    );
    Ok(receipt)
}

fn init(
    args: &Args,
    wallet: &Path,
    bump: u8,
    policy: Option<&Path>,
    admins: &[String],
    quorum: u8,
) -> Result<()> {
    let deployment_path = args.data_dir.join(DEPLOYMENT_FILE);
    if deployment_path.exists() {
        bail!("Deployment already exists at {}", deployment_path.display());
    }
    std::fs::create_dir_all(&args.data_dir)?;

    let mut deployment = DeploymentConfig::default();
    if let Some(path) = policy {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read policy {}", path.display()))?;
        deployment.policy = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse policy {}", path.display()))?;
    }
    deployment.governance.admins = admins
        .iter()
        .map(|a| parse_key(a))
        .collect::<Result<_>>()?;
    deployment.governance.quorum = quorum;
    deployment.validate()?;
    deployment.save(&deployment_path)?;

    match submit(args, wallet, VaultInstruction::InitializeVault { bump }) {
        Ok(_) => Ok(()),
        Err(e) => {
            // leave no half-initialized deployment behind
            let _ = std::fs::remove_file(&deployment_path);
            Err(e)
        }
    }
}

fn estimate(args: &Args, batch: &Path) -> Result<()> {
    let deployment = if args.data_dir.join(DEPLOYMENT_FILE).exists() {
        load_deployment(&args.data_dir)?
    } else {
        DeploymentConfig::default()
    };
    let policy = &deployment.policy;
    let batch = BatchFile::load(batch)?;

    let mut eligible = 0usize;
    let mut invalid = 0usize;
    for deposit in &batch.deposits {
        if validate_deposit(deposit).is_err() {
            invalid += 1;
            continue;
        }
        let score = compliance_score(deposit, &policy.weights)?;
        if score.get() >= policy.nft_threshold {
            eligible += 1;
        }
    }

    let units = estimate_batch_units(&policy.costs, batch.deposits.len(), eligible);
    let report = serde_json::json!({
        "deposits": batch.deposits.len(),
        "invalid": invalid,
        "eligible": eligible,
        "estimated_units": units,
        "compute_limit": policy.compute_limit,
        "fits": units <= policy.compute_limit,
        "max_full_batch": max_full_batch(&policy.costs, policy.compute_limit),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn status(args: &Args) -> Result<()> {
    let store = open_store(&args.data_dir)?;
    let state = store.load_state()?;
    let vault = state
        .vault
        .ok_or_else(|| anyhow!("Vault not initialized in {}", args.data_dir.display()))?;
    let report = serde_json::json!({
        "authority": hex::encode(vault.authority),
        "amount": vault.amount,
        "admin_approvals": vault.admin_approvals,
        "bump": vault.bump,
        "supply": state.supply,
        "token_accounts": state.token_accounts.len(),
        "credentials": state.credentials.len(),
        "message_sequence": state.message_sequence,
        "events": store.load_events()?.len(),
        "root_hash": hex::encode(state.root_hash()),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run(args: &Args) -> Result<()> {
    match &args.command {
        Commands::Keygen { out } => {
            let wallet = Wallet::generate();
            wallet.save(out)?;
            println!("Wallet written to {}", out.display());
            println!("Public Key: {}", wallet.public_key);
        }
        Commands::Init {
            wallet,
            bump,
            policy,
            admins,
            quorum,
        } => {
            init(args, wallet, *bump, policy.as_deref(), admins, *quorum)?;
            println!("Vault initialized in {}", args.data_dir.display());
        }
        Commands::Approve { wallet } => {
            if let TxReceipt::ApprovalRecorded { approvals, .. } =
                submit(args, wallet, VaultInstruction::ApproveMint)?
            {
                println!("Approvals: {approvals}");
            }
        }
        Commands::Process { wallet, batch } => {
            let file = BatchFile::load(batch)?;
            let instruction = VaultInstruction::ProcessBatch {
                destinations: file.destinations()?,
                deposits: file.deposits,
            };
            if let TxReceipt::BatchProcessed(receipt) = submit(args, wallet, instruction)? {
                println!("{}", serde_json::to_string_pretty(&receipt.events)?);
            }
        }
        Commands::Estimate { batch } => estimate(args, batch)?,
        Commands::Status => status(args)?,
        Commands::Decode { payload } => {
            let bytes = hex::decode(payload.trim_start_matches("0x"))?;
            let decoded = decode_payload(&bytes)?;
            let report = serde_json::json!({
                "asset_id": hex::encode(decoded.asset_id),
                "recipient": hex::encode(decoded.recipient),
                "carbon_offset": decoded.esg_metrics.carbon_offset,
                "recyclability": decoded.esg_metrics.recyclability,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .context("invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&args) {
        error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}

// exercises the flat-file store
#[cfg(all(test, not(feature = "rocksdb")))]
mod tests {
    use super::*;
    use ecovault_types::{EsgMetrics, Telemetry, TenantPolicy};
    use std::fs;

    fn scratch_args(tag: &str) -> Args {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let data_dir =
            std::env::temp_dir().join(format!("ecovault-node-{tag}-{}-{nanos}", std::process::id()));
        fs::create_dir_all(&data_dir).unwrap();
        Args {
            command: Commands::Status,
            data_dir,
            log_level: "warn".into(),
            outbox: None,
        }
    }

    fn wallet_at(args: &Args, name: &str) -> (PathBuf, Wallet) {
        let path = args.data_dir.join(format!("{name}.json"));
        let wallet = Wallet::generate();
        wallet.save(&path).unwrap();
        (path, wallet)
    }

    fn eligible_batch() -> VaultInstruction {
        VaultInstruction::ProcessBatch {
            deposits: vec![Deposit {
                depositor: [0x42; 32],
                target_chain: 2,
                amount: 1000,
                telemetry: Telemetry {
                    contamination: 5,
                    temperature: 25,
                    humidity: 50,
                    vibration: 2,
                    fill_level: 40,
                },
                esg_metrics: EsgMetrics {
                    carbon_offset: 50,
                    recyclability: 8000,
                },
                policy: TenantPolicy::default(),
            }],
            destinations: vec![[0xD1; 32], [0xD2; 32], [0xD3; 32]],
        }
    }

    fn outbox_lines(args: &Args) -> Vec<String> {
        match fs::read_to_string(args.data_dir.join("outbox.jsonl")) {
            Ok(content) => content.lines().map(str::to_owned).collect(),
            Err(_) => Vec::new(),
        }
    }

    #[test]
    fn failed_commit_releases_no_messages() {
        let args = scratch_args("outbox");
        let (authority, _) = wallet_at(&args, "authority");
        let (admin_a_path, admin_a) = wallet_at(&args, "admin-a");
        let (admin_b_path, admin_b) = wallet_at(&args, "admin-b");

        init(
            &args,
            &authority,
            255,
            None,
            &[admin_a.public_key.clone(), admin_b.public_key.clone()],
            2,
        )
        .unwrap();
        submit(&args, &admin_a_path, VaultInstruction::ApproveMint).unwrap();
        submit(&args, &admin_b_path, VaultInstruction::ApproveMint).unwrap();

        // a directory where the snapshot staging file goes makes the commit fail
        let blocker = args.data_dir.join("ledger_state.bin.tmp");
        fs::create_dir(&blocker).unwrap();
        let err = submit(&args, &authority, eligible_batch()).unwrap_err();
        assert!(format!("{err:#}").contains("ledger_state.bin.tmp"));
        assert!(outbox_lines(&args).is_empty());

        fs::remove_dir(&blocker).unwrap();
        let receipt = submit(&args, &authority, eligible_batch()).unwrap();
        let TxReceipt::BatchProcessed(batch) = receipt else {
            panic!("expected a batch receipt");
        };
        assert_eq!(batch.messages.len(), 1);

        let lines = outbox_lines(&args);
        assert_eq!(lines.len(), 1);
        let record: outbox::OutboxRecord = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(record.sequence, 0);
        assert_eq!(
            hex::decode(&record.payload).unwrap(),
            batch.messages[0].payload.as_bytes().to_vec()
        );

        let state = open_store(&args.data_dir).unwrap().load_state().unwrap();
        assert_eq!(state.message_sequence, 1);
        assert_eq!(state.vault.unwrap().amount, 1000);

        fs::remove_dir_all(&args.data_dir).unwrap();
    }
}
