pub mod deposit;
pub mod instruction;
pub mod reward;
pub mod state;
pub mod transaction;

pub use deposit::{Deposit, EsgMetrics, Telemetry, TenantPolicy};
pub use instruction::{TokenKind, VaultInstruction};
pub use reward::{ComplianceScore, RewardOutcome};
pub use state::{LedgerState, Vault};
pub use transaction::Transaction;

/// Fixed-point denominator: 1.0 is represented as `SCALE`.
pub const SCALE: u64 = 1_000_000;
