pub mod batch;
pub mod bridge;
pub mod budget;
pub mod config;
pub mod error;
pub mod events;
pub mod fixed_point;
pub mod governance;
pub mod message;
pub mod rewards;
pub mod scoring;
pub mod validation;

use anyhow::{bail, Context, Result};
use ecovault_types::transaction::Transaction;
use ecovault_types::{LedgerState, Vault, VaultInstruction};

pub use batch::{process_batch, BatchPolicy, BatchReceipt, ItemOutcome, RewardedItem};
pub use bridge::{BridgeError, MemoryBridge, MessageBridge};
pub use config::{GovernanceConfig, RewardPolicy};
pub use error::{BatchError, ErrorKind, RewardError};
pub use events::AuditEvent;

pub struct ExecutionContext<'a> {
    pub state: &'a mut LedgerState,
    pub policy: &'a RewardPolicy,
    pub governance: &'a GovernanceConfig,
    pub bridge: &'a mut dyn MessageBridge,
    pub height: u64,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxReceipt {
    VaultInitialized { authority: [u8; 32] },
    ApprovalRecorded { approvals: u8, event: AuditEvent },
    BatchProcessed(BatchReceipt),
}

impl TxReceipt {
    pub fn events(&self) -> Vec<AuditEvent> {
        match self {
            Self::VaultInitialized { .. } => Vec::new(),
            Self::ApprovalRecorded { event, .. } => vec![event.clone()],
            Self::BatchProcessed(receipt) => receipt.events.clone(),
        }
    }
}

/// Verifies, sequences and runs one signed transaction.
///
/// State (including the signer's nonce) changes only if the instruction
/// succeeds.
pub fn execute_transaction(tx: &Transaction, ctx: &mut ExecutionContext) -> Result<TxReceipt> {
    ecovault_crypto::verify_signature(&tx.signer, &tx.signing_bytes(), &tx.signature)
        .context("transaction signature")?;

    let expected = ctx.state.nonces.get(&tx.signer).copied().unwrap_or(0);
    if tx.nonce != expected {
        bail!("Invalid nonce: expected {}, got {}", expected, tx.nonce);
    }

    let receipt = execute_instruction(&tx.instruction, &tx.signer, ctx)?;
    ctx.state.nonces.insert(tx.signer, expected + 1);
    Ok(receipt)
}

pub fn execute_instruction(
    instruction: &VaultInstruction,
    signer: &[u8; 32],
    ctx: &mut ExecutionContext,
) -> Result<TxReceipt> {
    match instruction {
        VaultInstruction::InitializeVault { bump } => {
            if ctx.state.vault.is_some() {
                return Err(RewardError::VaultAlreadyInitialized.into());
            }
            ctx.state.vault = Some(Vault::new(*signer, *bump));
            tracing::info!(authority = %hex::encode(signer), bump, "vault initialized");
            Ok(TxReceipt::VaultInitialized { authority: *signer })
        }
        VaultInstruction::ApproveMint => {
            let mut vault = ctx.state.vault.ok_or(RewardError::VaultNotInitialized)?;
            let approvals = governance::approve(&mut vault, signer, ctx.governance)?;
            ctx.state.vault = Some(vault);
            let event = AuditEvent::ApprovalRecorded {
                admin: hex::encode(signer),
                approvals,
            };
            event.log();
            Ok(TxReceipt::ApprovalRecorded { approvals, event })
        }
        VaultInstruction::ProcessBatch {
            deposits,
            destinations,
        } => {
            let vault = ctx.state.vault.ok_or(RewardError::VaultNotInitialized)?;
            if vault.authority != *signer {
                return Err(RewardError::UnauthorizedAuthority.into());
            }
            let receipt = process_batch(ctx, deposits, destinations)?;
            Ok(TxReceipt::BatchProcessed(receipt))
        }
    }
}
