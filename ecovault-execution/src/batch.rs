//! Batch orchestration: quorum check, then validate → score → reward → mint
//! for each deposit in input order, then publish and commit.
//!
//! All work happens on a staged copy of the ledger. The caller's state is
//! replaced only after every staged message has been published, so a batch
//! either commits entirely or leaves the ledger untouched.

use ecovault_types::state::{Credential, TokenAccount, TokenSupply};
use ecovault_types::{ComplianceScore, Deposit, LedgerState, RewardOutcome, TokenKind, Vault};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::budget::{ComputeMeter, Stage};
use crate::error::{BatchError, RewardError};
use crate::events::AuditEvent;
use crate::fixed_point::checked_add;
use crate::governance;
use crate::message::{derive_asset_id, encode_payload, OutboundMessage};
use crate::rewards::calculate_rewards;
use crate::scoring::compliance_score;
use crate::validation::validate_deposit;
use crate::ExecutionContext;

/// What a per-deposit failure does to the rest of the batch.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BatchPolicy {
    /// First failing deposit aborts the batch with no side effects.
    #[default]
    AbortOnFirstFailure,
    /// Failing deposits are reported and skipped; the rest commit.
    SkipAndContinue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardedItem {
    pub index: usize,
    pub score: ComplianceScore,
    pub rewards: RewardOutcome,
    /// Asset id of the credential, for NFT-eligible deposits.
    pub credential: Option<[u8; 32]>,
    pub bridge_sequence: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Rewarded(RewardedItem),
    Rejected { index: usize, error: RewardError },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReceipt {
    pub outcomes: Vec<ItemOutcome>,
    pub total_amount: u64,
    pub compute_units: u64,
    pub events: Vec<AuditEvent>,
    pub messages: Vec<OutboundMessage>,
}

impl BatchReceipt {
    pub fn rewarded(&self) -> impl Iterator<Item = &RewardedItem> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            ItemOutcome::Rewarded(item) => Some(item),
            ItemOutcome::Rejected { .. } => None,
        })
    }

    pub fn rejected_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, ItemOutcome::Rejected { .. }))
            .count()
    }
}

/// Destination accounts for deposit `index`: slots `3i`, `3i+1`, `3i+2`.
pub fn destination_triple(
    destinations: &[[u8; 32]],
    index: usize,
) -> Result<[[u8; 32]; 3], RewardError> {
    let missing = RewardError::MissingDestinations { index };
    let start = index.checked_mul(3).ok_or_else(|| missing.clone())?;
    match destinations.get(start..start + 3) {
        Some([ply, carb, ewaste]) => Ok([*ply, *carb, *ewaste]),
        _ => Err(missing),
    }
}

/// Everything one deposit changes, computed before anything is written.
struct ItemPlan {
    item: RewardedItem,
    amount: u64,
    vault_amount: u64,
    credits: [([u8; 32], TokenAccount); 3],
    supply: TokenSupply,
    credential: Option<([u8; 32], Credential)>,
    message: Option<OutboundMessage>,
    events: Vec<AuditEvent>,
}

pub fn process_batch(
    ctx: &mut ExecutionContext<'_>,
    deposits: &[Deposit],
    destinations: &[[u8; 32]],
) -> Result<BatchReceipt, BatchError> {
    let policy = ctx.policy;
    policy.validate().map_err(BatchError::whole)?;
    ctx.governance.validate().map_err(BatchError::whole)?;

    let mut meter = ComputeMeter::new(policy.costs, policy.compute_limit);
    meter
        .charge(Stage::BatchOverhead)
        .map_err(BatchError::whole)?;

    let vault = ctx
        .state
        .vault
        .ok_or(BatchError::whole(RewardError::VaultNotInitialized))?;
    governance::require_quorum(&vault, ctx.governance).map_err(BatchError::whole)?;

    let mut staged = ctx.state.clone();
    let mut outcomes = Vec::with_capacity(deposits.len());
    let mut events = Vec::new();
    let mut pending: Vec<(usize, OutboundMessage)> = Vec::new();
    let mut total_amount = 0u64;

    for (index, deposit) in deposits.iter().enumerate() {
        let planned = plan_item(&staged, &mut meter, ctx, index, deposit, destinations);
        let plan = match planned {
            Ok(plan) => plan,
            Err(error) => {
                let fatal = matches!(error, RewardError::ComputeBudgetExceeded { .. })
                    || policy.batch_policy == BatchPolicy::AbortOnFirstFailure;
                if fatal {
                    warn!(index, %error, "batch aborted");
                    return Err(BatchError::at(index, error));
                }
                let event = AuditEvent::rejected(index, &error);
                event.log();
                events.push(event);
                outcomes.push(ItemOutcome::Rejected { index, error });
                continue;
            }
        };

        total_amount =
            checked_add(total_amount, plan.amount).map_err(|e| BatchError::at(index, e))?;
        if let Some(message) = plan.message {
            pending.push((index, message));
        }
        events.extend(plan.events.iter().cloned());
        outcomes.push(ItemOutcome::Rewarded(plan.item.clone()));
        apply_item(&mut staged, plan);
    }

    let messages: Vec<OutboundMessage> = pending.iter().map(|(_, msg)| *msg).collect();
    let sequences = ctx
        .bridge
        .publish_all(&messages)
        .map_err(|e| BatchError::whole(RewardError::EncodingFault(e.to_string())))?;

    for ((index, message), sequence) in pending.iter().zip(sequences) {
        // one outcome per deposit, in input order
        let Some(ItemOutcome::Rewarded(item)) = outcomes.get_mut(*index) else {
            continue;
        };
        item.bridge_sequence = Some(sequence);
        events.push(AuditEvent::BridgeSubmitted {
            index: *index,
            asset_id: hex::encode(item.credential.unwrap_or_default()),
            sequence,
            target_chain: message.target_chain,
        });
    }

    if let Some(vault) = staged.vault.as_mut() {
        governance::consume(vault);
    }

    let rejected = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, ItemOutcome::Rejected { .. }))
        .count();
    events.push(AuditEvent::BatchCommitted {
        deposits: deposits.len(),
        rejected,
        total_amount,
        compute_units: meter.used(),
    });
    // rejections were logged as they happened
    for event in events
        .iter()
        .filter(|event| !matches!(event, AuditEvent::DepositRejected { .. }))
    {
        event.log();
    }

    *ctx.state = staged;
    Ok(BatchReceipt {
        outcomes,
        total_amount,
        compute_units: meter.used(),
        events,
        messages,
    })
}

fn plan_item(
    staged: &LedgerState,
    meter: &mut ComputeMeter,
    ctx: &ExecutionContext<'_>,
    index: usize,
    deposit: &Deposit,
    destinations: &[[u8; 32]],
) -> Result<ItemPlan, RewardError> {
    let policy = ctx.policy;
    let vault: Vault = staged.vault.ok_or(RewardError::VaultNotInitialized)?;

    meter.charge(Stage::Validate)?;
    validate_deposit(deposit)?;
    let accounts = destination_triple(destinations, index)?;

    meter.charge(Stage::Score)?;
    let score = compliance_score(deposit, &policy.weights)?;

    meter.charge(Stage::Reward)?;
    let rewards = calculate_rewards(deposit, score, policy)?;
    if policy.reject_ineligible && !rewards.nft_eligible {
        return Err(RewardError::LowComplianceScore {
            score: score.get(),
            threshold: policy.nft_threshold,
        });
    }

    meter.charge(Stage::Mint)?;
    let quantities = [rewards.ply, rewards.carb, rewards.ewaste];
    let mut supply = staged.supply;
    let mut credits = [([0u8; 32], TokenAccount { kind: TokenKind::Ply, balance: 0 }); 3];
    for (slot, kind) in TokenKind::ORDER.into_iter().enumerate() {
        let account = accounts[slot];
        if accounts[..slot].contains(&account) {
            return Err(kind_mismatch(&account));
        }
        let balance = match staged.token_accounts.get(&account) {
            Some(existing) if existing.kind != kind => return Err(kind_mismatch(&account)),
            Some(existing) => existing.balance,
            None => 0,
        };
        let balance = checked_add(balance, quantities[slot])?;
        *supply.get_mut(kind) = checked_add(supply.get(kind), quantities[slot])?;
        credits[slot] = (account, TokenAccount { kind, balance });
    }
    let vault_amount = checked_add(vault.amount, deposit.amount)?;

    let mut events = vec![AuditEvent::RewardsMinted {
        index,
        depositor: hex::encode(deposit.depositor),
        amount: deposit.amount,
        compliance_score: score.get(),
        ply: rewards.ply,
        carb: rewards.carb,
        ewaste: rewards.ewaste,
    }];

    let mut credential = None;
    let mut message = None;
    if rewards.nft_eligible {
        meter.charge(Stage::Credential)?;
        let sequence = staged.message_sequence;
        let asset_id = derive_asset_id(&vault.authority, sequence);
        credential = Some((
            asset_id,
            Credential {
                owner: deposit.depositor,
                compliance_score: score,
                esg_metrics: deposit.esg_metrics,
                minted_at: ctx.height,
                issued_at: ctx.timestamp,
            },
        ));
        events.push(AuditEvent::CredentialMinted {
            index,
            asset_id: hex::encode(asset_id),
            owner: hex::encode(deposit.depositor),
            compliance_score: score.get(),
        });

        meter.charge(Stage::Encode)?;
        let payload = encode_payload(&asset_id, &deposit.depositor, &deposit.esg_metrics);
        meter.charge(Stage::Publish)?;
        message = Some(OutboundMessage {
            target_chain: deposit.target_chain,
            // The nonce is a batching tag, not an identifier; truncation is fine.
            nonce: sequence as u32,
            payload,
        });
    }

    Ok(ItemPlan {
        item: RewardedItem {
            index,
            score,
            rewards,
            credential: credential.map(|(asset_id, _)| asset_id),
            bridge_sequence: None,
        },
        amount: deposit.amount,
        vault_amount,
        credits,
        supply,
        credential,
        message,
        events,
    })
}

fn apply_item(staged: &mut LedgerState, plan: ItemPlan) {
    for (account, token_account) in plan.credits {
        staged.token_accounts.insert(account, token_account);
    }
    staged.supply = plan.supply;
    if let Some(vault) = staged.vault.as_mut() {
        vault.amount = plan.vault_amount;
    }
    if let Some((asset_id, credential)) = plan.credential {
        staged.credentials.insert(asset_id, credential);
        staged.message_sequence += 1;
    }
}

fn kind_mismatch(account: &[u8; 32]) -> RewardError {
    RewardError::DestinationKindMismatch {
        account: hex::encode(account),
    }
}
