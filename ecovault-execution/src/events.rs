//! Audit records handed to the persistence collaborator.
//!
//! Field names and types are part of the analytics contract.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ErrorKind, RewardError};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    DepositRejected {
        index: usize,
        kind: ErrorKind,
        /// Raw validation mask, when the rejection came from validation.
        violations: Option<u8>,
        reason: String,
    },
    RewardsMinted {
        index: usize,
        depositor: String,
        amount: u64,
        compliance_score: u64,
        ply: u64,
        carb: u64,
        ewaste: u64,
    },
    CredentialMinted {
        index: usize,
        asset_id: String,
        owner: String,
        compliance_score: u64,
    },
    BridgeSubmitted {
        index: usize,
        asset_id: String,
        sequence: u64,
        target_chain: u16,
    },
    ApprovalRecorded {
        admin: String,
        approvals: u8,
    },
    BatchCommitted {
        deposits: usize,
        rejected: usize,
        total_amount: u64,
        compute_units: u64,
    },
}

impl AuditEvent {
    pub fn rejected(index: usize, error: &RewardError) -> Self {
        Self::DepositRejected {
            index,
            kind: error.kind(),
            violations: error.violations().map(|mask| mask.bits()),
            reason: error.to_string(),
        }
    }

    /// Emits the record through `tracing`.
    pub fn log(&self) {
        match self {
            Self::DepositRejected { index, kind, reason, .. } => {
                warn!(index, ?kind, %reason, "deposit rejected");
            }
            Self::RewardsMinted { index, ply, carb, ewaste, compliance_score, .. } => {
                info!(index, ply, carb, ewaste, compliance_score, "rewards minted");
            }
            Self::CredentialMinted { index, asset_id, .. } => {
                info!(index, %asset_id, "credential minted");
            }
            Self::BridgeSubmitted { index, sequence, target_chain, .. } => {
                info!(index, sequence, target_chain, "payload submitted to bridge");
            }
            Self::ApprovalRecorded { admin, approvals } => {
                info!(%admin, approvals, "mint approval recorded");
            }
            Self::BatchCommitted { deposits, rejected, total_amount, compute_units } => {
                info!(deposits, rejected, total_amount, compute_units, "batch committed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ViolationMask;

    #[test]
    fn rejection_record_carries_mask_and_kind() {
        let err = RewardError::InvalidTelemetry {
            violations: ViolationMask::from_bits(ViolationMask::HUMIDITY),
        };
        let event = AuditEvent::rejected(4, &err);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "deposit_rejected");
        assert_eq!(json["index"], 4);
        assert_eq!(json["kind"], "InvalidTelemetry");
        assert_eq!(json["violations"], 8);
    }
}
