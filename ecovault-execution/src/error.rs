use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validation::ViolationMask;

/// Stable, serializable error discriminant used in audit records.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidAmount,
    InvalidTelemetry,
    InvalidEsgMetrics,
    InvalidPolicy,
    ArithmeticOverflow,
    InsufficientApprovals,
    LowComplianceScore,
    EncodingFault,
    UnauthorizedAdmin,
    UnauthorizedAuthority,
    VaultNotInitialized,
    VaultAlreadyInitialized,
    MissingDestinations,
    DestinationKindMismatch,
    ComputeBudgetExceeded,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RewardError {
    #[error("deposit amount {amount} outside (0, 1000000]")]
    InvalidAmount { amount: u64 },
    #[error("telemetry outside tenant bounds: {violations}")]
    InvalidTelemetry { violations: ViolationMask },
    #[error("invalid ESG metrics: {violations}")]
    InvalidEsgMetrics { violations: ViolationMask },
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),
    #[error("arithmetic overflow")]
    ArithmeticOverflow,
    #[error("insufficient approvals: have {have}, need {need}")]
    InsufficientApprovals { have: u8, need: u8 },
    #[error("compliance score {score} below NFT threshold {threshold}")]
    LowComplianceScore { score: u64, threshold: u64 },
    #[error("bridge rejected payload: {0}")]
    EncodingFault(String),
    #[error("signer is not an authorized admin")]
    UnauthorizedAdmin,
    #[error("signer is not the vault authority")]
    UnauthorizedAuthority,
    #[error("vault not initialized")]
    VaultNotInitialized,
    #[error("vault already initialized")]
    VaultAlreadyInitialized,
    #[error("deposit {index} has no complete destination triple")]
    MissingDestinations { index: usize },
    #[error("destination {account} already holds a different token kind")]
    DestinationKindMismatch { account: String },
    #[error("compute budget exceeded: {used} > {limit}")]
    ComputeBudgetExceeded { used: u64, limit: u64 },
}

impl RewardError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAmount { .. } => ErrorKind::InvalidAmount,
            Self::InvalidTelemetry { .. } => ErrorKind::InvalidTelemetry,
            Self::InvalidEsgMetrics { .. } => ErrorKind::InvalidEsgMetrics,
            Self::InvalidPolicy(_) => ErrorKind::InvalidPolicy,
            Self::ArithmeticOverflow => ErrorKind::ArithmeticOverflow,
            Self::InsufficientApprovals { .. } => ErrorKind::InsufficientApprovals,
            Self::LowComplianceScore { .. } => ErrorKind::LowComplianceScore,
            Self::EncodingFault(_) => ErrorKind::EncodingFault,
            Self::UnauthorizedAdmin => ErrorKind::UnauthorizedAdmin,
            Self::UnauthorizedAuthority => ErrorKind::UnauthorizedAuthority,
            Self::VaultNotInitialized => ErrorKind::VaultNotInitialized,
            Self::VaultAlreadyInitialized => ErrorKind::VaultAlreadyInitialized,
            Self::MissingDestinations { .. } => ErrorKind::MissingDestinations,
            Self::DestinationKindMismatch { .. } => ErrorKind::DestinationKindMismatch,
            Self::ComputeBudgetExceeded { .. } => ErrorKind::ComputeBudgetExceeded,
        }
    }

    /// Validation mask carried by the error, if any.
    pub fn violations(&self) -> Option<ViolationMask> {
        match self {
            Self::InvalidTelemetry { violations } | Self::InvalidEsgMetrics { violations } => {
                Some(*violations)
            }
            _ => None,
        }
    }
}

/// A batch that did not commit. `index` names the deposit that caused the
/// abort, or `None` when the batch failed before or after the item loop.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("batch aborted (deposit {index:?}): {source}")]
pub struct BatchError {
    pub index: Option<usize>,
    pub source: RewardError,
}

impl BatchError {
    pub fn whole(source: RewardError) -> Self {
        Self {
            index: None,
            source,
        }
    }

    pub fn at(index: usize, source: RewardError) -> Self {
        Self {
            index: Some(index),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}
