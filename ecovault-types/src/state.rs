use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::deposit::EsgMetrics;
use crate::instruction::TokenKind;
use crate::reward::ComplianceScore;

/// Account discriminator prefixed to the serialized vault record.
pub const VAULT_DISCRIMINATOR: [u8; 8] = *b"ecovault";

/// Serialized vault length: discriminator, authority, amount, approvals, bump.
pub const VAULT_RECORD_LEN: usize = 8 + 32 + 8 + 1 + 1;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("vault record must be {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },
    #[error("vault record discriminator mismatch")]
    Discriminator,
}

/// Deployment singleton guarding issuance.
///
/// The on-ledger byte layout produced by [`Vault::to_bytes`] is frozen;
/// changing it requires an explicit migration.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Vault {
    pub authority: [u8; 32],
    /// Running total of processed deposit amounts.
    pub amount: u64,
    pub admin_approvals: u8,
    pub bump: u8,
}

impl Vault {
    pub fn new(authority: [u8; 32], bump: u8) -> Self {
        Self {
            authority,
            amount: 0,
            admin_approvals: 0,
            bump,
        }
    }

    pub fn to_bytes(&self) -> [u8; VAULT_RECORD_LEN] {
        let mut out = [0u8; VAULT_RECORD_LEN];
        out[0..8].copy_from_slice(&VAULT_DISCRIMINATOR);
        out[8..40].copy_from_slice(&self.authority);
        out[40..48].copy_from_slice(&self.amount.to_le_bytes());
        out[48] = self.admin_approvals;
        out[49] = self.bump;
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LayoutError> {
        if bytes.len() != VAULT_RECORD_LEN {
            return Err(LayoutError::Length {
                expected: VAULT_RECORD_LEN,
                actual: bytes.len(),
            });
        }
        if bytes[0..8] != VAULT_DISCRIMINATOR {
            return Err(LayoutError::Discriminator);
        }
        let mut authority = [0u8; 32];
        authority.copy_from_slice(&bytes[8..40]);
        let mut amount = [0u8; 8];
        amount.copy_from_slice(&bytes[40..48]);
        Ok(Self {
            authority,
            amount: u64::from_le_bytes(amount),
            admin_approvals: bytes[48],
            bump: bytes[49],
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenAccount {
    pub kind: TokenKind,
    pub balance: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenSupply {
    pub ply: u64,
    pub carb: u64,
    pub ewaste: u64,
}

impl TokenSupply {
    pub fn get(&self, kind: TokenKind) -> u64 {
        match kind {
            TokenKind::Ply => self.ply,
            TokenKind::Carb => self.carb,
            TokenKind::Ewaste => self.ewaste,
        }
    }

    pub fn get_mut(&mut self, kind: TokenKind) -> &mut u64 {
        match kind {
            TokenKind::Ply => &mut self.ply,
            TokenKind::Carb => &mut self.carb,
            TokenKind::Ewaste => &mut self.ewaste,
        }
    }
}

/// Non-fungible compliance credential.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credential {
    pub owner: [u8; 32],
    pub compliance_score: ComplianceScore,
    pub esg_metrics: EsgMetrics,
    /// Block height of the issuing batch.
    pub minted_at: u64,
    /// Unix time of the issuing batch.
    pub issued_at: u64,
}

/// Every account the engine reads or writes, owned by the host.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct LedgerState {
    pub vault: Option<Vault>,
    pub token_accounts: BTreeMap<[u8; 32], TokenAccount>,
    pub supply: TokenSupply,
    pub credentials: BTreeMap<[u8; 32], Credential>,
    pub nonces: BTreeMap<[u8; 32], u64>,
    /// Sequence of the next credential / outbound message.
    pub message_sequence: u64,
}

impl LedgerState {
    pub fn root_hash(&self) -> [u8; 32] {
        let encoded = bincode::serialize(self).expect("ledger state serialization");
        *blake3::hash(&encoded).as_bytes()
    }

    pub fn balance_of(&self, account: &[u8; 32]) -> u64 {
        self.token_accounts
            .get(account)
            .map(|acct| acct.balance)
            .unwrap_or(0)
    }
}
