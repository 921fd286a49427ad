//! Mint quorum gate.
//!
//! A raw approval counter on the vault. The same admin approving twice
//! counts twice; the counter only drops when a batch consumes it.

use ecovault_types::Vault;

use crate::config::GovernanceConfig;
use crate::error::RewardError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Unapproved,
    Approved,
}

pub fn gate_state(vault: &Vault, config: &GovernanceConfig) -> GateState {
    if vault.admin_approvals >= config.quorum {
        GateState::Approved
    } else {
        GateState::Unapproved
    }
}

/// Records one approval and returns the new count.
pub fn approve(
    vault: &mut Vault,
    admin: &[u8; 32],
    config: &GovernanceConfig,
) -> Result<u8, RewardError> {
    if !config.is_admin(admin) {
        return Err(RewardError::UnauthorizedAdmin);
    }
    vault.admin_approvals = vault
        .admin_approvals
        .checked_add(1)
        .ok_or(RewardError::ArithmeticOverflow)?;
    Ok(vault.admin_approvals)
}

pub fn require_quorum(vault: &Vault, config: &GovernanceConfig) -> Result<(), RewardError> {
    match gate_state(vault, config) {
        GateState::Approved => Ok(()),
        GateState::Unapproved => Err(RewardError::InsufficientApprovals {
            have: vault.admin_approvals,
            need: config.quorum,
        }),
    }
}

pub fn consume(vault: &mut Vault) {
    vault.admin_approvals = 0;
}
