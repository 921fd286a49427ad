use anyhow::{Context, Result};
use ecovault_execution::{GovernanceConfig, RewardPolicy};
use ecovault_types::{LedgerState, Vault};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything fixed at deployment: reward policy and the admin set.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct DeploymentConfig {
    pub policy: RewardPolicy,
    pub governance: GovernanceConfig,
}

impl DeploymentConfig {
    pub fn validate(&self) -> Result<()> {
        self.policy.validate().context("reward policy")?;
        self.governance.validate().context("governance config")?;
        if self.governance.admins.len() < usize::from(self.governance.quorum) {
            tracing::warn!(
                admins = self.governance.admins.len(),
                quorum = self.governance.quorum,
                "fewer admins than quorum; approvals will need repeat signatures"
            );
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
    }
}

/// Ledger with the vault initialized and nothing issued yet.
pub fn create_genesis_state(authority: [u8; 32], bump: u8) -> LedgerState {
    LedgerState {
        vault: Some(Vault::new(authority, bump)),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_vault_starts_empty() {
        let state = create_genesis_state([4; 32], 255);
        let vault = state.vault.unwrap();
        assert_eq!(vault.authority, [4; 32]);
        assert_eq!(vault.amount, 0);
        assert_eq!(vault.admin_approvals, 0);
        assert!(state.token_accounts.is_empty());
        assert_eq!(state.message_sequence, 0);
    }

    #[test]
    fn deployment_config_round_trips_through_disk() {
        let config = DeploymentConfig {
            governance: GovernanceConfig::new(vec![[1; 32], [2; 32]], 2),
            ..Default::default()
        };
        let path = std::env::temp_dir().join(format!("ecovault-deploy-{}.json", std::process::id()));
        config.save(&path).unwrap();
        assert_eq!(DeploymentConfig::load(&path).unwrap(), config);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn invalid_policy_is_refused() {
        let mut config = DeploymentConfig::default();
        config.policy.weights.esg = 0;
        assert!(config.validate().is_err());
    }
}
