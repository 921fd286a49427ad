use serde::{Deserialize, Serialize};

use crate::batch::BatchPolicy;
use crate::budget::{StageCost, DEFAULT_COMPUTE_LIMIT};
use crate::error::RewardError;
use crate::fixed_point::SCALE;
use crate::rewards::{BaseRates, RewardFormula, TierSchedule};
use crate::scoring::ScoringWeights;

/// Deployment-wide reward policy. Every field has a canonical default, so a
/// partial JSON document overrides only what it names.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RewardPolicy {
    pub weights: ScoringWeights,
    pub base_rates: BaseRates,
    pub formula: RewardFormula,
    pub tiers: TierSchedule,
    /// Minimum score (inclusive) for a credential NFT.
    pub nft_threshold: u64,
    /// Treat an ineligible score as a per-deposit error instead of a
    /// tokens-only outcome.
    pub reject_ineligible: bool,
    pub batch_policy: BatchPolicy,
    pub compute_limit: u64,
    pub costs: StageCost,
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            base_rates: BaseRates::default(),
            formula: RewardFormula::default(),
            tiers: TierSchedule::default(),
            nft_threshold: SCALE / 2,
            reject_ineligible: false,
            batch_policy: BatchPolicy::default(),
            compute_limit: DEFAULT_COMPUTE_LIMIT,
            costs: StageCost::default(),
        }
    }
}

impl RewardPolicy {
    pub fn validate(&self) -> Result<(), RewardError> {
        self.weights.validate()?;
        self.tiers.validate()?;
        if self.nft_threshold > SCALE {
            return Err(RewardError::InvalidPolicy(format!(
                "nft_threshold {} exceeds {SCALE}",
                self.nft_threshold
            )));
        }
        if self.compute_limit < self.costs.batch_overhead {
            return Err(RewardError::InvalidPolicy(format!(
                "compute_limit {} cannot cover batch overhead {}",
                self.compute_limit, self.costs.batch_overhead
            )));
        }
        Ok(())
    }
}

/// Who may approve mints, and how many approvals a batch needs.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct GovernanceConfig {
    /// Admin public keys, hex in JSON.
    #[serde(with = "hex_keys")]
    pub admins: Vec<[u8; 32]>,
    pub quorum: u8,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            admins: Vec::new(),
            quorum: 2,
        }
    }
}

impl GovernanceConfig {
    pub fn new(admins: Vec<[u8; 32]>, quorum: u8) -> Self {
        Self { admins, quorum }
    }

    pub fn is_admin(&self, who: &[u8; 32]) -> bool {
        self.admins.contains(who)
    }

    pub fn validate(&self) -> Result<(), RewardError> {
        if self.quorum == 0 {
            return Err(RewardError::InvalidPolicy("quorum must be at least 1".into()));
        }
        Ok(())
    }
}

mod hex_keys {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(keys: &[[u8; 32]], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(keys.iter().map(hex::encode))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<[u8; 32]>, D::Error> {
        Vec::<String>::deserialize(d)?
            .iter()
            .map(|key| {
                let mut out = [0u8; 32];
                hex::decode_to_slice(key.trim_start_matches("0x"), &mut out)
                    .map_err(|e| D::Error::custom(format!("admin key {key}: {e}")))?;
                Ok(out)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(RewardPolicy::default().validate().is_ok());
        assert_eq!(GovernanceConfig::default().quorum, 2);
        assert!(GovernanceConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_overrides_only_named_fields() {
        let policy: RewardPolicy =
            serde_json::from_str(r#"{"formula": "tiered", "base_rates": {"ply": 12}}"#).unwrap();
        assert_eq!(policy.formula, RewardFormula::Tiered);
        assert_eq!(policy.base_rates.ply, 12);
        assert_eq!(policy.base_rates.carb, 5);
        assert_eq!(policy.nft_threshold, 500_000);
        assert_eq!(policy.compute_limit, 1_400_000);
    }

    #[test]
    fn threshold_above_scale_is_rejected() {
        let policy = RewardPolicy {
            nft_threshold: SCALE + 1,
            ..Default::default()
        };
        assert!(matches!(policy.validate(), Err(RewardError::InvalidPolicy(_))));
    }

    #[test]
    fn admin_keys_are_hex_in_json() {
        let cfg: GovernanceConfig =
            serde_json::from_str(&format!(r#"{{"admins": ["{}"]}}"#, "ab".repeat(32))).unwrap();
        assert_eq!(cfg.admins, vec![[0xAB; 32]]);
        assert_eq!(cfg.quorum, 2);
        let json = serde_json::to_value(&cfg).unwrap();
        assert_eq!(json["admins"][0], "ab".repeat(32));
        assert!(serde_json::from_str::<GovernanceConfig>(r#"{"admins": ["zz"]}"#).is_err());
    }

    #[test]
    fn zero_quorum_is_rejected() {
        assert!(GovernanceConfig::new(vec![[1; 32]], 0).validate().is_err());
    }
}
