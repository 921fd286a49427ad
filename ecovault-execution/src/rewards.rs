use ecovault_types::{ComplianceScore, Deposit, RewardOutcome};
use serde::{Deserialize, Serialize};

use crate::config::RewardPolicy;
use crate::error::RewardError;
use crate::fixed_point::{product_div, SCALE};

/// Whole-token base issuance per unit of deposit, per token kind.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct BaseRates {
    pub ply: u64,
    pub carb: u64,
    pub ewaste: u64,
}

impl Default for BaseRates {
    fn default() -> Self {
        Self {
            ply: 10,
            carb: 5,
            ewaste: 2,
        }
    }
}

/// Which factor scales rewards by compliance. One formula per deployment.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RewardFormula {
    /// `amount * base * multiplier * score / SCALE^2`
    #[default]
    Continuous,
    /// Same shape, with the score replaced by its tier factor.
    Tiered,
}

/// Step function over the compliance score. Factors are over `SCALE`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct TierSchedule {
    pub full_threshold: u64,
    pub partial_threshold: u64,
    pub full_factor: u64,
    pub partial_factor: u64,
    pub floor_factor: u64,
}

impl Default for TierSchedule {
    fn default() -> Self {
        Self {
            full_threshold: 800_000,
            partial_threshold: 500_000,
            full_factor: SCALE,
            partial_factor: 700_000,
            floor_factor: 400_000,
        }
    }
}

impl TierSchedule {
    pub fn validate(&self) -> Result<(), RewardError> {
        let ordered = self.partial_threshold <= self.full_threshold
            && self.full_threshold <= SCALE
            && self.floor_factor <= self.partial_factor
            && self.partial_factor <= self.full_factor;
        if ordered {
            Ok(())
        } else {
            Err(RewardError::InvalidPolicy(format!(
                "tier schedule must be non-decreasing: {self:?}"
            )))
        }
    }
}

pub fn tier_multiplier(score: ComplianceScore, tiers: &TierSchedule) -> u64 {
    if score.get() >= tiers.full_threshold {
        tiers.full_factor
    } else if score.get() >= tiers.partial_threshold {
        tiers.partial_factor
    } else {
        tiers.floor_factor
    }
}

/// Inclusive: a score exactly at the threshold is eligible.
pub fn is_nft_eligible(score: ComplianceScore, threshold: u64) -> bool {
    score.get() >= threshold
}

pub fn calculate_rewards(
    deposit: &Deposit,
    score: ComplianceScore,
    policy: &RewardPolicy,
) -> Result<RewardOutcome, RewardError> {
    let factor = match policy.formula {
        RewardFormula::Continuous => score.get(),
        RewardFormula::Tiered => tier_multiplier(score, &policy.tiers),
    };
    let rates = &policy.base_rates;
    let p = &deposit.policy;

    Ok(RewardOutcome {
        ply: quantity(deposit.amount, rates.ply, p.ply_multiplier, factor)?,
        carb: quantity(deposit.amount, rates.carb, p.carb_multiplier, factor)?,
        ewaste: quantity(deposit.amount, rates.ewaste, p.ewaste_multiplier, factor)?,
        nft_eligible: is_nft_eligible(score, policy.nft_threshold),
    })
}

fn quantity(amount: u64, base_rate: u64, multiplier: u64, factor: u64) -> Result<u64, RewardError> {
    const SCALE_SQUARED: u128 = SCALE as u128 * SCALE as u128;
    product_div(&[amount, base_rate, multiplier, factor], SCALE_SQUARED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecovault_types::{EsgMetrics, Telemetry, TenantPolicy};

    fn deposit(amount: u64) -> Deposit {
        Deposit {
            depositor: [2; 32],
            target_chain: 0,
            amount,
            telemetry: Telemetry::default(),
            esg_metrics: EsgMetrics {
                carbon_offset: 50,
                recyclability: 8000,
            },
            policy: TenantPolicy::default(),
        }
    }

    #[test]
    fn continuous_formula_matches_hand_computation() {
        let policy = RewardPolicy::default();
        let outcome =
            calculate_rewards(&deposit(1000), ComplianceScore::new(735_000), &policy).unwrap();
        assert_eq!(outcome.ply, 7350);
        assert_eq!(outcome.carb, 3675);
        assert_eq!(outcome.ewaste, 1470);
        assert!(outcome.nft_eligible);
    }

    #[test]
    fn continuous_formula_scales_to_zero() {
        let outcome =
            calculate_rewards(&deposit(1000), ComplianceScore::ZERO, &RewardPolicy::default())
                .unwrap();
        assert_eq!(outcome.total(), 0);
        assert!(!outcome.nft_eligible);
    }

    #[test]
    fn per_tenant_multipliers_apply() {
        let mut d = deposit(1000);
        d.policy.carb_multiplier = 1_500_000;
        let outcome = calculate_rewards(&d, ComplianceScore::MAX, &RewardPolicy::default()).unwrap();
        assert_eq!(outcome.ply, 10_000);
        assert_eq!(outcome.carb, 7_500);
    }

    #[test]
    fn nft_threshold_is_inclusive() {
        let policy = RewardPolicy::default();
        let below = calculate_rewards(&deposit(10), ComplianceScore::new(SCALE / 2 - 1), &policy)
            .unwrap();
        let at = calculate_rewards(&deposit(10), ComplianceScore::new(SCALE / 2), &policy).unwrap();
        assert!(!below.nft_eligible);
        assert!(at.nft_eligible);
    }

    #[test]
    fn tiered_formula_uses_step_factor() {
        let policy = RewardPolicy {
            formula: RewardFormula::Tiered,
            ..Default::default()
        };
        let tiers = TierSchedule::default();
        assert_eq!(tier_multiplier(ComplianceScore::new(800_000), &tiers), SCALE);
        assert_eq!(tier_multiplier(ComplianceScore::new(799_999), &tiers), 700_000);
        assert_eq!(tier_multiplier(ComplianceScore::new(500_000), &tiers), 700_000);
        assert_eq!(tier_multiplier(ComplianceScore::new(499_999), &tiers), 400_000);

        let outcome =
            calculate_rewards(&deposit(1000), ComplianceScore::new(600_000), &policy).unwrap();
        assert_eq!(outcome.ply, 7000);
        assert_eq!(outcome.carb, 3500);
        assert_eq!(outcome.ewaste, 1400);

        let floor = calculate_rewards(&deposit(1000), ComplianceScore::ZERO, &policy).unwrap();
        assert_eq!(floor.ply, 4000);
        assert!(!floor.nft_eligible);
    }

    #[test]
    fn oversized_multiplier_overflows_deterministically() {
        let mut d = deposit(1_000_000);
        d.policy.ewaste_multiplier = u64::MAX;
        let err = calculate_rewards(&d, ComplianceScore::MAX, &RewardPolicy::default()).unwrap_err();
        assert_eq!(err, RewardError::ArithmeticOverflow);
    }

    #[test]
    fn tier_schedule_must_be_ordered() {
        assert!(TierSchedule::default().validate().is_ok());
        let inverted = TierSchedule {
            floor_factor: 900_000,
            ..Default::default()
        };
        assert!(inverted.validate().is_err());
    }
}
