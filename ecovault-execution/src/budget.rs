//! Compute-unit accounting for one invocation.
//!
//! The host enforces the real ceiling; the meter mirrors it so cost is
//! visible per stage and a batch that would be terminated aborts cleanly.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RewardError;

pub const DEFAULT_COMPUTE_LIMIT: u64 = 1_400_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    BatchOverhead,
    Validate,
    Score,
    Reward,
    Mint,
    Credential,
    Encode,
    Publish,
}

/// Unit cost charged per stage.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct StageCost {
    pub batch_overhead: u64,
    pub validate: u64,
    pub score: u64,
    pub reward: u64,
    /// Three token mints into the destination triple.
    pub mint: u64,
    pub credential: u64,
    pub encode: u64,
    pub publish: u64,
}

impl Default for StageCost {
    fn default() -> Self {
        Self {
            batch_overhead: 5_000,
            validate: 4_000,
            score: 6_000,
            reward: 5_000,
            mint: 9_000,
            credential: 7_000,
            encode: 2_000,
            publish: 12_000,
        }
    }
}

impl StageCost {
    pub fn of(&self, stage: Stage) -> u64 {
        match stage {
            Stage::BatchOverhead => self.batch_overhead,
            Stage::Validate => self.validate,
            Stage::Score => self.score,
            Stage::Reward => self.reward,
            Stage::Mint => self.mint,
            Stage::Credential => self.credential,
            Stage::Encode => self.encode,
            Stage::Publish => self.publish,
        }
    }

    /// Deposit that earns tokens but no credential.
    pub fn token_only(&self) -> u64 {
        [self.score, self.reward, self.mint]
            .into_iter()
            .fold(self.validate, u64::saturating_add)
    }

    /// Deposit that also mints a credential and publishes a message.
    pub fn full_pipeline(&self) -> u64 {
        [self.credential, self.encode, self.publish]
            .into_iter()
            .fold(self.token_only(), u64::saturating_add)
    }
}

/// Upper-bound estimate for a batch of `deposits`, `eligible` of which
/// mint a credential.
pub fn estimate_batch_units(costs: &StageCost, deposits: usize, eligible: usize) -> u64 {
    let eligible = eligible.min(deposits) as u64;
    let token_only = deposits as u64 - eligible;
    costs
        .batch_overhead
        .saturating_add(eligible.saturating_mul(costs.full_pipeline()))
        .saturating_add(token_only.saturating_mul(costs.token_only()))
}

/// Largest batch that fits `limit` if every deposit runs the full pipeline.
pub fn max_full_batch(costs: &StageCost, limit: u64) -> usize {
    match costs.full_pipeline() {
        0 => usize::MAX,
        per => (limit.saturating_sub(costs.batch_overhead) / per) as usize,
    }
}

#[derive(Debug, Clone)]
pub struct ComputeMeter {
    costs: StageCost,
    limit: u64,
    used: u64,
}

impl ComputeMeter {
    pub fn new(costs: StageCost, limit: u64) -> Self {
        Self {
            costs,
            limit,
            used: 0,
        }
    }

    pub fn charge(&mut self, stage: Stage) -> Result<(), RewardError> {
        let cost = self.costs.of(stage);
        let used = self.used.saturating_add(cost);
        if used > self.limit {
            return Err(RewardError::ComputeBudgetExceeded {
                used,
                limit: self.limit,
            });
        }
        debug!(?stage, cost, used, "compute charged");
        self.used = used;
        Ok(())
    }

    pub fn used(&self) -> u64 {
        self.used
    }

    pub fn remaining(&self) -> u64 {
        self.limit - self.used
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_deposit_costs_sit_inside_the_envelope() {
        let costs = StageCost::default();
        assert_eq!(costs.token_only(), 24_000);
        assert_eq!(costs.full_pipeline(), 45_000);
        assert!((15_000..=50_000).contains(&costs.token_only()));
        assert!((15_000..=50_000).contains(&costs.full_pipeline()));
    }

    #[test]
    fn estimate_adds_overhead_and_mix() {
        let costs = StageCost::default();
        assert_eq!(estimate_batch_units(&costs, 0, 0), 5_000);
        assert_eq!(estimate_batch_units(&costs, 3, 1), 5_000 + 45_000 + 2 * 24_000);
        // eligible is capped at deposits
        assert_eq!(estimate_batch_units(&costs, 1, 5), 50_000);
    }

    #[test]
    fn default_limit_fits_thirty_one_full_deposits() {
        let costs = StageCost::default();
        assert_eq!(max_full_batch(&costs, DEFAULT_COMPUTE_LIMIT), 31);
        assert_eq!(estimate_batch_units(&costs, 31, 31), DEFAULT_COMPUTE_LIMIT);
        assert!(estimate_batch_units(&costs, 32, 32) > DEFAULT_COMPUTE_LIMIT);
    }

    #[test]
    fn meter_refuses_to_exceed_limit() {
        let mut meter = ComputeMeter::new(StageCost::default(), 10_000);
        meter.charge(Stage::BatchOverhead).unwrap();
        meter.charge(Stage::Validate).unwrap();
        assert_eq!(meter.remaining(), 1_000);
        assert_eq!(
            meter.charge(Stage::Score),
            Err(RewardError::ComputeBudgetExceeded {
                used: 15_000,
                limit: 10_000
            })
        );
        assert_eq!(meter.used(), 9_000);
    }
}
