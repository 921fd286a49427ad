use serde::{Deserialize, Serialize};

use crate::SCALE;

/// Fixed-point compliance fraction in `[0, SCALE]`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ComplianceScore(u64);

impl ComplianceScore {
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(SCALE);

    /// Clamps into `[0, SCALE]`.
    pub fn new(raw: u64) -> Self {
        Self(raw.min(SCALE))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RewardOutcome {
    pub ply: u64,
    pub carb: u64,
    pub ewaste: u64,
    pub nft_eligible: bool,
}

impl RewardOutcome {
    pub fn total(&self) -> u128 {
        self.ply as u128 + self.carb as u128 + self.ewaste as u128
    }
}
