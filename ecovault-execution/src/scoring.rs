//! Compliance scoring.
//!
//! Six weighted sub-signals, each a fixed-point fraction in `[0, SCALE]`:
//!
//! * contamination, vibration, fill level: remaining headroom under the limit
//! * temperature, humidity: full inside the tenant band, zero outside
//! * ESG composite: weighted carbon offset (saturating at the tenant target)
//!   and recyclability
//!
//! Every sub-signal is monotone in its reading, so the weighted sum is too.

use ecovault_types::deposit::MAX_RECYCLABILITY;
use ecovault_types::{ComplianceScore, Deposit, EsgMetrics, TenantPolicy};
use serde::{Deserialize, Serialize};

use crate::error::RewardError;
use crate::fixed_point::{checked_add, mul_div, mul_scaled, SCALE};

/// Sub-score weights over `SCALE`; must sum to exactly `SCALE`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct ScoringWeights {
    pub contamination: u64,
    pub temperature: u64,
    pub humidity: u64,
    pub vibration: u64,
    pub fill_level: u64,
    pub esg: u64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            contamination: 200_000,
            temperature: 200_000,
            humidity: 100_000,
            vibration: 100_000,
            fill_level: 100_000,
            esg: 300_000,
        }
    }
}

impl ScoringWeights {
    pub fn total(&self) -> Option<u64> {
        [
            self.temperature,
            self.humidity,
            self.vibration,
            self.fill_level,
            self.esg,
        ]
        .into_iter()
        .try_fold(self.contamination, u64::checked_add)
    }

    pub fn validate(&self) -> Result<(), RewardError> {
        match self.total() {
            Some(SCALE) => Ok(()),
            total => Err(RewardError::InvalidPolicy(format!(
                "scoring weights must sum to {SCALE}, got {total:?}"
            ))),
        }
    }
}

pub fn compliance_score(
    deposit: &Deposit,
    weights: &ScoringWeights,
) -> Result<ComplianceScore, RewardError> {
    let t = &deposit.telemetry;
    let p = &deposit.policy;

    let signals = [
        (weights.contamination, headroom(t.contamination, p.contamination_threshold)?),
        (weights.temperature, within(t.temperature, p.min_temperature, p.max_temperature)),
        (weights.humidity, within(t.humidity, p.min_humidity, p.max_humidity)),
        (weights.vibration, headroom(t.vibration, p.max_vibration)?),
        (weights.fill_level, headroom(t.fill_level, p.max_fill_level)?),
        (weights.esg, esg_composite(&deposit.esg_metrics, p)?),
    ];

    let mut total = 0u64;
    for (weight, signal) in signals {
        total = checked_add(total, mul_scaled(weight, signal)?)?;
    }
    Ok(ComplianceScore::new(total))
}

/// Carbon and recyclability blended by the tenant's ESG weights.
pub fn esg_composite(esg: &EsgMetrics, policy: &TenantPolicy) -> Result<u64, RewardError> {
    let carbon = headroom_inverse(esg.carbon_offset, policy.carbon_offset_target)?;
    let recyclability = mul_div(
        esg.recyclability.min(MAX_RECYCLABILITY),
        SCALE,
        MAX_RECYCLABILITY,
    )?;
    let composite = checked_add(
        mul_scaled(carbon, policy.esg_carbon_weight)?,
        mul_scaled(recyclability, policy.esg_recyclability_weight)?,
    )?;
    Ok(composite.min(SCALE))
}

/// Lower is better: `(limit - reading) / limit`, zero at or past the limit.
fn headroom(reading: u64, limit: u64) -> Result<u64, RewardError> {
    if limit == 0 {
        return Ok(if reading == 0 { SCALE } else { 0 });
    }
    mul_div(limit - reading.min(limit), SCALE, limit)
}

/// Higher is better, saturating at `target`.
fn headroom_inverse(reading: u64, target: u64) -> Result<u64, RewardError> {
    if target == 0 {
        return Ok(if reading > 0 { SCALE } else { 0 });
    }
    mul_div(reading.min(target), SCALE, target)
}

fn within(reading: u64, min: u64, max: u64) -> u64 {
    if (min..=max).contains(&reading) {
        SCALE
    } else {
        0
    }
}
