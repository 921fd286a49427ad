use serde::{Deserialize, Serialize};

use crate::SCALE;

/// Upper bound on recyclability (100.00%, percent x100).
pub const MAX_RECYCLABILITY: u64 = 10_000;

/// Raw sensor readings for one deposit event.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Telemetry {
    pub contamination: u64,
    pub temperature: u64,
    pub humidity: u64,
    pub vibration: u64,
    pub fill_level: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EsgMetrics {
    /// kg CO2 x100
    pub carbon_offset: u64,
    /// percent x100, at most `MAX_RECYCLABILITY`
    pub recyclability: u64,
}

/// Per-tenant acceptance bounds and reward weighting.
///
/// Multipliers and ESG weights are fixed-point values over `SCALE`.
/// The policy travels with each deposit rather than being looked up.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantPolicy {
    pub contamination_threshold: u64,
    pub min_temperature: u64,
    pub max_temperature: u64,
    pub min_humidity: u64,
    pub max_humidity: u64,
    pub max_vibration: u64,
    pub max_fill_level: u64,

    pub ply_multiplier: u64,
    pub carb_multiplier: u64,
    pub ewaste_multiplier: u64,

    pub esg_carbon_weight: u64,
    pub esg_recyclability_weight: u64,
    /// Carbon offset at which the carbon sub-signal saturates.
    pub carbon_offset_target: u64,
}

impl Default for TenantPolicy {
    fn default() -> Self {
        Self {
            contamination_threshold: 10,
            min_temperature: 10,
            max_temperature: 30,
            min_humidity: 30,
            max_humidity: 70,
            max_vibration: 10,
            max_fill_level: 100,
            ply_multiplier: SCALE,
            carb_multiplier: SCALE,
            ewaste_multiplier: SCALE,
            esg_carbon_weight: SCALE / 2,
            esg_recyclability_weight: SCALE / 2,
            carbon_offset_target: 100,
        }
    }
}

impl TenantPolicy {
    /// Returns a description of the first broken invariant, if any.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.min_temperature > self.max_temperature {
            return Err(format!(
                "temperature range inverted: {} > {}",
                self.min_temperature, self.max_temperature
            ));
        }
        if self.min_humidity > self.max_humidity {
            return Err(format!(
                "humidity range inverted: {} > {}",
                self.min_humidity, self.max_humidity
            ));
        }
        let esg_total = self
            .esg_carbon_weight
            .checked_add(self.esg_recyclability_weight);
        if esg_total != Some(SCALE) {
            return Err(format!(
                "esg weights must sum to {}: carbon {} + recyclability {}",
                SCALE, self.esg_carbon_weight, self.esg_recyclability_weight
            ));
        }
        Ok(())
    }
}

/// One reward request as delivered by the ingestion boundary.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Deposit {
    /// Recipient of the credential on the destination chain.
    pub depositor: [u8; 32],
    /// Informational; not part of the encoded payload.
    #[serde(default)]
    pub target_chain: u16,
    pub amount: u64,
    pub telemetry: Telemetry,
    pub esg_metrics: EsgMetrics,
    pub policy: TenantPolicy,
}
