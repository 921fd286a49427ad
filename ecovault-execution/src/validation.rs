//! Telemetry validation against the tenant policy carried on each deposit.
//!
//! Every check is evaluated; failures are packed into a [`ViolationMask`]
//! and the mask is mapped onto exactly one error kind.

use ecovault_types::deposit::MAX_RECYCLABILITY;
use ecovault_types::Deposit;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ErrorKind, RewardError};

pub const MAX_DEPOSIT_AMOUNT: u64 = 1_000_000;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ViolationMask(u8);

impl ViolationMask {
    pub const AMOUNT: u8 = 1 << 0;
    pub const CONTAMINATION: u8 = 1 << 1;
    pub const TEMPERATURE: u8 = 1 << 2;
    pub const HUMIDITY: u8 = 1 << 3;
    pub const VIBRATION: u8 = 1 << 4;
    pub const FILL_LEVEL: u8 = 1 << 5;
    pub const CARBON_OFFSET: u8 = 1 << 6;
    pub const RECYCLABILITY: u8 = 1 << 7;

    pub const TELEMETRY: u8 = Self::CONTAMINATION
        | Self::TEMPERATURE
        | Self::HUMIDITY
        | Self::VIBRATION
        | Self::FILL_LEVEL;
    pub const ESG: u8 = Self::CARBON_OFFSET | Self::RECYCLABILITY;

    const NAMES: [(u8, &'static str); 8] = [
        (Self::AMOUNT, "amount"),
        (Self::CONTAMINATION, "contamination"),
        (Self::TEMPERATURE, "temperature"),
        (Self::HUMIDITY, "humidity"),
        (Self::VIBRATION, "vibration"),
        (Self::FILL_LEVEL, "fill_level"),
        (Self::CARBON_OFFSET, "carbon_offset"),
        (Self::RECYCLABILITY, "recyclability"),
    ];

    pub fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, bit: u8) -> bool {
        self.0 & bit == bit
    }

    fn flag(&mut self, bit: u8, violated: bool) {
        if violated {
            self.0 |= bit;
        }
    }

    /// Error kind reported for this mask; `None` means the deposit is valid.
    ///
    /// Precedence: amount, then telemetry, then ESG.
    pub fn kind(self) -> Option<ErrorKind> {
        if self.0 & Self::AMOUNT != 0 {
            Some(ErrorKind::InvalidAmount)
        } else if self.0 & Self::TELEMETRY != 0 {
            Some(ErrorKind::InvalidTelemetry)
        } else if self.0 & Self::ESG != 0 {
            Some(ErrorKind::InvalidEsgMetrics)
        } else {
            None
        }
    }

    pub fn names(self) -> impl Iterator<Item = &'static str> {
        Self::NAMES
            .into_iter()
            .filter(move |(bit, _)| self.0 & bit != 0)
            .map(|(_, name)| name)
    }
}

impl fmt::Display for ViolationMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<&str> = self.names().collect();
        write!(f, "{} (mask {:#04x})", names.join(", "), self.0)
    }
}

/// Evaluates every field check without short-circuiting.
pub fn violations(deposit: &Deposit) -> ViolationMask {
    let t = &deposit.telemetry;
    let p = &deposit.policy;
    let esg = &deposit.esg_metrics;

    let mut mask = ViolationMask::default();
    mask.flag(
        ViolationMask::AMOUNT,
        deposit.amount == 0 || deposit.amount > MAX_DEPOSIT_AMOUNT,
    );
    mask.flag(
        ViolationMask::CONTAMINATION,
        t.contamination > p.contamination_threshold,
    );
    mask.flag(
        ViolationMask::TEMPERATURE,
        !(p.min_temperature..=p.max_temperature).contains(&t.temperature),
    );
    mask.flag(
        ViolationMask::HUMIDITY,
        !(p.min_humidity..=p.max_humidity).contains(&t.humidity),
    );
    mask.flag(ViolationMask::VIBRATION, t.vibration > p.max_vibration);
    mask.flag(ViolationMask::FILL_LEVEL, t.fill_level > p.max_fill_level);
    mask.flag(ViolationMask::CARBON_OFFSET, esg.carbon_offset == 0);
    mask.flag(
        ViolationMask::RECYCLABILITY,
        esg.recyclability > MAX_RECYCLABILITY,
    );
    mask
}

pub fn validate_deposit(deposit: &Deposit) -> Result<(), RewardError> {
    deposit
        .policy
        .check_invariants()
        .map_err(RewardError::InvalidPolicy)?;

    let mask = violations(deposit);
    match mask.kind() {
        None => Ok(()),
        Some(ErrorKind::InvalidAmount) => Err(RewardError::InvalidAmount {
            amount: deposit.amount,
        }),
        Some(ErrorKind::InvalidTelemetry) => Err(RewardError::InvalidTelemetry { violations: mask }),
        Some(_) => Err(RewardError::InvalidEsgMetrics { violations: mask }),
    }
}
