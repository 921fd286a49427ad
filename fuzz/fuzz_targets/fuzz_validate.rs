#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use ecovault_execution::error::RewardError;
use ecovault_execution::validation::{validate_deposit, violations};
use ecovault_types::{Deposit, EsgMetrics, Telemetry, TenantPolicy};

#[derive(Arbitrary, Debug)]
struct DepositInput {
    amount: u64,
    readings: [u64; 5],
    carbon_offset: u64,
    recyclability: u64,
    default_policy: bool,
    temperature_band: (u64, u64),
    humidity_band: (u64, u64),
    carbon_weight: u64,
}

fuzz_target!(|data: DepositInput| {
    let mut policy = TenantPolicy::default();
    if !data.default_policy {
        policy.min_temperature = data.temperature_band.0;
        policy.max_temperature = data.temperature_band.1;
        policy.min_humidity = data.humidity_band.0;
        policy.max_humidity = data.humidity_band.1;
        policy.esg_carbon_weight = data.carbon_weight;
    }
    let [contamination, temperature, humidity, vibration, fill_level] = data.readings;
    let deposit = Deposit {
        depositor: [7; 32],
        target_chain: 1,
        amount: data.amount,
        telemetry: Telemetry {
            contamination,
            temperature,
            humidity,
            vibration,
            fill_level,
        },
        esg_metrics: EsgMetrics {
            carbon_offset: data.carbon_offset,
            recyclability: data.recyclability,
        },
        policy,
    };

    let mask = violations(&deposit);
    match validate_deposit(&deposit) {
        Ok(()) => assert!(mask.is_empty()),
        Err(RewardError::InvalidPolicy(_)) => {
            assert!(deposit.policy.check_invariants().is_err())
        }
        Err(e) => assert_eq!(Some(e.kind()), mask.kind()),
    }
});
