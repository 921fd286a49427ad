#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use ecovault_execution::config::RewardPolicy;
use ecovault_execution::rewards::calculate_rewards;
use ecovault_execution::scoring::compliance_score;
use ecovault_execution::validation::validate_deposit;
use ecovault_types::SCALE;
use ecovault_types::{Deposit, EsgMetrics, Telemetry, TenantPolicy};

#[derive(Arbitrary, Debug)]
struct ScoreInput {
    amount: u32,
    readings: [u8; 5],
    carbon_offset: u64,
    recyclability: u16,
    multipliers: [u32; 3],
    tiered: bool,
}

fuzz_target!(|data: ScoreInput| {
    let mut policy = TenantPolicy::default();
    policy.ply_multiplier = u64::from(data.multipliers[0]);
    policy.carb_multiplier = u64::from(data.multipliers[1]);
    policy.ewaste_multiplier = u64::from(data.multipliers[2]);

    let [contamination, temperature, humidity, vibration, fill_level] =
        data.readings.map(u64::from);
    let deposit = Deposit {
        depositor: [3; 32],
        target_chain: 2,
        amount: u64::from(data.amount),
        telemetry: Telemetry {
            contamination,
            temperature,
            humidity,
            vibration,
            fill_level,
        },
        esg_metrics: EsgMetrics {
            carbon_offset: data.carbon_offset,
            recyclability: u64::from(data.recyclability),
        },
        policy,
    };
    if validate_deposit(&deposit).is_err() {
        return;
    }

    let mut reward_policy = RewardPolicy::default();
    if data.tiered {
        reward_policy.formula = ecovault_execution::rewards::RewardFormula::Tiered;
    }
    let Ok(score) = compliance_score(&deposit, &reward_policy.weights) else {
        return;
    };
    assert!(score.get() <= SCALE);

    // overflow is reported, never wrapped
    if let Ok(rewards) = calculate_rewards(&deposit, score, &reward_policy) {
        assert_eq!(rewards.nft_eligible, score.get() >= reward_policy.nft_threshold);
        if deposit.policy.ply_multiplier == deposit.policy.carb_multiplier {
            assert!(rewards.carb <= rewards.ply);
        }
    }
});
