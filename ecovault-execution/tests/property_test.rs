//! Property-based tests using proptest.
//!
//! These tests verify invariants that should hold for any valid input.

use proptest::prelude::*;

use ecovault_execution::config::RewardPolicy;
use ecovault_execution::error::{ErrorKind, RewardError};
use ecovault_execution::fixed_point::{mul_div, mul_scaled, SCALE};
use ecovault_execution::message::{decode_payload, encode_payload};
use ecovault_execution::rewards::{calculate_rewards, is_nft_eligible};
use ecovault_execution::scoring::{compliance_score, ScoringWeights};
use ecovault_execution::validation::validate_deposit;
use ecovault_types::{ComplianceScore, Deposit, EsgMetrics, Telemetry, TenantPolicy};

// ============================================================================
// Custom Strategies
// ============================================================================

/// Telemetry inside the default tenant bounds
fn arb_valid_telemetry() -> impl Strategy<Value = Telemetry> {
    (0u64..=10, 10u64..=30, 30u64..=70, 0u64..=10, 0u64..=100).prop_map(
        |(contamination, temperature, humidity, vibration, fill_level)| Telemetry {
            contamination,
            temperature,
            humidity,
            vibration,
            fill_level,
        },
    )
}

fn arb_any_telemetry() -> impl Strategy<Value = Telemetry> {
    any::<[u64; 5]>().prop_map(|[contamination, temperature, humidity, vibration, fill_level]| {
        Telemetry {
            contamination,
            temperature,
            humidity,
            vibration,
            fill_level,
        }
    })
}

fn arb_valid_esg() -> impl Strategy<Value = EsgMetrics> {
    (1u64..=u64::MAX, 0u64..=10_000).prop_map(|(carbon_offset, recyclability)| EsgMetrics {
        carbon_offset,
        recyclability,
    })
}

fn arb_valid_deposit() -> impl Strategy<Value = Deposit> {
    (
        any::<[u8; 32]>(),
        1u64..=1_000_000,
        arb_valid_telemetry(),
        arb_valid_esg(),
    )
        .prop_map(|(depositor, amount, telemetry, esg_metrics)| Deposit {
            depositor,
            target_chain: 2,
            amount,
            telemetry,
            esg_metrics,
            policy: TenantPolicy::default(),
        })
}

fn arb_score() -> impl Strategy<Value = u64> {
    0u64..=SCALE
}

fn score(deposit: &Deposit) -> u64 {
    compliance_score(deposit, &ScoringWeights::default())
        .unwrap()
        .get()
}

// ============================================================================
// Validation Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_valid_deposits_pass(deposit in arb_valid_deposit()) {
        prop_assert!(validate_deposit(&deposit).is_ok());
    }

    #[test]
    fn prop_amount_out_of_range_is_invalid_amount(
        mut deposit in arb_valid_deposit(),
        amount in prop_oneof![Just(0u64), 1_000_001u64..=u64::MAX],
        telemetry in arb_any_telemetry(),
    ) {
        // Amount wins over any telemetry violation.
        deposit.amount = amount;
        deposit.telemetry = telemetry;
        let err = validate_deposit(&deposit).unwrap_err();
        prop_assert_eq!(err, RewardError::InvalidAmount { amount });
    }

    #[test]
    fn prop_each_telemetry_field_maps_to_invalid_telemetry(
        mut deposit in arb_valid_deposit(),
        field in 0usize..6,
        excess in 1u64..1_000,
    ) {
        let t = &mut deposit.telemetry;
        match field {
            0 => t.contamination = 10 + excess,
            1 => t.temperature = 30 + excess,
            2 => t.temperature = 10u64.saturating_sub(excess),
            3 => t.humidity = 70 + excess,
            4 => t.vibration = 10 + excess,
            _ => t.fill_level = 100 + excess,
        }
        let err = validate_deposit(&deposit).unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::InvalidTelemetry);
    }

    #[test]
    fn prop_esg_fields_map_to_invalid_esg(
        mut deposit in arb_valid_deposit(),
        recyclability in 10_001u64..=u64::MAX,
        zero_carbon in any::<bool>(),
    ) {
        if zero_carbon {
            deposit.esg_metrics.carbon_offset = 0;
        } else {
            deposit.esg_metrics.recyclability = recyclability;
        }
        let err = validate_deposit(&deposit).unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::InvalidEsgMetrics);
    }
}

// ============================================================================
// Scoring Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_score_is_bounded(
        mut deposit in arb_valid_deposit(),
        telemetry in arb_any_telemetry(),
        carbon in any::<u64>(),
        recyclability in any::<u64>(),
    ) {
        deposit.telemetry = telemetry;
        deposit.esg_metrics = EsgMetrics { carbon_offset: carbon, recyclability };
        prop_assert!(score(&deposit) <= SCALE);
    }

    #[test]
    fn prop_lower_readings_never_score_worse(
        deposit in arb_valid_deposit(),
        field in 0usize..3,
        a in 0u64..500,
        b in 0u64..500,
    ) {
        let (low, high) = (a.min(b), a.max(b));
        let mut better = deposit.clone();
        let mut worse = deposit;
        match field {
            0 => { better.telemetry.contamination = low; worse.telemetry.contamination = high; }
            1 => { better.telemetry.vibration = low; worse.telemetry.vibration = high; }
            _ => { better.telemetry.fill_level = low; worse.telemetry.fill_level = high; }
        }
        prop_assert!(score(&better) >= score(&worse));
    }

    #[test]
    fn prop_in_band_never_scores_worse_than_out_of_band(
        deposit in arb_valid_deposit(),
        inside in 10u64..=30,
        outside in prop_oneof![0u64..10, 31u64..1_000],
    ) {
        let mut better = deposit.clone();
        let mut worse = deposit;
        better.telemetry.temperature = inside;
        worse.telemetry.temperature = outside;
        prop_assert!(score(&better) >= score(&worse));
    }

    #[test]
    fn prop_more_esg_never_scores_worse(
        deposit in arb_valid_deposit(),
        carbon in (1u64..10_000, 1u64..10_000),
        recyclability in (0u64..=10_000, 0u64..=10_000),
    ) {
        let mut better = deposit.clone();
        let mut worse = deposit;
        better.esg_metrics = EsgMetrics {
            carbon_offset: carbon.0.max(carbon.1),
            recyclability: recyclability.0.max(recyclability.1),
        };
        worse.esg_metrics = EsgMetrics {
            carbon_offset: carbon.0.min(carbon.1),
            recyclability: recyclability.0.min(recyclability.1),
        };
        prop_assert!(score(&better) >= score(&worse));
    }
}

// ============================================================================
// Reward Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_rewards_are_monotone_in_score(
        deposit in arb_valid_deposit(),
        a in arb_score(),
        b in arb_score(),
    ) {
        let policy = RewardPolicy::default();
        let (low, high) = (a.min(b), a.max(b));
        let lo = calculate_rewards(&deposit, ComplianceScore::new(low), &policy).unwrap();
        let hi = calculate_rewards(&deposit, ComplianceScore::new(high), &policy).unwrap();
        prop_assert!(hi.ply >= lo.ply);
        prop_assert!(hi.carb >= lo.carb);
        prop_assert!(hi.ewaste >= lo.ewaste);
        prop_assert!(hi.nft_eligible || !lo.nft_eligible);
    }

    #[test]
    fn prop_nft_eligibility_is_the_threshold(score in arb_score()) {
        prop_assert_eq!(is_nft_eligible(ComplianceScore::new(score), SCALE / 2), score >= SCALE / 2);
    }

    #[test]
    fn prop_mul_scaled_truncates(a in 0u64..=u32::MAX as u64, b in 0u64..=SCALE) {
        let exact = a as u128 * b as u128;
        prop_assert_eq!(mul_scaled(a, b).unwrap() as u128, exact / SCALE as u128);
        prop_assert_eq!(mul_div(a, b, SCALE).unwrap(), mul_scaled(a, b).unwrap());
    }
}

// ============================================================================
// Payload Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_payload_round_trips(
        asset_id in any::<[u8; 32]>(),
        recipient in any::<[u8; 32]>(),
        carbon_offset in any::<u64>(),
        recyclability in any::<u64>(),
    ) {
        let esg = EsgMetrics { carbon_offset, recyclability };
        let payload = encode_payload(&asset_id, &recipient, &esg);
        prop_assert_eq!(payload.as_ref().len(), 82);
        let decoded = decode_payload(payload.as_ref()).unwrap();
        prop_assert_eq!(decoded.asset_id, asset_id);
        prop_assert_eq!(decoded.recipient, recipient);
        prop_assert_eq!(decoded.esg_metrics, esg);
    }

    #[test]
    fn prop_foreign_lengths_are_rejected(bytes in prop::collection::vec(any::<u8>(), 0..200)) {
        prop_assume!(bytes.len() != 82);
        prop_assert!(decode_payload(&bytes).is_err());
    }
}
