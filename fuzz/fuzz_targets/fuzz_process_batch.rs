#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use ecovault_execution::governance;
use ecovault_execution::{
    process_batch, BatchPolicy, ExecutionContext, GovernanceConfig, MemoryBridge, RewardPolicy,
};
use ecovault_types::state::Vault;
use ecovault_types::{Deposit, EsgMetrics, LedgerState, Telemetry, TenantPolicy};

const ADMINS: [[u8; 32]; 2] = [[0xA1; 32], [0xB2; 32]];

#[derive(Arbitrary, Debug)]
struct Item {
    amount: u32,
    readings: [u8; 5],
    carbon_offset: u8,
    recyclability: u16,
}

#[derive(Arbitrary, Debug)]
struct BatchInput {
    items: Vec<Item>,
    /// Destination slots are drawn from a small pool so collisions happen.
    destination_seeds: Vec<u8>,
    approvals: u8,
    skip: bool,
    compute_limit: u32,
    bridge_capacity: Option<u8>,
}

fuzz_target!(|data: BatchInput| {
    let mut state = LedgerState::default();
    let mut vault = Vault::new([0xAA; 32], 255);
    let governance = GovernanceConfig::new(ADMINS.to_vec(), 2);
    for i in 0..data.approvals % 4 {
        let _ = governance::approve(&mut vault, &ADMINS[usize::from(i) % 2], &governance);
    }
    state.vault = Some(vault);

    let deposits: Vec<Deposit> = data
        .items
        .iter()
        .take(64)
        .map(|item| {
            let [contamination, temperature, humidity, vibration, fill_level] =
                item.readings.map(u64::from);
            Deposit {
                depositor: [1; 32],
                target_chain: 1,
                amount: u64::from(item.amount),
                telemetry: Telemetry {
                    contamination,
                    temperature,
                    humidity,
                    vibration,
                    fill_level,
                },
                esg_metrics: EsgMetrics {
                    carbon_offset: u64::from(item.carbon_offset),
                    recyclability: u64::from(item.recyclability),
                },
                policy: TenantPolicy::default(),
            }
        })
        .collect();
    let destinations: Vec<[u8; 32]> = data
        .destination_seeds
        .iter()
        .take(192)
        .map(|seed| [seed % 8; 32])
        .collect();

    let policy = RewardPolicy {
        batch_policy: if data.skip {
            BatchPolicy::SkipAndContinue
        } else {
            BatchPolicy::AbortOnFirstFailure
        },
        compute_limit: u64::from(data.compute_limit),
        ..Default::default()
    };
    let mut bridge = match data.bridge_capacity {
        Some(cap) => MemoryBridge::with_capacity_limit(usize::from(cap)),
        None => MemoryBridge::new(),
    };

    let before = state.clone();
    let result = {
        let mut ctx = ExecutionContext {
            state: &mut state,
            policy: &policy,
            governance: &governance,
            bridge: &mut bridge,
            height: 1,
            timestamp: 1,
        };
        process_batch(&mut ctx, &deposits, &destinations)
    };

    match result {
        Ok(receipt) => {
            assert_eq!(receipt.outcomes.len(), deposits.len());
            assert!(receipt.compute_units <= policy.compute_limit);
            let vault = state.vault.expect("vault survives");
            assert_eq!(vault.admin_approvals, 0);
            assert_eq!(
                vault.amount,
                before.vault.map(|v| v.amount).unwrap_or(0) + receipt.total_amount
            );
            assert_eq!(bridge.published.len(), receipt.messages.len());
        }
        Err(_) => {
            // aborted batches leave no trace
            assert_eq!(state, before);
        }
    }
});
