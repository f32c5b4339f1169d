//! Fuzz target for the record store state machine
//!
//! Drives a ledger over fault-injecting storage with arbitrary operation
//! sequences. With faults disabled the ledger must match the reference
//! model exactly.
//!
//! # Invariants
//!
//! - The ledger NEVER panics, whatever storage does
//! - Persisted state satisfies every standard invariant after each step
//! - Without faults, every outcome equals the model's

#![no_main]

use arbitrary::Arbitrary;
use inkvault_core::{Environment, Timestamp};
use inkvault_harness::{
    InvariantRegistry, LedgerSnapshot, ModelJournal, Operation, OperationResult, SimEnv,
    SmallContent,
};
use inkvault_ledger::{ChaoticStorage, Ledger, LedgerConfig, MemoryStorage};

#[derive(Debug, Arbitrary)]
struct Scenario {
    /// Seed for the simulation environment
    env_seed: u64,
    /// Seed for ChaoticStorage (deterministic failures)
    chaos_seed: u64,
    /// Failure rate 0-9 maps to 0%-90%
    failure_rate_tenth: u8,
    /// Operations to apply
    operations: Vec<Operation>,
}

fuzz_target!(|scenario: Scenario| {
    let failure_rate = f64::from(scenario.failure_rate_tenth % 10) / 10.0;
    let faults = failure_rate > 0.0;

    let memory = MemoryStorage::new();
    let storage = ChaoticStorage::with_seed(memory.clone(), failure_rate, scenario.chaos_seed);
    let env = SimEnv::with_seed(scenario.env_seed);
    let config =
        LedgerConfig { max_ciphertext_len: SmallContent::MAX_LEN, ..LedgerConfig::default() };

    let Ok(mut ledger) = Ledger::open(env.clone(), storage, &config) else {
        return;
    };
    let mut model = ModelJournal::new(config.access, SmallContent::MAX_LEN);
    let registry = InvariantRegistry::standard();
    let mut before = LedgerSnapshot::capture(&memory).expect("memory storage never fails");

    for op in scenario.operations.iter().take(200) {
        let call = op.to_call(&model);
        let timestamp = Timestamp::from_secs(env.wall_clock_secs());

        match (op, call) {
            (_, Some((caller, call))) => {
                let expected = model.apply(caller, &call, timestamp);
                if ledger.submit(caller, call).is_err() {
                    continue;
                }
                let Ok(Some(receipt)) = ledger.finalize_next() else {
                    continue;
                };
                if !faults {
                    let actual =
                        OperationResult::from_store(receipt.outcome, OperationResult::Output);
                    let expected = match expected {
                        Ok(output) => OperationResult::Output(output),
                        Err(kind) => OperationResult::Rejected(kind),
                    };
                    assert_eq!(actual, expected, "divergence on {op:?}");
                }
            },
            (Operation::AdvanceTime { secs }, None) => {
                env.advance(std::time::Duration::from_secs(u64::from(*secs)));
            },
            (Operation::SetWallClock { resolved }, None) => env.set_wall_clock_resolved(*resolved),
            (_, None) => {},
        }

        let after = LedgerSnapshot::capture(&memory).expect("memory storage never fails");
        registry.assert_transition(&before, &after, &format!("after {op:?}"));
        before = after;
    }
});
