#![allow(dead_code)]

use std::sync::Arc;

use heirvault::{
    AccountId, CreateRecordParams, EngineConfig, LedgerEngine, ManualClock, MemorySink,
    RecordingTransfer, UnlockPolicy,
};

pub const DAY: u64 = 24 * 60 * 60;

/// Arbitrary epoch for the manual clock; every scenario measures offsets
/// from here.
pub const T0: u64 = 1_700_000_000;

pub struct TestContext {
    pub engine: Arc<LedgerEngine>,
    pub clock: Arc<ManualClock>,
    pub transfers: Arc<RecordingTransfer>,
    pub events: Arc<MemorySink>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "warn".into()),
            )
            .with_test_writer()
            .try_init();

        let clock = Arc::new(ManualClock::new(T0));
        let transfers = Arc::new(RecordingTransfer::new());
        let events = Arc::new(MemorySink::new());
        let engine = Arc::new(LedgerEngine::new(
            config,
            clock.clone(),
            transfers.clone(),
            events.clone(),
        ));
        TestContext {
            engine,
            clock,
            transfers,
            events,
        }
    }
}

pub fn acct() -> AccountId {
    AccountId::generate()
}

pub fn record_params(owner: AccountId, policy: UnlockPolicy) -> CreateRecordParams {
    CreateRecordParams {
        owner,
        executor: owner,
        arbitrator: None,
        requires_confirmation: false,
        policy,
    }
}
