//! heirvault: digital-inheritance ledger and vesting engine.
//!
//! Tracks per-beneficiary basis-point allocations (≤100% per record),
//! computes how much of a pooled balance has unlocked under an immediate /
//! linear / cliff / milestone policy, and enforces single-claim semantics
//! per beneficiary per asset. The execution environment (value transfer,
//! identity, durable storage) is a set of collaborator traits; the engine
//! itself guarantees per-record serialization and debit-before-transfer
//! ordering.

pub mod allocation;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod ledger;
pub mod policy;
pub mod record;
pub mod transfer;
pub mod types;

pub use allocation::{AllocationTable, Beneficiary};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DepositPolicy, EngineConfig};
pub use engine::LedgerEngine;
pub use error::{LedgerError, Result};
pub use events::{EventSink, JsonLinesSink, LedgerEvent, MemorySink, NullSink};
pub use ledger::{AssetLedger, AssetPool};
pub use policy::{Milestone, PolicyKind, UnlockPolicy};
pub use record::{CreateRecordParams, InheritanceRecord};
pub use transfer::{
    AssetTransfer, FailingTransfer, NullTransfer, RecordingTransfer, TransferError,
};
pub use types::{
    AccountId, Amount, AssetId, AssetKind, HoldKind, RecordId, RecordStatus, BPS_DENOMINATOR,
};
