//! Observational events for UI/indexer consumers. Published after the state
//! mutation commits; core correctness never depends on anyone observing
//! them.

use std::io::Write;
use std::sync::Mutex;

use serde::Serialize;

use crate::types::{AccountId, Amount, AssetId, HoldKind, RecordId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    RecordCreated {
        record_id: RecordId,
        owner: AccountId,
    },
    BeneficiaryAdded {
        record_id: RecordId,
        identity: AccountId,
        allocation_bp: u32,
    },
    BeneficiaryRemoved {
        record_id: RecordId,
        identity: AccountId,
        allocation_bp: u32,
    },
    AllocationUpdated {
        record_id: RecordId,
        identity: AccountId,
        allocation_bp: u32,
    },
    AssetDeposited {
        record_id: RecordId,
        asset: AssetId,
        amount: Amount,
    },
    AssetWithdrawn {
        record_id: RecordId,
        asset: AssetId,
        amount: Amount,
    },
    RecordTriggered {
        record_id: RecordId,
        triggered_at: u64,
    },
    AssetClaimed {
        record_id: RecordId,
        asset: AssetId,
        identity: AccountId,
        amount: Amount,
    },
    RecordCompleted {
        record_id: RecordId,
    },
    HoldPlaced {
        record_id: RecordId,
        kind: HoldKind,
    },
    HoldReleased {
        record_id: RecordId,
    },
}

/// Observer seam. Implementations must not block for long: publish runs
/// inside the record's critical section.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: &LedgerEvent);
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _event: &LedgerEvent) {}
}

/// Buffers events in memory. Used by tests and by embedders that drain the
/// buffer on their own schedule.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<LedgerEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        MemorySink::default()
    }

    pub fn snapshot(&self) -> Vec<LedgerEvent> {
        self.events.lock().expect("event buffer poisoned").clone()
    }

    pub fn take(&self) -> Vec<LedgerEvent> {
        std::mem::take(&mut *self.events.lock().expect("event buffer poisoned"))
    }
}

impl EventSink for MemorySink {
    fn publish(&self, event: &LedgerEvent) {
        self.events
            .lock()
            .expect("event buffer poisoned")
            .push(event.clone());
    }
}

/// Append-only JSON-lines log, one event per line. Write failures are
/// logged and dropped: observation must not take the ledger down.
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        JsonLinesSink {
            writer: Mutex::new(writer),
        }
    }
}

impl<W: Write + Send> EventSink for JsonLinesSink<W> {
    fn publish(&self, event: &LedgerEvent) {
        let mut writer = self.writer.lock().expect("event writer poisoned");
        match serde_json::to_string(event) {
            Ok(line) => {
                if let Err(err) = writeln!(writer, "{line}") {
                    tracing::warn!(error = %err, "failed to append event to log");
                }
            }
            Err(err) => tracing::warn!(error = %err, "failed to serialize event"),
        }
    }
}
