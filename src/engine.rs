//! The engine: an arena of records, each behind its own async mutex so that
//! operations on one record are serialized exactly as a chain runtime would
//! serialize its transactions, while different records proceed in parallel.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::{LedgerError, Result};
use crate::events::{EventSink, LedgerEvent};
use crate::record::{CreateRecordParams, InheritanceRecord};
use crate::transfer::AssetTransfer;
use crate::types::{AccountId, Amount, AssetId, HoldKind, RecordId, RecordStatus};

pub struct LedgerEngine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    transfer: Arc<dyn AssetTransfer>,
    sink: Arc<dyn EventSink>,
    records: RwLock<HashMap<RecordId, Arc<Mutex<InheritanceRecord>>>>,
    next_id: AtomicU64,
}

impl LedgerEngine {
    pub fn new(
        config: EngineConfig,
        clock: Arc<dyn Clock>,
        transfer: Arc<dyn AssetTransfer>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        LedgerEngine {
            config,
            clock,
            transfer,
            sink,
            records: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn record(&self, id: RecordId) -> Result<Arc<Mutex<InheritanceRecord>>> {
        self.records
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(LedgerError::RecordNotFound(id))
    }

    // ── record lifecycle ────────────────────────────────────────

    /// Create a record in the ACTIVE state and return its id.
    pub async fn create_record(&self, params: CreateRecordParams) -> Result<RecordId> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let owner = params.owner;
        let record = InheritanceRecord::new(id, params, self.clock.now())?;

        self.records
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(record)));

        info!(record_id = id, %owner, "inheritance record created");
        self.sink
            .publish(&LedgerEvent::RecordCreated { record_id: id, owner });
        Ok(id)
    }

    /// Start the unlock clock for a record.
    pub async fn trigger(&self, id: RecordId, caller: AccountId) -> Result<()> {
        let record = self.record(id).await?;
        let mut record = record.lock().await;

        let now = self.clock.now();
        record.trigger(caller, now)?;

        info!(record_id = id, triggered_at = now, "inheritance record triggered");
        self.sink.publish(&LedgerEvent::RecordTriggered {
            record_id: id,
            triggered_at: now,
        });
        Ok(())
    }

    // ── beneficiary management ──────────────────────────────────

    pub async fn add_beneficiary(
        &self,
        id: RecordId,
        caller: AccountId,
        identity: AccountId,
        allocation_bp: u32,
    ) -> Result<()> {
        let record = self.record(id).await?;
        let mut record = record.lock().await;

        record.add_beneficiary(caller, identity, allocation_bp, self.config.max_beneficiaries)?;

        info!(record_id = id, %identity, allocation_bp, "beneficiary added");
        self.sink.publish(&LedgerEvent::BeneficiaryAdded {
            record_id: id,
            identity,
            allocation_bp,
        });
        Ok(())
    }

    pub async fn remove_beneficiary(
        &self,
        id: RecordId,
        caller: AccountId,
        identity: AccountId,
    ) -> Result<()> {
        let record = self.record(id).await?;
        let mut record = record.lock().await;

        let freed_bp = record.remove_beneficiary(caller, identity)?;

        info!(record_id = id, %identity, freed_bp, "beneficiary removed");
        self.sink.publish(&LedgerEvent::BeneficiaryRemoved {
            record_id: id,
            identity,
            allocation_bp: freed_bp,
        });
        Ok(())
    }

    pub async fn update_allocation(
        &self,
        id: RecordId,
        caller: AccountId,
        identity: AccountId,
        allocation_bp: u32,
    ) -> Result<()> {
        let record = self.record(id).await?;
        let mut record = record.lock().await;

        record.update_allocation(caller, identity, allocation_bp)?;

        info!(record_id = id, %identity, allocation_bp, "allocation updated");
        self.sink.publish(&LedgerEvent::AllocationUpdated {
            record_id: id,
            identity,
            allocation_bp,
        });
        Ok(())
    }

    pub async fn set_beneficiary_active(
        &self,
        id: RecordId,
        caller: AccountId,
        identity: AccountId,
        active: bool,
    ) -> Result<()> {
        let record = self.record(id).await?;
        let mut record = record.lock().await;
        record.set_beneficiary_active(caller, identity, active)?;
        info!(record_id = id, %identity, active, "beneficiary active flag set");
        Ok(())
    }

    // ── deposits and withdrawals ────────────────────────────────

    /// Deposit into a fungible pool. Returns the pool's new deposited total.
    pub async fn deposit(
        &self,
        id: RecordId,
        caller: AccountId,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<Amount> {
        let record = self.record(id).await?;
        let mut record = record.lock().await;

        let total = record.deposit(caller, asset, amount, self.config.deposit_policy)?;

        info!(record_id = id, %asset, amount, "asset deposited");
        self.sink.publish(&LedgerEvent::AssetDeposited {
            record_id: id,
            asset: asset.clone(),
            amount,
        });
        Ok(total)
    }

    /// Deposit NFTs by token id. Returns the count of newly recorded ids.
    pub async fn deposit_nft(
        &self,
        id: RecordId,
        caller: AccountId,
        collection: &AssetId,
        token_ids: &[u64],
    ) -> Result<u64> {
        let record = self.record(id).await?;
        let mut record = record.lock().await;

        let added = record.deposit_nft(caller, collection, token_ids, self.config.deposit_policy)?;

        info!(record_id = id, %collection, added, "nft tokens deposited");
        self.sink.publish(&LedgerEvent::AssetDeposited {
            record_id: id,
            asset: collection.clone(),
            amount: added as Amount,
        });
        Ok(added)
    }

    pub async fn withdraw(
        &self,
        id: RecordId,
        caller: AccountId,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<()> {
        let record = self.record(id).await?;
        let mut record = record.lock().await;

        record.withdraw(caller, asset, amount)?;

        info!(record_id = id, %asset, amount, "asset withdrawn");
        self.sink.publish(&LedgerEvent::AssetWithdrawn {
            record_id: id,
            asset: asset.clone(),
            amount,
        });
        Ok(())
    }

    // ── claims ──────────────────────────────────────────────────

    /// Claimable-now amount for `identity`. Read-only.
    pub async fn claimable_amount(
        &self,
        id: RecordId,
        asset: &AssetId,
        identity: AccountId,
    ) -> Result<Amount> {
        let record = self.record(id).await?;
        let record = record.lock().await;
        record.claimable_amount(asset, identity, self.clock.now())
    }

    /// Claim everything currently unlocked for `caller` against one asset.
    ///
    /// The ledger debit commits first; the outbound transfer runs second,
    /// still inside the record's critical section, so no concurrent claim
    /// can observe pre-debit state. A failed transfer rolls the debit back
    /// and surfaces as `TransferFailed`. A zero claimable is a successful
    /// no-op returning 0.
    pub async fn claim(&self, id: RecordId, caller: AccountId, asset: &AssetId) -> Result<Amount> {
        let record = self.record(id).await?;
        let mut record = record.lock().await;

        let amount = record.claim(caller, asset, self.clock.now())?;
        if amount == 0 {
            return Ok(0);
        }

        if let Err(err) = self.transfer.transfer(asset, caller, amount).await {
            record.rollback_claim(caller, asset, amount)?;
            warn!(record_id = id, %caller, %asset, amount, error = %err, "claim transfer failed, debit rolled back");
            return Err(LedgerError::TransferFailed(err));
        }

        info!(record_id = id, %caller, %asset, amount, "asset claimed");
        self.sink.publish(&LedgerEvent::AssetClaimed {
            record_id: id,
            asset: asset.clone(),
            identity: caller,
            amount,
        });

        if record.maybe_complete() {
            info!(record_id = id, "inheritance record completed");
            self.sink
                .publish(&LedgerEvent::RecordCompleted { record_id: id });
        }
        Ok(amount)
    }

    // ── emergency holds ─────────────────────────────────────────

    pub async fn place_hold(&self, id: RecordId, caller: AccountId, kind: HoldKind) -> Result<()> {
        let record = self.record(id).await?;
        let mut record = record.lock().await;

        record.place_hold(caller, kind)?;

        warn!(record_id = id, ?kind, "emergency hold placed");
        self.sink
            .publish(&LedgerEvent::HoldPlaced { record_id: id, kind });
        Ok(())
    }

    pub async fn release_hold(&self, id: RecordId, caller: AccountId) -> Result<()> {
        let record = self.record(id).await?;
        let mut record = record.lock().await;

        if record.release_hold(caller)? {
            info!(record_id = id, "emergency hold released");
            self.sink
                .publish(&LedgerEvent::HoldReleased { record_id: id });
        }
        Ok(())
    }

    // ── read-only views ─────────────────────────────────────────

    pub async fn record_status(&self, id: RecordId) -> Result<(RecordStatus, Option<HoldKind>)> {
        let record = self.record(id).await?;
        let record = record.lock().await;
        Ok((record.status, record.hold))
    }

    /// Sum of active allocations in basis points.
    pub async fn total_allocated(&self, id: RecordId) -> Result<u32> {
        let record = self.record(id).await?;
        let record = record.lock().await;
        Ok(record.allocations.total_allocated())
    }

    /// `(total_deposited, total_claimed)` for one pool, if it exists.
    pub async fn pool_totals(&self, id: RecordId, asset: &AssetId) -> Result<Option<(Amount, Amount)>> {
        let record = self.record(id).await?;
        let record = record.lock().await;
        Ok(record
            .ledger
            .get(asset)
            .map(|p| (p.total_deposited, p.total_claimed)))
    }

    /// Full clone of the record for inspection. Not a live view.
    pub async fn snapshot(&self, id: RecordId) -> Result<InheritanceRecord> {
        let record = self.record(id).await?;
        let record = record.lock().await;
        Ok(record.clone())
    }
}
