//! The aggregate root: one record owns its allocation table, unlock policy
//! and asset ledger, and enforces the ACTIVE → TRIGGERED → COMPLETED state
//! machine. All methods are synchronous; the engine serializes access per
//! record.

use serde::{Deserialize, Serialize};

use crate::allocation::AllocationTable;
use crate::config::DepositPolicy;
use crate::error::{LedgerError, Result};
use crate::ledger::AssetLedger;
use crate::policy::{self, UnlockPolicy};
use crate::types::{AccountId, Amount, AssetId, HoldKind, RecordId, RecordStatus};

/// Parameters for creating a record (grouped, mirroring the create call's
/// public surface).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRecordParams {
    pub owner: AccountId,
    pub executor: AccountId,
    pub arbitrator: Option<AccountId>,
    /// When set, only the executor may trigger the record: the owner's own
    /// declaration is not accepted as confirmation.
    pub requires_confirmation: bool,
    pub policy: UnlockPolicy,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InheritanceRecord {
    pub id: RecordId,
    pub owner: AccountId,
    pub executor: AccountId,
    pub arbitrator: Option<AccountId>,
    pub requires_confirmation: bool,
    pub status: RecordStatus,
    pub hold: Option<HoldKind>,
    pub created_at: u64,
    /// Set exactly once, by `trigger`. `Some` ⟺ status ∈ {Triggered, Completed}.
    pub triggered_at: Option<u64>,
    pub policy: UnlockPolicy,
    pub allocations: AllocationTable,
    pub ledger: AssetLedger,
}

impl InheritanceRecord {
    /// Validate identities and the unlock policy, then initialize an ACTIVE
    /// record.
    ///
    /// # Errors
    /// - `InvalidIdentity` if the owner is nil
    /// - `InvalidExecutor` if the executor (or a given arbitrator) is nil
    /// - `InvalidPolicy` if policy validation fails
    pub fn new(id: RecordId, params: CreateRecordParams, now: u64) -> Result<Self> {
        if params.owner.is_nil() {
            return Err(LedgerError::InvalidIdentity);
        }
        if params.executor.is_nil() {
            return Err(LedgerError::InvalidExecutor);
        }
        if matches!(params.arbitrator, Some(a) if a.is_nil()) {
            return Err(LedgerError::InvalidExecutor);
        }
        params.policy.validate()?;

        Ok(InheritanceRecord {
            id,
            owner: params.owner,
            executor: params.executor,
            arbitrator: params.arbitrator,
            requires_confirmation: params.requires_confirmation,
            status: RecordStatus::Active,
            hold: None,
            created_at: now,
            triggered_at: None,
            policy: params.policy,
            allocations: AllocationTable::new(),
            ledger: AssetLedger::new(),
        })
    }

    // ── guards ──────────────────────────────────────────────────

    fn ensure_no_hold(&self) -> Result<()> {
        if self.hold.is_some() {
            return Err(LedgerError::RecordOnHold);
        }
        Ok(())
    }

    fn ensure_active(&self) -> Result<()> {
        if self.status != RecordStatus::Active {
            return Err(LedgerError::RecordNotActive);
        }
        Ok(())
    }

    fn ensure_owner(&self, caller: AccountId) -> Result<()> {
        if caller != self.owner {
            return Err(LedgerError::Unauthorized);
        }
        Ok(())
    }

    // ── beneficiary management (ACTIVE only, owner only) ────────

    pub fn add_beneficiary(
        &mut self,
        caller: AccountId,
        identity: AccountId,
        bp: u32,
        max_beneficiaries: usize,
    ) -> Result<()> {
        self.ensure_no_hold()?;
        self.ensure_active()?;
        self.ensure_owner(caller)?;
        self.allocations.add(self.owner, identity, bp, max_beneficiaries)
    }

    /// Remove a beneficiary, returning the freed allocation in basis points.
    pub fn remove_beneficiary(&mut self, caller: AccountId, identity: AccountId) -> Result<u32> {
        self.ensure_no_hold()?;
        self.ensure_active()?;
        self.ensure_owner(caller)?;
        let removed = self.allocations.remove(identity)?;
        Ok(removed.allocation_bp)
    }

    pub fn update_allocation(
        &mut self,
        caller: AccountId,
        identity: AccountId,
        bp: u32,
    ) -> Result<()> {
        self.ensure_no_hold()?;
        self.ensure_active()?;
        self.ensure_owner(caller)?;
        self.allocations.update_allocation(identity, bp)
    }

    pub fn set_beneficiary_active(
        &mut self,
        caller: AccountId,
        identity: AccountId,
        active: bool,
    ) -> Result<()> {
        self.ensure_no_hold()?;
        self.ensure_active()?;
        self.ensure_owner(caller)?;
        self.allocations.set_active(identity, active)
    }

    // ── deposits and withdrawals (ACTIVE only) ──────────────────

    fn ensure_depositor(&self, caller: AccountId, deposit_policy: DepositPolicy) -> Result<()> {
        let allowed = match deposit_policy {
            DepositPolicy::OwnerOnly => caller == self.owner,
            DepositPolicy::OwnerOrExecutor => caller == self.owner || caller == self.executor,
        };
        if !allowed {
            return Err(LedgerError::Unauthorized);
        }
        Ok(())
    }

    pub fn deposit(
        &mut self,
        caller: AccountId,
        asset: &AssetId,
        amount: Amount,
        deposit_policy: DepositPolicy,
    ) -> Result<Amount> {
        self.ensure_no_hold()?;
        self.ensure_active()?;
        self.ensure_depositor(caller, deposit_policy)?;
        if !asset.is_fungible() {
            return Err(LedgerError::UnsupportedAsset);
        }
        self.ledger.deposit(asset, amount)
    }

    /// Deposit NFTs by token id. Returns the count of newly recorded ids.
    pub fn deposit_nft(
        &mut self,
        caller: AccountId,
        collection: &AssetId,
        token_ids: &[u64],
        deposit_policy: DepositPolicy,
    ) -> Result<u64> {
        self.ensure_no_hold()?;
        self.ensure_active()?;
        self.ensure_depositor(caller, deposit_policy)?;
        self.ledger.deposit_tokens(collection, token_ids)
    }

    /// Owner-only draw-down of an undistributed pool, permitted only while
    /// ACTIVE. After trigger the pool shrinks through claims alone.
    pub fn withdraw(&mut self, caller: AccountId, asset: &AssetId, amount: Amount) -> Result<()> {
        self.ensure_no_hold()?;
        self.ensure_active()?;
        self.ensure_owner(caller)?;
        self.ledger.withdraw(asset, amount)
    }

    // ── trigger ─────────────────────────────────────────────────

    /// Start the unlock clock.
    ///
    /// # Errors
    /// - `AlreadyTriggered` if the record has left ACTIVE
    /// - `Unauthorized` if the caller may not trigger (owner/executor; the
    ///   executor alone when `requires_confirmation` is set)
    /// - `NoBeneficiaries` if no active beneficiary exists
    pub fn trigger(&mut self, caller: AccountId, now: u64) -> Result<()> {
        self.ensure_no_hold()?;
        if self.status != RecordStatus::Active {
            return Err(LedgerError::AlreadyTriggered);
        }
        let authorized = if self.requires_confirmation {
            caller == self.executor
        } else {
            caller == self.owner || caller == self.executor
        };
        if !authorized {
            return Err(LedgerError::Unauthorized);
        }
        if !self.allocations.has_active() {
            return Err(LedgerError::NoBeneficiaries);
        }

        self.status = RecordStatus::Triggered;
        self.triggered_at = Some(now);
        Ok(())
    }

    // ── claims ──────────────────────────────────────────────────

    /// Claimable-now amount for `identity` against `asset`. Zero when the
    /// record is not triggered, is on hold, or the identity is unknown or
    /// inactive. Read-only.
    pub fn claimable_amount(&self, asset: &AssetId, identity: AccountId, now: u64) -> Result<Amount> {
        if self.hold.is_some() || self.status != RecordStatus::Triggered {
            return Ok(0);
        }
        let Some(beneficiary) = self.allocations.get(identity) else {
            return Ok(0);
        };
        if !beneficiary.is_active {
            return Ok(0);
        }
        let triggered_at = self
            .triggered_at
            .ok_or(LedgerError::InvariantViolation("triggered record without timestamp"))?;
        let unlocked = policy::unlocked_fraction(triggered_at, now, &self.policy)?;
        self.ledger.claimable(asset, beneficiary, unlocked)
    }

    /// Debit a claim for `caller` and return the claimed amount. A zero
    /// claimable is a successful no-op, deliberately: redundant claim calls
    /// are tolerated. The outbound transfer is the engine's job; the debit
    /// is committed here, before any transfer is initiated.
    ///
    /// # Errors
    /// - `RecordOnHold` under an emergency hold
    /// - `NotTriggered` while the record is still ACTIVE
    /// - `BeneficiaryNotFound` if `caller` is not a beneficiary
    pub fn claim(&mut self, caller: AccountId, asset: &AssetId, now: u64) -> Result<Amount> {
        self.ensure_no_hold()?;
        if self.status == RecordStatus::Active {
            return Err(LedgerError::NotTriggered);
        }
        if self.allocations.get(caller).is_none() {
            return Err(LedgerError::BeneficiaryNotFound);
        }
        if self.status == RecordStatus::Completed {
            return Ok(0);
        }

        let amount = self.claimable_amount(asset, caller, now)?;
        if amount == 0 {
            return Ok(0);
        }

        // Debit before any external transfer (bounds reentrancy exposure).
        let (ledger, allocations) = (&mut self.ledger, &mut self.allocations);
        let beneficiary = allocations
            .get_mut(caller)
            .ok_or(LedgerError::BeneficiaryNotFound)?;
        ledger.record_claim(asset, beneficiary, amount)?;
        Ok(amount)
    }

    /// Restore pre-claim counters after a failed outbound transfer.
    pub fn rollback_claim(
        &mut self,
        identity: AccountId,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<()> {
        let beneficiary = self
            .allocations
            .get_mut(identity)
            .ok_or(LedgerError::BeneficiaryNotFound)?;
        self.ledger.rollback_claim(asset, beneficiary, amount)
    }

    /// Transition to COMPLETED once every pool is fully drained. Called by
    /// the engine after each successful non-zero claim.
    pub fn maybe_complete(&mut self) -> bool {
        if self.status == RecordStatus::Triggered
            && self.ledger.has_deposits()
            && self.ledger.fully_claimed()
        {
            self.status = RecordStatus::Completed;
            return true;
        }
        false
    }

    // ── emergency holds ─────────────────────────────────────────

    fn ensure_hold_authority(&self, caller: AccountId) -> Result<()> {
        let authorized = caller == self.owner || self.arbitrator == Some(caller);
        if !authorized {
            return Err(LedgerError::Unauthorized);
        }
        Ok(())
    }

    /// Place a DISPUTED/FROZEN hold. Blocks every mutating operation on the
    /// record while leaving ledger state untouched.
    pub fn place_hold(&mut self, caller: AccountId, kind: HoldKind) -> Result<()> {
        self.ensure_hold_authority(caller)?;
        if self.status == RecordStatus::Completed {
            return Err(LedgerError::RecordNotActive);
        }
        if self.hold.is_some() {
            return Err(LedgerError::RecordOnHold);
        }
        self.hold = Some(kind);
        Ok(())
    }

    /// Lift a hold, restoring the prior status untouched. Releasing a record
    /// that holds no hold is a no-op; returns whether a hold was lifted.
    pub fn release_hold(&mut self, caller: AccountId) -> Result<bool> {
        self.ensure_hold_authority(caller)?;
        Ok(self.hold.take().is_some())
    }
}
