//! Per-(record, asset) deposit/claim bookkeeping and claimable-amount math.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::allocation::Beneficiary;
use crate::error::{LedgerError, Result};
use crate::types::{Amount, AssetId, AssetKind, BPS_DENOMINATOR};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetPool {
    pub kind: AssetKind,
    pub total_deposited: Amount,
    pub total_claimed: Amount,
    /// Deposited token ids; populated only for NFT pools, where each id
    /// counts as one unit of `total_deposited`.
    pub token_ids: BTreeSet<u64>,
}

impl AssetPool {
    fn new(kind: AssetKind) -> Self {
        AssetPool {
            kind,
            total_deposited: 0,
            total_claimed: 0,
            token_ids: BTreeSet::new(),
        }
    }

    pub fn unclaimed(&self) -> Amount {
        self.total_deposited.saturating_sub(self.total_claimed)
    }
}

/// Asset pools for one record. Pure bookkeeping: status and authorization
/// gating happens in the record layer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetLedger {
    pools: BTreeMap<AssetId, AssetPool>,
}

impl AssetLedger {
    pub fn new() -> Self {
        AssetLedger::default()
    }

    /// Accumulate a deposit. Repeated deposits add.
    pub fn deposit(&mut self, asset: &AssetId, amount: Amount) -> Result<Amount> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let pool = self
            .pools
            .entry(asset.clone())
            .or_insert_with(|| AssetPool::new(asset.kind()));
        pool.total_deposited = pool
            .total_deposited
            .checked_add(amount)
            .ok_or(LedgerError::InvariantViolation("deposit total overflows u128"))?;
        Ok(pool.total_deposited)
    }

    /// Deposit NFTs by token id into a collection pool. Already-present ids
    /// are ignored; each newly recorded id adds one unit to the pool total.
    /// Returns the count of newly recorded ids.
    pub fn deposit_tokens(&mut self, collection: &AssetId, token_ids: &[u64]) -> Result<u64> {
        if !matches!(collection, AssetId::Nft(_)) {
            return Err(LedgerError::UnsupportedAsset);
        }
        if token_ids.is_empty() {
            return Err(LedgerError::ZeroAmount);
        }
        let pool = self
            .pools
            .entry(collection.clone())
            .or_insert_with(|| AssetPool::new(AssetKind::NonFungible));
        let mut added = 0u64;
        for id in token_ids {
            if pool.token_ids.insert(*id) {
                added += 1;
            }
        }
        if added == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        pool.total_deposited = pool
            .total_deposited
            .checked_add(added as Amount)
            .ok_or(LedgerError::InvariantViolation("deposit total overflows u128"))?;
        Ok(added)
    }

    /// Reduce a fungible pool while the record is still accumulating.
    /// NFT pools cannot be drawn down by amount.
    pub fn withdraw(&mut self, asset: &AssetId, amount: Amount) -> Result<()> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        if !asset.is_fungible() {
            return Err(LedgerError::UnsupportedAsset);
        }
        let pool = self.pools.get_mut(asset).ok_or(LedgerError::InsufficientBalance {
            available: 0,
            requested: amount,
        })?;
        let available = pool.unclaimed();
        if amount > available {
            return Err(LedgerError::InsufficientBalance {
                available,
                requested: amount,
            });
        }
        pool.total_deposited -= amount;
        Ok(())
    }

    /// Claimable-now amount for one beneficiary against one pool:
    /// `deposited × allocation_bp × unlocked_bp / 10000² − already claimed`,
    /// floored at zero (a withdrawal during ACTIVE can shrink the effective
    /// balance below an earlier entitlement).
    pub fn claimable(
        &self,
        asset: &AssetId,
        beneficiary: &Beneficiary,
        unlocked_bp: u32,
    ) -> Result<Amount> {
        let Some(pool) = self.pools.get(asset) else {
            return Ok(0);
        };
        let entitled = pool
            .total_deposited
            .checked_mul(beneficiary.allocation_bp as Amount)
            .and_then(|v| v.checked_mul(unlocked_bp as Amount))
            .ok_or(LedgerError::InvariantViolation("entitlement math overflows u128"))?
            / (BPS_DENOMINATOR as Amount * BPS_DENOMINATOR as Amount);
        Ok(entitled.saturating_sub(beneficiary.claimed_for(asset)))
    }

    /// Debit a claim: bump the beneficiary's claimed counter and the pool's
    /// `total_claimed`. The over-claim check runs before any mutation.
    pub fn record_claim(
        &mut self,
        asset: &AssetId,
        beneficiary: &mut Beneficiary,
        amount: Amount,
    ) -> Result<()> {
        let pool = self
            .pools
            .get_mut(asset)
            .ok_or(LedgerError::InvariantViolation("claim against missing pool"))?;
        let claimed = pool
            .total_claimed
            .checked_add(amount)
            .ok_or(LedgerError::InvariantViolation("claim total overflows u128"))?;
        if claimed > pool.total_deposited {
            return Err(LedgerError::InvariantViolation(
                "total claimed would exceed total deposited",
            ));
        }
        pool.total_claimed = claimed;
        let entry = beneficiary.claimed.entry(asset.clone()).or_insert(0);
        *entry += amount;
        Ok(())
    }

    /// Undo a debit after a failed outbound transfer. Restores the exact
    /// pre-claim counters.
    pub fn rollback_claim(
        &mut self,
        asset: &AssetId,
        beneficiary: &mut Beneficiary,
        amount: Amount,
    ) -> Result<()> {
        let pool = self
            .pools
            .get_mut(asset)
            .ok_or(LedgerError::InvariantViolation("rollback against missing pool"))?;
        pool.total_claimed = pool
            .total_claimed
            .checked_sub(amount)
            .ok_or(LedgerError::InvariantViolation("rollback exceeds claimed total"))?;
        let entry = beneficiary
            .claimed
            .get_mut(asset)
            .ok_or(LedgerError::InvariantViolation("rollback for unclaimed asset"))?;
        *entry = entry
            .checked_sub(amount)
            .ok_or(LedgerError::InvariantViolation("rollback exceeds claimed total"))?;
        Ok(())
    }

    /// True when every pool is fully drained (`total_claimed ==
    /// total_deposited`). Empty pools count as drained.
    pub fn fully_claimed(&self) -> bool {
        self.pools
            .values()
            .all(|p| p.total_claimed == p.total_deposited)
    }

    /// True once at least one pool has ever held a deposit.
    pub fn has_deposits(&self) -> bool {
        self.pools.values().any(|p| p.total_deposited > 0 || p.total_claimed > 0)
    }

    pub fn get(&self, asset: &AssetId) -> Option<&AssetPool> {
        self.pools.get(asset)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AssetId, &AssetPool)> {
        self.pools.iter()
    }
}
