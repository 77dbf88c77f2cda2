//! Beneficiary set and basis-point shares for one record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::types::{AccountId, Amount, AssetId, BPS_DENOMINATOR};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Beneficiary {
    pub identity: AccountId,
    pub allocation_bp: u32,
    /// Inactive beneficiaries keep their claimed history but are excluded
    /// from new claims and from the allocation-total check.
    pub is_active: bool,
    /// Cumulative amount claimed by this beneficiary, per asset.
    pub claimed: BTreeMap<AssetId, Amount>,
}

impl Beneficiary {
    fn new(identity: AccountId, allocation_bp: u32) -> Self {
        Beneficiary {
            identity,
            allocation_bp,
            is_active: true,
            claimed: BTreeMap::new(),
        }
    }

    pub fn claimed_for(&self, asset: &AssetId) -> Amount {
        self.claimed.get(asset).copied().unwrap_or(0)
    }
}

/// Beneficiary table for one record. Entries keep insertion order; active
/// allocations never sum past 10000 bp.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationTable {
    entries: Vec<Beneficiary>,
}

impl AllocationTable {
    pub fn new() -> Self {
        AllocationTable::default()
    }

    /// Add a beneficiary.
    ///
    /// # Errors
    /// - `InvalidIdentity` if `identity` is nil or equals `owner`
    /// - `InvalidAllocation` if `bp` is outside (0, 10000]
    /// - `DuplicateBeneficiary` if `identity` is already present
    /// - `CapacityExceeded` if the table holds `max_beneficiaries` entries
    /// - `AllocationOverflow` if active allocations would exceed 10000 bp
    pub fn add(
        &mut self,
        owner: AccountId,
        identity: AccountId,
        bp: u32,
        max_beneficiaries: usize,
    ) -> Result<()> {
        if identity.is_nil() || identity == owner {
            return Err(LedgerError::InvalidIdentity);
        }
        if bp == 0 || bp > BPS_DENOMINATOR {
            return Err(LedgerError::InvalidAllocation);
        }
        if self.get(identity).is_some() {
            return Err(LedgerError::DuplicateBeneficiary);
        }
        if self.entries.len() >= max_beneficiaries {
            return Err(LedgerError::CapacityExceeded {
                max: max_beneficiaries,
            });
        }
        let current = self.total_allocated();
        if current + bp > BPS_DENOMINATOR {
            return Err(LedgerError::AllocationOverflow {
                current,
                requested: bp,
            });
        }

        self.entries.push(Beneficiary::new(identity, bp));
        Ok(())
    }

    /// Remove a beneficiary outright, returning the removed entry.
    pub fn remove(&mut self, identity: AccountId) -> Result<Beneficiary> {
        let index = self
            .entries
            .iter()
            .position(|b| b.identity == identity)
            .ok_or(LedgerError::BeneficiaryNotFound)?;
        Ok(self.entries.remove(index))
    }

    /// Change a beneficiary's share, re-validating the ≤10000 bp invariant
    /// against all other active entries.
    pub fn update_allocation(&mut self, identity: AccountId, bp: u32) -> Result<()> {
        if bp == 0 || bp > BPS_DENOMINATOR {
            return Err(LedgerError::InvalidAllocation);
        }
        let others: u32 = self
            .entries
            .iter()
            .filter(|b| b.is_active && b.identity != identity)
            .map(|b| b.allocation_bp)
            .sum();
        let entry = self.get_mut(identity).ok_or(LedgerError::BeneficiaryNotFound)?;
        if entry.is_active && others + bp > BPS_DENOMINATOR {
            return Err(LedgerError::AllocationOverflow {
                current: others,
                requested: bp,
            });
        }
        entry.allocation_bp = bp;
        Ok(())
    }

    /// Activate or deactivate a beneficiary. Re-activation re-validates the
    /// allocation-sum invariant.
    pub fn set_active(&mut self, identity: AccountId, active: bool) -> Result<()> {
        let others: u32 = self
            .entries
            .iter()
            .filter(|b| b.is_active && b.identity != identity)
            .map(|b| b.allocation_bp)
            .sum();
        let entry = self.get_mut(identity).ok_or(LedgerError::BeneficiaryNotFound)?;
        if active && !entry.is_active && others + entry.allocation_bp > BPS_DENOMINATOR {
            return Err(LedgerError::AllocationOverflow {
                current: others,
                requested: entry.allocation_bp,
            });
        }
        entry.is_active = active;
        Ok(())
    }

    pub fn get(&self, identity: AccountId) -> Option<&Beneficiary> {
        self.entries.iter().find(|b| b.identity == identity)
    }

    pub fn get_mut(&mut self, identity: AccountId) -> Option<&mut Beneficiary> {
        self.entries.iter_mut().find(|b| b.identity == identity)
    }

    /// Sum of active allocations in basis points. Not required to reach
    /// 10000: an under-allocated remainder is simply never claimable.
    pub fn total_allocated(&self) -> u32 {
        self.entries
            .iter()
            .filter(|b| b.is_active)
            .map(|b| b.allocation_bp)
            .sum()
    }

    pub fn has_active(&self) -> bool {
        self.entries.iter().any(|b| b.is_active)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Beneficiary> {
        self.entries.iter()
    }
}
