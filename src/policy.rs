//! Unlock schedules: pure mapping from (trigger time, now, policy) to an
//! unlocked fraction in basis points. No mutable state beyond the policy.

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::types::BPS_DENOMINATOR;

/// Sanity ceiling on every duration and milestone offset: 50 years.
/// Rejects misconfiguration and keeps timestamp arithmetic far from overflow.
pub const MAX_DURATION_SECS: u64 = 50 * 365 * 24 * 60 * 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// Everything unlocks as soon as the cliff (if any) has passed.
    Immediate,
    /// 0% to 100% linearly over `vesting_secs`, after the cliff.
    Linear,
    /// Same formula as `Immediate`; kept as a distinct tag so the owner's
    /// intent (an explicit waiting period) survives in the data.
    Cliff,
    /// Discrete cumulative unlocks at fixed offsets from the trigger.
    Milestone,
}

/// One step of a milestone schedule. `offset_secs` is measured from the
/// trigger timestamp, not from the end of the cliff.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub offset_secs: u64,
    pub cumulative_bp: u32,
}

/// Unlock policy, embedded in a record at creation and frozen once the
/// record is triggered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockPolicy {
    pub kind: PolicyKind,
    /// Seconds after trigger before anything unlocks. Applies to all kinds.
    pub cliff_secs: u64,
    /// Ramp duration for `Linear`; ignored by the other kinds.
    pub vesting_secs: u64,
    /// Schedule for `Milestone`; empty for the other kinds.
    pub milestones: Vec<Milestone>,
}

impl UnlockPolicy {
    pub fn immediate(cliff_secs: u64) -> Self {
        UnlockPolicy {
            kind: PolicyKind::Immediate,
            cliff_secs,
            vesting_secs: 0,
            milestones: Vec::new(),
        }
    }

    pub fn cliff(cliff_secs: u64) -> Self {
        UnlockPolicy {
            kind: PolicyKind::Cliff,
            cliff_secs,
            vesting_secs: 0,
            milestones: Vec::new(),
        }
    }

    pub fn linear(cliff_secs: u64, vesting_secs: u64) -> Self {
        UnlockPolicy {
            kind: PolicyKind::Linear,
            cliff_secs,
            vesting_secs,
            milestones: Vec::new(),
        }
    }

    pub fn milestones(cliff_secs: u64, milestones: Vec<Milestone>) -> Self {
        UnlockPolicy {
            kind: PolicyKind::Milestone,
            cliff_secs,
            vesting_secs: 0,
            milestones,
        }
    }

    /// Validate the policy once, at record creation. `unlocked_fraction`
    /// assumes a policy that has passed this check.
    pub fn validate(&self) -> Result<()> {
        if self.cliff_secs > MAX_DURATION_SECS {
            return Err(LedgerError::InvalidPolicy("cliff exceeds sanity ceiling"));
        }

        match self.kind {
            PolicyKind::Immediate | PolicyKind::Cliff => {
                if !self.milestones.is_empty() {
                    return Err(LedgerError::InvalidPolicy(
                        "milestones only apply to the milestone kind",
                    ));
                }
            }
            PolicyKind::Linear => {
                if self.vesting_secs == 0 {
                    return Err(LedgerError::InvalidPolicy(
                        "linear policy requires a non-zero vesting duration",
                    ));
                }
                if self.vesting_secs > MAX_DURATION_SECS {
                    return Err(LedgerError::InvalidPolicy(
                        "vesting duration exceeds sanity ceiling",
                    ));
                }
                if !self.milestones.is_empty() {
                    return Err(LedgerError::InvalidPolicy(
                        "milestones only apply to the milestone kind",
                    ));
                }
            }
            PolicyKind::Milestone => {
                if self.milestones.is_empty() {
                    return Err(LedgerError::InvalidPolicy(
                        "milestone policy requires at least one milestone",
                    ));
                }
                let mut prev_offset: Option<u64> = None;
                let mut prev_bp = 0u32;
                for m in &self.milestones {
                    if m.offset_secs > MAX_DURATION_SECS {
                        return Err(LedgerError::InvalidPolicy(
                            "milestone offset exceeds sanity ceiling",
                        ));
                    }
                    if let Some(prev) = prev_offset {
                        if m.offset_secs <= prev {
                            return Err(LedgerError::InvalidPolicy(
                                "milestone offsets must be strictly increasing",
                            ));
                        }
                    }
                    if m.cumulative_bp < prev_bp || m.cumulative_bp > BPS_DENOMINATOR {
                        return Err(LedgerError::InvalidPolicy(
                            "milestone percentages must be non-decreasing and at most 10000",
                        ));
                    }
                    prev_offset = Some(m.offset_secs);
                    prev_bp = m.cumulative_bp;
                }
                if prev_bp != BPS_DENOMINATOR {
                    return Err(LedgerError::InvalidPolicy(
                        "final milestone must unlock exactly 10000 bp",
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Fraction of the allocation unlocked as of `now`, in basis points.
///
/// # Errors
/// - `ClockSkew` if `now` precedes `triggered_at` (caller error)
/// - `InvariantViolation` if the policy was never validated and its
///   durations push timestamp arithmetic out of range
pub fn unlocked_fraction(triggered_at: u64, now: u64, policy: &UnlockPolicy) -> Result<u32> {
    if now < triggered_at {
        return Err(LedgerError::ClockSkew);
    }

    let cliff_end = triggered_at
        .checked_add(policy.cliff_secs)
        .ok_or(LedgerError::InvariantViolation("cliff end overflows u64"))?;

    match policy.kind {
        PolicyKind::Immediate | PolicyKind::Cliff => {
            if now < cliff_end {
                Ok(0)
            } else {
                Ok(BPS_DENOMINATOR)
            }
        }
        PolicyKind::Linear => {
            if now < cliff_end {
                return Ok(0);
            }
            let vesting_end = cliff_end
                .checked_add(policy.vesting_secs)
                .ok_or(LedgerError::InvariantViolation("vesting end overflows u64"))?;
            if now >= vesting_end {
                return Ok(BPS_DENOMINATOR);
            }
            // Truncating division, exact 0 at the start and exact 10000 at
            // vesting end (the >= branch above).
            let elapsed = (now - cliff_end) as u128;
            let fraction = elapsed * BPS_DENOMINATOR as u128 / policy.vesting_secs as u128;
            Ok(fraction as u32)
        }
        PolicyKind::Milestone => {
            if now < cliff_end {
                return Ok(0);
            }
            let mut unlocked = 0u32;
            for m in &policy.milestones {
                let due = triggered_at
                    .checked_add(m.offset_secs)
                    .ok_or(LedgerError::InvariantViolation("milestone due time overflows u64"))?;
                if due <= now {
                    unlocked = m.cumulative_bp;
                } else {
                    break;
                }
            }
            Ok(unlocked)
        }
    }
}
