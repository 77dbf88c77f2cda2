use thiserror::Error;

use crate::transfer::TransferError;
use crate::types::{Amount, RecordId};

/// Every failure mode of the ledger core. Errors are returned before any
/// state mutation, with one exception: a failed outbound transfer rolls its
/// debit back and surfaces as `TransferFailed`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    // ── validation ──────────────────────────────────────────────
    #[error("identity is nil or coincides with the record owner")]
    InvalidIdentity,

    #[error("allocation must be in (0, 10000] basis points")]
    InvalidAllocation,

    #[error("beneficiary already present on this record")]
    DuplicateBeneficiary,

    #[error("allocation overflow: {current} bp allocated, {requested} bp requested")]
    AllocationOverflow { current: u32, requested: u32 },

    #[error("beneficiary capacity of {max} reached")]
    CapacityExceeded { max: usize },

    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("invalid unlock policy: {0}")]
    InvalidPolicy(&'static str),

    #[error("executor or arbitrator identity is nil")]
    InvalidExecutor,

    // ── state ───────────────────────────────────────────────────
    #[error("record {0} not found")]
    RecordNotFound(RecordId),

    #[error("record is not in the ACTIVE state")]
    RecordNotActive,

    #[error("record was already triggered")]
    AlreadyTriggered,

    #[error("record has not been triggered yet")]
    NotTriggered,

    #[error("record has no active beneficiaries")]
    NoBeneficiaries,

    #[error("record is under an emergency hold")]
    RecordOnHold,

    // ── authorization ───────────────────────────────────────────
    #[error("caller is not authorized for this operation")]
    Unauthorized,

    #[error("caller is not a beneficiary of this record")]
    BeneficiaryNotFound,

    // ── runtime ─────────────────────────────────────────────────
    #[error("insufficient balance: {available} available, {requested} requested")]
    InsufficientBalance { available: Amount, requested: Amount },

    #[error("operation not supported for this asset kind")]
    UnsupportedAsset,

    #[error("clock skew: now precedes the trigger timestamp")]
    ClockSkew,

    #[error("outbound transfer failed: {0}")]
    TransferFailed(#[from] TransferError),

    /// Unreachable given the validation above; indicates a logic bug.
    /// The operation is halted, never silently clamped.
    #[error("ledger invariant violated: {0}")]
    InvariantViolation(&'static str),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
