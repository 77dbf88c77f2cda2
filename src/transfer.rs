//! Value-transfer collaborator. Execution of the actual transfer lives in
//! the host environment; the contract here is all-or-nothing: a failure must
//! not have partially applied, and the engine rolls the ledger debit back.

use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{AccountId, Amount, AssetId};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct TransferError(pub String);

#[async_trait]
pub trait AssetTransfer: Send + Sync {
    /// Move `amount` of `asset` to `to`. All-or-nothing.
    async fn transfer(
        &self,
        asset: &AssetId,
        to: AccountId,
        amount: Amount,
    ) -> Result<(), TransferError>;
}

/// Accepts every transfer without doing anything. Useful when settlement is
/// handled entirely out of band (fiat payout, off-chain indexer).
#[derive(Clone, Copy, Debug, Default)]
pub struct NullTransfer;

#[async_trait]
impl AssetTransfer for NullTransfer {
    async fn transfer(
        &self,
        _asset: &AssetId,
        _to: AccountId,
        _amount: Amount,
    ) -> Result<(), TransferError> {
        Ok(())
    }
}

/// Records every successful transfer. Used by the test suites to assert on
/// actual payouts.
#[derive(Debug, Default)]
pub struct RecordingTransfer {
    log: Mutex<Vec<(AssetId, AccountId, Amount)>>,
}

impl RecordingTransfer {
    pub fn new() -> Self {
        RecordingTransfer::default()
    }

    pub fn transfers(&self) -> Vec<(AssetId, AccountId, Amount)> {
        self.log.lock().expect("transfer log poisoned").clone()
    }

    /// Total paid out to `to` in `asset` across all recorded transfers.
    pub fn total_paid(&self, asset: &AssetId, to: AccountId) -> Amount {
        self.log
            .lock()
            .expect("transfer log poisoned")
            .iter()
            .filter(|(a, t, _)| a == asset && *t == to)
            .map(|(_, _, amount)| amount)
            .sum()
    }
}

#[async_trait]
impl AssetTransfer for RecordingTransfer {
    async fn transfer(
        &self,
        asset: &AssetId,
        to: AccountId,
        amount: Amount,
    ) -> Result<(), TransferError> {
        self.log
            .lock()
            .expect("transfer log poisoned")
            .push((asset.clone(), to, amount));
        Ok(())
    }
}

/// Fails every transfer. Exercises the debit-rollback path.
#[derive(Clone, Copy, Debug, Default)]
pub struct FailingTransfer;

#[async_trait]
impl AssetTransfer for FailingTransfer {
    async fn transfer(
        &self,
        _asset: &AssetId,
        _to: AccountId,
        _amount: Amount,
    ) -> Result<(), TransferError> {
        Err(TransferError("transfer rejected by host".into()))
    }
}
