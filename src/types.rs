use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Allocation and unlock fractions are expressed in basis points
/// (10000 = 100%) for exact integer arithmetic.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Arena-assigned record identifier. Starts at 1.
pub type RecordId = u64;

/// Amounts are unsigned 128-bit so that `amount * bp * bp` fits comfortably
/// during claimable-amount computation.
pub type Amount = u128;

/// Wallet/account reference. The nil UUID plays the role of the zero
/// address: it is rejected wherever a real identity is required.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AccountId(pub Uuid);

impl AccountId {
    /// Generate a fresh random identity.
    pub fn generate() -> Self {
        AccountId(Uuid::new_v4())
    }

    /// The zero-address equivalent.
    pub fn nil() -> Self {
        AccountId(Uuid::nil())
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Uuid> for AccountId {
    fn from(id: Uuid) -> Self {
        AccountId(id)
    }
}

/// Asset identifier: the native coin, a fungible token by symbol, or an
/// NFT collection by name. NFT pools additionally track deposited token ids.
#[derive(
    Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum AssetId {
    Native,
    Token(String),
    Nft(String),
}

impl AssetId {
    pub fn kind(&self) -> AssetKind {
        match self {
            AssetId::Native => AssetKind::Native,
            AssetId::Token(_) => AssetKind::FungibleToken,
            AssetId::Nft(_) => AssetKind::NonFungible,
        }
    }

    pub fn is_fungible(&self) -> bool {
        !matches!(self, AssetId::Nft(_))
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetId::Native => write!(f, "native"),
            AssetId::Token(symbol) => write!(f, "token:{symbol}"),
            AssetId::Nft(collection) => write!(f, "nft:{collection}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Native,
    FungibleToken,
    NonFungible,
}

/// Linear record lifecycle. Emergency holds (disputed/frozen) are modeled
/// separately so that releasing a hold restores the prior status untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Active,
    Triggered,
    Completed,
}

/// Opaque emergency hold. Blocks deposits, withdrawals, triggers and claims
/// without altering any ledger state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldKind {
    Disputed,
    Frozen,
}
