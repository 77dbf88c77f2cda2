//! Engine configuration, layered from built-in defaults and `HEIRVAULT_*`
//! environment variables.

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Who may deposit into an ACTIVE record. The source contracts disagree
/// between variants, so it is a flag rather than a hard-coded answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepositPolicy {
    OwnerOnly,
    OwnerOrExecutor,
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct EngineConfig {
    /// Per-record beneficiary cap. Bounds iteration cost on every
    /// allocation check.
    pub max_beneficiaries: usize,
    pub deposit_policy: DepositPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_beneficiaries: 10,
            deposit_policy: DepositPolicy::OwnerOnly,
        }
    }
}

impl EngineConfig {
    /// Load defaults overridden by `HEIRVAULT_MAX_BENEFICIARIES` /
    /// `HEIRVAULT_DEPOSIT_POLICY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("max_beneficiaries", 10)?
            .set_default("deposit_policy", "owner_only")?
            .add_source(Environment::with_prefix("HEIRVAULT").try_parsing(true))
            .build()?
            .try_deserialize()
    }
}
