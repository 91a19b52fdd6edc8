use round_vault_core::{FeeConfig, VaultParams};
use round_vault_strategy::{PolicyConfig, StrategyConfig};
use serde::{Deserialize, Serialize};

/// Top-level configuration for the demo runner.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub vault: VaultParams,
    pub fees: FeeConfig,
    pub policy: PolicyConfig,
    pub strategy: StrategyConfig,
}
