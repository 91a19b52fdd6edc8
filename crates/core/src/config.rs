use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Vault-level parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultParams {
    /// Maximum assets under management accepted by `deposit`.
    pub cap: Decimal,
    /// Account allowed to roll rounds and change configuration.
    pub manager: String,
    /// Account credited with assessed fees.
    pub fee_recipient: String,
}

impl Default for VaultParams {
    fn default() -> Self {
        Self {
            cap: Decimal::from(1_000_000),
            manager: "manager".to_string(),
            fee_recipient: "fee-recipient".to_string(),
        }
    }
}
