pub mod config;
pub mod config_loader;
pub mod error;
pub mod fees;
pub mod receipts;
pub mod shares;
pub mod traits;
pub mod vault;

pub use config::VaultParams;
pub use config_loader::ConfigLoader;
pub use error::{StrategyError, VaultError};
pub use fees::{FeeBreakdown, FeeConfig};
pub use receipts::{DepositReceipt, WithdrawalReceipt};
pub use shares::{AccountId, ShareLedger};
pub use traits::{Strategy, TradeOutcome};
pub use vault::Vault;
