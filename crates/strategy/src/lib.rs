//! Options strategies for the round vault.
//!
//! [`ShortStrategy`] sells premium against posted collateral and
//! [`LongStrategy`] buys it outright; both run every trade through the same
//! policy pipeline (cooldown, vol variance, strike validity) and track their
//! strikes in a [`strikes::StrikeCache`] until round end.

pub mod collateral;
pub mod config;
pub mod long;
pub mod policy;
pub mod short;
pub mod strikes;

pub use config::{PolicyConfig, StrategyConfig};
pub use long::LongStrategy;
pub use short::ShortStrategy;
pub use strikes::StrikeCache;
