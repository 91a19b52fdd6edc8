//! Fungible share accounting.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::VaultError;

/// Identity of a depositor, manager, or internal custody account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Mint/burn/transfer ledger for vault shares.
#[derive(Debug, Default)]
pub struct ShareLedger {
    balances: HashMap<AccountId, Decimal>,
    total_supply: Decimal,
}

impl ShareLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn total_supply(&self) -> Decimal {
        self.total_supply
    }

    #[must_use]
    pub fn balance_of(&self, account: &AccountId) -> Decimal {
        self.balances.get(account).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn mint(&mut self, to: &AccountId, amount: Decimal) {
        *self.balances.entry(to.clone()).or_insert(Decimal::ZERO) += amount;
        self.total_supply += amount;
    }

    pub fn burn(&mut self, from: &AccountId, amount: Decimal) -> Result<(), VaultError> {
        let balance = self.balance_of(from);
        if balance < amount {
            return Err(VaultError::InsufficientShares {
                requested: amount,
                available: balance,
            });
        }
        self.balances.insert(from.clone(), balance - amount);
        self.total_supply -= amount;
        Ok(())
    }

    pub fn transfer(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        amount: Decimal,
    ) -> Result<(), VaultError> {
        let balance = self.balance_of(from);
        if balance < amount {
            return Err(VaultError::InsufficientShares {
                requested: amount,
                available: balance,
            });
        }
        self.balances.insert(from.clone(), balance - amount);
        *self.balances.entry(to.clone()).or_insert(Decimal::ZERO) += amount;
        Ok(())
    }
}
