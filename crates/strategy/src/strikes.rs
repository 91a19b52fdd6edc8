//! Strike/position cache.
//!
//! Maps strikes traded this round to their market position and last trade
//! time. Entries are only removed after the market confirms the position is
//! terminal, and always keyed by strike id; clearing speculatively would
//! desynchronize this bookkeeping from the venue's ground truth.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use round_vault_market::{PositionId, StrikeId};

#[derive(Debug, Clone)]
pub struct StrikeEntry {
    /// Open position on this strike, if any.
    pub position_id: Option<PositionId>,
    pub last_trade_at: DateTime<Utc>,
}

/// Per-round bookkeeping of traded strikes.
#[derive(Debug, Default)]
pub struct StrikeCache {
    entries: BTreeMap<StrikeId, StrikeEntry>,
}

impl StrikeCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn active_strike_ids(&self) -> Vec<StrikeId> {
        self.entries.keys().copied().collect()
    }

    #[must_use]
    pub fn last_trade_at(&self, strike_id: StrikeId) -> Option<DateTime<Utc>> {
        self.entries.get(&strike_id).map(|e| e.last_trade_at)
    }

    #[must_use]
    pub fn position_for_strike(&self, strike_id: StrikeId) -> Option<PositionId> {
        self.entries.get(&strike_id).and_then(|e| e.position_id)
    }

    #[must_use]
    pub fn strike_for_position(&self, position_id: PositionId) -> Option<StrikeId> {
        self.entries
            .iter()
            .find(|(_, e)| e.position_id == Some(position_id))
            .map(|(strike_id, _)| *strike_id)
    }

    /// All (strike, position) pairs with an open position.
    #[must_use]
    pub fn tracked_positions(&self) -> Vec<(StrikeId, PositionId)> {
        self.entries
            .iter()
            .filter_map(|(strike_id, e)| e.position_id.map(|p| (*strike_id, p)))
            .collect()
    }

    pub fn record_trade(
        &mut self,
        strike_id: StrikeId,
        position_id: PositionId,
        now: DateTime<Utc>,
    ) {
        let entry = self.entries.entry(strike_id).or_insert(StrikeEntry {
            position_id: None,
            last_trade_at: now,
        });
        entry.position_id = Some(position_id);
        entry.last_trade_at = now;
    }

    /// Drops the position link after a full close; the strike stays tracked
    /// so its cooldown keeps applying.
    pub fn clear_position(&mut self, strike_id: StrikeId) {
        if let Some(entry) = self.entries.get_mut(&strike_id) {
            entry.position_id = None;
        }
    }

    /// Removes one strike's entry, timestamp included.
    pub fn remove(&mut self, strike_id: StrikeId) -> Option<StrikeEntry> {
        self.entries.remove(&strike_id)
    }
}
