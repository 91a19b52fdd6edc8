//! Market-side error taxonomy.
//!
//! These are the rejections the options market itself produces. Callers
//! propagate them unchanged; the vault core never retries or reinterprets.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::{BoardId, PositionId, StrikeId};

/// Errors returned by the options-market collaborator.
#[derive(Error, Debug)]
pub enum MarketError {
    /// Board id is unknown.
    #[error("Board {0} not found")]
    BoardNotFound(BoardId),

    /// Strike id is unknown.
    #[error("Strike {0} not found")]
    StrikeNotFound(StrikeId),

    /// Position id is unknown.
    #[error("Position {0} not found")]
    PositionNotFound(PositionId),

    /// Position exists but is no longer active.
    #[error("Position {0} is not active")]
    PositionNotActive(PositionId),

    /// Board is frozen and rejects all trades.
    #[error("Board {0} is frozen")]
    BoardFrozen(BoardId),

    /// Executed premium fell outside the caller's price-protection bounds.
    #[error("Total cost {total_cost} outside bounds [{min}, {max}]")]
    TotalCostOutsideBounds {
        total_cost: Decimal,
        min: Decimal,
        max: Decimal,
    },

    /// Short position would hold less than the market-mandated minimum.
    #[error("Collateral {provided} below market minimum {min_required}")]
    InsufficientCollateral {
        provided: Decimal,
        min_required: Decimal,
    },

    /// Position must be closed via the force-close path.
    #[error("Position {0} outside the safe-close window, force close required")]
    ForceCloseRequired(PositionId),

    /// Exchange returned less than the caller's minimum-received guard.
    #[error("Exchange returned {received}, below minimum {min_received}")]
    SlippageExceeded {
        received: Decimal,
        min_received: Decimal,
    },

    /// Trade amount must be positive.
    #[error("Trade amount must be positive")]
    InvalidAmount,
}
