//! Trade fills.

use super::ids::{OrderId, TradeId};
use super::order::{Direction, Offset};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A fill reported by the execution collaborator. Immutable; appended to the
/// owning strategy's trade log and applied to its position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub order_id: OrderId,
    pub symbol: String,
    pub direction: Direction,
    pub offset: Offset,
    pub price: f64,
    pub volume: f64,
    pub datetime: DateTime<Utc>,
}

impl Trade {
    /// Volume signed by direction: positive for long fills, negative for short.
    pub fn signed_volume(&self) -> f64 {
        self.volume * self.direction.sign()
    }
}
