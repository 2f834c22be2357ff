//! Locally-simulated stop orders.

use super::ids::{OrderId, StopOrderId};
use super::order::{Direction, Offset, PriceType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stop order states. `Triggered` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopOrderStatus {
    Waiting,
    Triggered,
    Cancelled,
}

/// A virtual stop order held in the local simulator.
///
/// Never visible to the execution collaborator: once the trigger condition
/// is met, exactly one real order is synthesized from the template fields
/// and the stop order transitions to `Triggered`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopOrder {
    pub id: StopOrderId,
    pub symbol: String,
    pub direction: Direction,
    pub offset: Offset,
    /// Trigger level: a long stop fires on price >= this, a short stop on <=.
    pub stop_price: f64,
    pub volume: f64,
    /// How the synthesized real order is priced once triggered.
    pub convert_price: PriceType,
    pub status: StopOrderStatus,
    pub datetime: DateTime<Utc>,
    /// The real order created on trigger, if any. At most one ever exists.
    pub converted_order: Option<OrderId>,
}

impl StopOrder {
    pub fn is_waiting(&self) -> bool {
        self.status == StopOrderStatus::Waiting
    }

    /// Whether `price` satisfies the trigger condition.
    pub fn triggers_at(&self, price: f64) -> bool {
        match self.direction {
            Direction::Long => price >= self.stop_price,
            Direction::Short => price <= self.stop_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn stop(direction: Direction, stop_price: f64) -> StopOrder {
        StopOrder {
            id: StopOrderId(1),
            symbol: "rb2410".into(),
            direction,
            offset: Offset::Open,
            stop_price,
            volume: 1.0,
            convert_price: PriceType::Market,
            status: StopOrderStatus::Waiting,
            datetime: Utc.with_ymd_and_hms(2024, 3, 4, 9, 30, 0).unwrap(),
            converted_order: None,
        }
    }

    #[test]
    fn long_stop_triggers_at_or_above() {
        let so = stop(Direction::Long, 100.0);
        assert!(!so.triggers_at(99.9));
        assert!(so.triggers_at(100.0));
        assert!(so.triggers_at(101.0));
    }

    #[test]
    fn short_stop_triggers_at_or_below() {
        let so = stop(Direction::Short, 95.0);
        assert!(!so.triggers_at(95.1));
        assert!(so.triggers_at(95.0));
        assert!(so.triggers_at(94.0));
    }
}
