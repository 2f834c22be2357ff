//! Order request and active-order lifecycle types.

use super::ids::OrderId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// Sign applied to volumes when updating a net position.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }
}

/// Whether an order opens a new position or closes an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Offset {
    Open,
    Close,
}

/// Execution price instruction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PriceType {
    /// Fill at the next available price.
    Market,
    /// Fill at the given price or better.
    Limit(f64),
}

/// An order a strategy wants executed. Consumed by the engine (market/limit)
/// or, for stop orders, by the local stop-order simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub direction: Direction,
    pub offset: Offset,
    pub price: PriceType,
    pub volume: f64,
}

/// Order lifecycle states. `AllTraded`, `Cancelled` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Submitting,
    NotTraded,
    PartTraded,
    AllTraded,
    Cancelled,
    Rejected,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Submitting => "submitting",
            OrderStatus::NotTraded => "not traded",
            OrderStatus::PartTraded => "part traded",
            OrderStatus::AllTraded => "all traded",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Rejected => "rejected",
        };
        write!(f, "{s}")
    }
}

/// A submitted order as last reported by the execution collaborator.
///
/// Mutated only by order-status events; ownership (which strategy placed it)
/// is tracked in the engine's order maps, not on the order itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveOrder {
    pub id: OrderId,
    pub symbol: String,
    pub direction: Direction,
    pub offset: Offset,
    pub price: PriceType,
    pub volume: f64,
    pub traded: f64,
    pub status: OrderStatus,
    pub datetime: DateTime<Utc>,
}

impl ActiveOrder {
    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            OrderStatus::Submitting | OrderStatus::NotTraded | OrderStatus::PartTraded
        )
    }

    pub fn remaining(&self) -> f64 {
        self.volume - self.traded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn order(status: OrderStatus) -> ActiveOrder {
        ActiveOrder {
            id: OrderId(7),
            symbol: "rb2410".into(),
            direction: Direction::Long,
            offset: Offset::Open,
            price: PriceType::Limit(3900.0),
            volume: 3.0,
            traded: 1.0,
            status,
            datetime: Utc.with_ymd_and_hms(2024, 3, 4, 9, 31, 0).unwrap(),
        }
    }

    #[test]
    fn active_states() {
        assert!(order(OrderStatus::Submitting).is_active());
        assert!(order(OrderStatus::NotTraded).is_active());
        assert!(order(OrderStatus::PartTraded).is_active());
        assert!(!order(OrderStatus::AllTraded).is_active());
        assert!(!order(OrderStatus::Cancelled).is_active());
        assert!(!order(OrderStatus::Rejected).is_active());
    }

    #[test]
    fn remaining_volume() {
        assert_eq!(order(OrderStatus::PartTraded).remaining(), 2.0);
    }
}
