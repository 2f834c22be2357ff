//! Per-strategy net position bookkeeping.

use super::order::Direction;
use super::trade::Trade;
use serde::{Deserialize, Serialize};

/// Signed net position and weighted average entry price for one
/// (strategy, instrument) pair. Updated only by trade application, so the
/// whole state is reconstructible by replaying the trade log from zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub volume: f64,
    pub avg_price: f64,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.volume > 0.0
    }

    pub fn is_short(&self) -> bool {
        self.volume < 0.0
    }

    pub fn is_flat(&self) -> bool {
        self.volume == 0.0
    }

    pub fn unrealized_pnl(&self, mark_price: f64) -> f64 {
        self.volume * (mark_price - self.avg_price)
    }

    /// Apply one fill.
    ///
    /// Average price rules: adding to the position blends the entry price
    /// by volume; reducing leaves it unchanged; crossing through zero
    /// restarts it at the fill price; going flat clears it.
    pub fn apply_fill(&mut self, direction: Direction, price: f64, volume: f64) {
        let signed = volume * direction.sign();
        let new_volume = self.volume + signed;

        if self.volume == 0.0 || self.volume.signum() == signed.signum() {
            // Opening or adding: blend the average entry price.
            let old_abs = self.volume.abs();
            self.avg_price =
                (self.avg_price * old_abs + price * volume) / (old_abs + volume);
        } else if new_volume == 0.0 {
            self.avg_price = 0.0;
        } else if new_volume.signum() != self.volume.signum() {
            // Crossed through zero: the surviving lot was opened at this fill.
            self.avg_price = price;
        }
        // Plain reduction keeps the existing average.

        self.volume = new_volume;
    }

    pub fn apply_trade(&mut self, trade: &Trade) {
        self.apply_fill(trade.direction, trade.price, trade.volume);
    }

    /// Rebuild a position from scratch by replaying a trade log.
    pub fn from_trades<'a>(trades: impl IntoIterator<Item = &'a Trade>) -> Self {
        let mut pos = Position::default();
        for trade in trades {
            pos.apply_trade(trade);
        }
        pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Offset, OrderId, TradeId};
    use chrono::{TimeZone, Utc};

    fn trade(direction: Direction, price: f64, volume: f64) -> Trade {
        Trade {
            id: TradeId(0),
            order_id: OrderId(0),
            symbol: "rb2410".into(),
            direction,
            offset: Offset::Open,
            price,
            volume,
            datetime: Utc.with_ymd_and_hms(2024, 3, 4, 9, 31, 0).unwrap(),
        }
    }

    #[test]
    fn open_and_add_blends_average() {
        let mut pos = Position::default();
        pos.apply_fill(Direction::Long, 100.0, 2.0);
        pos.apply_fill(Direction::Long, 110.0, 2.0);
        assert_eq!(pos.volume, 4.0);
        assert_eq!(pos.avg_price, 105.0);
    }

    #[test]
    fn reduction_keeps_average() {
        let mut pos = Position::default();
        pos.apply_fill(Direction::Long, 100.0, 4.0);
        pos.apply_fill(Direction::Short, 120.0, 1.0);
        assert_eq!(pos.volume, 3.0);
        assert_eq!(pos.avg_price, 100.0);
    }

    #[test]
    fn flat_clears_average() {
        let mut pos = Position::default();
        pos.apply_fill(Direction::Long, 100.0, 2.0);
        pos.apply_fill(Direction::Short, 105.0, 2.0);
        assert!(pos.is_flat());
        assert_eq!(pos.avg_price, 0.0);
    }

    #[test]
    fn crossing_zero_restarts_average() {
        let mut pos = Position::default();
        pos.apply_fill(Direction::Long, 100.0, 1.0);
        pos.apply_fill(Direction::Short, 98.0, 3.0);
        assert_eq!(pos.volume, -2.0);
        assert_eq!(pos.avg_price, 98.0);
    }

    #[test]
    fn reconstructible_from_trade_log() {
        let log = vec![
            trade(Direction::Long, 100.0, 2.0),
            trade(Direction::Short, 101.0, 1.0),
            trade(Direction::Long, 99.0, 3.0),
            trade(Direction::Short, 102.0, 4.0),
        ];
        let mut live = Position::default();
        for t in &log {
            live.apply_trade(t);
        }
        let rebuilt = Position::from_trades(&log);
        assert_eq!(live, rebuilt);

        let signed_sum: f64 = log.iter().map(|t| t.signed_volume()).sum();
        assert_eq!(live.volume, signed_sum);
    }

    #[test]
    fn unrealized_pnl_signs() {
        let mut pos = Position::default();
        pos.apply_fill(Direction::Short, 100.0, 2.0);
        assert_eq!(pos.unrealized_pnl(95.0), 10.0);
        assert_eq!(pos.unrealized_pnl(105.0), -10.0);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Any fill sequence nets out to the signed volume sum.
            #[test]
            fn volume_is_signed_fill_sum(
                fills in proptest::collection::vec(
                    (any::<bool>(), 1.0..200.0f64, 0.1..10.0f64),
                    1..40,
                )
            ) {
                let mut pos = Position::default();
                for &(long, price, volume) in &fills {
                    let direction = if long { Direction::Long } else { Direction::Short };
                    pos.apply_fill(direction, price, volume);
                }
                let signed: f64 = fills
                    .iter()
                    .map(|&(long, _, v)| if long { v } else { -v })
                    .sum();
                prop_assert!((pos.volume - signed).abs() < 1e-9);
            }
        }
    }
}
