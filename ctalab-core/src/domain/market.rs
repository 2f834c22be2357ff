//! Market data types: ticks and bars.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bar interval. `Minute(n)` covers n-minute bars; `Minute(1)` is the base
/// interval the [`BarGenerator`](crate::bar_generator::BarGenerator) emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interval {
    Minute(u32),
    Hour,
    Daily,
}

/// A single market data tick. Immutable external input.
///
/// `volume` is the volume traded at this tick (not a cumulative session
/// counter): bar volume is the plain sum of tick volumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub symbol: String,
    pub datetime: DateTime<Utc>,
    pub last_price: f64,
    pub volume: f64,
    pub open_interest: f64,
    pub bid_price: f64,
    pub bid_volume: f64,
    pub ask_price: f64,
    pub ask_volume: f64,
}

impl Tick {
    /// A bare last-price tick with empty book snapshot. Test and replay helper.
    pub fn trade(symbol: &str, datetime: DateTime<Utc>, last_price: f64, volume: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            datetime,
            last_price,
            volume,
            open_interest: 0.0,
            bid_price: 0.0,
            bid_volume: 0.0,
            ask_price: 0.0,
            ask_volume: 0.0,
        }
    }
}

/// A fixed-interval OHLCV aggregate. Immutable once emitted.
///
/// `datetime` is the bar-close time: a 1-minute bar built from ticks in
/// [09:30:00, 09:31:00) is stamped 09:31:00.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub interval: Interval,
    pub datetime: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub open_interest: f64,
}
