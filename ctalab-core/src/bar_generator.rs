//! Tick-to-bar aggregation.
//!
//! Ticks for one instrument are folded into 1-minute bars on the wall-clock
//! minute boundary of the tick timestamp, not on tick count. An optional
//! secondary window merges N completed 1-minute bars into one coarser bar;
//! a partial window at stream end is never emitted.

use crate::domain::{Bar, Interval, Tick};
use chrono::{DateTime, Duration, Timelike, Utc};
use tracing::warn;

/// Stateless-across-restarts windowing transform from ticks to bars.
#[derive(Debug)]
pub struct BarGenerator {
    symbol: String,
    /// Secondary aggregation width in 1-minute bars. 0 or 1 disables it.
    window: usize,
    /// Open 1-minute bar; `datetime` holds the minute-open time while the
    /// bar accumulates and is restamped to close time on emission.
    bar: Option<Bar>,
    last_tick: Option<DateTime<Utc>>,
    window_bar: Option<Bar>,
    window_count: usize,
}

impl BarGenerator {
    pub fn new(symbol: &str, window: usize) -> Self {
        Self {
            symbol: symbol.to_string(),
            window,
            bar: None,
            last_tick: None,
            window_bar: None,
            window_count: 0,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Fold one tick in. Returns the completed 1-minute bar when this tick
    /// crosses a minute boundary.
    ///
    /// Zero-priced ticks are ignored. Ticks older than the last accepted
    /// tick are dropped rather than corrupting the open bar.
    pub fn update_tick(&mut self, tick: &Tick) -> Option<Bar> {
        if tick.last_price <= 0.0 {
            return None;
        }
        if let Some(last) = self.last_tick {
            if tick.datetime < last {
                warn!(
                    symbol = %self.symbol,
                    tick_time = %tick.datetime,
                    last_time = %last,
                    "dropping out-of-order tick"
                );
                return None;
            }
        }
        self.last_tick = Some(tick.datetime);

        let minute = minute_open(tick.datetime);
        let mut finished = None;

        match &mut self.bar {
            Some(bar) if bar.datetime == minute => {
                bar.high = bar.high.max(tick.last_price);
                bar.low = bar.low.min(tick.last_price);
                bar.close = tick.last_price;
                bar.volume += tick.volume;
                bar.open_interest = tick.open_interest;
            }
            current => {
                if let Some(mut done) = current.take() {
                    done.datetime += Duration::minutes(1);
                    finished = Some(done);
                }
                *current = Some(Bar {
                    symbol: self.symbol.clone(),
                    interval: Interval::Minute(1),
                    datetime: minute,
                    open: tick.last_price,
                    high: tick.last_price,
                    low: tick.last_price,
                    close: tick.last_price,
                    volume: tick.volume,
                    open_interest: tick.open_interest,
                });
            }
        }

        finished
    }

    /// Merge one completed 1-minute bar into the N-minute window. Returns
    /// the merged bar every time N bars have accumulated.
    pub fn update_bar(&mut self, bar: &Bar) -> Option<Bar> {
        if self.window <= 1 {
            return None;
        }

        match &mut self.window_bar {
            Some(wb) => {
                wb.high = wb.high.max(bar.high);
                wb.low = wb.low.min(bar.low);
                wb.close = bar.close;
                wb.volume += bar.volume;
                wb.open_interest = bar.open_interest;
                wb.datetime = bar.datetime;
            }
            slot => {
                *slot = Some(Bar {
                    interval: Interval::Minute(self.window as u32),
                    ..bar.clone()
                });
            }
        }

        self.window_count += 1;
        if self.window_count == self.window {
            self.window_count = 0;
            self.window_bar.take()
        } else {
            None
        }
    }
}

fn minute_open(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_second(0)
        .and_then(|d| d.with_nanosecond(0))
        .unwrap_or(dt)
}
