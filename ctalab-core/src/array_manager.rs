//! Rolling bar history and on-demand technical indicators.
//!
//! One `ArrayManager` per strategy host. Every completed bar shifts the
//! fixed-capacity OHLCV arrays (oldest dropped). Indicators are pure
//! read-only queries over the current window: insufficient history yields
//! `None` rather than an error, and strategies are responsible for checking
//! readiness before acting.

use crate::domain::Bar;

pub const DEFAULT_CAPACITY: usize = 100;

#[derive(Debug, Clone)]
pub struct ArrayManager {
    capacity: usize,
    filled: usize,
    count: usize,
    open: Vec<f64>,
    high: Vec<f64>,
    low: Vec<f64>,
    close: Vec<f64>,
    volume: Vec<f64>,
    open_interest: Vec<f64>,
}

impl Default for ArrayManager {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ArrayManager {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 2, "ArrayManager capacity must be >= 2");
        Self {
            capacity,
            filled: 0,
            count: 0,
            open: Vec::with_capacity(capacity),
            high: Vec::with_capacity(capacity),
            low: Vec::with_capacity(capacity),
            close: Vec::with_capacity(capacity),
            volume: Vec::with_capacity(capacity),
            open_interest: Vec::with_capacity(capacity),
        }
    }

    /// Shift a completed bar into the rolling window.
    pub fn update(&mut self, bar: &Bar) {
        push_rolling(&mut self.open, self.capacity, bar.open);
        push_rolling(&mut self.high, self.capacity, bar.high);
        push_rolling(&mut self.low, self.capacity, bar.low);
        push_rolling(&mut self.close, self.capacity, bar.close);
        push_rolling(&mut self.volume, self.capacity, bar.volume);
        push_rolling(&mut self.open_interest, self.capacity, bar.open_interest);
        self.filled = self.open.len();
        self.count += 1;
    }

    /// Whether the window is completely filled.
    pub fn is_ready(&self) -> bool {
        self.count >= self.capacity
    }

    /// Total bars ever seen (not capped at capacity).
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn open(&self) -> &[f64] {
        &self.open
    }

    pub fn high(&self) -> &[f64] {
        &self.high
    }

    pub fn low(&self) -> &[f64] {
        &self.low
    }

    pub fn close(&self) -> &[f64] {
        &self.close
    }

    pub fn volume(&self) -> &[f64] {
        &self.volume
    }

    pub fn last_close(&self) -> Option<f64> {
        self.close.last().copied()
    }

    // ── Indicators ─────────────────────────────────────────────────────

    /// Simple moving average of the last `n` closes.
    pub fn sma(&self, n: usize) -> Option<f64> {
        let window = tail(&self.close, n)?;
        Some(window.iter().sum::<f64>() / n as f64)
    }

    /// Exponential moving average (alpha = 2/(n+1)), seeded at the oldest
    /// close in the window.
    pub fn ema(&self, n: usize) -> Option<f64> {
        if n == 0 || self.filled < n {
            return None;
        }
        Some(ema_series(&self.close, n).pop()?)
    }

    /// Population standard deviation of the last `n` closes.
    pub fn std(&self, n: usize) -> Option<f64> {
        let window = tail(&self.close, n)?;
        let mean = window.iter().sum::<f64>() / n as f64;
        let var = window.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / n as f64;
        Some(var.sqrt())
    }

    /// Wilder RSI over the window. Needs `n + 1` closes.
    pub fn rsi(&self, n: usize) -> Option<f64> {
        if n == 0 || self.filled < n + 1 {
            return None;
        }
        let closes = &self.close;
        let mut gain = 0.0;
        let mut loss = 0.0;
        for i in 1..=n {
            let change = closes[i] - closes[i - 1];
            if change > 0.0 {
                gain += change;
            } else {
                loss -= change;
            }
        }
        let mut avg_gain = gain / n as f64;
        let mut avg_loss = loss / n as f64;
        for i in (n + 1)..closes.len() {
            let change = closes[i] - closes[i - 1];
            let (g, l) = if change > 0.0 {
                (change, 0.0)
            } else {
                (0.0, -change)
            };
            avg_gain = (avg_gain * (n as f64 - 1.0) + g) / n as f64;
            avg_loss = (avg_loss * (n as f64 - 1.0) + l) / n as f64;
        }
        if avg_loss == 0.0 {
            return Some(100.0);
        }
        let rs = avg_gain / avg_loss;
        Some(100.0 - 100.0 / (1.0 + rs))
    }

    /// Wilder-smoothed Average True Range. Needs `n + 1` bars.
    pub fn atr(&self, n: usize) -> Option<f64> {
        if n == 0 || self.filled < n + 1 {
            return None;
        }
        let mut tr = Vec::with_capacity(self.filled - 1);
        for i in 1..self.filled {
            let h = self.high[i];
            let l = self.low[i];
            let pc = self.close[i - 1];
            tr.push((h - l).max((h - pc).abs()).max((l - pc).abs()));
        }
        // Seed with the mean of the first n true ranges, then Wilder smooth.
        let mut atr = tr[..n].iter().sum::<f64>() / n as f64;
        let alpha = 1.0 / n as f64;
        for &v in &tr[n..] {
            atr = atr + alpha * (v - atr);
        }
        Some(atr)
    }

    /// MACD line, signal line and histogram.
    pub fn macd(&self, fast: usize, slow: usize, signal: usize) -> Option<(f64, f64, f64)> {
        if fast == 0 || slow <= fast || signal == 0 || self.filled < slow + signal {
            return None;
        }
        let ema_fast = ema_series(&self.close, fast);
        let ema_slow = ema_series(&self.close, slow);
        let macd_line: Vec<f64> = ema_fast
            .iter()
            .zip(&ema_slow)
            .map(|(f, s)| f - s)
            .collect();
        let signal_line = ema_series(&macd_line, signal);
        let macd = *macd_line.last()?;
        let sig = *signal_line.last()?;
        Some((macd, sig, macd - sig))
    }

    /// Bollinger bands: SMA(n) ± dev × STD(n). Returns (upper, lower).
    pub fn boll(&self, n: usize, dev: f64) -> Option<(f64, f64)> {
        let mid = self.sma(n)?;
        let std = self.std(n)?;
        Some((mid + dev * std, mid - dev * std))
    }

    /// Donchian channel over the last `n` bars. Returns (upper, lower).
    pub fn donchian(&self, n: usize) -> Option<(f64, f64)> {
        let highs = tail(&self.high, n)?;
        let lows = tail(&self.low, n)?;
        let up = highs.iter().fold(f64::MIN, |a, &b| a.max(b));
        let down = lows.iter().fold(f64::MAX, |a, &b| a.min(b));
        Some((up, down))
    }

    /// Rate of change over `n` bars, in percent.
    pub fn roc(&self, n: usize) -> Option<f64> {
        if n == 0 || self.filled < n + 1 {
            return None;
        }
        let last = self.close[self.filled - 1];
        let base = self.close[self.filled - 1 - n];
        if base == 0.0 {
            return None;
        }
        Some((last / base - 1.0) * 100.0)
    }
}

fn push_rolling(values: &mut Vec<f64>, capacity: usize, value: f64) {
    if values.len() == capacity {
        values.copy_within(1.., 0);
        let last = values.len() - 1;
        values[last] = value;
    } else {
        values.push(value);
    }
}

fn tail(values: &[f64], n: usize) -> Option<&[f64]> {
    if n == 0 || values.len() < n {
        None
    } else {
        Some(&values[values.len() - n..])
    }
}

/// EMA series seeded at the first value, alpha = 2/(n+1).
fn ema_series(values: &[f64], n: usize) -> Vec<f64> {
    let alpha = 2.0 / (n as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev = match values.first() {
        Some(&v) => v,
        None => return out,
    };
    out.push(prev);
    for &v in &values[1..] {
        prev = prev + alpha * (v - prev);
        out.push(prev);
    }
    out
}
