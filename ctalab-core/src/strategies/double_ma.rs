//! Double moving-average crossover strategy.
//!
//! Long when the fast SMA crosses above the slow SMA, short on the reverse
//! cross. Always at most one unit of exposure; a new signal first flattens
//! the opposite position, then opens the new one.

use crate::domain::{Bar, PriceType};
use crate::error::StrategyResult;
use crate::strategy::{ParamMap, ParamSpec, Strategy, StrategyCtx};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone)]
pub struct DoubleMaStrategy {
    fast_window: usize,
    slow_window: usize,
    fixed_size: f64,

    fast_ma: f64,
    slow_ma: f64,
    prev_fast_ma: f64,
    prev_slow_ma: f64,
}

impl DoubleMaStrategy {
    pub fn new() -> Self {
        Self {
            fast_window: 10,
            slow_window: 20,
            fixed_size: 1.0,
            fast_ma: 0.0,
            slow_ma: 0.0,
            prev_fast_ma: 0.0,
            prev_slow_ma: 0.0,
        }
    }
}

impl Default for DoubleMaStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for DoubleMaStrategy {
    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::int("fast_window", 10, 2, 200),
            ParamSpec::int("slow_window", 20, 3, 500),
            ParamSpec::float("fixed_size", 1.0, 1.0, 1000.0),
        ]
    }

    fn configure(&mut self, params: &ParamMap) {
        if let Some(v) = params.get("fast_window").and_then(|v| v.as_usize()) {
            self.fast_window = v;
        }
        if let Some(v) = params.get("slow_window").and_then(|v| v.as_usize()) {
            self.slow_window = v;
        }
        if let Some(v) = params.get("fixed_size").and_then(|v| v.as_f64()) {
            self.fixed_size = v;
        }
    }

    fn variables(&self) -> Map<String, Value> {
        let mut vars = Map::new();
        vars.insert("fast_ma".into(), json!(self.fast_ma));
        vars.insert("slow_ma".into(), json!(self.slow_ma));
        vars
    }

    fn on_bar(&mut self, ctx: &mut StrategyCtx, _bar: &Bar) -> StrategyResult {
        let am = ctx.am();
        let (Some(fast), Some(slow)) = (am.sma(self.fast_window), am.sma(self.slow_window)) else {
            return Ok(());
        };

        self.prev_fast_ma = self.fast_ma;
        self.prev_slow_ma = self.slow_ma;
        self.fast_ma = fast;
        self.slow_ma = slow;
        if self.prev_fast_ma == 0.0 || self.prev_slow_ma == 0.0 {
            return Ok(());
        }

        let cross_over = fast > slow && self.prev_fast_ma <= self.prev_slow_ma;
        let cross_below = fast < slow && self.prev_fast_ma >= self.prev_slow_ma;

        let pos = ctx.pos();
        if cross_over {
            if pos < 0.0 {
                ctx.cover(PriceType::Market, -pos, false);
            }
            if pos <= 0.0 {
                ctx.buy(PriceType::Market, self.fixed_size, false);
            }
        } else if cross_below {
            if pos > 0.0 {
                ctx.sell(PriceType::Market, pos, false);
            }
            if pos >= 0.0 {
                ctx.short(PriceType::Market, self.fixed_size, false);
            }
        }
        Ok(())
    }
}
