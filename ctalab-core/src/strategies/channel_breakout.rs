//! Donchian channel breakout strategy, driven entirely by stop orders.
//!
//! Entry stops sit at the channel boundaries while flat; once positioned,
//! a trailing ATR stop protects the trade. Working stop orders are
//! re-placed from scratch on every bar.

use crate::domain::{Bar, PriceType};
use crate::error::StrategyResult;
use crate::strategy::{ParamMap, ParamSpec, Strategy, StrategyCtx};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone)]
pub struct ChannelBreakoutStrategy {
    entry_window: usize,
    stop_multiplier: f64,
    fixed_size: f64,

    entry_up: f64,
    entry_down: f64,
    atr_value: f64,
    intra_trade_high: f64,
    intra_trade_low: f64,
}

impl ChannelBreakoutStrategy {
    pub fn new() -> Self {
        Self {
            entry_window: 20,
            stop_multiplier: 2.0,
            fixed_size: 1.0,
            entry_up: 0.0,
            entry_down: 0.0,
            atr_value: 0.0,
            intra_trade_high: 0.0,
            intra_trade_low: 0.0,
        }
    }
}

impl Default for ChannelBreakoutStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for ChannelBreakoutStrategy {
    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::int("entry_window", 20, 2, 300),
            ParamSpec::float("stop_multiplier", 2.0, 0.5, 10.0),
            ParamSpec::float("fixed_size", 1.0, 1.0, 1000.0),
        ]
    }

    fn configure(&mut self, params: &ParamMap) {
        if let Some(v) = params.get("entry_window").and_then(|v| v.as_usize()) {
            self.entry_window = v;
        }
        if let Some(v) = params.get("stop_multiplier").and_then(|v| v.as_f64()) {
            self.stop_multiplier = v;
        }
        if let Some(v) = params.get("fixed_size").and_then(|v| v.as_f64()) {
            self.fixed_size = v;
        }
    }

    fn variables(&self) -> Map<String, Value> {
        let mut vars = Map::new();
        vars.insert("entry_up".into(), json!(self.entry_up));
        vars.insert("entry_down".into(), json!(self.entry_down));
        vars.insert("atr_value".into(), json!(self.atr_value));
        vars.insert("intra_trade_high".into(), json!(self.intra_trade_high));
        vars.insert("intra_trade_low".into(), json!(self.intra_trade_low));
        vars
    }

    fn restore(&mut self, variables: &Map<String, Value>) {
        if let Some(v) = variables.get("intra_trade_high").and_then(Value::as_f64) {
            self.intra_trade_high = v;
        }
        if let Some(v) = variables.get("intra_trade_low").and_then(Value::as_f64) {
            self.intra_trade_low = v;
        }
    }

    fn on_bar(&mut self, ctx: &mut StrategyCtx, bar: &Bar) -> StrategyResult {
        ctx.cancel_all();

        let am = ctx.am();
        let (Some((up, down)), Some(atr)) =
            (am.donchian(self.entry_window), am.atr(self.entry_window))
        else {
            return Ok(());
        };
        self.entry_up = up;
        self.entry_down = down;
        self.atr_value = atr;

        let pos = ctx.pos();
        if pos == 0.0 {
            self.intra_trade_high = bar.high;
            self.intra_trade_low = bar.low;
            ctx.buy(PriceType::Limit(self.entry_up), self.fixed_size, true);
            ctx.short(PriceType::Limit(self.entry_down), self.fixed_size, true);
        } else if pos > 0.0 {
            self.intra_trade_high = self.intra_trade_high.max(bar.high);
            let trailing = self.intra_trade_high - self.atr_value * self.stop_multiplier;
            ctx.sell(PriceType::Limit(trailing), pos, true);
        } else {
            self.intra_trade_low = self.intra_trade_low.min(bar.low);
            let trailing = self.intra_trade_low + self.atr_value * self.stop_multiplier;
            ctx.cover(PriceType::Limit(trailing), -pos, true);
        }
        Ok(())
    }
}
