//! The strategy contract.
//!
//! A strategy is a value implementing [`Strategy`]: a fixed callback set
//! invoked by its host, a declared parameter schema validated before
//! construction, and a variable snapshot used for inspection and
//! persistence. Strategies never touch the engine directly — callbacks
//! receive a [`StrategyCtx`] that exposes read-only runtime state and
//! queues outbound order actions for the engine to apply once the callback
//! returns.

use crate::array_manager::ArrayManager;
use crate::domain::{
    ActiveOrder, Bar, Direction, Offset, OrderRef, OrderRequest, PriceType, StopOrder, Tick, Trade,
};
use crate::error::StrategyResult;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// A parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_usize(&self) -> Option<usize> {
        self.as_i64().and_then(|v| usize::try_from(v).ok())
    }
}

/// Declared type and domain of one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamKind {
    Int { min: i64, max: i64 },
    Float { min: f64, max: f64 },
    Bool,
    Text,
}

/// Schema descriptor for one strategy parameter: name, type, default,
/// validation range. Kept alongside the instance rather than recovered by
/// runtime introspection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub default: ParamValue,
}

impl ParamSpec {
    pub fn int(name: &'static str, default: i64, min: i64, max: i64) -> Self {
        Self {
            name,
            kind: ParamKind::Int { min, max },
            default: ParamValue::Int(default),
        }
    }

    pub fn float(name: &'static str, default: f64, min: f64, max: f64) -> Self {
        Self {
            name,
            kind: ParamKind::Float { min, max },
            default: ParamValue::Float(default),
        }
    }

    /// Check a supplied value against the declared type and range.
    pub fn validate(&self, value: &ParamValue) -> Result<(), String> {
        match (&self.kind, value) {
            (ParamKind::Int { min, max }, ParamValue::Int(v)) => {
                if v < min || v > max {
                    Err(format!("{v} outside [{min}, {max}]"))
                } else {
                    Ok(())
                }
            }
            (ParamKind::Float { min, max }, value) => match value.as_f64() {
                Some(v) if v >= *min && v <= *max => Ok(()),
                Some(v) => Err(format!("{v} outside [{min}, {max}]")),
                None => Err("expected a number".to_string()),
            },
            (ParamKind::Bool, ParamValue::Bool(_)) => Ok(()),
            (ParamKind::Text, ParamValue::Text(_)) => Ok(()),
            (kind, value) => Err(format!("expected {kind:?}, got {value:?}")),
        }
    }
}

/// Named parameter values supplied when a strategy is added.
pub type ParamMap = BTreeMap<String, ParamValue>;

/// Persisted runtime state of a strategy instance: its variable snapshot and
/// net position. Saved after every trade and on stop, restored on init.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategyState {
    pub variables: Map<String, Value>,
    pub pos: f64,
}

/// Outbound request queued by a strategy callback.
#[derive(Debug, Clone)]
pub enum Action {
    SendOrder { request: OrderRequest, stop: bool },
    Cancel(OrderRef),
    CancelAll,
}

/// Per-callback view of the host handed to strategy code.
pub struct StrategyCtx<'a> {
    symbol: &'a str,
    am: &'a ArrayManager,
    pos: f64,
    trading: bool,
    actions: Vec<Action>,
}

impl<'a> StrategyCtx<'a> {
    pub(crate) fn new(symbol: &'a str, am: &'a ArrayManager, pos: f64, trading: bool) -> Self {
        Self {
            symbol,
            am,
            pos,
            trading,
            actions: Vec::new(),
        }
    }

    pub(crate) fn into_actions(self) -> Vec<Action> {
        self.actions
    }

    /// The rolling bar history and indicators for this instance.
    pub fn am(&self) -> &ArrayManager {
        self.am
    }

    /// Current net position (signed).
    pub fn pos(&self) -> f64 {
        self.pos
    }

    /// Whether the host is in `Running` state and orders will be honored.
    pub fn trading(&self) -> bool {
        self.trading
    }

    pub fn symbol(&self) -> &str {
        self.symbol
    }

    /// Queue an order request. Ignored (with a debug log) outside of
    /// `Running`, mirroring the trading-flag gate of the original template.
    pub fn send_order(
        &mut self,
        direction: Direction,
        offset: Offset,
        price: PriceType,
        volume: f64,
        stop: bool,
    ) {
        if !self.trading {
            debug!(symbol = self.symbol, "order ignored: strategy not trading");
            return;
        }
        self.actions.push(Action::SendOrder {
            request: OrderRequest {
                symbol: self.symbol.to_string(),
                direction,
                offset,
                price,
                volume,
            },
            stop,
        });
    }

    /// Open a long position.
    pub fn buy(&mut self, price: PriceType, volume: f64, stop: bool) {
        self.send_order(Direction::Long, Offset::Open, price, volume, stop);
    }

    /// Close a long position.
    pub fn sell(&mut self, price: PriceType, volume: f64, stop: bool) {
        self.send_order(Direction::Short, Offset::Close, price, volume, stop);
    }

    /// Open a short position.
    pub fn short(&mut self, price: PriceType, volume: f64, stop: bool) {
        self.send_order(Direction::Short, Offset::Open, price, volume, stop);
    }

    /// Close a short position.
    pub fn cover(&mut self, price: PriceType, volume: f64, stop: bool) {
        self.send_order(Direction::Long, Offset::Close, price, volume, stop);
    }

    /// Cancel one outstanding order (real or stop).
    pub fn cancel(&mut self, order: OrderRef) {
        self.actions.push(Action::Cancel(order));
    }

    /// Cancel every outstanding order and stop order of this strategy.
    pub fn cancel_all(&mut self) {
        self.actions.push(Action::CancelAll);
    }
}

/// The fixed callback set every strategy implements.
///
/// Each callback returns a `Result`; an `Err` is caught at the engine
/// boundary, logged with context, and degrades only this instance.
#[allow(unused_variables)]
pub trait Strategy: Send {
    /// Declared parameter schema. Supplied values are validated against it
    /// before `configure` is called.
    fn parameters(&self) -> Vec<ParamSpec> {
        Vec::new()
    }

    /// Apply validated parameter values. Called once before `on_init`.
    fn configure(&mut self, params: &ParamMap) {}

    /// Runtime variables exposed for inspection and persistence.
    fn variables(&self) -> Map<String, Value> {
        Map::new()
    }

    /// Restore persisted variables (inverse of `variables`).
    fn restore(&mut self, variables: &Map<String, Value>) {}

    fn on_init(&mut self, ctx: &mut StrategyCtx) -> StrategyResult {
        Ok(())
    }

    fn on_start(&mut self, ctx: &mut StrategyCtx) -> StrategyResult {
        Ok(())
    }

    fn on_stop(&mut self, ctx: &mut StrategyCtx) -> StrategyResult {
        Ok(())
    }

    fn on_tick(&mut self, ctx: &mut StrategyCtx, tick: &Tick) -> StrategyResult {
        Ok(())
    }

    fn on_bar(&mut self, ctx: &mut StrategyCtx, bar: &Bar) -> StrategyResult {
        Ok(())
    }

    fn on_order(&mut self, ctx: &mut StrategyCtx, order: &ActiveOrder) -> StrategyResult {
        Ok(())
    }

    fn on_trade(&mut self, ctx: &mut StrategyCtx, trade: &Trade) -> StrategyResult {
        Ok(())
    }

    fn on_stop_order(&mut self, ctx: &mut StrategyCtx, stop_order: &StopOrder) -> StrategyResult {
        Ok(())
    }
}
