//! The engine: single authoritative router between market data, strategy
//! hosts, and the execution collaborator.
//!
//! Dispatch discipline: the engine is a single-threaded event consumer —
//! each event is processed to completion, strategy callbacks included,
//! before the next one. For every event the fan-out order per subscribed
//! host is fixed: bar/indicator update, then position update (on trades),
//! then stop-order evaluation, then the strategy callback. A stop order
//! that triggers is therefore already converted and submitted by the time
//! the strategy observes the event. Hosts are visited in registration
//! order, which is also the documented tie-break when one price event
//! satisfies several strategies' stop orders.

mod execution;
mod host;

pub use execution::{ExecutionClient, ExecutionUpdate, RecordingClient};
pub use host::{LifecycleState, StrategyHost, StrategySettings};

use crate::domain::{
    ActiveOrder, Bar, OrderId, OrderRef, OrderRequest, OrderStatus, PriceType, Position, StopOrder,
    Tick, Trade, TradeId,
};
use crate::error::{EngineError, StrategyResult};
use crate::event::Event;
use crate::persist::StateStore;
use crate::stop_simulator::{StopOrderSimulator, TriggeredStop};
use crate::strategy::{Action, ParamMap, Strategy, StrategyCtx};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, error, info, warn};

pub struct Engine {
    execution: Box<dyn ExecutionClient>,
    store: Box<dyn StateStore>,
    hosts: HashMap<String, StrategyHost>,
    /// Strategy names in registration order; all fan-out follows it.
    registration: Vec<String>,
    symbol_map: HashMap<String, Vec<String>>,
    /// Order ownership, kept for the lifetime of the strategy so late
    /// fills still find their owner.
    order_owner: HashMap<OrderId, String>,
    active_orders: HashMap<OrderId, ActiveOrder>,
    strategy_orders: HashMap<String, BTreeSet<OrderId>>,
    seen_trades: HashSet<TradeId>,
    trade_history: Vec<Trade>,
    /// Time of the last market event; stamps outbound orders.
    clock: DateTime<Utc>,
}

impl Engine {
    pub fn new(execution: Box<dyn ExecutionClient>, store: Box<dyn StateStore>) -> Self {
        Self {
            execution,
            store,
            hosts: HashMap::new(),
            registration: Vec::new(),
            symbol_map: HashMap::new(),
            order_owner: HashMap::new(),
            active_orders: HashMap::new(),
            strategy_orders: HashMap::new(),
            seen_trades: HashSet::new(),
            trade_history: Vec::new(),
            clock: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    // ── Strategy lifecycle ─────────────────────────────────────────────

    /// Register a strategy instance under a unique name.
    ///
    /// Fails before any state mutation: duplicate names and parameter
    /// values outside their declared domain are rejected synchronously.
    pub fn add_strategy(
        &mut self,
        name: &str,
        symbol: &str,
        mut strategy: Box<dyn Strategy>,
        params: ParamMap,
        settings: StrategySettings,
    ) -> Result<(), EngineError> {
        if self.hosts.contains_key(name) {
            return Err(EngineError::DuplicateName(name.to_string()));
        }
        if settings.capacity < 2 {
            return Err(EngineError::InvalidParameter {
                strategy: name.to_string(),
                name: "capacity".to_string(),
                reason: "rolling history needs at least 2 bars".to_string(),
            });
        }

        let specs = strategy.parameters();
        for (key, value) in &params {
            let spec = specs.iter().find(|s| s.name == key).ok_or_else(|| {
                EngineError::InvalidParameter {
                    strategy: name.to_string(),
                    name: key.clone(),
                    reason: "unknown parameter".to_string(),
                }
            })?;
            spec.validate(value)
                .map_err(|reason| EngineError::InvalidParameter {
                    strategy: name.to_string(),
                    name: key.clone(),
                    reason,
                })?;
        }

        let mut merged: ParamMap = specs
            .iter()
            .map(|s| (s.name.to_string(), s.default.clone()))
            .collect();
        merged.extend(params);
        strategy.configure(&merged);

        self.hosts
            .insert(name.to_string(), StrategyHost::new(name, symbol, strategy, &settings));
        self.registration.push(name.to_string());
        self.symbol_map
            .entry(symbol.to_string())
            .or_default()
            .push(name.to_string());

        info!(strategy = name, symbol, "strategy added");
        Ok(())
    }

    /// Initialize a strategy: restore persisted state, run `on_init`.
    ///
    /// A failing `on_init` leaves the host in `InitFailed` — disabled, but
    /// the engine keeps running.
    pub fn init_strategy(&mut self, name: &str) -> Result<(), EngineError> {
        let host = self
            .hosts
            .get_mut(name)
            .ok_or_else(|| EngineError::UnknownStrategy(name.to_string()))?;
        match host.state {
            LifecycleState::Created | LifecycleState::InitFailed | LifecycleState::Faulted => {}
            other => {
                return Err(EngineError::InvalidState {
                    strategy: name.to_string(),
                    expected: "created, init failed or faulted",
                    actual: other.to_string(),
                })
            }
        }
        host.state = LifecycleState::Initializing;
        info!(strategy = name, "initializing strategy");

        if let Some(state) = self.store.load(name)? {
            host.position = Position {
                volume: state.pos,
                avg_price: 0.0,
            };
            host.strategy.restore(&state.variables);
        }

        let (result, actions) = host.call(|s, ctx| s.on_init(ctx));
        match result {
            Ok(()) => {
                host.state = LifecycleState::Inited;
                info!(strategy = name, "strategy inited");
                self.apply_actions(name, actions);
            }
            Err(err) => {
                host.state = LifecycleState::InitFailed;
                error!(strategy = name, error = %err, "on_init failed; strategy disabled");
            }
        }
        Ok(())
    }

    /// Start trading: requires `Inited` (or restart from `Stopped`).
    pub fn start_strategy(&mut self, name: &str) -> Result<(), EngineError> {
        let host = self
            .hosts
            .get_mut(name)
            .ok_or_else(|| EngineError::UnknownStrategy(name.to_string()))?;
        match host.state {
            LifecycleState::Inited | LifecycleState::Stopped => {}
            other => {
                return Err(EngineError::InvalidState {
                    strategy: name.to_string(),
                    expected: "inited or stopped",
                    actual: other.to_string(),
                })
            }
        }

        let (result, actions) = host.call(|s, ctx| s.on_start(ctx));
        match result {
            Ok(()) => {
                host.state = LifecycleState::Running;
                info!(strategy = name, "strategy started");
                self.apply_actions(name, actions);
            }
            Err(err) => {
                host.state = LifecycleState::Faulted;
                error!(strategy = name, error = %err, "on_start failed; strategy faulted");
            }
        }
        Ok(())
    }

    /// Stop trading: cancels every outstanding order and stop order of the
    /// strategy before it stops observing market data, then persists state.
    pub fn stop_strategy(&mut self, name: &str) -> Result<(), EngineError> {
        let host = self
            .hosts
            .get_mut(name)
            .ok_or_else(|| EngineError::UnknownStrategy(name.to_string()))?;
        if host.state != LifecycleState::Running {
            return Err(EngineError::InvalidState {
                strategy: name.to_string(),
                expected: "running",
                actual: host.state.to_string(),
            });
        }

        let (result, actions) = host.call(|s, ctx| s.on_stop(ctx));
        match result {
            Ok(()) => {
                host.state = LifecycleState::Stopped;
                self.apply_actions(name, actions);
            }
            Err(err) => {
                host.state = LifecycleState::Faulted;
                error!(strategy = name, error = %err, "on_stop failed");
            }
        }

        self.cancel_strategy_orders(name);
        self.sync_state(name);
        info!(strategy = name, "strategy stopped");
        Ok(())
    }

    /// Re-validate and apply parameters on a non-running strategy.
    pub fn edit_strategy(&mut self, name: &str, params: ParamMap) -> Result<(), EngineError> {
        let host = self
            .hosts
            .get_mut(name)
            .ok_or_else(|| EngineError::UnknownStrategy(name.to_string()))?;
        if host.state == LifecycleState::Running {
            return Err(EngineError::InvalidState {
                strategy: name.to_string(),
                expected: "not running",
                actual: host.state.to_string(),
            });
        }

        let specs = host.strategy.parameters();
        for (key, value) in &params {
            let spec = specs.iter().find(|s| s.name == key).ok_or_else(|| {
                EngineError::InvalidParameter {
                    strategy: name.to_string(),
                    name: key.clone(),
                    reason: "unknown parameter".to_string(),
                }
            })?;
            spec.validate(value)
                .map_err(|reason| EngineError::InvalidParameter {
                    strategy: name.to_string(),
                    name: key.clone(),
                    reason,
                })?;
        }
        host.strategy.configure(&params);
        info!(strategy = name, "strategy parameters updated");
        Ok(())
    }

    /// Remove a non-running strategy and its persisted state.
    pub fn remove_strategy(&mut self, name: &str) -> Result<(), EngineError> {
        let host = self
            .hosts
            .get(name)
            .ok_or_else(|| EngineError::UnknownStrategy(name.to_string()))?;
        if host.state == LifecycleState::Running {
            return Err(EngineError::InvalidState {
                strategy: name.to_string(),
                expected: "not running",
                actual: host.state.to_string(),
            });
        }

        let symbol = host.symbol.clone();
        self.hosts.remove(name);
        self.registration.retain(|n| n != name);
        if let Some(names) = self.symbol_map.get_mut(&symbol) {
            names.retain(|n| n != name);
        }
        if let Some(ids) = self.strategy_orders.remove(name) {
            for id in ids {
                self.order_owner.remove(&id);
                self.active_orders.remove(&id);
            }
        }
        self.store.remove(name)?;
        info!(strategy = name, "strategy removed");
        Ok(())
    }

    pub fn init_all(&mut self) -> Result<(), EngineError> {
        for name in self.registration.clone() {
            self.init_strategy(&name)?;
        }
        Ok(())
    }

    pub fn start_all(&mut self) -> Result<(), EngineError> {
        for name in self.registration.clone() {
            self.start_strategy(&name)?;
        }
        Ok(())
    }

    pub fn stop_all(&mut self) -> Result<(), EngineError> {
        for name in self.registration.clone() {
            if self.state_of(&name) == Some(LifecycleState::Running) {
                self.stop_strategy(&name)?;
            }
        }
        Ok(())
    }

    // ── Event processing ───────────────────────────────────────────────

    /// Process one event from the queue: let the execution collaborator
    /// observe it first and drain any fills it produced, then fan out.
    pub fn process_event(&mut self, event: &Event) {
        self.execution.on_event(event);
        for update in self.execution.poll() {
            match update {
                ExecutionUpdate::Order(order) => self.process_order(&order),
                ExecutionUpdate::Trade(trade) => self.process_trade(&trade),
            }
        }
        match event {
            Event::Tick(tick) => self.process_tick(tick),
            Event::Bar(bar) => self.process_bar(bar),
            Event::Order(order) => self.process_order(order),
            Event::Trade(trade) => self.process_trade(trade),
        }
    }

    /// Fan a tick out to every running host on its instrument.
    pub fn process_tick(&mut self, tick: &Tick) {
        self.clock = tick.datetime;
        for name in self.subscribed(&tick.symbol) {
            let completed = match self.hosts.get_mut(&name) {
                Some(host) if host.is_running() => host.update_tick(tick),
                _ => continue,
            };
            if let Some(minute_bar) = completed {
                let emitted = self
                    .hosts
                    .get_mut(&name)
                    .and_then(|host| host.roll_bar(&minute_bar));
                if let Some(bar) = emitted {
                    self.guarded(&name, "on_bar", |s, ctx| s.on_bar(ctx, &bar));
                }
            }
            self.trigger_stops(&name, |sim| sim.check_tick(tick));
            self.guarded(&name, "on_tick", |s, ctx| s.on_tick(ctx, tick));
        }
    }

    /// Fan a completed bar out (bar-driven replay or external aggregation).
    pub fn process_bar(&mut self, bar: &Bar) {
        self.clock = bar.datetime;
        for name in self.subscribed(&bar.symbol) {
            let emitted = match self.hosts.get_mut(&name) {
                Some(host) if host.is_running() => host.roll_bar(bar),
                _ => continue,
            };
            self.trigger_stops(&name, |sim| sim.check_bar(bar));
            if let Some(b) = emitted {
                self.guarded(&name, "on_bar", |s, ctx| s.on_bar(ctx, &b));
            }
        }
    }

    /// Route an order-status event to its owning strategy.
    pub fn process_order(&mut self, order: &ActiveOrder) {
        let Some(name) = self.order_owner.get(&order.id).cloned() else {
            debug!(order = %order.id, "order event for unknown order");
            return;
        };
        if order.is_active() {
            self.active_orders.insert(order.id, order.clone());
        } else {
            self.active_orders.remove(&order.id);
            if let Some(ids) = self.strategy_orders.get_mut(&name) {
                ids.remove(&order.id);
            }
        }
        self.guarded(&name, "on_order", |s, ctx| s.on_order(ctx, order));
    }

    /// Route a fill to its owning strategy: position first, then the
    /// `on_trade` callback, then a state sync.
    pub fn process_trade(&mut self, trade: &Trade) {
        if !self.seen_trades.insert(trade.id) {
            debug!(trade = %trade.id, "duplicate trade dropped");
            return;
        }
        let Some(name) = self.order_owner.get(&trade.order_id).cloned() else {
            debug!(order = %trade.order_id, "trade for unknown order");
            return;
        };
        if let Some(host) = self.hosts.get_mut(&name) {
            host.position.apply_trade(trade);
            host.trade_log.push(trade.clone());
        }
        self.trade_history.push(trade.clone());
        self.guarded(&name, "on_trade", |s, ctx| s.on_trade(ctx, trade));
        self.sync_state(&name);
    }

    // ── Order path ─────────────────────────────────────────────────────

    fn apply_actions(&mut self, name: &str, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::SendOrder { request, stop } => self.execute_send(name, request, stop),
                Action::Cancel(order_ref) => self.execute_cancel(name, order_ref),
                Action::CancelAll => self.cancel_strategy_orders(name),
            }
        }
    }

    fn execute_send(&mut self, name: &str, request: OrderRequest, stop: bool) {
        if request.volume <= 0.0 {
            warn!(strategy = name, "order with non-positive volume ignored");
            return;
        }
        if self.would_exceed_exposure(name, &request) {
            warn!(
                strategy = name,
                volume = request.volume,
                "order rejected: would exceed max position"
            );
            return;
        }

        if stop {
            let trigger = match request.price {
                PriceType::Limit(price) => price,
                PriceType::Market => {
                    warn!(strategy = name, "stop order without a trigger price ignored");
                    return;
                }
            };
            let clock = self.clock;
            let stop_order = match self.hosts.get_mut(name) {
                Some(host) => host.stop_simulator.add(
                    &request.symbol,
                    request.direction,
                    request.offset,
                    trigger,
                    request.volume,
                    PriceType::Market,
                    clock,
                ),
                None => return,
            };
            debug!(strategy = name, stop_order = %stop_order.id, "stop order registered");
            self.guarded(name, "on_stop_order", |s, ctx| {
                s.on_stop_order(ctx, &stop_order)
            });
        } else {
            match self.execution.submit(&request, self.clock) {
                Ok(id) => self.register_order(name, id, &request),
                Err(err) => {
                    warn!(strategy = name, error = %err, "order submission failed");
                }
            }
        }
    }

    fn execute_cancel(&mut self, name: &str, order_ref: OrderRef) {
        match order_ref {
            OrderRef::Stop(id) => {
                let cancelled = match self.hosts.get_mut(name) {
                    Some(host) => host.stop_simulator.cancel(id),
                    None => None,
                };
                if let Some(stop_order) = cancelled {
                    self.guarded(name, "on_stop_order", |s, ctx| {
                        s.on_stop_order(ctx, &stop_order)
                    });
                }
            }
            OrderRef::Order(id) => {
                if let Err(err) = self.execution.cancel(id) {
                    warn!(strategy = name, order = %id, error = %err, "cancel failed");
                }
            }
        }
    }

    /// Cancel every active order and waiting stop order of a strategy.
    fn cancel_strategy_orders(&mut self, name: &str) {
        let ids: Vec<OrderId> = self
            .strategy_orders
            .get(name)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default();
        for id in ids {
            if let Err(err) = self.execution.cancel(id) {
                warn!(strategy = name, order = %id, error = %err, "cancel failed");
            }
        }

        let cancelled = match self.hosts.get_mut(name) {
            Some(host) => host.stop_simulator.cancel_all(),
            None => Vec::new(),
        };
        for stop_order in cancelled {
            self.guarded(name, "on_stop_order", |s, ctx| {
                s.on_stop_order(ctx, &stop_order)
            });
        }
    }

    /// Convert freshly-triggered stop orders into real orders, submitting
    /// each before the owning strategy's callback observes the event.
    fn trigger_stops<F>(&mut self, name: &str, check: F)
    where
        F: FnOnce(&mut StopOrderSimulator) -> Vec<TriggeredStop>,
    {
        let triggered = match self.hosts.get_mut(name) {
            Some(host) if host.is_running() => check(&mut host.stop_simulator),
            _ => return,
        };
        for TriggeredStop { mut stop, request } in triggered {
            // Fills since placement may have consumed the headroom this
            // stop was admitted under, so the cap is re-checked here.
            if self.would_exceed_exposure(name, &request) {
                warn!(
                    strategy = name,
                    stop_order = %stop.id,
                    "stop conversion skipped: would exceed max position"
                );
                self.guarded(name, "on_stop_order", |s, ctx| s.on_stop_order(ctx, &stop));
                continue;
            }
            match self.execution.submit(&request, self.clock) {
                Ok(id) => {
                    stop.converted_order = Some(id);
                    self.register_order(name, id, &request);
                    info!(
                        strategy = name,
                        stop_order = %stop.id,
                        order = %id,
                        price = stop.stop_price,
                        "stop order triggered and converted"
                    );
                }
                Err(err) => {
                    warn!(strategy = name, stop_order = %stop.id, error = %err,
                        "stop conversion rejected by execution");
                }
            }
            self.guarded(name, "on_stop_order", |s, ctx| s.on_stop_order(ctx, &stop));
        }
    }

    fn register_order(&mut self, name: &str, id: OrderId, request: &OrderRequest) {
        let order = ActiveOrder {
            id,
            symbol: request.symbol.clone(),
            direction: request.direction,
            offset: request.offset,
            price: request.price,
            volume: request.volume,
            traded: 0.0,
            status: OrderStatus::Submitting,
            datetime: self.clock,
        };
        self.order_owner.insert(id, name.to_string());
        self.strategy_orders
            .entry(name.to_string())
            .or_default()
            .insert(id);
        self.active_orders.insert(id, order);
    }

    /// Worst-case net position if every outstanding order of the strategy
    /// were to fill: current position plus the signed remaining volume of
    /// active orders and waiting stop orders.
    fn projected_position(&self, name: &str, host: &StrategyHost) -> f64 {
        let pending: f64 = self
            .strategy_orders
            .get(name)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.active_orders.get(id))
                    .map(|o| o.remaining() * o.direction.sign())
                    .sum()
            })
            .unwrap_or(0.0);
        let stops: f64 = host
            .stop_simulator
            .waiting()
            .iter()
            .map(|s| s.volume * s.direction.sign())
            .sum();
        host.position.volume + pending + stops
    }

    fn would_exceed_exposure(&self, name: &str, request: &OrderRequest) -> bool {
        let Some(host) = self.hosts.get(name) else {
            return true;
        };
        let Some(max_pos) = host.max_pos else {
            return false;
        };
        let signed = request.volume * request.direction.sign();
        (self.projected_position(name, host) + signed).abs() > max_pos + 1e-9
    }

    // ── Fault boundary ─────────────────────────────────────────────────

    /// Run one strategy callback. An error faults only this host; its
    /// queued actions are discarded and dispatch continues elsewhere.
    fn guarded<F>(&mut self, name: &str, context: &'static str, f: F)
    where
        F: FnOnce(&mut dyn Strategy, &mut StrategyCtx) -> StrategyResult,
    {
        let Some(host) = self.hosts.get_mut(name) else {
            return;
        };
        let (result, actions) = host.call(f);
        if let Err(err) = result {
            host.state = LifecycleState::Faulted;
            error!(
                strategy = name,
                context,
                error = %err,
                "strategy callback failed; instance faulted"
            );
            return;
        }
        self.apply_actions(name, actions);
    }

    fn sync_state(&mut self, name: &str) {
        let Some(host) = self.hosts.get(name) else {
            return;
        };
        let state = host.snapshot();
        if let Err(err) = self.store.save(name, &state) {
            error!(strategy = name, error = %err, "state sync failed");
        }
    }

    fn subscribed(&self, symbol: &str) -> Vec<String> {
        self.symbol_map.get(symbol).cloned().unwrap_or_default()
    }

    // ── Inspection ─────────────────────────────────────────────────────

    pub fn strategies(&self) -> &[String] {
        &self.registration
    }

    pub fn state_of(&self, name: &str) -> Option<LifecycleState> {
        self.hosts.get(name).map(|h| h.state)
    }

    pub fn position(&self, name: &str) -> Option<&Position> {
        self.hosts.get(name).map(|h| &h.position)
    }

    pub fn trade_log(&self, name: &str) -> Option<&[Trade]> {
        self.hosts.get(name).map(|h| h.trade_log.as_slice())
    }

    /// Every fill routed through the engine, in arrival order.
    pub fn trades(&self) -> &[Trade] {
        &self.trade_history
    }

    pub fn waiting_stop_orders(&self, name: &str) -> Option<&[StopOrder]> {
        self.hosts.get(name).map(|h| h.stop_simulator.waiting())
    }

    pub fn active_orders_of(&self, name: &str) -> Vec<&ActiveOrder> {
        self.strategy_orders
            .get(name)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.active_orders.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Runtime variable snapshot of a strategy, for inspection.
    pub fn variables(&self, name: &str) -> Option<Map<String, Value>> {
        self.hosts.get(name).map(|h| h.strategy.variables())
    }

    /// Net position summed over every strategy on an instrument.
    pub fn net_position(&self, symbol: &str) -> f64 {
        self.symbol_map
            .get(symbol)
            .map(|names| {
                names
                    .iter()
                    .filter_map(|n| self.hosts.get(n))
                    .map(|h| h.position.volume)
                    .sum()
            })
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, Offset};
    use crate::persist::MemoryStore;
    use crate::strategy::{ParamSpec, ParamValue};
    use chrono::TimeZone;

    /// Does nothing; all defaults.
    struct NullStrategy;
    impl Strategy for NullStrategy {}

    struct OneParamStrategy;
    impl Strategy for OneParamStrategy {
        fn parameters(&self) -> Vec<ParamSpec> {
            vec![ParamSpec::int("fast_window", 5, 2, 120)]
        }
    }

    fn engine() -> Engine {
        Engine::new(
            Box::new(RecordingClient::new()),
            Box::new(MemoryStore::new()),
        )
    }

    fn dt(sec: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 9, 30, sec).unwrap()
    }

    #[test]
    fn duplicate_name_rejected() {
        let mut eng = engine();
        eng.add_strategy(
            "demo",
            "rb2410",
            Box::new(NullStrategy),
            ParamMap::new(),
            StrategySettings::default(),
        )
        .unwrap();
        let err = eng
            .add_strategy(
                "demo",
                "rb2410",
                Box::new(NullStrategy),
                ParamMap::new(),
                StrategySettings::default(),
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateName(_)));
    }

    #[test]
    fn out_of_range_parameter_rejected_before_registration() {
        let mut eng = engine();
        let mut params = ParamMap::new();
        params.insert("fast_window".into(), ParamValue::Int(500));
        let err = eng
            .add_strategy(
                "demo",
                "rb2410",
                Box::new(OneParamStrategy),
                params,
                StrategySettings::default(),
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter { .. }));
        assert!(eng.strategies().is_empty());
    }

    #[test]
    fn unknown_parameter_rejected() {
        let mut eng = engine();
        let mut params = ParamMap::new();
        params.insert("no_such_param".into(), ParamValue::Int(1));
        let err = eng
            .add_strategy(
                "demo",
                "rb2410",
                Box::new(OneParamStrategy),
                params,
                StrategySettings::default(),
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter { .. }));
    }

    #[test]
    fn lifecycle_happy_path() {
        let mut eng = engine();
        eng.add_strategy(
            "demo",
            "rb2410",
            Box::new(NullStrategy),
            ParamMap::new(),
            StrategySettings::default(),
        )
        .unwrap();
        assert_eq!(eng.state_of("demo"), Some(LifecycleState::Created));

        eng.init_strategy("demo").unwrap();
        assert_eq!(eng.state_of("demo"), Some(LifecycleState::Inited));

        eng.start_strategy("demo").unwrap();
        assert_eq!(eng.state_of("demo"), Some(LifecycleState::Running));

        eng.stop_strategy("demo").unwrap();
        assert_eq!(eng.state_of("demo"), Some(LifecycleState::Stopped));

        // Stopped strategies may restart without re-init.
        eng.start_strategy("demo").unwrap();
        assert_eq!(eng.state_of("demo"), Some(LifecycleState::Running));
    }

    #[test]
    fn start_requires_init() {
        let mut eng = engine();
        eng.add_strategy(
            "demo",
            "rb2410",
            Box::new(NullStrategy),
            ParamMap::new(),
            StrategySettings::default(),
        )
        .unwrap();
        let err = eng.start_strategy("demo").unwrap_err();
        assert!(matches!(err, EngineError::InvalidState { .. }));
    }

    #[test]
    fn init_failure_degrades_only_that_strategy() {
        struct FailsInit;
        impl Strategy for FailsInit {
            fn on_init(&mut self, _ctx: &mut StrategyCtx) -> StrategyResult {
                Err("warmup data missing".into())
            }
        }

        let mut eng = engine();
        eng.add_strategy(
            "bad",
            "rb2410",
            Box::new(FailsInit),
            ParamMap::new(),
            StrategySettings::default(),
        )
        .unwrap();
        eng.add_strategy(
            "good",
            "rb2410",
            Box::new(NullStrategy),
            ParamMap::new(),
            StrategySettings::default(),
        )
        .unwrap();

        eng.init_all().unwrap();
        assert_eq!(eng.state_of("bad"), Some(LifecycleState::InitFailed));
        assert_eq!(eng.state_of("good"), Some(LifecycleState::Inited));
    }

    #[test]
    fn faulted_callback_does_not_stop_other_strategies() {
        struct Panicky;
        impl Strategy for Panicky {
            fn on_tick(&mut self, _ctx: &mut StrategyCtx, _tick: &Tick) -> StrategyResult {
                Err("division by zero".into())
            }
        }
        struct Counter {
            ticks: u32,
        }
        impl Strategy for Counter {
            fn on_tick(&mut self, _ctx: &mut StrategyCtx, _tick: &Tick) -> StrategyResult {
                self.ticks += 1;
                Ok(())
            }
            fn variables(&self) -> Map<String, Value> {
                let mut vars = Map::new();
                vars.insert("ticks".into(), self.ticks.into());
                vars
            }
        }
        let mut eng = engine();
        eng.add_strategy(
            "panicky",
            "rb2410",
            Box::new(Panicky),
            ParamMap::new(),
            StrategySettings::default(),
        )
        .unwrap();
        eng.add_strategy(
            "counter",
            "rb2410",
            Box::new(Counter { ticks: 0 }),
            ParamMap::new(),
            StrategySettings::default(),
        )
        .unwrap();
        eng.init_all().unwrap();
        eng.start_all().unwrap();

        for sec in 0..3 {
            eng.process_tick(&Tick::trade("rb2410", dt(sec), 100.0, 1.0));
        }

        assert_eq!(eng.state_of("panicky"), Some(LifecycleState::Faulted));
        assert_eq!(eng.state_of("counter"), Some(LifecycleState::Running));
        // The faulted host stopped receiving events after the first tick;
        // the healthy one saw all three.
        let vars = eng.variables("counter").unwrap();
        assert_eq!(vars["ticks"], 3);
    }

    #[test]
    fn stop_cancels_outstanding_orders_and_stops() {
        struct Sender;
        impl Strategy for Sender {
            fn on_tick(&mut self, ctx: &mut StrategyCtx, _tick: &Tick) -> StrategyResult {
                if ctx.pos() == 0.0 {
                    ctx.buy(PriceType::Limit(99.0), 1.0, false);
                    ctx.sell(PriceType::Limit(95.0), 1.0, true);
                }
                Ok(())
            }
        }

        let mut eng = engine();
        eng.add_strategy(
            "demo",
            "rb2410",
            Box::new(Sender),
            ParamMap::new(),
            StrategySettings::default(),
        )
        .unwrap();
        eng.init_strategy("demo").unwrap();
        eng.start_strategy("demo").unwrap();

        eng.process_tick(&Tick::trade("rb2410", dt(0), 100.0, 1.0));
        assert_eq!(eng.active_orders_of("demo").len(), 1);
        assert_eq!(eng.waiting_stop_orders("demo").unwrap().len(), 1);

        eng.stop_strategy("demo").unwrap();
        assert!(eng.waiting_stop_orders("demo").unwrap().is_empty());
    }

    #[test]
    fn exposure_cap_blocks_orders() {
        struct Greedy;
        impl Strategy for Greedy {
            fn on_tick(&mut self, ctx: &mut StrategyCtx, _tick: &Tick) -> StrategyResult {
                ctx.buy(PriceType::Limit(100.0), 5.0, false);
                Ok(())
            }
        }

        let mut eng = engine();
        eng.add_strategy(
            "demo",
            "rb2410",
            Box::new(Greedy),
            ParamMap::new(),
            StrategySettings {
                max_pos: Some(2.0),
                ..StrategySettings::default()
            },
        )
        .unwrap();
        eng.init_strategy("demo").unwrap();
        eng.start_strategy("demo").unwrap();
        eng.process_tick(&Tick::trade("rb2410", dt(0), 100.0, 1.0));
        assert!(eng.active_orders_of("demo").is_empty());
    }

    #[test]
    fn tiny_capacity_rejected() {
        let mut eng = engine();
        let err = eng
            .add_strategy(
                "demo",
                "rb2410",
                Box::new(NullStrategy),
                ParamMap::new(),
                StrategySettings {
                    capacity: 0,
                    ..StrategySettings::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter { .. }));
        assert!(eng.strategies().is_empty());
    }

    #[test]
    fn exposure_cap_counts_waiting_stops() {
        struct TwoStops {
            placed: bool,
        }
        impl Strategy for TwoStops {
            fn on_tick(&mut self, ctx: &mut StrategyCtx, _tick: &Tick) -> StrategyResult {
                if !self.placed {
                    self.placed = true;
                    ctx.buy(PriceType::Limit(101.0), 1.0, true);
                    ctx.buy(PriceType::Limit(102.0), 1.0, true);
                }
                Ok(())
            }
        }

        let mut eng = engine();
        eng.add_strategy(
            "demo",
            "rb2410",
            Box::new(TwoStops { placed: false }),
            ParamMap::new(),
            StrategySettings {
                max_pos: Some(1.0),
                ..StrategySettings::default()
            },
        )
        .unwrap();
        eng.init_strategy("demo").unwrap();
        eng.start_strategy("demo").unwrap();

        eng.process_tick(&Tick::trade("rb2410", dt(0), 100.0, 1.0));
        // The second stop alone would already put worst-case exposure at 2.
        assert_eq!(eng.waiting_stop_orders("demo").unwrap().len(), 1);

        eng.process_tick(&Tick::trade("rb2410", dt(1), 105.0, 1.0));
        assert_eq!(eng.active_orders_of("demo").len(), 1);
    }

    #[test]
    fn stop_conversion_rechecks_exposure_cap() {
        struct StopOnce {
            placed: bool,
        }
        impl Strategy for StopOnce {
            fn on_tick(&mut self, ctx: &mut StrategyCtx, _tick: &Tick) -> StrategyResult {
                if !self.placed {
                    self.placed = true;
                    ctx.buy(PriceType::Limit(105.0), 1.0, true);
                }
                Ok(())
            }
        }

        let mut eng = engine();
        eng.add_strategy(
            "demo",
            "rb2410",
            Box::new(StopOnce { placed: false }),
            ParamMap::new(),
            StrategySettings {
                max_pos: Some(1.0),
                ..StrategySettings::default()
            },
        )
        .unwrap();
        eng.init_strategy("demo").unwrap();
        eng.start_strategy("demo").unwrap();

        eng.process_tick(&Tick::trade("rb2410", dt(0), 100.0, 1.0));
        assert_eq!(eng.waiting_stop_orders("demo").unwrap().len(), 1);

        // A fill on another order consumes the headroom while the stop waits.
        eng.register_order(
            "demo",
            OrderId(50),
            &OrderRequest {
                symbol: "rb2410".into(),
                direction: Direction::Long,
                offset: Offset::Open,
                price: PriceType::Limit(100.0),
                volume: 1.0,
            },
        );
        eng.process_trade(&Trade {
            id: TradeId(50),
            order_id: OrderId(50),
            symbol: "rb2410".into(),
            direction: Direction::Long,
            offset: Offset::Open,
            price: 100.0,
            volume: 1.0,
            datetime: dt(1),
        });
        eng.process_order(&ActiveOrder {
            id: OrderId(50),
            symbol: "rb2410".into(),
            direction: Direction::Long,
            offset: Offset::Open,
            price: PriceType::Limit(100.0),
            volume: 1.0,
            traded: 1.0,
            status: OrderStatus::AllTraded,
            datetime: dt(1),
        });
        assert_eq!(eng.position("demo").unwrap().volume, 1.0);

        // The trigger fires but conversion is refused: no order registered.
        eng.process_tick(&Tick::trade("rb2410", dt(2), 106.0, 1.0));
        assert!(eng.waiting_stop_orders("demo").unwrap().is_empty());
        assert!(eng.active_orders_of("demo").is_empty());
    }

    #[test]
    fn duplicate_trade_ignored() {
        let mut eng = engine();
        eng.add_strategy(
            "demo",
            "rb2410",
            Box::new(NullStrategy),
            ParamMap::new(),
            StrategySettings::default(),
        )
        .unwrap();
        eng.init_strategy("demo").unwrap();
        eng.start_strategy("demo").unwrap();

        // Plant an owned order, then deliver the same fill twice.
        eng.register_order(
            "demo",
            OrderId(1),
            &OrderRequest {
                symbol: "rb2410".into(),
                direction: Direction::Long,
                offset: Offset::Open,
                price: PriceType::Limit(100.0),
                volume: 1.0,
            },
        );
        let trade = Trade {
            id: TradeId(1),
            order_id: OrderId(1),
            symbol: "rb2410".into(),
            direction: Direction::Long,
            offset: Offset::Open,
            price: 100.0,
            volume: 1.0,
            datetime: dt(1),
        };
        eng.process_trade(&trade);
        eng.process_trade(&trade);
        assert_eq!(eng.position("demo").unwrap().volume, 1.0);
        assert_eq!(eng.trade_log("demo").unwrap().len(), 1);
    }
}
