//! Strategy host: one user-defined strategy instance plus the state that
//! belongs exclusively to it.

use crate::array_manager::ArrayManager;
use crate::bar_generator::BarGenerator;
use crate::domain::{Bar, Position, Tick, Trade};
use crate::error::StrategyResult;
use crate::stop_simulator::StopOrderSimulator;
use crate::strategy::{Action, Strategy, StrategyCtx, StrategyState};
use std::fmt;

/// Strategy lifecycle states.
///
/// `Created → Initializing → Inited | InitFailed`, `Inited → Running`,
/// `Running → Stopped`, `Stopped → Running` (restart). A callback error
/// while running marks the host `Faulted`; a faulted or init-failed host
/// may be re-initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Initializing,
    Inited,
    InitFailed,
    Running,
    Stopped,
    Faulted,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Created => "created",
            LifecycleState::Initializing => "initializing",
            LifecycleState::Inited => "inited",
            LifecycleState::InitFailed => "init failed",
            LifecycleState::Running => "running",
            LifecycleState::Stopped => "stopped",
            LifecycleState::Faulted => "faulted",
        };
        write!(f, "{s}")
    }
}

/// Sizing knobs supplied when a strategy is added.
#[derive(Debug, Clone)]
pub struct StrategySettings {
    /// Secondary N-minute aggregation; 0 or 1 feeds 1-minute bars directly.
    pub window: usize,
    /// Rolling history capacity of the ArrayManager.
    pub capacity: usize,
    /// Maximum absolute net position; orders that would exceed it are rejected.
    pub max_pos: Option<f64>,
}

impl Default for StrategySettings {
    fn default() -> Self {
        Self {
            window: 0,
            capacity: crate::array_manager::DEFAULT_CAPACITY,
            max_pos: None,
        }
    }
}

/// Wraps one strategy instance. Owned exclusively by the engine; the bar
/// generator, indicator history, stop simulator, position and trade log in
/// here are never shared across strategies, so single-threaded dispatch is
/// the only locking discipline required.
pub struct StrategyHost {
    pub(crate) name: String,
    pub(crate) symbol: String,
    pub(crate) state: LifecycleState,
    pub(crate) strategy: Box<dyn Strategy>,
    pub(crate) bar_generator: BarGenerator,
    pub(crate) array_manager: ArrayManager,
    pub(crate) stop_simulator: StopOrderSimulator,
    pub(crate) position: Position,
    pub(crate) trade_log: Vec<Trade>,
    pub(crate) max_pos: Option<f64>,
}

impl StrategyHost {
    pub(crate) fn new(
        name: &str,
        symbol: &str,
        strategy: Box<dyn Strategy>,
        settings: &StrategySettings,
    ) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            state: LifecycleState::Created,
            strategy,
            bar_generator: BarGenerator::new(symbol, settings.window),
            array_manager: ArrayManager::new(settings.capacity),
            stop_simulator: StopOrderSimulator::new(),
            position: Position::default(),
            trade_log: Vec::new(),
            max_pos: settings.max_pos,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LifecycleState::Running
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn trade_log(&self) -> &[Trade] {
        &self.trade_log
    }

    /// Snapshot for persistence.
    pub(crate) fn snapshot(&self) -> StrategyState {
        StrategyState {
            variables: self.strategy.variables(),
            pos: self.position.volume,
        }
    }

    /// Feed a tick to the bar generator. Returns a completed 1-minute bar.
    pub(crate) fn update_tick(&mut self, tick: &Tick) -> Option<Bar> {
        self.bar_generator.update_tick(tick)
    }

    /// Roll a completed bar into the indicator history, applying the
    /// N-minute window if configured. Returns the bar the strategy should
    /// observe, already reflected in the ArrayManager.
    pub(crate) fn roll_bar(&mut self, bar: &Bar) -> Option<Bar> {
        if self.bar_generator.window() > 1 {
            let merged = self.bar_generator.update_bar(bar)?;
            self.array_manager.update(&merged);
            Some(merged)
        } else {
            self.array_manager.update(bar);
            Some(bar.clone())
        }
    }

    /// Invoke one strategy callback with a fresh context, returning the
    /// callback result and whatever actions it queued.
    pub(crate) fn call<F>(&mut self, f: F) -> (StrategyResult, Vec<Action>)
    where
        F: FnOnce(&mut dyn Strategy, &mut StrategyCtx) -> StrategyResult,
    {
        let trading = self.state == LifecycleState::Running;
        let mut ctx = StrategyCtx::new(
            &self.symbol,
            &self.array_manager,
            self.position.volume,
            trading,
        );
        let result = f(self.strategy.as_mut(), &mut ctx);
        (result, ctx.into_actions())
    }
}
