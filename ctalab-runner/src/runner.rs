//! Single-backtest replay loop.
//!
//! A backtest is a strictly single-threaded fold over a pre-sorted
//! historical series, driven through the very same engine stack live
//! trading uses, with [`SimMatcher`](crate::matcher::SimMatcher) standing
//! in for the gateway. Identical inputs yield identical trade lists,
//! equity curves and fingerprints.

use crate::config::{BacktestConfig, ConfigError, RunId};
use crate::matcher::SimMatcher;
use crate::metrics::PerformanceMetrics;
use chrono::{DateTime, Utc};
use ctalab_core::domain::{Bar, Tick, Trade};
use ctalab_core::engine::{Engine, LifecycleState, StrategySettings};
use ctalab_core::error::EngineError;
use ctalab_core::event::Event;
use ctalab_core::persist::MemoryStore;
use ctalab_core::strategies::{ChannelBreakoutStrategy, DoubleMaStrategy};
use ctalab_core::strategy::Strategy;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

/// Name under which the runner registers the single strategy instance.
const STRATEGY_NAME: &str = "backtest";

#[derive(Debug, Error)]
pub enum BacktestError {
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("no events to replay after filtering")]
    EmptyData,
    #[error("data gap at event {index}: {datetime} is earlier than {previous}")]
    DataGap {
        index: usize,
        datetime: DateTime<Utc>,
        previous: DateTime<Utc>,
    },
}

/// Historical input series, already sorted by the data pipeline.
#[derive(Debug, Clone)]
pub enum DataSeries {
    Bars(Vec<Bar>),
    Ticks(Vec<Tick>),
}

/// One equity observation, recorded after every processed event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityPoint {
    pub datetime: DateTime<Utc>,
    pub equity: f64,
}

/// Everything a finished run produces.
#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub run_id: RunId,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub metrics: PerformanceMetrics,
    /// blake3 over the serialized trade list and equity curve. Equal
    /// fingerprints mean byte-identical results.
    pub fingerprint: String,
}

/// Instantiate a bundled strategy by its registered name.
pub fn build_strategy(name: &str) -> Result<Box<dyn Strategy>, ConfigError> {
    match name {
        "double_ma" => Ok(Box::new(DoubleMaStrategy::new())),
        "channel_breakout" => Ok(Box::new(ChannelBreakoutStrategy::new())),
        other => Err(ConfigError::UnknownStrategy(other.to_string())),
    }
}

pub struct BacktestRunner {
    config: BacktestConfig,
}

impl BacktestRunner {
    pub fn new(config: BacktestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Run the configured strategy over the series.
    pub fn run(&self, data: &DataSeries) -> Result<BacktestResult, BacktestError> {
        let strategy = build_strategy(&self.config.strategy)?;
        self.run_with(strategy, data)
    }

    /// Run a caller-supplied strategy instance over the series.
    pub fn run_with(
        &self,
        strategy: Box<dyn Strategy>,
        data: &DataSeries,
    ) -> Result<BacktestResult, BacktestError> {
        let events = self.prepare_events(data)?;

        let mut engine = Engine::new(
            Box::new(SimMatcher::new(self.config.slippage)),
            Box::new(MemoryStore::new()),
        );
        engine.add_strategy(
            STRATEGY_NAME,
            &self.config.symbol,
            strategy,
            self.config.params.clone(),
            StrategySettings {
                window: self.config.window,
                ..StrategySettings::default()
            },
        )?;
        engine.init_strategy(STRATEGY_NAME)?;
        engine.start_strategy(STRATEGY_NAME)?;

        let mut cash = 0.0_f64;
        let mut commission = 0.0_f64;
        let mut settled = 0usize;
        let mut equity_curve = Vec::with_capacity(events.len());

        for event in &events {
            engine.process_event(event);

            for trade in &engine.trades()[settled..] {
                cash -= trade.signed_volume() * trade.price;
                commission += self.config.commission_rate * trade.price * trade.volume;
            }
            settled = engine.trades().len();

            let (datetime, mark) = match event {
                Event::Bar(bar) => (bar.datetime, bar.close),
                Event::Tick(tick) => (tick.datetime, tick.last_price),
                _ => continue,
            };
            let pos = engine
                .position(STRATEGY_NAME)
                .map(|p| p.volume)
                .unwrap_or(0.0);
            equity_curve.push(EquityPoint {
                datetime,
                equity: self.config.capital + cash + pos * mark - commission,
            });
        }

        // A strategy that faulted mid-replay leaves Running; the trades and
        // equity recorded up to that point still make a valid result.
        if engine.state_of(STRATEGY_NAME) == Some(LifecycleState::Running) {
            engine.stop_strategy(STRATEGY_NAME)?;
        } else {
            warn!(
                state = %engine
                    .state_of(STRATEGY_NAME)
                    .map(|s| s.to_string())
                    .unwrap_or_default(),
                "strategy not running at replay end; returning partial results"
            );
        }

        let trades = engine.trades().to_vec();
        let equity_values: Vec<f64> = equity_curve.iter().map(|p| p.equity).collect();
        let metrics = PerformanceMetrics::compute(&equity_values, &trades);
        let fingerprint = fingerprint(&trades, &equity_curve);
        info!(
            run_id = %self.config.run_id(),
            trades = trades.len(),
            total_return = metrics.total_return,
            "backtest finished"
        );

        Ok(BacktestResult {
            run_id: self.config.run_id(),
            trades,
            equity_curve,
            metrics,
            fingerprint,
        })
    }

    /// Apply the date range and the timestamp monotonicity policy.
    fn prepare_events(&self, data: &DataSeries) -> Result<Vec<Event>, BacktestError> {
        let raw: Vec<Event> = match data {
            DataSeries::Bars(bars) => bars.iter().cloned().map(Event::Bar).collect(),
            DataSeries::Ticks(ticks) => ticks.iter().cloned().map(Event::Tick).collect(),
        };

        let mut events = Vec::with_capacity(raw.len());
        let mut previous: Option<DateTime<Utc>> = None;
        for (index, event) in raw.into_iter().enumerate() {
            let datetime = match &event {
                Event::Bar(bar) => bar.datetime,
                Event::Tick(tick) => tick.datetime,
                _ => continue,
            };
            if let Some(start) = self.config.start {
                if datetime.date_naive() < start {
                    continue;
                }
            }
            if let Some(end) = self.config.end {
                if datetime.date_naive() > end {
                    continue;
                }
            }
            if let Some(prev) = previous {
                if datetime < prev {
                    if self.config.strict {
                        return Err(BacktestError::DataGap {
                            index,
                            datetime,
                            previous: prev,
                        });
                    }
                    warn!(index, %datetime, %prev, "out-of-order event skipped");
                    continue;
                }
            }
            previous = Some(datetime);
            events.push(event);
        }

        if events.is_empty() {
            return Err(BacktestError::EmptyData);
        }
        Ok(events)
    }
}

fn fingerprint(trades: &[Trade], equity_curve: &[EquityPoint]) -> String {
    let mut hasher = blake3::Hasher::new();
    if let Ok(bytes) = serde_json::to_vec(trades) {
        hasher.update(&bytes);
    }
    if let Ok(bytes) = serde_json::to_vec(equity_curve) {
        hasher.update(&bytes);
    }
    hasher.finalize().to_hex().to_string()
}
