//! CtaLab Runner — backtest orchestration on top of `ctalab-core`.
//!
//! This crate provides:
//! - A synthetic matching engine (`SimMatcher`) behind the core's
//!   execution boundary
//! - A deterministic single-backtest replay loop with equity accounting
//! - Pure performance metrics
//! - TOML run configuration with content-addressed run ids
//! - CSV export of trades and equity curves
//! - A rayon parameter sweep and a seeded synthetic data generator

pub mod config;
pub mod export;
pub mod matcher;
pub mod metrics;
pub mod runner;
pub mod sweep;
pub mod synthetic;

pub use config::{BacktestConfig, ConfigError, RunId};
pub use export::{write_equity_csv, write_trades_csv, ExportError};
pub use matcher::SimMatcher;
pub use metrics::PerformanceMetrics;
pub use runner::{
    build_strategy, BacktestError, BacktestResult, BacktestRunner, DataSeries, EquityPoint,
};
pub use sweep::{param_grid, sweep, SweepCell};
pub use synthetic::{random_walk_bars, random_walk_ticks};
