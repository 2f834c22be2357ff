//! CtaLab Core — event-driven strategy runtime for rule-based trading.
//!
//! This crate contains the heart of the runtime:
//! - Domain types (ticks, bars, orders, stop orders, trades, positions)
//! - FIFO event queue consumed by a single-threaded engine
//! - Tick-to-bar and N-minute bar aggregation
//! - Rolling indicator history (SMA, EMA, RSI, ATR, MACD, Bollinger, Donchian)
//! - Engine-side stop order simulation with exactly-once triggering
//! - Strategy contract with lifecycle, fault isolation, and persistence
//!
//! The engine is execution-agnostic: live gateways and backtest matchers both
//! sit behind [`engine::ExecutionClient`].

pub mod array_manager;
pub mod bar_generator;
pub mod domain;
pub mod engine;
pub mod error;
pub mod event;
pub mod persist;
pub mod stop_simulator;
pub mod strategies;
pub mod strategy;
