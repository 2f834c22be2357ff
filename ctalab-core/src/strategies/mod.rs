//! Bundled reference strategies.
//!
//! These exercise the full callback surface and double as executable
//! documentation of the [`Strategy`](crate::strategy::Strategy) contract:
//! `DoubleMaStrategy` trades market orders off an indicator crossover,
//! `ChannelBreakoutStrategy` works entirely through stop orders.

mod channel_breakout;
mod double_ma;

pub use channel_breakout::ChannelBreakoutStrategy;
pub use double_ma::DoubleMaStrategy;
