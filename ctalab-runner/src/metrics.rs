//! Performance metrics — pure functions that compute backtest statistics.
//!
//! Every metric is a pure function: equity curve and/or fill list in,
//! scalar out. No dependencies on the runner or the engine.

use ctalab_core::domain::Trade;
use serde::{Deserialize, Serialize};

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub max_drawdown: f64,
    pub sharpe: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub trade_count: usize,
}

impl PerformanceMetrics {
    /// Compute all metrics from an equity curve and fill list.
    pub fn compute(equity_curve: &[f64], trades: &[Trade]) -> Self {
        let pnls = closing_pnls(trades);
        Self {
            total_return: total_return(equity_curve),
            max_drawdown: max_drawdown(equity_curve),
            sharpe: sharpe_ratio(equity_curve),
            win_rate: win_rate(&pnls),
            profit_factor: profit_factor(&pnls),
            trade_count: trades.len(),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: (final - initial) / initial.
pub fn total_return(equity_curve: &[f64]) -> f64 {
    let (Some(&initial), Some(&last)) = (equity_curve.first(), equity_curve.last()) else {
        return 0.0;
    };
    if equity_curve.len() < 2 || initial <= 0.0 {
        return 0.0;
    }
    (last - initial) / initial
}

/// Maximum peak-to-trough drawdown as a positive fraction.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst = 0.0_f64;
    for &equity in equity_curve {
        peak = peak.max(equity);
        if peak > 0.0 {
            worst = worst.max((peak - equity) / peak);
        }
    }
    worst
}

/// Annualized Sharpe ratio from per-point returns (240 trading days).
///
/// Returns 0.0 for a flat curve or fewer than 3 points.
pub fn sharpe_ratio(equity_curve: &[f64]) -> f64 {
    let returns = point_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = mean(&returns);
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    (mean / std) * (240.0_f64).sqrt()
}

/// Fraction of closing fills with positive realized P&L.
pub fn win_rate(pnls: &[f64]) -> f64 {
    if pnls.is_empty() {
        return 0.0;
    }
    pnls.iter().filter(|&&p| p > 0.0).count() as f64 / pnls.len() as f64
}

/// Gross profit / gross loss over closing fills. Infinite with no losers.
pub fn profit_factor(pnls: &[f64]) -> f64 {
    let gross_profit: f64 = pnls.iter().filter(|&&p| p > 0.0).sum();
    let gross_loss: f64 = -pnls.iter().filter(|&&p| p < 0.0).sum::<f64>();
    if gross_loss < 1e-15 {
        if gross_profit > 0.0 {
            return f64::INFINITY;
        }
        return 0.0;
    }
    gross_profit / gross_loss
}

/// Realized P&L of each position-reducing fill, replayed with average-cost
/// accounting over the fill sequence.
pub fn closing_pnls(trades: &[Trade]) -> Vec<f64> {
    let mut pnls = Vec::new();
    let mut volume = 0.0_f64;
    let mut avg_price = 0.0_f64;
    for trade in trades {
        let signed = trade.signed_volume();
        if volume == 0.0 || volume.signum() == signed.signum() {
            let total = volume + signed;
            avg_price = (avg_price * volume.abs() + trade.price * signed.abs()) / total.abs();
            volume = total;
            continue;
        }
        let closed = signed.abs().min(volume.abs());
        let direction = volume.signum();
        pnls.push((trade.price - avg_price) * closed * direction);
        volume += signed;
        if volume.signum() == signed.signum() && volume != 0.0 {
            // Crossed through flat; remainder opens at the fill price.
            avg_price = trade.price;
        } else if volume == 0.0 {
            avg_price = 0.0;
        }
    }
    pnls
}

fn point_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| w[1] / w[0] - 1.0)
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}
