//! Parallel parameter sweep.
//!
//! Each grid cell runs an independent engine over the same series, so cells
//! parallelize freely; `collect` preserves grid order, keeping sweep output
//! deterministic regardless of scheduling.

use crate::config::{BacktestConfig, RunId};
use crate::metrics::PerformanceMetrics;
use crate::runner::{BacktestError, BacktestRunner, DataSeries};
use ctalab_core::strategy::{ParamMap, ParamValue};
use rayon::prelude::*;
use serde::Serialize;

/// Result of one sweep cell.
#[derive(Debug, Clone, Serialize)]
pub struct SweepCell {
    pub params: ParamMap,
    pub metrics: PerformanceMetrics,
    pub fingerprint: String,
    pub run_id: RunId,
}

/// Run every parameter set in `grid` over the same data series.
pub fn sweep(
    config: &BacktestConfig,
    grid: Vec<ParamMap>,
    data: &DataSeries,
) -> Result<Vec<SweepCell>, BacktestError> {
    grid.into_par_iter()
        .map(|params| {
            let mut merged = config.params.clone();
            merged.extend(params.clone());
            let cell_config = BacktestConfig {
                params: merged,
                ..config.clone()
            };
            let result = BacktestRunner::new(cell_config).run(data)?;
            Ok(SweepCell {
                params,
                metrics: result.metrics,
                fingerprint: result.fingerprint,
                run_id: result.run_id,
            })
        })
        .collect()
}

/// Cartesian product of parameter axes, in axis-major order.
pub fn param_grid(axes: &[(&str, Vec<ParamValue>)]) -> Vec<ParamMap> {
    let mut grid = vec![ParamMap::new()];
    for (name, values) in axes {
        let mut next = Vec::with_capacity(grid.len() * values.len());
        for base in &grid {
            for value in values {
                let mut params = base.clone();
                params.insert(name.to_string(), value.clone());
                next.push(params);
            }
        }
        grid = next;
    }
    grid
}
