//! CSV export of backtest artifacts.

use crate::runner::EquityPoint;
use ctalab_core::domain::Trade;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// Write the fill list: one row per trade.
pub fn write_trades_csv(path: impl AsRef<Path>, trades: &[Trade]) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "trade_id",
        "order_id",
        "datetime",
        "symbol",
        "direction",
        "offset",
        "price",
        "volume",
    ])?;
    for trade in trades {
        writer.write_record([
            trade.id.to_string(),
            trade.order_id.to_string(),
            trade.datetime.to_rfc3339(),
            trade.symbol.clone(),
            format!("{:?}", trade.direction),
            format!("{:?}", trade.offset),
            trade.price.to_string(),
            trade.volume.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the equity curve: one row per processed event.
pub fn write_equity_csv(path: impl AsRef<Path>, curve: &[EquityPoint]) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["datetime", "equity"])?;
    for point in curve {
        writer.write_record([point.datetime.to_rfc3339(), point.equity.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use ctalab_core::domain::{Direction, Offset, OrderId, TradeId};

    #[test]
    fn trades_csv_has_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trades.csv");
        let trades = vec![Trade {
            id: TradeId(1),
            order_id: OrderId(1),
            symbol: "rb2410".into(),
            direction: Direction::Long,
            offset: Offset::Open,
            price: 3905.0,
            volume: 2.0,
            datetime: Utc.with_ymd_and_hms(2024, 3, 4, 9, 31, 0).unwrap(),
        }];
        write_trades_csv(&path, &trades).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let mut lines = raw.lines();
        assert!(lines.next().unwrap().starts_with("trade_id,order_id"));
        assert!(lines.next().unwrap().contains("3905"));
        assert!(lines.next().is_none());
    }

    #[test]
    fn equity_csv_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("equity.csv");
        let curve = vec![
            EquityPoint {
                datetime: Utc.with_ymd_and_hms(2024, 3, 4, 9, 31, 0).unwrap(),
                equity: 1_000_000.0,
            },
            EquityPoint {
                datetime: Utc.with_ymd_and_hms(2024, 3, 4, 9, 32, 0).unwrap(),
                equity: 1_000_120.0,
            },
        ];
        write_equity_csv(&path, &curve).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw.lines().count(), 3);
    }
}
