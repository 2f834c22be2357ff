//! CtaLab CLI — run backtests from a TOML config or the built-in demo.
//!
//! Commands:
//! - `run` — replay a strategy over seeded synthetic data, print a metrics
//!   summary and optionally export trades/equity as CSV

use anyhow::Result;
use clap::{Parser, Subcommand};
use ctalab_runner::{
    random_walk_bars, write_equity_csv, write_trades_csv, BacktestConfig, BacktestResult,
    BacktestRunner, DataSeries,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ctalab", about = "CtaLab CLI — event-driven strategy backtesting")]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file, or the built-in demo.
    Run {
        /// Path to a TOML config file. Without it, the demo config runs
        /// (double_ma on synthetic rb2410 bars).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of synthetic one-minute bars to replay.
        #[arg(long, default_value_t = 2_000)]
        bars: usize,

        /// Seed for the synthetic data generator.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Directory to write trades.csv and equity.csv into.
        #[arg(long)]
        export_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            bars,
            seed,
            export_dir,
        } => run_cmd(config, bars, seed, export_dir),
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run_cmd(
    config_path: Option<PathBuf>,
    bars: usize,
    seed: u64,
    export_dir: Option<PathBuf>,
) -> Result<()> {
    let config = match config_path {
        Some(path) => BacktestConfig::from_toml_file(path)?,
        None => BacktestConfig::default(),
    };

    let data = DataSeries::Bars(random_walk_bars(&config.symbol, bars, seed, 3900.0));
    let result = BacktestRunner::new(config).run(&data)?;
    print_summary(&result);

    if let Some(dir) = export_dir {
        std::fs::create_dir_all(&dir)?;
        write_trades_csv(dir.join("trades.csv"), &result.trades)?;
        write_equity_csv(dir.join("equity.csv"), &result.equity_curve)?;
        println!("Artifacts saved to: {}", dir.display());
    }
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    let m = &result.metrics;
    println!("Run ID:        {}", result.run_id);
    println!("Fingerprint:   {}", result.fingerprint);
    println!("Trades:        {}", m.trade_count);
    println!("Total return:  {:.2}%", m.total_return * 100.0);
    println!("Max drawdown:  {:.2}%", m.max_drawdown * 100.0);
    println!("Sharpe:        {:.2}", m.sharpe);
    println!("Win rate:      {:.1}%", m.win_rate * 100.0);
    println!("Profit factor: {:.2}", m.profit_factor);
}
