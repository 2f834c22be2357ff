//! Criterion benchmarks for CtaLab hot paths.
//!
//! Benchmarks:
//! 1. Tick-to-bar aggregation
//! 2. Indicator queries over a full rolling window
//! 3. Stop order trigger checks with a deep book of waiting stops
//! 4. Full engine dispatch of a bar stream to a live strategy

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use chrono::{DateTime, Duration, TimeZone, Utc};
use ctalab_core::array_manager::ArrayManager;
use ctalab_core::bar_generator::BarGenerator;
use ctalab_core::domain::{Bar, Direction, Interval, Offset, PriceType, Tick};
use ctalab_core::engine::{Engine, RecordingClient, StrategySettings};
use ctalab_core::event::Event;
use ctalab_core::persist::MemoryStore;
use ctalab_core::stop_simulator::StopOrderSimulator;
use ctalab_core::strategies::DoubleMaStrategy;
use ctalab_core::strategy::ParamMap;

// ── Helpers ──────────────────────────────────────────────────────────

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 9, 30, 0).unwrap()
}

fn make_ticks(n: usize) -> Vec<Tick> {
    (0..n)
        .map(|i| {
            let price = 100.0 + (i as f64 * 0.1).sin() * 5.0;
            Tick::trade(
                "rb2410",
                base_time() + Duration::seconds(i as i64),
                price,
                2.0,
            )
        })
        .collect()
}

fn make_bars(n: usize) -> Vec<Bar> {
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0;
            Bar {
                symbol: "rb2410".into(),
                interval: Interval::Minute(1),
                datetime: base_time() + Duration::minutes(i as i64),
                open: close - 0.3,
                high: close + 1.5,
                low: close - 1.5,
                close,
                volume: 100.0,
                open_interest: 0.0,
            }
        })
        .collect()
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_bar_generator(c: &mut Criterion) {
    let ticks = make_ticks(10_000);
    c.bench_function("bar_generator_10k_ticks", |b| {
        b.iter(|| {
            let mut bg = BarGenerator::new("rb2410", 0);
            let mut bars = 0usize;
            for tick in &ticks {
                if bg.update_tick(tick).is_some() {
                    bars += 1;
                }
            }
            black_box(bars)
        })
    });
}

fn bench_indicators(c: &mut Criterion) {
    let mut am = ArrayManager::new(100);
    for bar in make_bars(200) {
        am.update(&bar);
    }
    c.bench_function("indicator_query_batch", |b| {
        b.iter(|| {
            black_box((
                am.sma(20),
                am.ema(20),
                am.rsi(14),
                am.atr(14),
                am.macd(12, 26, 9),
                am.boll(20, 2.0),
                am.donchian(20),
            ))
        })
    });
}

fn bench_stop_checks(c: &mut Criterion) {
    let ticks = make_ticks(1_000);
    c.bench_function("stop_check_100_waiting", |b| {
        b.iter(|| {
            let mut sim = StopOrderSimulator::new();
            for i in 0..100 {
                sim.add(
                    "rb2410",
                    Direction::Long,
                    Offset::Open,
                    200.0 + i as f64,
                    1.0,
                    PriceType::Market,
                    base_time(),
                );
            }
            let mut fired = 0usize;
            for tick in &ticks {
                fired += sim.check_tick(tick).len();
            }
            black_box(fired)
        })
    });
}

fn bench_engine_dispatch(c: &mut Criterion) {
    let bars = make_bars(2_000);
    c.bench_function("engine_2k_bars_double_ma", |b| {
        b.iter(|| {
            let mut eng = Engine::new(
                Box::new(RecordingClient::new()),
                Box::new(MemoryStore::new()),
            );
            eng.add_strategy(
                "double_ma",
                "rb2410",
                Box::new(DoubleMaStrategy::new()),
                ParamMap::new(),
                StrategySettings::default(),
            )
            .unwrap();
            eng.init_strategy("double_ma").unwrap();
            eng.start_strategy("double_ma").unwrap();
            for bar in &bars {
                eng.process_event(&Event::Bar(bar.clone()));
            }
            black_box(eng.trades().len())
        })
    });
}

criterion_group!(
    benches,
    bench_bar_generator,
    bench_indicators,
    bench_stop_checks,
    bench_engine_dispatch
);
criterion_main!(benches);
