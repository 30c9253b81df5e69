use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use price_chart_bridge::domain::chart::{OverlayManager, PriceLineOverlay};
use price_chart_bridge::domain::market_data::{
    CandleSeries, IndicatorEngine, IndicatorSet, IndicatorSpec, RawCandle,
};
use std::collections::BTreeSet;
use std::hint::black_box;
use std::time::Duration;

/// Synthetic kline rows with trend, volatility and noise
fn generate_rows(count: usize) -> Vec<RawCandle> {
    let mut rows = Vec::with_capacity(count);
    let mut base_price = 50_000.0;
    for i in 0..count {
        let x = i as f64;
        let open = base_price + (x * 0.001).sin() * 1_000.0 + (x * 0.1).sin() * 200.0;
        let close = open + (x * 0.3).cos() * 100.0;
        let high = open.max(close) + (x * 0.7).sin().abs() * 150.0;
        let low = open.min(close) - (x * 0.9).cos().abs() * 120.0;
        let volume = 1_000.0 + (x * 0.4).sin().abs() * 2_000.0;
        rows.push(RawCandle::new(
            (1_640_000_000_000u64 + i as u64 * 60_000) as f64,
            open,
            high,
            low,
            close,
            Some(volume),
        ));
        base_price = close * 0.999 + open * 0.001;
    }
    rows
}

fn bench_series_replace(c: &mut Criterion) {
    let mut group = c.benchmark_group("series_replace");
    for count in [200, 1_000, 5_000] {
        let rows = generate_rows(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &rows, |b, rows| {
            b.iter(|| {
                let mut series = CandleSeries::new();
                series.replace_raw(black_box(rows));
                series
            })
        });
    }
    group.finish();
}

fn bench_indicators(c: &mut Criterion) {
    let mut group = c.benchmark_group("indicators");
    group.measurement_time(Duration::from_secs(5));

    let mut set = IndicatorSet::new();
    for period in [9, 20, 50, 200] {
        if let (Ok(ma), Ok(ema)) = (IndicatorSpec::ma(period), IndicatorSpec::ema(period)) {
            set.insert(ma);
            set.insert(ema);
        }
    }

    for count in [200, 1_000, 10_000] {
        let mut series = CandleSeries::new();
        series.replace_raw(&generate_rows(count));
        group.bench_with_input(BenchmarkId::new("compute_all", count), &series, |b, series| {
            b.iter(|| IndicatorEngine::compute_all(black_box(series), &set))
        });
    }
    group.finish();
}

fn bench_overlay_delta(c: &mut Criterion) {
    let mut manager = OverlayManager::new();
    for i in 0..500 {
        if let Ok(line) = PriceLineOverlay::new(format!("line-{}", i), 100.0 + i as f64, None) {
            manager.upsert(line);
        }
    }
    let materialized: BTreeSet<String> = (250..750).map(|i| format!("line-{}", i)).collect();
    c.bench_function("overlay_delta_500", |b| {
        b.iter(|| manager.delta_against(black_box(&materialized)))
    });
}

criterion_group!(benches, bench_series_replace, bench_indicators, bench_overlay_delta);
criterion_main!(benches);
