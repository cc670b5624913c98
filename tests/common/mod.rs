#![allow(dead_code)]

use chrono::{DateTime, Duration, FixedOffset, TimeZone};
use scalptrader::domain::bar::Bar;
use scalptrader::domain::indicator::{EnrichedBar, IndicatorSet};
use scalptrader::domain::strategy::StrategyConfig;
use std::path::{Path, PathBuf};

pub fn ist() -> FixedOffset {
    FixedOffset::east_opt(19_800).unwrap()
}

pub fn at(hour: u32, minute: u32) -> DateTime<FixedOffset> {
    ist().with_ymd_and_hms(2025, 8, 1, hour, minute, 0).unwrap()
}

/// First bar of the session.
pub fn session_open() -> DateTime<FixedOffset> {
    at(9, 15)
}

pub fn make_bar(timestamp: DateTime<FixedOffset>, open: f64, high: f64, low: f64, close: f64) -> Bar {
    Bar {
        timestamp,
        open,
        high,
        low,
        close,
        volume: 1_000,
    }
}

/// Five-minute bars from 09:15, each spanning close +/- 1.
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            make_bar(
                session_open() + Duration::minutes(5 * i as i64),
                close,
                close + 1.0,
                close - 1.0,
                close,
            )
        })
        .collect()
}

/// 75 bars (09:15 to 15:25) of an accelerating rally.
pub fn accelerating_rally() -> Vec<Bar> {
    let closes: Vec<f64> = (0..75).map(|i| 100.0 + 0.001 * (i as f64).powi(3)).collect();
    bars_from_closes(&closes)
}

/// 75 bars (09:15 to 15:25) of an accelerating selloff.
pub fn accelerating_selloff() -> Vec<Bar> {
    let closes: Vec<f64> = (0..75).map(|i| 600.0 - 0.001 * (i as f64).powi(3)).collect();
    bars_from_closes(&closes)
}

pub fn flat_session() -> Vec<Bar> {
    bars_from_closes(&[250.0; 75])
}

pub fn bullish() -> IndicatorSet {
    IndicatorSet {
        ema_fast_momentum: 90.0,
        macd: 1.5,
        macd_signal: 1.0,
        macd_histogram: 0.5,
        atr: 4.0,
    }
}

pub fn bearish() -> IndicatorSet {
    IndicatorSet {
        ema_fast_momentum: 110.0,
        macd: -1.5,
        macd_signal: -1.0,
        macd_histogram: -0.5,
        atr: 4.0,
    }
}

pub fn enriched(
    time: DateTime<FixedOffset>,
    high: f64,
    low: f64,
    close: f64,
    indicators: IndicatorSet,
) -> EnrichedBar {
    EnrichedBar {
        bar: make_bar(time, close, high, low, close),
        indicators: Some(indicators),
    }
}

/// Three bars ending at 09:45 whose histogram rises twice; a LongCall entry
/// at 100 is due on the last one.
pub fn long_setup() -> Vec<EnrichedBar> {
    [at(9, 35), at(9, 40), at(9, 45)]
        .into_iter()
        .enumerate()
        .map(|(i, time)| {
            let mut ind = bullish();
            ind.macd_histogram = 0.1 * (i as f64 + 1.0);
            enriched(time, 101.0, 99.0, 100.0, ind)
        })
        .collect()
}

/// Mirror of `long_setup` for a ShortPut entry at 100.
pub fn short_setup() -> Vec<EnrichedBar> {
    [at(9, 35), at(9, 40), at(9, 45)]
        .into_iter()
        .enumerate()
        .map(|(i, time)| {
            let mut ind = bearish();
            ind.macd_histogram = -0.1 * (i as f64 + 1.0);
            enriched(time, 101.0, 99.0, 100.0, ind)
        })
        .collect()
}

/// Reference config with the warmup shortened so hand-built sequences can
/// enter on their third bar.
pub fn short_warmup_config() -> StrategyConfig {
    let mut config = StrategyConfig::default();
    config.indicators.warmup_override = Some(2);
    config
}

pub fn write_bars_csv(dir: &Path, name: &str, bars: &[Bar]) -> PathBuf {
    let path = dir.join(name);
    let mut content = String::from("datetime,open,high,low,close,volume\n");
    for b in bars {
        content.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.timestamp.format("%Y-%m-%d %H:%M:%S"),
            b.open,
            b.high,
            b.low,
            b.close,
            b.volume
        ));
    }
    std::fs::write(&path, content).unwrap();
    path
}
