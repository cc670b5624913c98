//! Indicator engine: EMA trend filter, MACD triple and ATR attached per bar.
//!
//! - `IndicatorParams`: periods plus the warmup length before entries are allowed
//! - `IndicatorSet`: the per-bar values, present only once every field is defined
//! - `EnrichedBar`: a bar with its optional `IndicatorSet`
//! - `enrich`: pure, deterministic annotation of a bar sequence

pub mod atr;
pub mod ema;
pub mod macd;

pub use atr::calculate_atr;
pub use ema::calculate_ema;
pub use macd::{calculate_macd, MacdPoint};

use crate::domain::bar::Bar;
use std::fmt;

pub const DEFAULT_EMA_PERIOD: usize = 21;
pub const DEFAULT_ATR_PERIOD: usize = 14;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorParams {
    pub ema_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub atr_period: usize,
    /// Overrides the derived warmup when set.
    pub warmup_override: Option<usize>,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        IndicatorParams {
            ema_period: DEFAULT_EMA_PERIOD,
            macd_fast: macd::DEFAULT_FAST,
            macd_slow: macd::DEFAULT_SLOW,
            macd_signal: macd::DEFAULT_SIGNAL,
            atr_period: DEFAULT_ATR_PERIOD,
            warmup_override: None,
        }
    }
}

impl IndicatorParams {
    /// First bar index at which indicator values may be trusted and entries
    /// allowed, unless overridden.
    pub fn warmup(&self) -> usize {
        self.warmup_override.unwrap_or_else(|| self.min_warmup())
    }

    /// Smallest warmup at which the signal detector never reads a bar
    /// without an `IndicatorSet`: the MACD signal must have settled and ATR
    /// must be defined on the two bars before.
    pub fn min_warmup(&self) -> usize {
        self.macd_slow.saturating_add(self.macd_signal).max(self.atr_period.saturating_add(2))
    }
}

impl fmt::Display for IndicatorParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EMA({}) MACD({},{},{}) ATR({}) warmup={}",
            self.ema_period,
            self.macd_fast,
            self.macd_slow,
            self.macd_signal,
            self.atr_period,
            self.warmup()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorSet {
    /// EMA of close used as the trend filter (EMA21 by default).
    pub ema_fast_momentum: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub macd_histogram: f64,
    pub atr: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedBar {
    pub bar: Bar,
    pub indicators: Option<IndicatorSet>,
}

/// Annotate every bar with its indicator values. The output has the same
/// length as the input; bars whose ATR is still undefined carry `None`.
pub fn enrich(bars: &[Bar], params: &IndicatorParams) -> Vec<EnrichedBar> {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let ema = calculate_ema(&closes, params.ema_period);
    let macd = calculate_macd(&closes, params.macd_fast, params.macd_slow, params.macd_signal);
    let atr = calculate_atr(bars, params.atr_period);

    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let indicators = match (ema.get(i), macd.get(i), atr.get(i).copied().flatten()) {
                (Some(&trend), Some(m), Some(range)) => Some(IndicatorSet {
                    ema_fast_momentum: trend,
                    macd: m.line,
                    macd_signal: m.signal,
                    macd_histogram: m.histogram,
                    atr: range,
                }),
                _ => None,
            };
            EnrichedBar {
                bar: bar.clone(),
                indicators,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    fn make_bars(closes: &[f64]) -> Vec<Bar> {
        let tz = FixedOffset::east_opt(19_800).unwrap();
        let start = tz.with_ymd_and_hms(2025, 8, 1, 9, 15, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                timestamp: start + chrono::Duration::minutes(5 * i as i64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1000,
            })
            .collect()
    }

    #[test]
    fn default_warmup_matches_reference() {
        assert_eq!(IndicatorParams::default().warmup(), 35);
    }

    #[test]
    fn warmup_override_wins() {
        let params = IndicatorParams {
            warmup_override: Some(50),
            ..Default::default()
        };
        assert_eq!(params.warmup(), 50);
    }

    #[test]
    fn warmup_uses_atr_when_longer() {
        let params = IndicatorParams {
            atr_period: 60,
            ..Default::default()
        };
        assert_eq!(params.warmup(), 62);
    }

    #[test]
    fn min_warmup_covers_the_histogram_lookback() {
        let params = IndicatorParams {
            atr_period: 40,
            ..Default::default()
        };
        let enriched = enrich(&make_bars(&[100.0; 50]), &params);
        let w = params.min_warmup();
        assert!(enriched[w - 2].indicators.is_some());
        assert!(enriched[w - 3].indicators.is_none());
    }

    #[test]
    fn enrich_preserves_length() {
        let bars = make_bars(&[100.0; 40]);
        let enriched = enrich(&bars, &IndicatorParams::default());
        assert_eq!(enriched.len(), 40);
        assert_eq!(enriched[7].bar, bars[7]);
    }

    #[test]
    fn indicators_undefined_until_atr_defined() {
        let bars = make_bars(&[100.0; 20]);
        let enriched = enrich(&bars, &IndicatorParams::default());
        for (i, e) in enriched.iter().enumerate() {
            assert_eq!(e.indicators.is_some(), i >= DEFAULT_ATR_PERIOD, "index {}", i);
        }
    }

    #[test]
    fn flat_series_has_zero_macd() {
        let bars = make_bars(&[100.0; 30]);
        let enriched = enrich(&bars, &IndicatorParams::default());
        let set = enriched[29].indicators.unwrap();
        assert!((set.ema_fast_momentum - 100.0).abs() < 1e-12);
        assert!(set.macd.abs() < 1e-12);
        assert!(set.macd_histogram.abs() < 1e-12);
        assert!((set.atr - 2.0).abs() < 1e-12);
    }

    #[test]
    fn enrich_is_idempotent() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let bars = make_bars(&closes);
        let params = IndicatorParams::default();
        assert_eq!(enrich(&bars, &params), enrich(&bars, &params));
    }

    #[test]
    fn empty_input() {
        assert!(enrich(&[], &IndicatorParams::default()).is_empty());
    }

    #[test]
    fn params_display() {
        assert_eq!(
            IndicatorParams::default().to_string(),
            "EMA(21) MACD(12,26,9) ATR(14) warmup=35"
        );
    }
}
