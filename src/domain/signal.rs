//! Entry signal detection over an enriched bar sequence.
//!
//! Stateless: the answer for a given index depends only on the sequence and
//! the configuration. The position machine only asks while it is flat.

use crate::domain::error::ScalptraderError;
use crate::domain::indicator::{EnrichedBar, IndicatorSet};
use crate::domain::position::Side;
use crate::domain::strategy::StrategyConfig;

/// Detect an entry at `index`.
///
/// Returns `Ok(None)` before the warmup length or outside the entry window.
/// A bar inside the warmed-up region without indicator values (or whose two
/// predecessors lack them) is a caller error.
pub fn detect_signal(
    bars: &[EnrichedBar],
    index: usize,
    config: &StrategyConfig,
) -> Result<Option<Side>, ScalptraderError> {
    if index < 2 || index < config.indicators.warmup() || index >= bars.len() {
        return Ok(None);
    }

    let current = &bars[index];
    if !config.session.allows_entry(current.bar.time()) {
        return Ok(None);
    }

    let now = indicators_at(bars, index)?;
    let prev1 = indicators_at(bars, index - 1)?;
    let prev2 = indicators_at(bars, index - 2)?;

    if long_call_triggered(current, &now, &prev1, &prev2, config) {
        return Ok(Some(Side::LongCall));
    }
    if short_put_triggered(current, &now, &prev1, &prev2, config) {
        return Ok(Some(Side::ShortPut));
    }
    Ok(None)
}

fn indicators_at(bars: &[EnrichedBar], index: usize) -> Result<IndicatorSet, ScalptraderError> {
    bars[index]
        .indicators
        .ok_or(ScalptraderError::MissingIndicators { index })
}

fn volatile_enough(close: f64, atr: f64, min_ratio: f64) -> bool {
    close > 0.0 && atr / close >= min_ratio
}

fn long_call_triggered(
    current: &EnrichedBar,
    now: &IndicatorSet,
    prev1: &IndicatorSet,
    prev2: &IndicatorSet,
    config: &StrategyConfig,
) -> bool {
    let rules = &config.entry;
    let close = current.bar.close;

    let hist_rising =
        now.macd_histogram > prev1.macd_histogram && prev1.macd_histogram > prev2.macd_histogram;
    let crossed_up =
        rules.allow_macd_cross && prev1.macd < prev1.macd_signal && now.macd > now.macd_signal;
    let strong = rules
        .min_bar_strength
        .is_none_or(|min| current.bar.ce_strength() > min);

    (hist_rising || crossed_up)
        && (now.macd - now.macd_signal) > rules.macd_gap
        && close > now.ema_fast_momentum
        && volatile_enough(close, now.atr, rules.min_atr_ratio)
        && strong
}

fn short_put_triggered(
    current: &EnrichedBar,
    now: &IndicatorSet,
    prev1: &IndicatorSet,
    prev2: &IndicatorSet,
    config: &StrategyConfig,
) -> bool {
    let rules = &config.entry;
    let close = current.bar.close;

    let hist_falling =
        now.macd_histogram < prev1.macd_histogram && prev1.macd_histogram < prev2.macd_histogram;
    let crossed_down =
        rules.allow_macd_cross && prev1.macd > prev1.macd_signal && now.macd < now.macd_signal;
    let strong = rules
        .min_bar_strength
        .is_none_or(|min| current.bar.pe_strength() > min);

    (hist_falling || crossed_down)
        && (now.macd - now.macd_signal) < -rules.macd_gap
        && close < now.ema_fast_momentum
        && volatile_enough(close, now.atr, rules.min_atr_ratio)
        && strong
}
