//! Configuration validation.
//!
//! Validates all strategy fields before a run. Missing keys fall back to
//! the reference defaults; present keys must be well-formed and consistent.

use chrono::{FixedOffset, NaiveTime};

use crate::domain::error::ScalptraderError;
use crate::domain::indicator::IndicatorParams;
use crate::domain::strategy::{EntryRules, ExitRules, SessionWindow, StrategyConfig};
use crate::ports::config_port::ConfigPort;

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), ScalptraderError> {
    validate_session(config)?;
    validate_periods(config)?;
    validate_entry(config)?;
    validate_exit(config)?;
    validate_lot_size(config)?;
    validate_utc_offset(config)?;
    Ok(())
}

/// Parse an `HH:MM` (or `HH:MM:SS`) key from `[session]`.
pub fn parse_session_time(
    config: &dyn ConfigPort,
    key: &str,
    default: NaiveTime,
) -> Result<NaiveTime, ScalptraderError> {
    match config.get_string("session", key) {
        None => Ok(default),
        Some(s) => {
            let s = s.trim();
            NaiveTime::parse_from_str(s, "%H:%M")
                .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
                .map_err(|_| {
                    ScalptraderError::invalid("session", key, "invalid time, expected HH:MM")
                })
        }
    }
}

/// Parse a `+HH:MM` / `-HH:MM` offset.
pub fn parse_utc_offset(value: &str) -> Option<FixedOffset> {
    let value = value.trim();
    let (sign, rest) = match value.as_bytes().first()? {
        b'+' => (1, &value[1..]),
        b'-' => (-1, &value[1..]),
        _ => (1, value),
    };
    let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if !(0..=23).contains(&hours) || !(0..=59).contains(&minutes) {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn validate_session(config: &dyn ConfigPort) -> Result<(), ScalptraderError> {
    let defaults = SessionWindow::default();
    let start = parse_session_time(config, "entry_start", defaults.entry_start)?;
    let end = parse_session_time(config, "entry_end", defaults.entry_end)?;
    let force_exit = parse_session_time(config, "force_exit", defaults.force_exit)?;

    if start >= end {
        return Err(ScalptraderError::invalid(
            "session",
            "entry_start",
            "entry_start must be before entry_end",
        ));
    }
    if end >= force_exit {
        return Err(ScalptraderError::invalid(
            "session",
            "force_exit",
            "force_exit must be after entry_end",
        ));
    }
    Ok(())
}

/// Integer value of a key, `default` when absent. A present value that is
/// not an integer is rejected rather than replaced by the default.
fn int_key(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<i64, ScalptraderError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(s) => s.trim().parse::<i64>().map_err(|_| {
            ScalptraderError::invalid(section, key, format!("{} must be an integer", key))
        }),
    }
}

/// Finite float value of a key, `default` when absent.
fn number_key(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, ScalptraderError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| {
                ScalptraderError::invalid(section, key, format!("{} must be a number", key))
            }),
    }
}

fn positive_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<i64, ScalptraderError> {
    let value = int_key(config, section, key, default)?;
    if value < 1 {
        return Err(ScalptraderError::invalid(
            section,
            key,
            format!("{} must be at least 1", key),
        ));
    }
    Ok(value)
}

fn validate_periods(config: &dyn ConfigPort) -> Result<(), ScalptraderError> {
    let defaults = IndicatorParams::default();
    positive_int(config, "indicators", "ema_period", defaults.ema_period as i64)?;
    let fast = positive_int(config, "indicators", "macd_fast", defaults.macd_fast as i64)?;
    let slow = positive_int(config, "indicators", "macd_slow", defaults.macd_slow as i64)?;
    let signal = positive_int(config, "indicators", "macd_signal", defaults.macd_signal as i64)?;
    let atr = positive_int(config, "indicators", "atr_period", defaults.atr_period as i64)?;

    if fast >= slow {
        return Err(ScalptraderError::invalid(
            "indicators",
            "macd_fast",
            "macd_fast must be shorter than macd_slow",
        ));
    }

    if config.get_string("indicators", "warmup").is_some() {
        let warmup = int_key(config, "indicators", "warmup", 0)?;
        let floor = IndicatorParams {
            macd_slow: slow as usize,
            macd_signal: signal as usize,
            atr_period: atr as usize,
            ..defaults
        }
        .min_warmup() as i64;
        if warmup < floor {
            return Err(ScalptraderError::invalid(
                "indicators",
                "warmup",
                format!("warmup must be at least {} for these periods", floor),
            ));
        }
    }
    Ok(())
}

fn validate_entry(config: &dyn ConfigPort) -> Result<(), ScalptraderError> {
    let defaults = EntryRules::default();
    for (key, default) in [
        ("macd_gap", defaults.macd_gap),
        ("min_atr_ratio", defaults.min_atr_ratio),
    ] {
        if number_key(config, "entry", key, default)? < 0.0 {
            return Err(ScalptraderError::invalid(
                "entry",
                key,
                format!("{} must be non-negative", key),
            ));
        }
    }
    if config.get_string("entry", "min_bar_strength").is_some() {
        let strength = number_key(config, "entry", "min_bar_strength", f64::NAN)?;
        if !(0.0..=1.0).contains(&strength) {
            return Err(ScalptraderError::invalid(
                "entry",
                "min_bar_strength",
                "min_bar_strength must be between 0 and 1",
            ));
        }
    }
    Ok(())
}

fn validate_exit(config: &dyn ConfigPort) -> Result<(), ScalptraderError> {
    let defaults = ExitRules::default();

    for (key, default) in [
        ("initial_sl_atr_mult", defaults.initial_sl_atr_mult),
        ("take_profit_points", defaults.take_profit_points),
    ] {
        if number_key(config, "exit", key, default)? <= 0.0 {
            return Err(ScalptraderError::invalid(
                "exit",
                key,
                format!("{} must be positive", key),
            ));
        }
    }
    for (key, default) in [
        ("trail_floor_points", defaults.trail_floor_points),
        ("trail_atr_mult", defaults.trail_atr_mult),
    ] {
        if number_key(config, "exit", key, default)? < 0.0 {
            return Err(ScalptraderError::invalid(
                "exit",
                key,
                format!("{} must be non-negative", key),
            ));
        }
    }

    let points = config.get_string("exit", "lock_offset_points");
    let atr_mult = config.get_string("exit", "lock_offset_atr_mult");
    if points.is_some() && atr_mult.is_some() {
        return Err(ScalptraderError::invalid(
            "exit",
            "lock_offset_atr_mult",
            "set either lock_offset_points or lock_offset_atr_mult, not both",
        ));
    }
    for (key, value) in [("lock_offset_points", points), ("lock_offset_atr_mult", atr_mult)] {
        if value.is_some() && number_key(config, "exit", key, -1.0)? < 0.0 {
            return Err(ScalptraderError::invalid(
                "exit",
                key,
                format!("{} must be a non-negative number", key),
            ));
        }
    }
    Ok(())
}

fn validate_lot_size(config: &dyn ConfigPort) -> Result<(), ScalptraderError> {
    let lot_size = int_key(
        config,
        "contract",
        "lot_size",
        StrategyConfig::default().lot_size as i64,
    )?;
    if lot_size < 1 || lot_size > u32::MAX as i64 {
        return Err(ScalptraderError::invalid(
            "contract",
            "lot_size",
            "lot_size must be at least 1",
        ));
    }
    Ok(())
}

fn validate_utc_offset(config: &dyn ConfigPort) -> Result<(), ScalptraderError> {
    match config.get_string("data", "utc_offset") {
        Some(s) if parse_utc_offset(&s).is_none() => Err(ScalptraderError::invalid(
            "data",
            "utc_offset",
            "invalid offset, expected +HH:MM",
        )),
        _ => Ok(()),
    }
}
