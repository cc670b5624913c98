//! Strategy configuration: session window, indicator periods, entry
//! thresholds and the stop / profit-lock / trailing parameters.

use chrono::{DateTime, FixedOffset, NaiveTime};
use std::fmt;

use crate::domain::indicator::IndicatorParams;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionWindow {
    pub entry_start: NaiveTime,
    pub entry_end: NaiveTime,
    /// Any open position is closed on the first bar at or after this time,
    /// or on the first bar of a later trading day.
    pub force_exit: NaiveTime,
}

impl SessionWindow {
    /// Inclusive on both ends.
    pub fn allows_entry(&self, t: NaiveTime) -> bool {
        self.entry_start <= t && t <= self.entry_end
    }

    pub fn must_exit(&self, entered: DateTime<FixedOffset>, now: DateTime<FixedOffset>) -> bool {
        now.date_naive() != entered.date_naive() || now.time() >= self.force_exit
    }
}

impl Default for SessionWindow {
    fn default() -> Self {
        SessionWindow {
            entry_start: hm(9, 30),
            entry_end: hm(15, 15),
            force_exit: hm(15, 25),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntryRules {
    /// Minimum |macd - signal| gap, applied as `> gap` for longs and
    /// `< -gap` for shorts.
    pub macd_gap: f64,
    /// Minimum atr / close.
    pub min_atr_ratio: f64,
    /// When set, the close must sit this far into the bar's range in the
    /// trade's direction.
    pub min_bar_strength: Option<f64>,
    /// Accept a fresh MACD/signal crossover in place of the two-step
    /// histogram run.
    pub allow_macd_cross: bool,
}

impl Default for EntryRules {
    fn default() -> Self {
        EntryRules {
            macd_gap: 0.20,
            min_atr_ratio: 0.00065,
            min_bar_strength: None,
            allow_macd_cross: false,
        }
    }
}

/// Where the stop moves once take-profit is first reached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LockOffset {
    /// Fixed distance from entry, in price points.
    Points(f64),
    /// Multiple of the ATR on the locking bar.
    AtrMultiple(f64),
}

impl LockOffset {
    pub fn distance(&self, atr: f64) -> f64 {
        match *self {
            LockOffset::Points(p) => p,
            LockOffset::AtrMultiple(m) => m * atr,
        }
    }
}

impl fmt::Display for LockOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockOffset::Points(p) => write!(f, "{} pts", p),
            LockOffset::AtrMultiple(m) => write!(f, "{} x ATR", m),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExitRules {
    pub initial_sl_atr_mult: f64,
    pub take_profit_points: f64,
    pub lock_offset: LockOffset,
    pub trail_floor_points: f64,
    pub trail_atr_mult: f64,
    /// Label an untrailed locked-stop exit "TP1 Only" instead of "SL Hit".
    pub tp1_only_label: bool,
}

impl ExitRules {
    /// Trailing distance from the favorable extreme: max(floor, k * atr).
    pub fn trail_distance(&self, atr: f64) -> f64 {
        self.trail_floor_points.max(self.trail_atr_mult * atr)
    }
}

impl Default for ExitRules {
    fn default() -> Self {
        ExitRules {
            initial_sl_atr_mult: 1.0,
            take_profit_points: 15.0,
            lock_offset: LockOffset::Points(13.0),
            trail_floor_points: 10.0,
            trail_atr_mult: 0.3,
            tp1_only_label: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    pub session: SessionWindow,
    pub indicators: IndicatorParams,
    pub entry: EntryRules,
    pub exit: ExitRules,
    pub lot_size: u32,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            session: SessionWindow::default(),
            indicators: IndicatorParams::default(),
            entry: EntryRules::default(),
            exit: ExitRules::default(),
            lot_size: 75,
        }
    }
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn default_session_window() {
        let s = SessionWindow::default();
        assert!(!s.allows_entry(hm(9, 25)));
        assert!(s.allows_entry(hm(9, 30)));
        assert!(s.allows_entry(hm(15, 15)));
        assert!(!s.allows_entry(hm(15, 20)));
    }

    #[test]
    fn must_exit_at_cutoff_or_next_day() {
        let ist = FixedOffset::east_opt(19_800).unwrap();
        let on = |day: u32, h: u32, m: u32| ist.with_ymd_and_hms(2025, 8, day, h, m, 0).unwrap();
        let s = SessionWindow::default();
        let entered = on(1, 9, 45);
        assert!(!s.must_exit(entered, on(1, 15, 20)));
        assert!(s.must_exit(entered, on(1, 15, 25)));
        assert!(s.must_exit(entered, on(1, 15, 30)));
        assert!(s.must_exit(entered, on(4, 9, 15)));
    }

    #[test]
    fn lock_offset_distance() {
        assert_eq!(LockOffset::Points(13.0).distance(40.0), 13.0);
        assert!((LockOffset::AtrMultiple(0.5).distance(40.0) - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn trail_distance_uses_floor_when_atr_small() {
        let rules = ExitRules::default();
        assert_eq!(rules.trail_distance(20.0), 10.0);
        assert!((rules.trail_distance(50.0) - 15.0).abs() < 1e-12);
    }

    #[test]
    fn defaults() {
        let c = StrategyConfig::default();
        assert_eq!(c.lot_size, 75);
        assert_eq!(c.exit.take_profit_points, 15.0);
        assert_eq!(c.entry.macd_gap, 0.20);
        assert!(c.entry.min_bar_strength.is_none());
        assert_eq!(c.indicators.warmup(), 35);
    }

    #[test]
    fn lock_offset_display() {
        assert_eq!(LockOffset::Points(13.0).to_string(), "13 pts");
        assert_eq!(LockOffset::AtrMultiple(0.5).to_string(), "0.5 x ATR");
    }
}
