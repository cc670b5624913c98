//! Position, side, exit reason and completed-trade types.

use chrono::{DateTime, FixedOffset};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    LongCall,
    ShortPut,
}

impl Side {
    /// +1 for LongCall, -1 for ShortPut: multiplies a price move into a
    /// favorable (positive) or adverse (negative) distance.
    pub fn direction(self) -> f64 {
        match self {
            Side::LongCall => 1.0,
            Side::ShortPut => -1.0,
        }
    }

    /// Label used in trade logs.
    pub fn label(self) -> &'static str {
        match self {
            Side::LongCall => "BUY_CE",
            Side::ShortPut => "SELL_PE",
        }
    }

    pub fn parse(s: &str) -> Option<Side> {
        match s.trim().to_ascii_lowercase().as_str() {
            "long-call" | "long_call" | "buy_ce" | "ce" => Some(Side::LongCall),
            "short-put" | "short_put" | "sell_pe" | "pe" => Some(Side::ShortPut),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitReason {
    InitialStopLoss,
    StopLoss,
    Tp1Only,
    TrailProfit,
    MomentumExit,
    EndOfDay,
}

impl ExitReason {
    pub const ALL: [ExitReason; 6] = [
        ExitReason::InitialStopLoss,
        ExitReason::StopLoss,
        ExitReason::Tp1Only,
        ExitReason::TrailProfit,
        ExitReason::MomentumExit,
        ExitReason::EndOfDay,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ExitReason::InitialStopLoss => "Initial SL Hit",
            ExitReason::StopLoss => "SL Hit",
            ExitReason::Tp1Only => "TP1 Only",
            ExitReason::TrailProfit => "Trail Profit",
            ExitReason::MomentumExit => "MACD/EMA Exit",
            ExitReason::EndOfDay => "EOD Exit",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Round a price level to exchange tick granularity (2 dp).
pub fn round_price(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Unlocked,
    Locked,
}

/// The single open position of a machine.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub side: Side,
    pub entry_time: DateTime<FixedOffset>,
    pub entry_price: f64,
    /// Current stop; equals `initial_stop_loss` until the profit lock.
    pub stop_loss: f64,
    pub initial_stop_loss: f64,
    pub take_profit_level: f64,
    pub lock: LockState,
    /// Running max of highs (LongCall) or min of lows (ShortPut).
    pub favorable_extreme: f64,
    pub trail_adjustment_count: u32,
}

impl Position {
    pub fn open(
        side: Side,
        entry_time: DateTime<FixedOffset>,
        entry_price: f64,
        stop_distance: f64,
        take_profit_distance: f64,
    ) -> Self {
        let dir = side.direction();
        let initial_stop_loss = round_price(entry_price - dir * stop_distance);
        Position {
            side,
            entry_time,
            entry_price,
            stop_loss: initial_stop_loss,
            initial_stop_loss,
            take_profit_level: entry_price + dir * take_profit_distance,
            lock: LockState::Unlocked,
            favorable_extreme: entry_price,
            trail_adjustment_count: 0,
        }
    }

    pub fn profit_locked(&self) -> bool {
        self.lock == LockState::Locked
    }

    pub fn track_extreme(&mut self, high: f64, low: f64) {
        self.favorable_extreme = match self.side {
            Side::LongCall => self.favorable_extreme.max(high),
            Side::ShortPut => self.favorable_extreme.min(low),
        };
    }

    /// True when `price` is at or beyond `level` in the adverse direction.
    pub fn breached(&self, price: f64, level: f64) -> bool {
        match self.side {
            Side::LongCall => price <= level,
            Side::ShortPut => price >= level,
        }
    }

    /// True when the bar's favorable intrabar extreme reaches take-profit.
    pub fn take_profit_reached(&self, high: f64, low: f64) -> bool {
        match self.side {
            Side::LongCall => high >= self.take_profit_level,
            Side::ShortPut => low <= self.take_profit_level,
        }
    }

    /// True when `candidate` is a tighter stop than the current one.
    pub fn improves_stop(&self, candidate: f64) -> bool {
        match self.side {
            Side::LongCall => candidate > self.stop_loss,
            Side::ShortPut => candidate < self.stop_loss,
        }
    }

    pub fn pnl_points(&self, exit_price: f64) -> f64 {
        self.side.direction() * (exit_price - self.entry_price)
    }
}

/// A completed round trip. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub entry_time: DateTime<FixedOffset>,
    pub side: Side,
    pub entry_price: f64,
    pub exit_time: DateTime<FixedOffset>,
    pub exit_price: f64,
    pub exit_reason: ExitReason,
    /// Stop level in force when the position closed.
    pub exit_stop: f64,
    pub pnl_points: f64,
    pub pnl_currency: f64,
}

impl Trade {
    pub fn close(
        position: &Position,
        exit_time: DateTime<FixedOffset>,
        exit_price: f64,
        exit_reason: ExitReason,
        lot_size: u32,
    ) -> Self {
        let pnl_points = position.pnl_points(exit_price);
        Trade {
            entry_time: position.entry_time,
            side: position.side,
            entry_price: position.entry_price,
            exit_time,
            exit_price,
            exit_reason,
            exit_stop: position.stop_loss,
            pnl_points,
            pnl_currency: pnl_points * lot_size as f64,
        }
    }

    pub fn is_win(&self) -> bool {
        self.pnl_currency > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(hour: u32, minute: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(19_800)
            .unwrap()
            .with_ymd_and_hms(2025, 8, 1, hour, minute, 0)
            .unwrap()
    }

    fn long() -> Position {
        Position::open(Side::LongCall, t(9, 45), 100.0, 4.0, 15.0)
    }

    fn short() -> Position {
        Position::open(Side::ShortPut, t(9, 45), 100.0, 4.0, 15.0)
    }

    #[test]
    fn open_long_levels() {
        let pos = long();
        assert_eq!(pos.initial_stop_loss, 96.0);
        assert_eq!(pos.stop_loss, 96.0);
        assert_eq!(pos.take_profit_level, 115.0);
        assert_eq!(pos.favorable_extreme, 100.0);
        assert!(!pos.profit_locked());
    }

    #[test]
    fn open_short_levels() {
        let pos = short();
        assert_eq!(pos.initial_stop_loss, 104.0);
        assert_eq!(pos.take_profit_level, 85.0);
    }

    #[test]
    fn initial_stop_is_rounded() {
        let pos = Position::open(Side::LongCall, t(9, 45), 100.0, 1.23456, 15.0);
        assert_eq!(pos.initial_stop_loss, 98.77);
    }

    #[test]
    fn extreme_tracks_favorable_side_only() {
        let mut pos = long();
        pos.track_extreme(104.0, 99.0);
        pos.track_extreme(102.0, 90.0);
        assert_eq!(pos.favorable_extreme, 104.0);

        let mut pos = short();
        pos.track_extreme(110.0, 97.0);
        pos.track_extreme(101.0, 98.0);
        assert_eq!(pos.favorable_extreme, 97.0);
    }

    #[test]
    fn breach_is_inclusive() {
        let pos = long();
        assert!(pos.breached(96.0, pos.stop_loss));
        assert!(!pos.breached(96.01, pos.stop_loss));
        let pos = short();
        assert!(pos.breached(104.0, pos.stop_loss));
        assert!(!pos.breached(103.99, pos.stop_loss));
    }

    #[test]
    fn take_profit_uses_intrabar_extreme() {
        assert!(long().take_profit_reached(115.0, 99.0));
        assert!(!long().take_profit_reached(114.9, 99.0));
        assert!(short().take_profit_reached(101.0, 85.0));
        assert!(!short().take_profit_reached(101.0, 85.1));
    }

    #[test]
    fn improves_stop_by_side() {
        assert!(long().improves_stop(97.0));
        assert!(!long().improves_stop(96.0));
        assert!(short().improves_stop(103.0));
        assert!(!short().improves_stop(104.0));
    }

    #[test]
    fn trade_pnl_long_and_short() {
        let trade = Trade::close(&long(), t(10, 0), 113.0, ExitReason::StopLoss, 75);
        assert!((trade.pnl_points - 13.0).abs() < 1e-12);
        assert!((trade.pnl_currency - 975.0).abs() < 1e-9);
        assert!(trade.is_win());

        let trade = Trade::close(&short(), t(10, 0), 104.0, ExitReason::InitialStopLoss, 75);
        assert!((trade.pnl_points + 4.0).abs() < 1e-12);
        assert!((trade.pnl_currency + 300.0).abs() < 1e-9);
        assert!(!trade.is_win());
        assert_eq!(trade.exit_stop, 104.0);
    }

    #[test]
    fn labels() {
        assert_eq!(Side::LongCall.to_string(), "BUY_CE");
        assert_eq!(ExitReason::MomentumExit.to_string(), "MACD/EMA Exit");
        assert_eq!(ExitReason::EndOfDay.to_string(), "EOD Exit");
        assert_eq!(Side::parse("short-put"), Some(Side::ShortPut));
        assert_eq!(Side::parse("CE"), Some(Side::LongCall));
        assert_eq!(Side::parse("straddle"), None);
    }
}
