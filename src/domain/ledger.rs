//! Append-only trade ledger with running aggregates.

use std::collections::BTreeMap;

use crate::domain::error::ScalptraderError;
use crate::domain::position::{ExitReason, Trade};
use crate::ports::trade_sink::TradeSink;

/// Completed trades for one run, in the order they closed.
///
/// Trades are only ever appended; the ledger hands out shared references, so
/// a recorded trade cannot be altered. Count, wins and net P&L are kept up to
/// date on every append and may be read mid-run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeLedger {
    trades: Vec<Trade>,
    wins: usize,
    net_pnl: f64,
}

impl TradeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, trade: Trade) {
        if trade.is_win() {
            self.wins += 1;
        }
        self.net_pnl += trade.pnl_currency;
        self.trades.push(trade);
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn count(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn wins(&self) -> usize {
        self.wins
    }

    /// wins / count, 0 for an empty ledger.
    pub fn win_rate(&self) -> f64 {
        if self.trades.is_empty() {
            0.0
        } else {
            self.wins as f64 / self.trades.len() as f64
        }
    }

    /// Sum of pnl_currency.
    pub fn net_pnl(&self) -> f64 {
        self.net_pnl
    }

    pub fn summary(&self) -> LedgerSummary {
        LedgerSummary::compute(&self.trades)
    }

    /// Merge several ledgers into one ordered by exit time. Ties keep the
    /// order of `ledgers`.
    pub fn merged<'a, I>(ledgers: I) -> TradeLedger
    where
        I: IntoIterator<Item = &'a TradeLedger>,
    {
        let mut all: Vec<Trade> = ledgers
            .into_iter()
            .flat_map(|l| l.trades.iter().cloned())
            .collect();
        all.sort_by_key(|t| t.exit_time);

        let mut merged = TradeLedger::new();
        for trade in all {
            merged.record(trade);
        }
        merged
    }
}

impl TradeSink for TradeLedger {
    fn record(&mut self, trade: &Trade) -> Result<(), ScalptraderError> {
        TradeLedger::record(self, trade.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerSummary {
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub breakeven: usize,
    pub win_rate: f64,
    pub net_pnl: f64,
    pub net_points: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub by_reason: BTreeMap<&'static str, usize>,
}

impl LedgerSummary {
    pub fn compute(trades: &[Trade]) -> Self {
        let mut wins = 0usize;
        let mut losses = 0usize;
        let mut breakeven = 0usize;
        let mut gross_profit = 0.0_f64;
        let mut gross_loss = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut net_points = 0.0_f64;
        let mut by_reason: BTreeMap<&'static str, usize> = BTreeMap::new();

        for trade in trades {
            let pnl = trade.pnl_currency;
            if pnl > 0.0 {
                wins += 1;
                gross_profit += pnl;
                largest_win = largest_win.max(pnl);
            } else if pnl < 0.0 {
                losses += 1;
                gross_loss += pnl.abs();
                largest_loss = largest_loss.max(pnl.abs());
            } else {
                breakeven += 1;
            }
            net_points += trade.pnl_points;
            *by_reason.entry(trade.exit_reason.label()).or_insert(0) += 1;
        }

        let total_trades = trades.len();
        let win_rate = if total_trades > 0 {
            wins as f64 / total_trades as f64
        } else {
            0.0
        };

        let profit_factor = if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else if gross_profit > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let avg_win = if wins > 0 {
            gross_profit / wins as f64
        } else {
            0.0
        };
        let avg_loss = if losses > 0 {
            gross_loss / losses as f64
        } else {
            0.0
        };

        LedgerSummary {
            total_trades,
            wins,
            losses,
            breakeven,
            win_rate,
            net_pnl: gross_profit - gross_loss,
            net_points,
            gross_profit,
            gross_loss,
            profit_factor,
            avg_win,
            avg_loss,
            largest_win,
            largest_loss,
            by_reason,
        }
    }

    pub fn count_for(&self, reason: ExitReason) -> usize {
        self.by_reason.get(reason.label()).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::Side;
    use approx::assert_relative_eq;
    use chrono::{DateTime, FixedOffset, TimeZone};

    fn t(minute: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(19_800)
            .unwrap()
            .with_ymd_and_hms(2025, 8, 1, 10, minute, 0)
            .unwrap()
    }

    fn trade(points: f64, reason: ExitReason, exit_minute: u32) -> Trade {
        Trade {
            entry_time: t(0),
            side: Side::LongCall,
            entry_price: 100.0,
            exit_time: t(exit_minute),
            exit_price: 100.0 + points,
            exit_reason: reason,
            exit_stop: 96.0,
            pnl_points: points,
            pnl_currency: points * 75.0,
        }
    }

    #[test]
    fn empty_ledger() {
        let ledger = TradeLedger::new();
        assert_eq!(ledger.count(), 0);
        assert!(ledger.is_empty());
        assert_eq!(ledger.win_rate(), 0.0);
        assert_eq!(ledger.net_pnl(), 0.0);
        let summary = ledger.summary();
        assert_eq!(summary.total_trades, 0);
        assert_eq!(summary.profit_factor, 0.0);
    }

    #[test]
    fn aggregates_update_on_each_record() {
        let mut ledger = TradeLedger::new();
        ledger.record(trade(13.0, ExitReason::StopLoss, 5));
        assert_eq!(ledger.count(), 1);
        assert_relative_eq!(ledger.win_rate(), 1.0);
        assert_relative_eq!(ledger.net_pnl(), 975.0);

        ledger.record(trade(-4.0, ExitReason::InitialStopLoss, 10));
        assert_eq!(ledger.count(), 2);
        assert_eq!(ledger.wins(), 1);
        assert_relative_eq!(ledger.win_rate(), 0.5);
        assert_relative_eq!(ledger.net_pnl(), 675.0);
    }

    #[test]
    fn breakeven_is_not_a_win() {
        let mut ledger = TradeLedger::new();
        ledger.record(trade(0.0, ExitReason::EndOfDay, 5));
        assert_eq!(ledger.wins(), 0);
        assert_eq!(ledger.summary().breakeven, 1);
    }

    #[test]
    fn earlier_trades_are_unchanged_by_later_records() {
        let mut ledger = TradeLedger::new();
        let first = trade(13.0, ExitReason::StopLoss, 5);
        ledger.record(first.clone());
        ledger.record(trade(-4.0, ExitReason::InitialStopLoss, 10));
        assert_eq!(ledger.trades()[0], first);
    }

    #[test]
    fn summary_statistics() {
        let mut ledger = TradeLedger::new();
        ledger.record(trade(20.0, ExitReason::TrailProfit, 1));
        ledger.record(trade(-4.0, ExitReason::InitialStopLoss, 2));
        ledger.record(trade(10.0, ExitReason::MomentumExit, 3));
        ledger.record(trade(-6.0, ExitReason::InitialStopLoss, 4));

        let s = ledger.summary();
        assert_eq!(s.total_trades, 4);
        assert_eq!(s.wins, 2);
        assert_eq!(s.losses, 2);
        assert_relative_eq!(s.gross_profit, 2250.0);
        assert_relative_eq!(s.gross_loss, 750.0);
        assert_relative_eq!(s.profit_factor, 3.0);
        assert_relative_eq!(s.avg_win, 1125.0);
        assert_relative_eq!(s.avg_loss, 375.0);
        assert_relative_eq!(s.largest_win, 1500.0);
        assert_relative_eq!(s.largest_loss, 450.0);
        assert_relative_eq!(s.net_pnl, ledger.net_pnl());
        assert_relative_eq!(s.net_points, 20.0);
        assert_eq!(s.count_for(ExitReason::InitialStopLoss), 2);
        assert_eq!(s.count_for(ExitReason::EndOfDay), 0);
    }

    #[test]
    fn profit_factor_without_losses_is_infinite() {
        let s = LedgerSummary::compute(&[trade(5.0, ExitReason::StopLoss, 1)]);
        assert!(s.profit_factor.is_infinite());
    }

    #[test]
    fn merged_orders_by_exit_time() {
        let mut calls = TradeLedger::new();
        calls.record(trade(5.0, ExitReason::StopLoss, 10));
        calls.record(trade(6.0, ExitReason::StopLoss, 30));
        let mut puts = TradeLedger::new();
        puts.record(trade(-2.0, ExitReason::InitialStopLoss, 20));

        let merged = TradeLedger::merged([&calls, &puts]);
        let exits: Vec<_> = merged.trades().iter().map(|t| t.exit_time).collect();
        assert_eq!(exits, vec![t(10), t(20), t(30)]);
        assert_eq!(merged.wins(), 2);
        assert_relative_eq!(merged.net_pnl(), 675.0);
    }

    #[test]
    fn ledger_as_sink() {
        let mut ledger = TradeLedger::new();
        TradeSink::record(&mut ledger, &trade(1.0, ExitReason::EndOfDay, 1)).unwrap();
        assert_eq!(ledger.count(), 1);
    }
}
