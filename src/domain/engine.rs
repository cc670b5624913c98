//! Position state machine: one open position at most, driven one bar at a
//! time.
//!
//! Flat -> Open(unlocked) -> Open(locked) -> Flat. While open, each bar runs
//! through the exit rules in a fixed priority and the first rule that fires
//! ends the bar:
//!
//! 1. session-end cutoff (always closes, overrides everything below)
//! 2. initial stop, unlocked only, exit at the initial stop
//! 3. take-profit reached, unlocked only: lock and tighten the stop, no exit
//! 4. locked stop, exit at the current stop
//! 5. trailing update (side effect only)
//! 6. momentum fail-safe, locked only, exit at close
//!
//! An entry is only taken while flat and never on the bar that closed the
//! previous position.

use crate::domain::error::ScalptraderError;
use crate::domain::event::{EngineEvent, EngineObserver};
use crate::domain::indicator::{EnrichedBar, IndicatorSet};
use crate::domain::ledger::TradeLedger;
use crate::domain::position::{round_price, ExitReason, LockState, Position, Side, Trade};
use crate::domain::signal::detect_signal;
use crate::domain::strategy::StrategyConfig;

/// Lifecycle phase, for callers that only need to know where the machine is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Flat,
    OpenUnlocked,
    OpenLocked,
}

/// What a single step did.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Flat and no entry taken (warmup, no signal, filtered side).
    Idle,
    Entered(Side),
    Held,
    Locked,
    Exited(Trade),
}

#[derive(Debug, Clone)]
pub struct PositionMachine {
    config: StrategyConfig,
    side_filter: Option<Side>,
    position: Option<Position>,
}

impl PositionMachine {
    pub fn new(config: StrategyConfig) -> Self {
        PositionMachine {
            config,
            side_filter: None,
            position: None,
        }
    }

    /// Restrict entries to one side; signals for the other side are ignored.
    pub fn with_side_filter(mut self, side: Side) -> Self {
        self.side_filter = Some(side);
        self
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn phase(&self) -> Phase {
        match &self.position {
            None => Phase::Flat,
            Some(p) if p.profit_locked() => Phase::OpenLocked,
            Some(_) => Phase::OpenUnlocked,
        }
    }

    /// Process bar `index` of `bars`. Completed trades go to `ledger`,
    /// decisions to `observer`.
    pub fn step(
        &mut self,
        bars: &[EnrichedBar],
        index: usize,
        ledger: &mut TradeLedger,
        observer: &mut dyn EngineObserver,
    ) -> Result<StepOutcome, ScalptraderError> {
        let Some(current) = bars.get(index) else {
            return Ok(StepOutcome::Idle);
        };

        if self.position.is_none() {
            return self.try_enter(bars, index, observer);
        }

        let indicators = current
            .indicators
            .ok_or(ScalptraderError::MissingIndicators { index })?;
        let Some(position) = self.position.take() else {
            return Ok(StepOutcome::Idle);
        };
        match self.manage(position, current, &indicators, observer) {
            Managed::Open(position, outcome) => {
                self.position = Some(position);
                Ok(outcome)
            }
            Managed::Closed(trade) => {
                observer.on_event(&EngineEvent::Exited(trade.clone()));
                ledger.record(trade.clone());
                Ok(StepOutcome::Exited(trade))
            }
        }
    }

    fn try_enter(
        &mut self,
        bars: &[EnrichedBar],
        index: usize,
        observer: &mut dyn EngineObserver,
    ) -> Result<StepOutcome, ScalptraderError> {
        let Some(side) = detect_signal(bars, index, &self.config)? else {
            return Ok(StepOutcome::Idle);
        };
        if self.side_filter.is_some_and(|only| only != side) {
            return Ok(StepOutcome::Idle);
        }

        let current = &bars[index];
        let indicators = current
            .indicators
            .ok_or(ScalptraderError::MissingIndicators { index })?;
        let time = current.bar.timestamp;
        observer.on_event(&EngineEvent::EntrySignal {
            time,
            side,
            indicators,
        });

        let exit = &self.config.exit;
        let position = Position::open(
            side,
            time,
            current.bar.close,
            exit.initial_sl_atr_mult * indicators.atr,
            exit.take_profit_points,
        );
        observer.on_event(&EngineEvent::Entered {
            time,
            side,
            price: position.entry_price,
            stop_loss: position.stop_loss,
            take_profit: position.take_profit_level,
        });
        self.position = Some(position);
        Ok(StepOutcome::Entered(side))
    }

    fn manage(
        &self,
        mut pos: Position,
        current: &EnrichedBar,
        ind: &IndicatorSet,
        observer: &mut dyn EngineObserver,
    ) -> Managed {
        let bar = &current.bar;
        let lot_size = self.config.lot_size;
        let exit = &self.config.exit;

        pos.track_extreme(bar.high, bar.low);

        if self.config.session.must_exit(pos.entry_time, bar.timestamp) {
            let trade = Trade::close(&pos, bar.timestamp, bar.close, ExitReason::EndOfDay, lot_size);
            return Managed::Closed(trade);
        }

        if pos.lock == LockState::Unlocked {
            if pos.breached(bar.close, pos.initial_stop_loss) {
                let price = pos.initial_stop_loss;
                let trade = Trade::close(
                    &pos,
                    bar.timestamp,
                    price,
                    ExitReason::InitialStopLoss,
                    lot_size,
                );
                return Managed::Closed(trade);
            }

            if pos.take_profit_reached(bar.high, bar.low) {
                let offset = exit.lock_offset.distance(ind.atr);
                pos.lock = LockState::Locked;
                pos.stop_loss = round_price(pos.entry_price + pos.side.direction() * offset);
                observer.on_event(&EngineEvent::ProfitLocked {
                    time: bar.timestamp,
                    side: pos.side,
                    take_profit: pos.take_profit_level,
                    stop_loss: pos.stop_loss,
                });
                return Managed::Open(pos, StepOutcome::Locked);
            }

            return Managed::Open(pos, StepOutcome::Held);
        }

        if pos.breached(bar.close, pos.stop_loss) {
            let reason = if pos.trail_adjustment_count > 0 {
                ExitReason::TrailProfit
            } else if exit.tp1_only_label {
                ExitReason::Tp1Only
            } else {
                ExitReason::StopLoss
            };
            let price = pos.stop_loss;
            let trade = Trade::close(&pos, bar.timestamp, price, reason, lot_size);
            return Managed::Closed(trade);
        }

        let candidate = round_price(
            pos.favorable_extreme - pos.side.direction() * exit.trail_distance(ind.atr),
        );
        if pos.improves_stop(candidate) {
            let previous = pos.stop_loss;
            pos.stop_loss = candidate;
            pos.trail_adjustment_count += 1;
            observer.on_event(&EngineEvent::StopTrailed {
                time: bar.timestamp,
                side: pos.side,
                previous,
                stop_loss: candidate,
            });
        }

        let momentum_lost = match pos.side {
            Side::LongCall => bar.close < ind.ema_fast_momentum || ind.macd_histogram < 0.0,
            Side::ShortPut => bar.close > ind.ema_fast_momentum || ind.macd_histogram > 0.0,
        };
        if momentum_lost {
            let trade = Trade::close(
                &pos,
                bar.timestamp,
                bar.close,
                ExitReason::MomentumExit,
                lot_size,
            );
            return Managed::Closed(trade);
        }

        Managed::Open(pos, StepOutcome::Held)
    }
}

enum Managed {
    Open(Position, StepOutcome),
    Closed(Trade),
}
