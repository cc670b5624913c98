//! Backtest drivers: replay a finite bar sequence through a position
//! machine, or several independent side tracks at once.

use rayon::prelude::*;

use crate::domain::bar::{validate_sequence, Bar};
use crate::domain::engine::{Phase, PositionMachine};
use crate::domain::error::ScalptraderError;
use crate::domain::event::EngineObserver;
use crate::domain::indicator::{enrich, EnrichedBar};
use crate::domain::ledger::TradeLedger;
use crate::domain::position::{Position, Side};
use crate::domain::strategy::StrategyConfig;

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub ledger: TradeLedger,
    pub bars_processed: usize,
    pub final_phase: Phase,
    /// Position still open after the last bar, if any.
    pub open_position: Option<Position>,
}

/// Validate, enrich and replay `bars` through a fresh machine.
pub fn run_backtest(
    bars: &[Bar],
    config: &StrategyConfig,
    side_filter: Option<Side>,
    observer: &mut dyn EngineObserver,
) -> Result<BacktestResult, ScalptraderError> {
    validate_sequence(bars)?;
    let enriched = enrich(bars, &config.indicators);

    let mut machine = PositionMachine::new(config.clone());
    if let Some(side) = side_filter {
        machine = machine.with_side_filter(side);
    }
    run_enriched(&enriched, machine, observer)
}

/// Replay an already enriched sequence. A fresh ledger is created per call.
pub fn run_enriched(
    bars: &[EnrichedBar],
    mut machine: PositionMachine,
    observer: &mut dyn EngineObserver,
) -> Result<BacktestResult, ScalptraderError> {
    let mut ledger = TradeLedger::new();
    for index in 0..bars.len() {
        machine.step(bars, index, &mut ledger, observer)?;
    }

    Ok(BacktestResult {
        ledger,
        bars_processed: bars.len(),
        final_phase: machine.phase(),
        open_position: machine.position().cloned(),
    })
}

/// One side-restricted bar stream, e.g. call-option bars for the long-call
/// track.
#[derive(Debug, Clone)]
pub struct Track {
    pub side: Side,
    pub bars: Vec<Bar>,
}

#[derive(Debug, Clone)]
pub struct TrackResult {
    pub side: Side,
    pub result: BacktestResult,
}

/// Run every track on its own machine and ledger. Tracks share no mutable
/// state, so they run in parallel; results come back in input order.
pub fn run_tracks<F, O>(
    tracks: &[Track],
    config: &StrategyConfig,
    make_observer: F,
) -> Result<Vec<TrackResult>, ScalptraderError>
where
    F: Fn(Side) -> O + Sync,
    O: EngineObserver,
{
    tracks
        .par_iter()
        .map(|track| {
            let mut observer = make_observer(track.side);
            let result = run_backtest(&track.bars, config, Some(track.side), &mut observer)?;
            Ok(TrackResult {
                side: track.side,
                result,
            })
        })
        .collect()
}
