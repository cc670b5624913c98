//! Decision events emitted by the position machine.
//!
//! The engine never writes to a log or console itself; it hands each
//! decision to an [`EngineObserver`]. Closures implement the trait, so a test
//! can collect events with `|e: &EngineEvent| seen.push(e.clone())`.

use chrono::{DateTime, FixedOffset};

use crate::domain::indicator::IndicatorSet;
use crate::domain::position::{Side, Trade};

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    EntrySignal {
        time: DateTime<FixedOffset>,
        side: Side,
        indicators: IndicatorSet,
    },
    Entered {
        time: DateTime<FixedOffset>,
        side: Side,
        price: f64,
        stop_loss: f64,
        take_profit: f64,
    },
    ProfitLocked {
        time: DateTime<FixedOffset>,
        side: Side,
        take_profit: f64,
        stop_loss: f64,
    },
    StopTrailed {
        time: DateTime<FixedOffset>,
        side: Side,
        previous: f64,
        stop_loss: f64,
    },
    Exited(Trade),
}

pub trait EngineObserver {
    fn on_event(&mut self, event: &EngineEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl EngineObserver for NoopObserver {
    fn on_event(&mut self, _event: &EngineEvent) {}
}

impl<F> EngineObserver for F
where
    F: FnMut(&EngineEvent),
{
    fn on_event(&mut self, event: &EngineEvent) {
        self(event)
    }
}
