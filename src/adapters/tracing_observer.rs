//! Renders engine events as structured `tracing` records.

use crate::domain::event::{EngineEvent, EngineObserver};

/// Logs every engine decision at info level, tagged with the instrument it
/// came from.
#[derive(Debug, Clone)]
pub struct TracingObserver {
    instrument: String,
}

impl TracingObserver {
    pub fn new(instrument: impl Into<String>) -> Self {
        Self {
            instrument: instrument.into(),
        }
    }
}

impl EngineObserver for TracingObserver {
    fn on_event(&mut self, event: &EngineEvent) {
        let instrument = self.instrument.as_str();
        match event {
            EngineEvent::EntrySignal {
                time,
                side,
                indicators,
            } => tracing::debug!(
                instrument,
                %time,
                %side,
                ema = indicators.ema_fast_momentum,
                macd = indicators.macd,
                signal = indicators.macd_signal,
                histogram = indicators.macd_histogram,
                atr = indicators.atr,
                "entry signal"
            ),
            EngineEvent::Entered {
                time,
                side,
                price,
                stop_loss,
                take_profit,
            } => tracing::info!(
                instrument,
                %time,
                %side,
                price,
                stop_loss,
                take_profit,
                "entered"
            ),
            EngineEvent::ProfitLocked {
                time,
                side,
                take_profit,
                stop_loss,
            } => tracing::info!(
                instrument,
                %time,
                %side,
                take_profit,
                stop_loss,
                "take-profit reached, stop locked"
            ),
            EngineEvent::StopTrailed {
                time,
                side,
                previous,
                stop_loss,
            } => tracing::debug!(
                instrument,
                %time,
                %side,
                previous,
                stop_loss,
                "stop trailed"
            ),
            EngineEvent::Exited(trade) => tracing::info!(
                instrument,
                time = %trade.exit_time,
                side = %trade.side,
                entry = trade.entry_price,
                exit = trade.exit_price,
                reason = %trade.exit_reason,
                pnl_points = trade.pnl_points,
                pnl = trade.pnl_currency,
                "exited"
            ),
        }
    }
}
