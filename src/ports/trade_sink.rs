//! Trade sink port trait.

use crate::domain::error::ScalptraderError;
use crate::domain::position::Trade;

/// Receives completed trades in the order they close.
pub trait TradeSink {
    fn record(&mut self, trade: &Trade) -> Result<(), ScalptraderError>;
}
