//! Bar source port trait.

use crate::domain::bar::Bar;
use crate::domain::error::ScalptraderError;

/// Supplies one instrument's bars, ordered by timestamp with no duplicates.
pub trait BarSource {
    fn load_bars(&self) -> Result<Vec<Bar>, ScalptraderError>;
}
