//! OHLCV bar representation and sequence checks.

use chrono::{DateTime, FixedOffset, NaiveTime};

use super::error::ScalptraderError;

/// One OHLCV observation. The timestamp carries the exchange's UTC offset so
/// session rules can read the local wall-clock time directly.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub timestamp: DateTime<FixedOffset>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// Local time of day of the bar.
    pub fn time(&self) -> NaiveTime {
        self.timestamp.time()
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    /// Where the close sits in the bar's range, measured from the low.
    /// A degenerate bar (high == low) has no strength.
    pub fn ce_strength(&self) -> f64 {
        let range = self.range();
        if range > 0.0 {
            (self.close - self.low) / range
        } else {
            0.0
        }
    }

    /// Where the close sits in the bar's range, measured from the high.
    pub fn pe_strength(&self) -> f64 {
        let range = self.range();
        if range > 0.0 {
            (self.high - self.close) / range
        } else {
            0.0
        }
    }
}

/// Reject sequences whose timestamps are not strictly increasing.
/// Gaps between bars are allowed.
pub fn validate_sequence(bars: &[Bar]) -> Result<(), ScalptraderError> {
    for (i, pair) in bars.windows(2).enumerate() {
        if pair[1].timestamp <= pair[0].timestamp {
            return Err(ScalptraderError::UnorderedBars { index: i + 1 });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ist() -> FixedOffset {
        FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap()
    }

    fn bar_at(hour: u32, minute: u32, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            timestamp: ist().with_ymd_and_hms(2025, 8, 1, hour, minute, 0).unwrap(),
            open: close,
            high,
            low,
            close,
            volume: 1_000,
        }
    }

    #[test]
    fn time_is_local_to_offset() {
        let bar = bar_at(9, 45, 110.0, 90.0, 105.0);
        assert_eq!(bar.time(), NaiveTime::from_hms_opt(9, 45, 0).unwrap());
    }

    #[test]
    fn true_range_hl_dominates() {
        let bar = bar_at(9, 45, 110.0, 90.0, 105.0);
        assert!((bar.true_range(100.0) - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_gap_up() {
        let bar = bar_at(9, 45, 110.0, 90.0, 105.0);
        // |110-70| = 40
        assert!((bar.true_range(70.0) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_gap_down() {
        let bar = bar_at(9, 45, 110.0, 90.0, 105.0);
        assert!((bar.true_range(130.0) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn strength_of_close_near_high() {
        let bar = bar_at(9, 45, 110.0, 90.0, 105.0);
        assert!((bar.ce_strength() - 0.75).abs() < 1e-12);
        assert!((bar.pe_strength() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn degenerate_bar_has_zero_strength() {
        let bar = bar_at(9, 45, 100.0, 100.0, 100.0);
        assert_eq!(bar.ce_strength(), 0.0);
        assert_eq!(bar.pe_strength(), 0.0);
    }

    #[test]
    fn sequence_must_be_strictly_increasing() {
        let bars = vec![
            bar_at(9, 15, 101.0, 99.0, 100.0),
            bar_at(9, 20, 101.0, 99.0, 100.0),
            bar_at(9, 20, 101.0, 99.0, 100.0),
        ];
        match validate_sequence(&bars) {
            Err(ScalptraderError::UnorderedBars { index }) => assert_eq!(index, 2),
            other => panic!("expected UnorderedBars, got {:?}", other),
        }
    }

    #[test]
    fn sequence_with_gaps_is_accepted() {
        let bars = vec![
            bar_at(9, 15, 101.0, 99.0, 100.0),
            bar_at(9, 40, 101.0, 99.0, 100.0),
            bar_at(11, 0, 101.0, 99.0, 100.0),
        ];
        assert!(validate_sequence(&bars).is_ok());
        assert!(validate_sequence(&[]).is_ok());
    }
}
