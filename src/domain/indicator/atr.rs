//! Average True Range as a simple rolling mean of true range.
//!
//! The first bar has no previous close, so its true range is undefined and
//! the first defined ATR sits at index `period`.

use crate::domain::bar::Bar;

pub fn calculate_atr(bars: &[Bar], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; bars.len()];
    }

    let true_ranges: Vec<Option<f64>> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                None
            } else {
                Some(bar.true_range(bars[i - 1].close))
            }
        })
        .collect();

    (0..bars.len())
        .map(|i| {
            if i + 1 < period {
                return None;
            }
            let window = &true_ranges[i + 1 - period..=i];
            let sum: Option<f64> = window.iter().copied().sum();
            sum.map(|s| s / period as f64)
        })
        .collect()
}
