//! MACD (Moving Average Convergence Divergence).
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! Every EMA is seeded with its first input, so all three values exist from
//! the first bar; callers gate on the warmup length instead.

use crate::domain::indicator::calculate_ema;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdPoint {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

pub fn calculate_macd(
    closes: &[f64],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> Vec<MacdPoint> {
    if closes.is_empty() || fast == 0 || slow == 0 || signal_period == 0 {
        return Vec::new();
    }

    let ema_fast = calculate_ema(closes, fast);
    let ema_slow = calculate_ema(closes, slow);

    let macd_line: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = calculate_ema(&macd_line, signal_period);

    macd_line
        .iter()
        .zip(&signal_line)
        .map(|(&line, &signal)| MacdPoint {
            line,
            signal,
            histogram: line - signal,
        })
        .collect()
}
