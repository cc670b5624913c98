//! Exponential Moving Average.
//!
//! alpha = 2/(n+1), seeded with the first value (no look-ahead), then
//! EMA[i] = alpha*X[i] + (1-alpha)*EMA[i-1]. Defined from the first bar.

pub fn calculate_ema(series: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || series.is_empty() {
        return Vec::new();
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut values = Vec::with_capacity(series.len());
    let mut ema = series[0];
    values.push(ema);

    for &x in &series[1..] {
        ema = alpha * x + (1.0 - alpha) * ema;
        values.push(ema);
    }

    values
}
