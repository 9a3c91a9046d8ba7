use crate::error::BotError;
use crate::Result;

/// Calculate Relative Strength Index (RSI)
///
/// RSI measures the magnitude of recent price changes to evaluate
/// overbought or oversold conditions.
///
/// Values:
/// - RSI > 70: Overbought
/// - RSI < 30: Oversold
///
/// Every index `i` contributes a windowed average over the next `period`
/// differences. Windows near the end of the series are clipped but still
/// divided by the full `period`. Averages are seeded at `i = 1` and then
/// smoothed with `(prev * (period - 1) + window) / period`.
///
/// A series with no losses yields 100 (infinite RS). A series with neither
/// gains nor losses yields NaN, which is returned as-is.
pub fn calculate_rsi(prices: &[f64], period: usize) -> Result<f64> {
    if period == 0 {
        return Err(BotError::InvalidPeriod);
    }
    if prices.len() < period + 1 {
        return Err(BotError::InsufficientData {
            have: prices.len(),
            need: period + 1,
        });
    }

    let n = period as f64;
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    for i in 1..prices.len() {
        let (gain, loss) = window_average(prices, period, i);

        if i == 1 {
            avg_gain = gain;
            avg_loss = loss;
            continue;
        }

        avg_gain = (avg_gain * (n - 1.0) + gain) / n;
        avg_loss = (avg_loss * (n - 1.0) + loss) / n;
    }

    let rs = avg_gain / avg_loss;
    Ok(100.0 - (100.0 / (1.0 + rs)))
}

/// Average gain and loss over `period` differences starting at `start`
fn window_average(prices: &[f64], period: usize, start: usize) -> (f64, f64) {
    let end = (start + period).min(prices.len());

    let (gain, loss) = (start..end).fold((0.0, 0.0), |(gain, loss), i| {
        let change = prices[i] - prices[i - 1];
        if change > 0.0 {
            (gain + change, loss)
        } else {
            (gain, loss + change.abs())
        }
    });

    (gain / period as f64, loss / period as f64)
}
