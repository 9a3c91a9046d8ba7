use crate::error::BotError;
use crate::Result;

/// Calculate Simple Moving Average (SMA) over the most recent `period` prices
pub fn calculate_sma(prices: &[f64], period: usize) -> Result<f64> {
    if period == 0 {
        return Err(BotError::InvalidPeriod);
    }
    if prices.len() < period {
        return Err(BotError::InsufficientData {
            have: prices.len(),
            need: period,
        });
    }

    let sum: f64 = prices.iter().rev().take(period).sum();
    Ok(sum / period as f64)
}
