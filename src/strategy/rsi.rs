use super::Strategy;
use crate::indicators::calculate_rsi;
use crate::models::IndicatorReading;
use crate::Result;

/// Oscillator-only strategy
///
/// Enters when RSI drops below the oversold level and exits when it rises
/// above the overbought level.
#[derive(Debug, Clone)]
pub struct RsiStrategy {
    period: usize,
    overbought_level: f64,
    oversold_level: f64,
}

impl RsiStrategy {
    pub fn new(period: usize, overbought_level: f64, oversold_level: f64) -> Self {
        Self {
            period,
            overbought_level,
            oversold_level,
        }
    }

    pub fn rsi(&self, prices: &[f64]) -> Result<f64> {
        calculate_rsi(prices, self.period)
    }
}

impl Default for RsiStrategy {
    fn default() -> Self {
        Self::new(14, 70.0, 30.0)
    }
}

impl Strategy for RsiStrategy {
    fn should_enter(&self, prices: &[f64]) -> Result<bool> {
        Ok(self.rsi(prices)? < self.oversold_level)
    }

    fn should_exit(&self, prices: &[f64]) -> Result<bool> {
        Ok(self.rsi(prices)? > self.overbought_level)
    }

    fn readings(&self, prices: &[f64]) -> Result<IndicatorReading> {
        Ok(IndicatorReading {
            rsi: self.rsi(prices)?,
            moving_average: None,
        })
    }

    fn name(&self) -> &str {
        "RsiStrategy"
    }

    fn min_prices_required(&self) -> usize {
        self.period + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BotError;

    fn rising() -> Vec<f64> {
        (10..=24).map(|p| p as f64).collect()
    }

    #[test]
    fn test_rising_prices_exit_not_enter() {
        let strategy = RsiStrategy::default();
        let prices = rising();

        assert_eq!(strategy.rsi(&prices).unwrap(), 100.0);
        assert!(!strategy.should_enter(&prices).unwrap());
        assert!(strategy.should_exit(&prices).unwrap());
    }

    #[test]
    fn test_oversold_prices_enter() {
        let strategy = RsiStrategy::default();
        let prices = vec![
            100.0, 97.0, 98.0, 95.0, 96.0, 93.0, 94.0, 91.0, 92.0, 89.0, 90.0, 87.0, 88.0,
            85.0, 86.0,
        ];

        assert!(strategy.should_enter(&prices).unwrap());
        assert!(!strategy.should_exit(&prices).unwrap());
    }

    #[test]
    fn test_flat_prices_neither_enter_nor_exit() {
        let strategy = RsiStrategy::default();
        let prices = vec![42.0; 20];

        let reading = strategy.readings(&prices).unwrap();
        assert!(reading.rsi.is_nan());
        assert!(!strategy.should_enter(&prices).unwrap());
        assert!(!strategy.should_exit(&prices).unwrap());
    }

    #[test]
    fn test_readings_have_no_moving_average() {
        let strategy = RsiStrategy::default();
        let reading = strategy.readings(&rising()).unwrap();
        assert_eq!(reading.rsi, 100.0);
        assert_eq!(reading.moving_average, None);
    }

    #[test]
    fn test_insufficient_prices_propagate() {
        let strategy = RsiStrategy::default();
        let prices = vec![1.0; 14];
        assert!(matches!(
            strategy.should_enter(&prices),
            Err(BotError::InsufficientData { .. })
        ));
        assert!(matches!(
            strategy.should_exit(&[]),
            Err(BotError::InsufficientData { .. })
        ));
    }
}
