use super::{last_price, Strategy, StrategyConfig};
use crate::indicators::{calculate_rsi, calculate_sma};
use crate::models::IndicatorReading;
use crate::Result;

/// Trend + oscillator strategy
///
/// Entry requires price above its SMA, RSI oversold, and the distance to the
/// SMA above `trend_strength_pct`. Exit mirrors it below the SMA with RSI
/// overbought.
#[derive(Debug, Clone)]
pub struct CombinedStrategy {
    config: StrategyConfig,
}

impl CombinedStrategy {
    pub fn new(config: StrategyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    fn indicators(&self, prices: &[f64]) -> Result<(f64, f64, f64)> {
        let price = last_price(prices)?;
        let rsi = calculate_rsi(prices, self.config.rsi_period)?;
        let sma = calculate_sma(prices, self.config.sma_period)?;
        Ok((price, rsi, sma))
    }
}

impl Default for CombinedStrategy {
    fn default() -> Self {
        Self::new(StrategyConfig::default())
    }
}

impl Strategy for CombinedStrategy {
    fn should_enter(&self, prices: &[f64]) -> Result<bool> {
        let (price, rsi, sma) = self.indicators(prices)?;

        let trend_up = price > sma;
        let oversold = rsi < self.config.oversold_level;
        let strength = (price - sma) / sma * 100.0;

        tracing::debug!(
            "{}: price {:.4} sma {:.4} rsi {:.2} strength {:.3}%",
            self.name(),
            price,
            sma,
            rsi,
            strength
        );

        Ok(trend_up && oversold && strength > self.config.trend_strength_pct)
    }

    fn should_exit(&self, prices: &[f64]) -> Result<bool> {
        let (price, rsi, sma) = self.indicators(prices)?;

        let trend_down = price < sma;
        let overbought = rsi > self.config.overbought_level;
        let strength = (sma - price) / sma * 100.0;

        Ok(trend_down && overbought && strength > self.config.trend_strength_pct)
    }

    fn readings(&self, prices: &[f64]) -> Result<IndicatorReading> {
        Ok(IndicatorReading {
            rsi: calculate_rsi(prices, self.config.rsi_period)?,
            moving_average: Some(calculate_sma(prices, self.config.sma_period)?),
        })
    }

    fn name(&self) -> &str {
        "CombinedStrategy"
    }

    fn min_prices_required(&self) -> usize {
        (self.config.rsi_period + 1).max(self.config.sma_period)
    }
}
