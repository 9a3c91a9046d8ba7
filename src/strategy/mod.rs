// Trading strategy module
pub mod combined;
pub mod rsi;

use std::fmt;
use std::str::FromStr;

use crate::error::BotError;
use crate::models::IndicatorReading;
use crate::Result;

pub use combined::CombinedStrategy;
pub use rsi::RsiStrategy;

/// Entry/exit evaluator over a closing-price series (oldest first)
///
/// Each call recomputes its indicators from `prices`; nothing is cached
/// between calls.
pub trait Strategy: Send + Sync {
    /// True when a closed position should be opened
    fn should_enter(&self, prices: &[f64]) -> Result<bool>;

    /// True when an open position should be closed
    fn should_exit(&self, prices: &[f64]) -> Result<bool>;

    /// Current indicator values, for logging
    fn readings(&self, prices: &[f64]) -> Result<IndicatorReading>;

    /// Get strategy name
    fn name(&self) -> &str;

    /// Minimum prices required for every indicator this strategy uses
    fn min_prices_required(&self) -> usize;
}

/// Immutable strategy parameters, set once at startup
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    pub rsi_period: usize,
    pub sma_period: usize,
    pub overbought_level: f64,
    pub oversold_level: f64,
    /// Minimum distance between price and SMA, in percent
    pub trend_strength_pct: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            sma_period: 20,
            overbought_level: 70.0,
            oversold_level: 30.0,
            trend_strength_pct: 1.0,
        }
    }
}

/// Which strategy variant to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Rsi,
    Combined,
}

impl FromStr for StrategyKind {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rsi" => Ok(StrategyKind::Rsi),
            "combined" => Ok(StrategyKind::Combined),
            other => Err(BotError::Config(format!(
                "unknown strategy '{}', expected 'rsi' or 'combined'",
                other
            ))),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Rsi => f.write_str("rsi"),
            StrategyKind::Combined => f.write_str("combined"),
        }
    }
}

/// Build the configured strategy variant
pub fn build_strategy(kind: StrategyKind, config: StrategyConfig) -> Box<dyn Strategy> {
    match kind {
        StrategyKind::Rsi => Box::new(RsiStrategy::new(
            config.rsi_period,
            config.overbought_level,
            config.oversold_level,
        )),
        StrategyKind::Combined => Box::new(CombinedStrategy::new(config)),
    }
}

/// Most recent price, erroring on an empty series
pub(crate) fn last_price(prices: &[f64]) -> Result<f64> {
    prices
        .last()
        .copied()
        .ok_or(BotError::InsufficientData { have: 0, need: 1 })
}
