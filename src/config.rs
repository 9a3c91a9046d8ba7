use config::{Config, Environment};
use serde::Deserialize;
use std::collections::HashMap;

use crate::error::BotError;
use crate::execution::CycleSettings;
use crate::strategy::{StrategyConfig, StrategyKind};
use crate::Result;

/// Startup configuration, read once from the environment
#[derive(Clone, PartialEq)]
pub struct BotConfig {
    pub api_url: String,
    pub symbol: String,
    /// RSI lookback
    pub period: usize,
    pub api_key: String,
    pub api_secret: String,
    pub database_url: String,
    pub strategy: StrategyKind,
    pub sma_period: usize,
    pub overbought_level: f64,
    pub oversold_level: f64,
    pub trend_strength_pct: f64,
    pub candle_interval: String,
    pub candle_limit: usize,
    pub order_quantity: f64,
    pub poll_interval_secs: u64,
}

impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("api_url", &self.api_url)
            .field("symbol", &self.symbol)
            .field("period", &self.period)
            .field("strategy", &self.strategy)
            .field("sma_period", &self.sma_period)
            .field("overbought_level", &self.overbought_level)
            .field("oversold_level", &self.oversold_level)
            .field("trend_strength_pct", &self.trend_strength_pct)
            .field("candle_interval", &self.candle_interval)
            .field("candle_limit", &self.candle_limit)
            .field("order_quantity", &self.order_quantity)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .finish_non_exhaustive()
    }
}

/// Environment keys, lowercased by the `config` crate
#[derive(Debug, Deserialize)]
struct RawSettings {
    api_url: Option<String>,
    symbol: Option<String>,
    period: Option<String>,
    binance_api_key: Option<String>,
    binance_api_secret: Option<String>,
    database_url: Option<String>,
    db_host: Option<String>,
    db_port: Option<String>,
    db_user: Option<String>,
    db_password: Option<String>,
    db_name: Option<String>,
    strategy: String,
    sma_period: usize,
    overbought_level: f64,
    oversold_level: f64,
    trend_strength: f64,
    candle_interval: String,
    candle_limit: usize,
    order_quantity: f64,
    poll_interval_secs: u64,
}

impl BotConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_environment(Environment::default())
    }

    /// Load from an explicit variable map instead of the process environment
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self> {
        Self::from_environment(Environment::default().source(Some(vars)))
    }

    fn from_environment(env: Environment) -> Result<Self> {
        let defaults = StrategyConfig::default();
        let settings = Config::builder()
            .set_default("strategy", "rsi")?
            .set_default("sma_period", defaults.sma_period as i64)?
            .set_default("overbought_level", defaults.overbought_level)?
            .set_default("oversold_level", defaults.oversold_level)?
            .set_default("trend_strength", defaults.trend_strength_pct)?
            .set_default("candle_interval", "15m")?
            .set_default("candle_limit", 100_i64)?
            .set_default("order_quantity", 0.001)?
            .set_default("poll_interval_secs", 10_i64)?
            .add_source(env)
            .build()?;

        let raw: RawSettings = settings.try_deserialize()?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawSettings) -> Result<Self> {
        let mut missing = Vec::new();
        let mut required = |name: &str, value: Option<String>| -> String {
            match value.filter(|v| !v.trim().is_empty()) {
                Some(v) => v,
                None => {
                    missing.push(name.to_string());
                    String::new()
                }
            }
        };

        let api_url = required("API_URL", raw.api_url);
        let symbol = required("SYMBOL", raw.symbol);
        let period = required("PERIOD", raw.period);
        let api_key = required("BINANCE_API_KEY", raw.binance_api_key);
        let api_secret = required("BINANCE_API_SECRET", raw.binance_api_secret);

        let database_url = match raw.database_url.filter(|v| !v.trim().is_empty()) {
            Some(url) => url,
            None => {
                let host = required("DB_HOST", raw.db_host);
                let port = required("DB_PORT", raw.db_port);
                let user = required("DB_USER", raw.db_user);
                let password = required("DB_PASSWORD", raw.db_password);
                let name = required("DB_NAME", raw.db_name);
                format!(
                    "postgres://{}:{}@{}:{}/{}?sslmode=disable",
                    user, password, host, port, name
                )
            }
        };

        if !missing.is_empty() {
            return Err(BotError::Config(format!(
                "missing required variables: {}",
                missing.join(", ")
            )));
        }

        let period: usize = period
            .trim()
            .parse()
            .map_err(|_| BotError::Config(format!("PERIOD must be an integer, got {:?}", period)))?;

        let config = Self {
            api_url,
            symbol,
            period,
            api_key,
            api_secret,
            database_url,
            strategy: raw.strategy.parse()?,
            sma_period: raw.sma_period,
            overbought_level: raw.overbought_level,
            oversold_level: raw.oversold_level,
            trend_strength_pct: raw.trend_strength,
            candle_interval: raw.candle_interval,
            candle_limit: raw.candle_limit,
            order_quantity: raw.order_quantity,
            poll_interval_secs: raw.poll_interval_secs,
        };
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.period == 0 {
            return Err(BotError::Config("PERIOD must be greater than zero".to_string()));
        }
        if self.sma_period == 0 {
            return Err(BotError::Config("SMA_PERIOD must be greater than zero".to_string()));
        }
        if self.oversold_level >= self.overbought_level {
            return Err(BotError::Config(format!(
                "OVERSOLD_LEVEL ({}) must be below OVERBOUGHT_LEVEL ({})",
                self.oversold_level, self.overbought_level
            )));
        }
        if self.order_quantity.is_nan() || self.order_quantity <= 0.0 {
            return Err(BotError::Config("ORDER_QUANTITY must be positive".to_string()));
        }
        if self.poll_interval_secs == 0 {
            return Err(BotError::Config(
                "POLL_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }

        let needed = match self.strategy {
            StrategyKind::Rsi => self.period + 1,
            StrategyKind::Combined => (self.period + 1).max(self.sma_period),
        };
        if self.candle_limit < needed {
            return Err(BotError::Config(format!(
                "CANDLE_LIMIT ({}) is too small, the {} strategy needs {} candles",
                self.candle_limit, self.strategy, needed
            )));
        }

        Ok(())
    }

    pub fn strategy_config(&self) -> StrategyConfig {
        StrategyConfig {
            rsi_period: self.period,
            sma_period: self.sma_period,
            overbought_level: self.overbought_level,
            oversold_level: self.oversold_level,
            trend_strength_pct: self.trend_strength_pct,
        }
    }

    pub fn cycle_settings(&self) -> CycleSettings {
        CycleSettings {
            symbol: self.symbol.clone(),
            interval: self.candle_interval.clone(),
            candle_limit: self.candle_limit,
            order_quantity: self.order_quantity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_vars() -> HashMap<String, String> {
        [
            ("API_URL", "https://api.binance.com"),
            ("SYMBOL", "BTCUSDT"),
            ("PERIOD", "14"),
            ("BINANCE_API_KEY", "key"),
            ("BINANCE_API_SECRET", "secret"),
            ("DATABASE_URL", "postgres://localhost/rsitrader"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_defaults_applied() {
        let config = BotConfig::from_vars(base_vars()).unwrap();

        assert_eq!(config.symbol, "BTCUSDT");
        assert_eq!(config.period, 14);
        assert_eq!(config.strategy, StrategyKind::Rsi);
        assert_eq!(config.candle_interval, "15m");
        assert_eq!(config.candle_limit, 100);
        assert_eq!(config.order_quantity, 0.001);
        assert_eq!(config.poll_interval_secs, 10);
        assert_eq!(config.overbought_level, 70.0);
        assert_eq!(config.oversold_level, 30.0);
        assert_eq!(config.strategy_config().sma_period, 20);
    }

    #[test]
    fn test_overrides() {
        let mut vars = base_vars();
        vars.insert("STRATEGY".to_string(), "combined".to_string());
        vars.insert("SMA_PERIOD".to_string(), "50".to_string());
        vars.insert("TREND_STRENGTH".to_string(), "0.5".to_string());
        vars.insert("ORDER_QUANTITY".to_string(), "0.01".to_string());

        let config = BotConfig::from_vars(vars).unwrap();
        assert_eq!(config.strategy, StrategyKind::Combined);
        assert_eq!(config.sma_period, 50);
        assert_eq!(config.trend_strength_pct, 0.5);
        assert_eq!(config.cycle_settings().order_quantity, 0.01);
    }

    #[test]
    fn test_missing_variables_listed_together() {
        let mut vars = base_vars();
        vars.remove("SYMBOL");
        vars.remove("BINANCE_API_SECRET");
        vars.insert("API_URL".to_string(), "".to_string());

        let err = BotConfig::from_vars(vars).unwrap_err().to_string();
        assert!(err.contains("API_URL"));
        assert!(err.contains("SYMBOL"));
        assert!(err.contains("BINANCE_API_SECRET"));
        assert!(!err.contains("PERIOD"));
    }

    #[test]
    fn test_period_must_be_positive_integer() {
        let mut vars = base_vars();
        vars.insert("PERIOD".to_string(), "0".to_string());
        assert!(BotConfig::from_vars(vars).is_err());

        let mut vars = base_vars();
        vars.insert("PERIOD".to_string(), "fourteen".to_string());
        let err = BotConfig::from_vars(vars).unwrap_err().to_string();
        assert!(err.contains("PERIOD"));
    }

    #[test]
    fn test_database_url_from_parts() {
        let mut vars = base_vars();
        vars.remove("DATABASE_URL");
        for (k, v) in [
            ("DB_HOST", "db"),
            ("DB_PORT", "5432"),
            ("DB_USER", "bot"),
            ("DB_PASSWORD", "pw"),
            ("DB_NAME", "trading"),
        ] {
            vars.insert(k.to_string(), v.to_string());
        }

        let config = BotConfig::from_vars(vars).unwrap();
        assert_eq!(
            config.database_url,
            "postgres://bot:pw@db:5432/trading?sslmode=disable"
        );
    }

    #[test]
    fn test_missing_database_location() {
        let mut vars = base_vars();
        vars.remove("DATABASE_URL");
        let err = BotConfig::from_vars(vars).unwrap_err().to_string();
        assert!(err.contains("DB_HOST"));
        assert!(err.contains("DB_NAME"));
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let mut vars = base_vars();
        vars.insert("OVERSOLD_LEVEL".to_string(), "80".to_string());
        assert!(BotConfig::from_vars(vars).is_err());
    }

    #[test]
    fn test_candle_limit_must_cover_lookback() {
        let mut vars = base_vars();
        vars.insert("STRATEGY".to_string(), "combined".to_string());
        vars.insert("SMA_PERIOD".to_string(), "200".to_string());
        let err = BotConfig::from_vars(vars).unwrap_err().to_string();
        assert!(err.contains("CANDLE_LIMIT"));
    }

    #[test]
    fn test_candle_limit_equal_to_lookback_accepted() {
        let mut vars = base_vars();
        vars.insert("CANDLE_LIMIT".to_string(), "15".to_string());
        assert_eq!(BotConfig::from_vars(vars).unwrap().candle_limit, 15);

        let mut vars = base_vars();
        vars.insert("CANDLE_LIMIT".to_string(), "14".to_string());
        assert!(BotConfig::from_vars(vars).is_err());
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let mut vars = base_vars();
        vars.insert("STRATEGY".to_string(), "martingale".to_string());
        assert!(BotConfig::from_vars(vars).is_err());
    }

    #[test]
    fn test_debug_hides_credentials() {
        let config = BotConfig::from_vars(base_vars()).unwrap();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("secret"));
        assert!(printed.contains("BTCUSDT"));
    }
}
