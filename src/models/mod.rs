use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// OHLCV candlestick as returned by the exchange kline endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub close_time: DateTime<Utc>,
    pub quote_asset_volume: f64,
    pub number_of_trades: u64,
    pub taker_buy_base_volume: f64,
    pub taker_buy_quote_volume: f64,
}

/// Closing prices in chronological order
pub fn closing_prices(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

/// Order direction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Wire and storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }

    /// Whether a filled order on this side leaves the position open
    pub fn opens_position(&self) -> bool {
        matches!(self, OrderSide::Buy)
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(OrderSide::Buy),
            "SELL" => Ok(OrderSide::Sell),
            other => Err(format!("unknown order side: {}", other)),
        }
    }
}

/// Immutable record of an executed trade
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: i64,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: f64,
    pub price: f64,
    pub client_order_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Order to be appended to the ledger
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: f64,
    pub price: f64,
    pub client_order_id: Option<Uuid>,
}

/// Durable open/closed state for one symbol
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PositionRecord {
    pub symbol: String,
    pub is_open: bool,
    pub updated_at: DateTime<Utc>,
}

/// Indicator values computed for one cycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct IndicatorReading {
    pub rsi: f64,
    /// Only strategies that use a trend filter compute this
    pub moving_average: Option<f64>,
}

/// Outcome of the decide step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Buy,
    Sell,
    Wait,
}

impl Decision {
    pub fn side(&self) -> Option<OrderSide> {
        match self {
            Decision::Buy => Some(OrderSide::Buy),
            Decision::Sell => Some(OrderSide::Sell),
            Decision::Wait => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_side_round_trip() {
        assert_eq!("BUY".parse::<OrderSide>().unwrap(), OrderSide::Buy);
        assert_eq!(OrderSide::Sell.to_string(), "SELL");
        assert!("HOLD".parse::<OrderSide>().is_err());
    }

    #[test]
    fn test_only_buy_opens_position() {
        assert!(OrderSide::Buy.opens_position());
        assert!(!OrderSide::Sell.opens_position());
    }

    #[test]
    fn test_decision_side() {
        assert_eq!(Decision::Buy.side(), Some(OrderSide::Buy));
        assert_eq!(Decision::Sell.side(), Some(OrderSide::Sell));
        assert_eq!(Decision::Wait.side(), None);
    }

    #[test]
    fn test_closing_prices_keep_order() {
        let now = Utc::now();
        let candle = |close: f64| Candle {
            open_time: now,
            open: close,
            high: close,
            low: close,
            close,
            volume: 1.0,
            close_time: now,
            quote_asset_volume: close,
            number_of_trades: 1,
            taker_buy_base_volume: 0.5,
            taker_buy_quote_volume: close / 2.0,
        };

        let candles = vec![candle(3.0), candle(1.0), candle(2.0)];
        assert_eq!(closing_prices(&candles), vec![3.0, 1.0, 2.0]);
    }
}
