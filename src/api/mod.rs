pub mod binance;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Candle, OrderSide};
use crate::Result;

pub use binance::{sign_payload, BinanceClient, Credentials, OrderAck};

/// Source of recent candles for a symbol
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Last `limit` candles at `interval`, oldest first
    async fn fetch_candles(&self, symbol: &str, interval: &str, limit: usize)
        -> Result<Vec<Candle>>;
}

/// Places market orders on the exchange
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Submit an immediate market order; the exchange fills it whole or rejects it
    async fn submit_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: f64,
        client_order_id: Uuid,
    ) -> Result<OrderAck>;
}
