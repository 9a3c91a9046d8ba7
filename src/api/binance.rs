use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::de::IgnoredAny;
use serde::Deserialize;
use sha2::Sha256;
use std::time::Duration;
use uuid::Uuid;

use super::{MarketData, OrderGateway};
use crate::error::BotError;
use crate::models::{Candle, OrderSide};
use crate::Result;

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Client for a Binance-compatible spot REST API
///
/// Public endpoints (klines) work without credentials; order placement
/// needs an API key and secret.
#[derive(Clone)]
pub struct BinanceClient {
    client: Client,
    base_url: String,
    credentials: Option<Credentials>,
}

/// Pre-shared API credentials
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

// ============== Response Types ==============

/// One kline row: 12 positional fields, prices as decimal strings
#[derive(Debug, Deserialize)]
struct RawKline(
    i64,
    String,
    String,
    String,
    String,
    String,
    i64,
    String,
    u64,
    String,
    String,
    IgnoredAny,
);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOrderAck {
    order_id: Option<i64>,
    status: Option<String>,
    executed_qty: Option<String>,
}

// ============== Public Types ==============

/// Exchange acknowledgement of a filled order
#[derive(Debug, Clone, PartialEq)]
pub struct OrderAck {
    pub client_order_id: Uuid,
    pub order_id: Option<i64>,
    pub status: Option<String>,
    pub executed_qty: Option<f64>,
}

impl TryFrom<RawKline> for Candle {
    type Error = BotError;

    fn try_from(raw: RawKline) -> Result<Self> {
        Ok(Candle {
            open_time: parse_millis(raw.0)?,
            open: parse_decimal("open", &raw.1)?,
            high: parse_decimal("high", &raw.2)?,
            low: parse_decimal("low", &raw.3)?,
            close: parse_decimal("close", &raw.4)?,
            volume: parse_decimal("volume", &raw.5)?,
            close_time: parse_millis(raw.6)?,
            quote_asset_volume: parse_decimal("quote asset volume", &raw.7)?,
            number_of_trades: raw.8,
            taker_buy_base_volume: parse_decimal("taker buy base volume", &raw.9)?,
            taker_buy_quote_volume: parse_decimal("taker buy quote volume", &raw.10)?,
        })
    }
}

fn parse_decimal(field: &str, value: &str) -> Result<f64> {
    value
        .parse::<f64>()
        .map_err(|_| BotError::MalformedCandle(format!("{} is not a number: {:?}", field, value)))
}

fn parse_millis(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| BotError::MalformedCandle(format!("timestamp out of range: {}", millis)))
}

/// Hex-encoded HMAC-SHA256 of `payload` keyed by `secret`
pub fn sign_payload(secret: &str, payload: &str) -> String {
    // HMAC accepts keys of any length
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

// ============== Implementation ==============

impl BinanceClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials: None,
        })
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Get recent candles
    /// Endpoint: GET /api/v3/klines?symbol={symbol}&interval={interval}&limit={limit}
    pub async fn get_klines(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let limit = limit.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[("symbol", symbol), ("interval", interval), ("limit", &limit)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BotError::Transport(format!(
                "klines request failed ({}): {}",
                status, body
            )));
        }

        let rows: Vec<RawKline> = response.json().await?;
        let candles = rows
            .into_iter()
            .map(Candle::try_from)
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!("Fetched {} {} candles for {}", candles.len(), interval, symbol);

        Ok(candles)
    }

    /// Place a signed market order
    /// Endpoint: POST /api/v3/order
    pub async fn new_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: f64,
        client_order_id: Uuid,
    ) -> Result<OrderAck> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            BotError::Config("API key and secret are required to place orders".to_string())
        })?;

        let payload = format!(
            "symbol={}&side={}&type=MARKET&quantity={}&newClientOrderId={}&timestamp={}",
            symbol,
            side.as_str(),
            quantity,
            client_order_id.simple(),
            Utc::now().timestamp_millis()
        );
        let signature = sign_payload(&credentials.api_secret, &payload);
        let body = format!("{}&signature={}", payload, signature);

        let response = self
            .client
            .post(format!("{}/api/v3/order", self.base_url))
            .header("X-MBX-APIKEY", &credentials.api_key)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(BotError::Execution {
                status: status.as_u16(),
                detail: text,
            });
        }

        tracing::info!("Order accepted by exchange: {}", text);

        // The order is filled at this point, so an unexpected body must not turn into an error
        let raw: Option<RawOrderAck> = serde_json::from_str(&text).ok();
        let ack = match raw {
            Some(raw) => OrderAck {
                client_order_id,
                order_id: raw.order_id,
                status: raw.status,
                executed_qty: raw.executed_qty.and_then(|q| q.parse().ok()),
            },
            None => OrderAck {
                client_order_id,
                order_id: None,
                status: None,
                executed_qty: None,
            },
        };

        Ok(ack)
    }
}

#[async_trait]
impl MarketData for BinanceClient {
    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        self.get_klines(symbol, interval, limit).await
    }
}

#[async_trait]
impl OrderGateway for BinanceClient {
    async fn submit_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: f64,
        client_order_id: Uuid,
    ) -> Result<OrderAck> {
        self.new_market_order(symbol, side, quantity, client_order_id)
            .await
    }
}
