use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use uuid::Uuid;

use super::LedgerStore;
use crate::error::BotError;
use crate::models::{NewOrder, Order, OrderSide, PositionRecord};
use crate::Result;

/// Postgres persistence for orders and positions
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    /// Connect to Postgres and apply pending migrations
    ///
    /// # Arguments
    /// * `database_url` - Postgres connection URL
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        // Run migrations
        sqlx::migrate!("./migrations").run(&pool).await?;

        tracing::info!("Connected to Postgres");

        Ok(Self { pool })
    }

    /// Close all pooled connections
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Delete all orders and positions (testing only)
    #[cfg(test)]
    pub async fn clear_all(&self) -> Result<()> {
        sqlx::query("DELETE FROM orders").execute(&self.pool).await?;
        sqlx::query("DELETE FROM positions").execute(&self.pool).await?;
        Ok(())
    }

    #[cfg(test)]
    async fn count_positions(&self, symbol: &str) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM positions WHERE symbol = $1")
            .bind(symbol)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }
}

fn to_decimal(field: &str, value: f64) -> Result<Decimal> {
    Decimal::from_f64(value)
        .ok_or_else(|| BotError::Persistence(format!("{} is not representable: {}", field, value)))
}

fn from_decimal(field: &str, value: Decimal) -> Result<f64> {
    value
        .to_f64()
        .ok_or_else(|| BotError::Persistence(format!("{} out of range: {}", field, value)))
}

fn order_from_row(row: &sqlx::postgres::PgRow) -> Result<Order> {
    let side: String = row.get("side");
    let quantity: Decimal = row.get("quantity");
    let price: Decimal = row.get("price");

    Ok(Order {
        id: row.get("id"),
        symbol: row.get("symbol"),
        side: side.parse::<OrderSide>().map_err(BotError::Persistence)?,
        quantity: from_decimal("quantity", quantity)?,
        price: from_decimal("price", price)?,
        client_order_id: row.get::<Option<Uuid>, _>("client_order_id"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    })
}

#[async_trait]
impl LedgerStore for PostgresPersistence {
    async fn load_position(&self, symbol: &str) -> Result<Option<PositionRecord>> {
        let row = sqlx::query(
            r#"
            SELECT symbol, is_opened, updated_at
            FROM positions
            WHERE symbol = $1
            "#,
        )
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| PositionRecord {
            symbol: row.get("symbol"),
            is_open: row.get("is_opened"),
            updated_at: row.get("updated_at"),
        }))
    }

    async fn upsert_position(&self, symbol: &str, is_open: bool) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO positions (symbol, is_opened, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (symbol) DO UPDATE SET
                is_opened = EXCLUDED.is_opened,
                updated_at = NOW()
            "#,
        )
        .bind(symbol)
        .bind(is_open)
        .execute(&self.pool)
        .await?;

        tracing::debug!("Saved position {} (open: {}) to Postgres", symbol, is_open);

        Ok(())
    }

    async fn insert_order(&self, order: &NewOrder) -> Result<Order> {
        let row = sqlx::query(
            r#"
            INSERT INTO orders (symbol, side, quantity, price, client_order_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, symbol, side, quantity, price, client_order_id, created_at
            "#,
        )
        .bind(&order.symbol)
        .bind(order.side.as_str())
        .bind(to_decimal("quantity", order.quantity)?)
        .bind(to_decimal("price", order.price)?)
        .bind(order.client_order_id)
        .fetch_one(&self.pool)
        .await?;

        let stored = order_from_row(&row)?;

        tracing::debug!(
            "Saved order {} {} {} @ {} to Postgres",
            stored.id,
            stored.side,
            stored.symbol,
            stored.price
        );

        Ok(stored)
    }

    async fn orders_for(&self, symbol: &str) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id, symbol, side, quantity, price, client_order_id, created_at
            FROM orders
            WHERE symbol = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(symbol)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(order_from_row).collect()
    }
}
