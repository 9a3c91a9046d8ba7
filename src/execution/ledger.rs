use std::sync::Arc;
use uuid::Uuid;

use crate::db::LedgerStore;
use crate::models::{NewOrder, Order, OrderSide};
use crate::Result;

/// Authoritative open/closed state per symbol, plus the order log
///
/// Reads always hit the store. Callers read before deciding and write only
/// after the exchange has filled the order.
#[derive(Clone)]
pub struct PositionLedger {
    store: Arc<dyn LedgerStore>,
}

impl PositionLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Whether `symbol` has an open position; a symbol never written is closed
    pub async fn get_position(&self, symbol: &str) -> Result<bool> {
        let record = self.store.load_position(symbol).await?;
        Ok(record.map(|r| r.is_open).unwrap_or(false))
    }

    /// Set the position state for `symbol`, creating the row on first write
    pub async fn update_position(&self, symbol: &str, is_open: bool) -> Result<()> {
        self.store.upsert_position(symbol, is_open).await
    }

    /// Append an executed order
    pub async fn record_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: f64,
        price: f64,
        client_order_id: Option<Uuid>,
    ) -> Result<Order> {
        let order = NewOrder {
            symbol: symbol.to_string(),
            side,
            quantity,
            price,
            client_order_id,
        };
        self.store.insert_order(&order).await
    }

    /// Recorded orders for `symbol`, oldest first
    pub async fn orders(&self, symbol: &str) -> Result<Vec<Order>> {
        self.store.orders_for(symbol).await
    }
}
