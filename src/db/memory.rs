use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::LedgerStore;
use crate::error::BotError;
use crate::models::{NewOrder, Order, PositionRecord};
use crate::Result;

/// Process-local ledger storage, used for dry runs and tests
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    positions: HashMap<String, PositionRecord>,
    orders: Vec<Order>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with an existing position row
    pub fn with_position(symbol: &str, is_open: bool) -> Self {
        let store = Self::new();
        if let Ok(mut state) = store.state.lock() {
            state.positions.insert(
                symbol.to_string(),
                PositionRecord {
                    symbol: symbol.to_string(),
                    is_open,
                    updated_at: Utc::now(),
                },
            );
        }
        store
    }

    /// Number of position rows across all symbols
    pub fn position_count(&self) -> usize {
        self.state.lock().map(|s| s.positions.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| BotError::Persistence("in-memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn load_position(&self, symbol: &str) -> Result<Option<PositionRecord>> {
        Ok(self.lock()?.positions.get(symbol).cloned())
    }

    async fn upsert_position(&self, symbol: &str, is_open: bool) -> Result<()> {
        let mut state = self.lock()?;
        let record = state
            .positions
            .entry(symbol.to_string())
            .or_insert_with(|| PositionRecord {
                symbol: symbol.to_string(),
                is_open,
                updated_at: Utc::now(),
            });
        record.is_open = is_open;
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn insert_order(&self, order: &NewOrder) -> Result<Order> {
        let mut state = self.lock()?;
        let stored = Order {
            id: state.orders.len() as i64 + 1,
            symbol: order.symbol.clone(),
            side: order.side,
            quantity: order.quantity,
            price: order.price,
            client_order_id: order.client_order_id,
            created_at: Utc::now(),
        };
        state.orders.push(stored.clone());
        Ok(stored)
    }

    async fn orders_for(&self, symbol: &str) -> Result<Vec<Order>> {
        Ok(self
            .lock()?
            .orders
            .iter()
            .filter(|o| o.symbol == symbol)
            .cloned()
            .collect())
    }
}
