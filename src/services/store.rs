use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::StoreError;
use crate::models::{Order, OrderSummary, User};

/// Read-only access to users and their orders.
///
/// Every lookup takes the authenticated user id. An order owned by another
/// user comes back as `None`, exactly like a missing one.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn get_user(&self, user_id: i64) -> Result<Option<User>, StoreError>;
    async fn get_order(&self, user_id: i64, order_id: i64) -> Result<Option<Order>, StoreError>;
    async fn get_last_order(&self, user_id: i64) -> Result<Option<Order>, StoreError>;
    async fn recent_orders(&self, user_id: i64, limit: usize) -> Result<Vec<OrderSummary>, StoreError>;
}

pub struct SqliteOrderStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteOrderStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> anyhow::Result<T>,
    ) -> Result<T, StoreError> {
        let conn = self
            .db
            .lock()
            .map_err(|_| StoreError::Unavailable("database connection poisoned".to_string()))?;
        Ok(f(&conn)?)
    }
}

#[async_trait]
impl OrderStore for SqliteOrderStore {
    async fn get_user(&self, user_id: i64) -> Result<Option<User>, StoreError> {
        self.with_conn(|conn| queries::get_user(conn, user_id))
    }

    async fn get_order(&self, user_id: i64, order_id: i64) -> Result<Option<Order>, StoreError> {
        self.with_conn(|conn| queries::get_order_for_user(conn, user_id, order_id))
    }

    async fn get_last_order(&self, user_id: i64) -> Result<Option<Order>, StoreError> {
        self.with_conn(|conn| queries::get_last_order_for_user(conn, user_id))
    }

    async fn recent_orders(&self, user_id: i64, limit: usize) -> Result<Vec<OrderSummary>, StoreError> {
        self.with_conn(|conn| queries::list_recent_orders(conn, user_id, limit))
    }
}
