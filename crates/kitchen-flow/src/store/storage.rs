//! Durable storage for the order collection.
//!
//! The persisted layout is one keyed document:
//!
//! ```json
//! { "nextId": 3, "orders": { "ORD-0001": { "id": 1, "orderNumber": "ORD-0001", ... } } }
//! ```
//!
//! `nextId` is the id allocation high-water mark. Ids of deleted orders are never
//! handed out again.

use crate::model::Order;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// The whole stored collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredOrders {
    /// Lowest id never allocated. Documents written before the mark existed load as 0.
    pub next_id: u32,
    pub orders: Vec<Order>,
}

impl StoredOrders {
    pub fn new(next_id: u32, orders: Vec<Order>) -> Self {
        Self { next_id, orders }
    }

    /// Next id to allocate: past both the stored mark and every stored order.
    pub fn resume_id(&self) -> u32 {
        let past_orders = self.orders.iter().map(|o| o.id.0).max().unwrap_or(0) + 1;
        self.next_id.max(past_orders)
    }
}

/// Whole-collection load and save.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    async fn load(&self) -> Result<StoredOrders, StorageError>;

    /// Replaces the stored collection.
    async fn save(&self, stored: &StoredOrders) -> Result<(), StorageError>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedOrders {
    #[serde(default)]
    next_id: u32,
    orders: BTreeMap<String, Order>,
}

impl From<&StoredOrders> for PersistedOrders {
    fn from(stored: &StoredOrders) -> Self {
        Self {
            next_id: stored.next_id,
            orders: stored
                .orders
                .iter()
                .map(|o| (o.order_number.clone(), o.clone()))
                .collect(),
        }
    }
}

impl From<PersistedOrders> for StoredOrders {
    fn from(file: PersistedOrders) -> Self {
        Self {
            next_id: file.next_id,
            orders: file.orders.into_values().collect(),
        }
    }
}

/// JSON document on disk. Writes go to a sibling temp file that is renamed into place.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "orders.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl Storage for JsonFileStorage {
    async fn load(&self) -> Result<StoredOrders, StorageError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StoredOrders::default())
            }
            Err(e) => return Err(e.into()),
        };
        let file: PersistedOrders = serde_json::from_slice(&bytes)?;
        Ok(file.into())
    }

    async fn save(&self, stored: &StoredOrders) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        let json = serde_json::to_vec_pretty(&PersistedOrders::from(stored))?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, json).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        Ok(())
    }
}

/// In-memory storage for tests and throwaway runs. Clones share contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    contents: Arc<Mutex<PersistedOrders>>,
    fail_writes: Arc<AtomicBool>,
    saves: Arc<AtomicU64>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that starts out holding `orders`.
    pub fn with_orders(orders: Vec<Order>) -> Self {
        let storage = Self::default();
        *storage.contents.lock() = PersistedOrders::from(&StoredOrders::new(0, orders));
        storage
    }

    /// Makes every following `save` fail until switched back.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Successful saves so far.
    pub fn save_count(&self) -> u64 {
        self.saves.load(Ordering::SeqCst)
    }

    /// Currently stored orders, keyed by order number.
    pub fn snapshot(&self) -> BTreeMap<String, Order> {
        self.contents.lock().orders.clone()
    }

    /// Stored id high-water mark.
    pub fn next_id(&self) -> u32 {
        self.contents.lock().next_id
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn load(&self) -> Result<StoredOrders, StorageError> {
        Ok(self.contents.lock().clone().into())
    }

    async fn save(&self, stored: &StoredOrders) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("writes disabled".into()));
        }
        *self.contents.lock() = PersistedOrders::from(stored);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
