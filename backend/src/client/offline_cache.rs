use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::client::store::KeyValueStore;
use crate::models::cache::{CacheEntry, EntryStamp};

pub const NEWS: &str = "agrivision_news";
pub const MARKET_PRICES: &str = "agrivision_market";
pub const FARMER_DATA: &str = "agrivision_farmer";
pub const SOIL_RESULTS: &str = "agrivision_soil_results";
pub const CROP_ANALYSIS: &str = "agrivision_crop_analysis";
pub const LAST_SYNC: &str = "agrivision_last_sync";

/// Every key the application writes, in the order `clear_all` walks them.
pub const ALL_KEYS: [&str; 6] = [
    NEWS,
    MARKET_PRICES,
    FARMER_DATA,
    SOIL_RESULTS,
    CROP_ANALYSIS,
    LAST_SYNC,
];

pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(60 * 60);

/// Source of wall-clock time in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start_ms)),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Timestamped cache over a [`KeyValueStore`]. Storage problems are logged and
/// reported as misses or `false`; nothing here returns an error.
#[derive(Clone)]
pub struct OfflineCache {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl OfflineCache {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn with_system_clock(store: Arc<dyn KeyValueStore>) -> Self {
        Self::new(store, Arc::new(SystemClock))
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> bool {
        let entry = CacheEntry::new(value, self.clock.now_ms());
        let raw = match serde_json::to_string(&entry) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, "error serialising cache entry: {}", e);
                return false;
            }
        };
        match self.store.set_item(key, &raw) {
            Ok(()) => true,
            Err(e) => {
                warn!(key, "error saving to cache: {}", e);
                false
            }
        }
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.read_raw(key)?;
        match serde_json::from_str::<CacheEntry<T>>(&raw) {
            Ok(entry) => Some(entry.data),
            Err(e) => {
                warn!(key, "error reading from cache: {}", e);
                None
            }
        }
    }

    pub fn is_valid(&self, key: &str, max_age: Duration) -> bool {
        let Some(raw) = self.read_raw(key) else {
            return false;
        };
        match serde_json::from_str::<EntryStamp>(&raw) {
            Ok(stamp) => stamp.is_fresh(self.clock.now_ms(), max_age.as_millis() as i64),
            Err(_) => false,
        }
    }

    pub fn remove(&self, key: &str) -> bool {
        match self.store.remove_item(key) {
            Ok(()) => true,
            Err(e) => {
                warn!(key, "error removing cache: {}", e);
                false
            }
        }
    }

    /// Removes every listed key, carrying on past failures. Returns `true`
    /// only if all removals succeeded.
    pub fn clear_all(&self, keys: &[&str]) -> bool {
        keys.iter()
            .map(|key| self.remove(key))
            .fold(true, |all_ok, ok| all_ok && ok)
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        let raw = self.read_raw(LAST_SYNC)?;
        let ms = raw.trim().parse::<i64>().ok()?;
        DateTime::from_timestamp_millis(ms)
    }

    pub fn update_last_sync(&self) -> bool {
        let now = self.clock.now_ms();
        match self.store.set_item(LAST_SYNC, &now.to_string()) {
            Ok(()) => {
                debug!(now, "last sync updated");
                true
            }
            Err(e) => {
                warn!("error updating last sync: {}", e);
                false
            }
        }
    }

    fn read_raw(&self, key: &str) -> Option<String> {
        match self.store.get_item(key) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, "error reading from cache: {}", e);
                None
            }
        }
    }
}
