use std::future::Future;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::client::{connectivity::Connectivity, error::ClientError, offline_cache::OfflineCache};

pub const OFFLINE_NO_CACHE: &str = "No internet connection and no cached data available";

/// Zero-argument remote fetch.
#[async_trait]
pub trait Fetcher<T>: Send + Sync {
    async fn fetch(&self) -> Result<T, ClientError>;
}

#[async_trait]
impl<T, F, Fut> Fetcher<T> for F
where
    T: Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
{
    async fn fetch(&self) -> Result<T, ClientError> {
        (self)().await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
    pub is_from_cache: bool,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: true,
            error: None,
            is_from_cache: false,
        }
    }
}

/// Serves a resource from the offline cache and keeps it fresh from the
/// network when connectivity allows.
///
/// State is published on a watch channel. After [`CachedFetch::dispose`]
/// the consumer is considered gone: fetches already running still complete
/// and still write the cache, but state is no longer touched. There is no single-flight guard, so overlapping `activate` and
/// `refresh` calls both run and the one finishing last owns the cache entry.
pub struct CachedFetch<T> {
    key: String,
    max_age: Duration,
    timeout: Option<Duration>,
    fetcher: Arc<dyn Fetcher<T>>,
    cache: OfflineCache,
    connectivity: Arc<dyn Connectivity>,
    state: watch::Sender<FetchState<T>>,
    disposed: AtomicBool,
}

impl<T> CachedFetch<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn new(
        key: impl Into<String>,
        fetcher: Arc<dyn Fetcher<T>>,
        max_age: Duration,
        cache: OfflineCache,
        connectivity: Arc<dyn Connectivity>,
    ) -> Self {
        let (state, _) = watch::channel(FetchState::default());
        Self {
            key: key.into(),
            max_age,
            timeout: None,
            fetcher,
            cache,
            connectivity,
            state,
            disposed: AtomicBool::new(false),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<FetchState<T>> {
        self.state.subscribe()
    }

    pub fn state(&self) -> FetchState<T> {
        self.state.borrow().clone()
    }

    /// Detaches the consumer. Later state updates are dropped.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }

    pub async fn activate(&self) {
        let cached: Option<T> = self.cache.get(&self.key);
        let valid = self.cache.is_valid(&self.key, self.max_age);

        if let (Some(data), true) = (&cached, valid) {
            let data = data.clone();
            self.publish(|s| {
                s.data = Some(data);
                s.is_from_cache = true;
                s.loading = false;
            });
        }

        if self.connectivity.is_online() {
            self.fetch_and_publish().await;
        } else if let Some(data) = cached {
            debug!(key = %self.key, valid, "offline, serving cached data");
            self.publish(|s| {
                if s.data.is_none() {
                    s.data = Some(data);
                    s.is_from_cache = true;
                }
                s.error = None;
                s.loading = false;
            });
        } else {
            warn!(key = %self.key, "offline with nothing cached");
            self.publish(|s| {
                s.error = Some(OFFLINE_NO_CACHE.to_string());
                s.loading = false;
            });
        }
    }

    /// Re-fetches on demand. Does nothing while offline.
    pub async fn refresh(&self) {
        if !self.connectivity.is_online() {
            debug!(key = %self.key, "refresh skipped, offline");
            return;
        }
        self.publish(|s| s.loading = true);
        self.fetch_and_publish().await;
    }

    async fn fetch_and_publish(&self) {
        match self.fetch_and_store().await {
            Ok(fresh) => self.publish(|s| {
                s.data = Some(fresh);
                s.is_from_cache = false;
                s.error = None;
                s.loading = false;
            }),
            Err(e) => {
                warn!(key = %self.key, "fetch failed: {}", e);
                self.publish(|s| {
                    s.error = Some(e.to_string());
                    s.loading = false;
                });
            }
        }
    }

    async fn fetch_and_store(&self) -> Result<T, ClientError> {
        let fresh = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.fetcher.fetch())
                .await
                .map_err(|_| ClientError::Timeout)??,
            None => self.fetcher.fetch().await?,
        };
        self.cache.set(&self.key, &fresh);
        self.cache.update_last_sync();
        Ok(fresh)
    }

    fn publish(&self, update: impl FnOnce(&mut FetchState<T>)) {
        if self.disposed.load(Ordering::SeqCst) {
            debug!(key = %self.key, "consumer disposed, dropping state update");
            return;
        }
        self.state.send_modify(update);
    }
}
