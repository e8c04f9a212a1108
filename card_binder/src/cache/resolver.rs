//! Resolving card keys through the store and the remote fetcher

use super::record::{CachedCardRecord, FetchStatus};
use super::store::CacheStore;
use crate::card_key::CardKey;
use crate::error::{BinderError, ResolveError, TransientFetchError};
use crate::fetcher::{CardFetcher, FetchOutcome};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::OnceCell;

/// Staleness windows for stored records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// How long a not-found record short-circuits lookups
    pub negative_ttl: Duration,
    /// How long a resolved record is served; `None` keeps it forever
    pub resolved_ttl: Option<Duration>,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            negative_ttl: Duration::days(7),
            resolved_ttl: None,
        }
    }
}

impl CachePolicy {
    /// Whether a stored record can be served at `now` without a fetch
    pub fn is_fresh(&self, record: &CachedCardRecord, now: DateTime<Utc>) -> bool {
        match record.status {
            FetchStatus::Resolved => self
                .resolved_ttl
                .map_or(true, |ttl| record.age(now) < ttl),
            FetchStatus::NotFound => record.age(now) < self.negative_ttl,
            FetchStatus::Error => false,
        }
    }
}

type Flight = Arc<OnceCell<Result<CachedCardRecord, ResolveError>>>;

/// Maps card keys to cached records, fetching on a miss.
///
/// Concurrent resolves of one key share a single fetch.
pub struct MetadataCache<F> {
    store: Arc<Mutex<CacheStore>>,
    fetcher: F,
    policy: CachePolicy,
    in_flight: Mutex<HashMap<CardKey, Flight>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<F: CardFetcher> MetadataCache<F> {
    pub fn new(store: Arc<Mutex<CacheStore>>, fetcher: F, policy: CachePolicy) -> Self {
        Self {
            store,
            fetcher,
            policy,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<Mutex<CacheStore>> {
        &self.store
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub async fn resolve(&self, key: &CardKey) -> Result<CachedCardRecord, ResolveError> {
        self.resolve_at(key, Utc::now()).await
    }

    /// Resolve a key as of `now`.
    ///
    /// Serves a fresh stored record, otherwise fetches once and stores a
    /// resolved or not-found record. Transient fetch failures are returned
    /// and leave the store untouched.
    pub async fn resolve_at(
        &self,
        key: &CardKey,
        now: DateTime<Utc>,
    ) -> Result<CachedCardRecord, ResolveError> {
        if let Some(record) = self.lookup_fresh(key, now)? {
            log::debug!("Cache hit for {}", key);
            return Ok(record);
        }

        let flight = lock(&self.in_flight).entry(key.clone()).or_default().clone();
        let result = flight
            .get_or_init(|| self.fetch_and_store(key, now))
            .await
            .clone();

        let mut in_flight = lock(&self.in_flight);
        if in_flight.get(key).is_some_and(|f| Arc::ptr_eq(f, &flight)) {
            in_flight.remove(key);
        }
        result
    }

    /// Drop the stored record so the next resolve fetches again
    pub fn invalidate(&self, key: &CardKey) -> Result<bool, BinderError> {
        let removed = lock(&self.store).remove(key)?;
        if removed {
            log::info!("Invalidated cached record for {}", key);
        }
        Ok(removed)
    }

    fn lookup_fresh(
        &self,
        key: &CardKey,
        now: DateTime<Utc>,
    ) -> Result<Option<CachedCardRecord>, ResolveError> {
        let record = lock(&self.store)
            .get(key)
            .map_err(|e| store_error(key, e))?;
        Ok(record.filter(|r| {
            let fresh = self.policy.is_fresh(r, now);
            if !fresh {
                log::debug!("Cached {} record for {} is stale", r.status.as_str(), key);
            }
            fresh
        }))
    }

    async fn fetch_and_store(
        &self,
        key: &CardKey,
        now: DateTime<Utc>,
    ) -> Result<CachedCardRecord, ResolveError> {
        // Another flight may have finished between the first lookup and this one
        if let Some(record) = self.lookup_fresh(key, now)? {
            return Ok(record);
        }

        log::info!("Cache miss for {}, fetching", key);
        let outcome = self.fetcher.fetch(key).await.map_err(|source| {
            log::warn!("Fetch failed for {}: {}", key, source);
            TransientFetchError {
                key: key.clone(),
                source,
            }
        })?;

        let (record, image) = match outcome {
            FetchOutcome::Found(card) => {
                let image_file = card
                    .image
                    .as_ref()
                    .map(|_| card.metadata.image_file_name());
                let record = CachedCardRecord::resolved(key.clone(), card.metadata, image_file, now);
                (record, card.image)
            }
            FetchOutcome::NotFound => {
                log::info!("No card found for {}", key);
                (CachedCardRecord::not_found(key.clone(), now), None)
            }
        };

        lock(&self.store)
            .put(&record, image.as_deref())
            .map_err(|e| store_error(key, e))?;
        Ok(record)
    }
}

fn store_error(key: &CardKey, err: BinderError) -> ResolveError {
    ResolveError::Store {
        key: key.clone(),
        message: err.to_string(),
    }
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
