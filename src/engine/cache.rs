//! Result cache: request to classification result, bounded LRU.
//!
//! Safe for concurrent `get`/`put` from any number of threads sharing one
//! [`Classifier`](crate::Classifier). Capacity `0` disables the cache and
//! every call recomputes.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};

use crate::error::{ClassifierError, Result};
use crate::request::UaRequest;
use crate::result::UaResult;

/// Result cache statistics.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResultCacheStats {
    pub hits: usize,
    pub misses: usize,
    pub insertions: usize,
    pub evictions: usize,
}

impl ResultCacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            return 0.0;
        }
        self.hits as f64 / lookups as f64
    }
}

#[derive(Debug)]
struct Inner {
    entries: LruCache<UaRequest, UaResult>,
    stats: ResultCacheStats,
}

#[derive(Debug)]
pub struct ResultCache {
    inner: Option<Mutex<Inner>>,
    capacity: usize,
}

impl ResultCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: NonZeroUsize::new(capacity).map(|cap| {
                Mutex::new(Inner {
                    entries: LruCache::new(cap),
                    stats: ResultCacheStats::default(),
                })
            }),
            capacity,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(inner: &Mutex<Inner>) -> Result<MutexGuard<'_, Inner>> {
        inner
            .lock()
            .map_err(|_| ClassifierError::LockPoisoned("result cache"))
    }

    pub fn get(&self, request: &UaRequest) -> Result<Option<UaResult>> {
        let Some(inner) = &self.inner else {
            return Ok(None);
        };
        let mut inner = Self::lock(inner)?;
        let hit = inner.entries.get(request).cloned();
        if hit.is_some() {
            inner.stats.hits += 1;
        } else {
            inner.stats.misses += 1;
        }
        Ok(hit)
    }

    pub fn put(&self, request: UaRequest, result: UaResult) -> Result<()> {
        let Some(inner) = &self.inner else {
            return Ok(());
        };
        let mut inner = Self::lock(inner)?;
        inner.stats.insertions += 1;
        if let Some((evicted, _)) = inner.entries.push(request.clone(), result) {
            if evicted != request {
                inner.stats.evictions += 1;
            }
        }
        Ok(())
    }

    pub fn len(&self) -> Result<usize> {
        match &self.inner {
            Some(inner) => Ok(Self::lock(inner)?.entries.len()),
            None => Ok(0),
        }
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn clear(&self) -> Result<()> {
        if let Some(inner) = &self.inner {
            Self::lock(inner)?.entries.clear();
        }
        Ok(())
    }

    pub fn stats(&self) -> Result<ResultCacheStats> {
        match &self.inner {
            Some(inner) => Ok(Self::lock(inner)?.stats.clone()),
            None => Ok(ResultCacheStats::default()),
        }
    }
}
