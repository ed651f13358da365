//! Compiled-pattern memo for ad-hoc regexes.
//!
//! Device-brand and client-hints lists are fetched per request and their
//! pattern text is compiled on demand. This module keeps the compiled
//! form around so that repeated requests do not recompile the same text.
//!
//! # Thread Safety
//! One `Mutex` guards the LRU. Compilation happens outside the lock, so
//! two threads missing on the same text may both compile it; the second
//! insert simply refreshes the entry.
//!
//! # Memory Management
//! The memo is bounded: once `capacity` entries are held, the least
//! recently used one is evicted. A capacity of `0` disables memoization
//! and every lookup compiles.

use lru::LruCache;
use regex::Regex;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{trace, warn};

use super::pattern::compile_pattern;
use crate::error::{ClassifierError, Result};

/// Default number of compiled patterns kept.
pub const DEFAULT_PATTERN_CACHE_CAPACITY: usize = 1000;

/// Memo performance statistics.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Total memo lookups
    pub total_lookups: usize,

    /// Memo hits
    pub hits: usize,

    /// Memo misses
    pub misses: usize,

    /// Pattern compilations
    pub compilations: usize,

    /// Evictions performed
    pub evictions: usize,

    /// Patterns that failed to compile
    pub rejected_patterns: usize,
}

#[derive(Debug)]
struct CacheStorage {
    patterns: Option<LruCache<String, Arc<Regex>>>,
    stats: CacheStats,
}

/// Bounded LRU memo from stored pattern text to compiled regex.
#[derive(Debug)]
pub struct PatternCache {
    storage: Mutex<CacheStorage>,
    capacity: usize,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_PATTERN_CACHE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: Mutex::new(CacheStorage {
                patterns: NonZeroUsize::new(capacity).map(LruCache::new),
                stats: CacheStats::default(),
            }),
            capacity,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, CacheStorage>> {
        self.storage
            .lock()
            .map_err(|_| ClassifierError::LockPoisoned("pattern cache"))
    }

    /// Get or compile the regex for stored pattern text.
    pub fn get_regex(&self, stored: &str) -> Result<Arc<Regex>> {
        {
            let mut storage = self.lock()?;
            storage.stats.total_lookups += 1;

            let cached = storage
                .patterns
                .as_mut()
                .and_then(|patterns| patterns.get(stored).cloned());

            if let Some(regex) = cached {
                storage.stats.hits += 1;
                return Ok(regex);
            }
            storage.stats.misses += 1;
        }

        self.compile_and_cache(stored)
    }

    fn compile_and_cache(&self, stored: &str) -> Result<Arc<Regex>> {
        let compiled = compile_pattern(stored);

        let mut storage = self.lock()?;
        let regex = match compiled {
            Ok(regex) => Arc::new(regex),
            Err(e) => {
                storage.stats.rejected_patterns += 1;
                warn!(pattern = stored, error = %e, "Failed to compile pattern");
                return Err(ClassifierError::InvalidRegex(format!(
                    "Pattern '{stored}': {e}"
                )));
            }
        };
        storage.stats.compilations += 1;
        trace!(pattern = stored, "Compiled pattern");

        let evicted = storage
            .patterns
            .as_mut()
            .and_then(|patterns| patterns.push(stored.to_string(), regex.clone()));
        if evicted.is_some_and(|(key, _)| key != stored) {
            storage.stats.evictions += 1;
        }

        Ok(regex)
    }

    /// Get cache statistics for monitoring.
    pub fn stats(&self) -> Result<CacheStats> {
        Ok(self.lock()?.stats.clone())
    }

    /// Get cache hit ratio for performance monitoring.
    pub fn hit_ratio(&self) -> Result<f64> {
        let stats = self.stats()?;
        if stats.total_lookups == 0 {
            return Ok(0.0);
        }
        Ok(stats.hits as f64 / stats.total_lookups as f64)
    }

    pub fn clear(&self) -> Result<()> {
        let mut storage = self.lock()?;
        if let Some(patterns) = storage.patterns.as_mut() {
            patterns.clear();
        }
        storage.stats = CacheStats::default();
        Ok(())
    }

    /// Get current cache size.
    pub fn size(&self) -> Result<usize> {
        Ok(self
            .lock()?
            .patterns
            .as_ref()
            .map_or(0, |patterns| patterns.len()))
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Compile a set of patterns ahead of time.
    pub fn precompile_patterns(&self, patterns: &[&str]) -> Result<()> {
        for &pattern in patterns {
            self.get_regex(pattern)?;
        }
        Ok(())
    }
}

impl Default for PatternCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_basic_functionality() {
        let cache = PatternCache::new();

        let regex1 = cache.get_regex("/sm-([a-z0-9]+)/si").unwrap();
        let stats = cache.stats().unwrap();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.compilations, 1);

        let regex2 = cache.get_regex("/sm-([a-z0-9]+)/si").unwrap();
        let stats = cache.stats().unwrap();
        assert_eq!(stats.hits, 1);
        assert!(Arc::ptr_eq(&regex1, &regex2));
        assert!(regex2.is_match("Linux; Android 10; SM-G960F"));
    }

    #[test]
    fn test_cache_eviction() {
        let cache = PatternCache::with_capacity(3);

        for pattern in ["/a/si", "/b/si", "/c/si", "/d/si"] {
            cache.get_regex(pattern).unwrap();
        }

        let stats = cache.stats().unwrap();
        assert_eq!(stats.evictions, 1);
        assert_eq!(cache.size().unwrap(), 3);

        // "/a/si" was least recently used and must be recompiled
        cache.get_regex("/a/si").unwrap();
        assert_eq!(cache.stats().unwrap().compilations, 5);
    }

    #[test]
    fn test_recently_used_pattern_survives() {
        let cache = PatternCache::with_capacity(2);

        cache.get_regex("/hot/si").unwrap();
        cache.get_regex("/cold1/si").unwrap();
        cache.get_regex("/hot/si").unwrap();
        cache.get_regex("/cold2/si").unwrap();

        cache.get_regex("/hot/si").unwrap();
        assert_eq!(cache.stats().unwrap().hits, 2);
    }

    #[test]
    fn test_zero_capacity_always_compiles() {
        let cache = PatternCache::with_capacity(0);

        cache.get_regex("/x/si").unwrap();
        cache.get_regex("/x/si").unwrap();

        let stats = cache.stats().unwrap();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.compilations, 2);
        assert_eq!(cache.size().unwrap(), 0);
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let cache = PatternCache::new();
        let err = cache.get_regex("/(unclosed/si").unwrap_err();
        assert!(matches!(err, ClassifierError::InvalidRegex(_)));
        assert_eq!(cache.stats().unwrap().rejected_patterns, 1);
    }

    #[test]
    fn test_hit_ratio_and_clear() {
        let cache = PatternCache::new();
        assert_eq!(cache.hit_ratio().unwrap(), 0.0);

        cache.precompile_patterns(&["/a/si", "/b/si"]).unwrap();
        cache.get_regex("/a/si").unwrap();
        assert!((cache.hit_ratio().unwrap() - 1.0 / 3.0).abs() < f64::EPSILON);

        cache.clear().unwrap();
        assert_eq!(cache.size().unwrap(), 0);
        assert_eq!(cache.stats().unwrap(), CacheStats::default());
    }
}
