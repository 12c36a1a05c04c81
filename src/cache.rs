// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F. (https://github.com/tomtom215/duckdb-regexp)

//! Compiled-pattern cache for the `regexp` predicate.
//!
//! The predicate runs once per candidate row, so the same pattern text is seen
//! thousands to millions of times per query (quadratically in a
//! `JOIN ... ON text REGEXP pattern`). [`PatternCache`] compiles each distinct
//! pattern once and hands out shared references to the compiled [`Regex`].
//!
//! # Locking
//!
//! A single [`RwLock`] guards the whole map:
//!
//! - Lookups take the read lock only, so a warm cache is read concurrently.
//! - Compilation happens with no lock held.
//! - The write lock is taken only to store a new pattern or to clear.
//!
//! Two threads that miss on the same pattern at the same time both compile it.
//! The first to take the write lock stores its matcher; the other discards
//! its own and returns the stored one, so at most one matcher per pattern is
//! ever retained.
//!
//! # Growth
//!
//! By default the cache is unbounded: it grows with the number of distinct
//! patterns a workload issues and shrinks only on [`PatternCache::clear`].
//! Workloads with unbounded pattern diversity should configure a capacity
//! through [`CacheConfig`]; when a new pattern would exceed it, the map is
//! reset before the insert.

use crate::config::CacheConfig;
use crate::error::RegexpError;
use regex::Regex;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

static SHARED: OnceLock<Arc<PatternCache>> = OnceLock::new();

/// Thread-safe map from pattern text to compiled matcher.
///
/// Keys are the exact pattern text: `a+` and `(?:a)+` are different entries.
#[derive(Debug, Default)]
pub struct PatternCache {
    map: RwLock<HashMap<String, Arc<Regex>>>,
    capacity: Option<NonZeroUsize>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

/// Point-in-time counters for a [`PatternCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Patterns currently cached.
    pub entries: usize,
    /// Configured capacity, if any.
    pub capacity: Option<NonZeroUsize>,
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that had to compile, including failed compilations.
    pub misses: u64,
    /// Entries dropped because the capacity was reached.
    pub evictions: u64,
}

impl PatternCache {
    /// Creates an empty, unbounded cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty cache with the given configuration.
    #[must_use]
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            capacity: config.capacity,
            ..Self::default()
        }
    }

    /// Process-wide default cache.
    ///
    /// Created unbounded on first use unless [`PatternCache::init_shared`] ran
    /// first. Every database that loads the extension registers against this
    /// instance.
    pub fn shared() -> &'static Arc<Self> {
        SHARED.get_or_init(|| Arc::new(Self::new()))
    }

    /// Returns the process-wide cache, creating it from `config` if it does
    /// not exist yet. Once created, later configs are ignored.
    pub fn init_shared(config: CacheConfig) -> &'static Arc<Self> {
        SHARED.get_or_init(|| {
            tracing::debug!(
                capacity = ?config.capacity,
                "creating shared regexp pattern cache"
            );
            Arc::new(Self::with_config(config))
        })
    }

    /// Returns the cached matcher for `pattern`, if present. Never compiles.
    pub fn get(&self, pattern: &str) -> Option<Arc<Regex>> {
        let map = self.map.read().unwrap_or_else(PoisonError::into_inner);
        map.get(pattern).map(Arc::clone)
    }

    /// Returns the cached matcher for `pattern`, compiling and storing it on
    /// first use.
    ///
    /// A pattern that fails to compile is not cached; the next call with the
    /// same text compiles again and fails again.
    pub fn get_or_compile(&self, pattern: &str) -> Result<Arc<Regex>, RegexpError> {
        if let Some(found) = self.get(pattern) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(found);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(pattern.len = pattern.len(), "compiling regexp pattern");
        let compiled = Arc::new(Regex::new(pattern)?);

        let mut map = self.map.write().unwrap_or_else(PoisonError::into_inner);

        // Lost the race: keep the stored matcher, drop ours.
        if let Some(existing) = map.get(pattern) {
            return Ok(Arc::clone(existing));
        }

        if let Some(capacity) = self.capacity {
            if map.len() >= capacity.get() {
                let dropped = map.len();
                *map = HashMap::new();
                self.evictions.fetch_add(dropped as u64, Ordering::Relaxed);
                tracing::warn!(
                    capacity = capacity.get(),
                    dropped,
                    "regexp pattern cache reached capacity, resetting"
                );
            }
        }

        map.insert(pattern.to_owned(), Arc::clone(&compiled));
        Ok(compiled)
    }

    /// Drops every cached matcher and returns how many were dropped.
    ///
    /// Matchers already handed out stay valid; they are simply no longer
    /// reachable from the cache.
    pub fn clear(&self) -> usize {
        let old = {
            let mut map = self.map.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *map)
        };
        let dropped = old.len();
        tracing::info!(dropped, "regexp pattern cache cleared");
        dropped
    }

    /// Number of cached patterns.
    pub fn size(&self) -> usize {
        self.map.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns true if no pattern is cached.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Returns true if `pattern` is cached.
    pub fn contains(&self, pattern: &str) -> bool {
        self.map
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(pattern)
    }

    /// Configured capacity, or `None` when unbounded.
    pub const fn capacity(&self) -> Option<NonZeroUsize> {
        self.capacity
    }

    /// Snapshot of the cache counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.size(),
            capacity: self.capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;

    #[test]
    fn test_new_cache_is_empty() {
        let cache = PatternCache::new();
        assert_eq!(cache.size(), 0);
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), None);
    }

    #[test]
    fn test_get_never_compiles() {
        let cache = PatternCache::new();
        assert!(cache.get("^ap").is_none());
        assert_eq!(cache.size(), 0);
        assert_eq!(cache.stats().misses, 0);
    }

    #[test]
    fn test_get_after_compile() {
        let cache = PatternCache::new();
        let compiled = cache.get_or_compile("^ap").unwrap();
        let found = cache.get("^ap").unwrap();
        assert!(Arc::ptr_eq(&compiled, &found));
    }

    #[test]
    fn test_second_call_is_a_hit() {
        let cache = PatternCache::new();
        let first = cache.get_or_compile(r"\d+").unwrap();
        let second = cache.get_or_compile(r"\d+").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.size(), 1);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_distinct_text_is_distinct_key() {
        let cache = PatternCache::new();
        cache.get_or_compile("a+").unwrap();
        cache.get_or_compile("(?:a)+").unwrap();
        assert_eq!(cache.size(), 2);
    }

    #[test]
    fn test_invalid_pattern_not_cached() {
        let cache = PatternCache::new();
        cache.get_or_compile("ok").unwrap();

        let err = cache.get_or_compile("[").unwrap_err();
        assert!(matches!(err, RegexpError::Compile(_)));
        assert_eq!(cache.size(), 1);
        assert!(!cache.contains("["));

        // Retried, not remembered.
        assert!(cache.get_or_compile("[").is_err());
        assert_eq!(cache.stats().misses, 3);
    }

    #[test]
    fn test_clear_then_recompile() {
        let cache = PatternCache::new();
        let before = cache.get_or_compile("^apple").unwrap();
        cache.get_or_compile("book$").unwrap();

        assert_eq!(cache.clear(), 2);
        assert_eq!(cache.size(), 0);

        // The handed-out matcher outlives the clear.
        assert!(before.is_match("apple pie"));

        let after = cache.get_or_compile("^apple").unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(cache.size(), 1);
    }

    #[test]
    fn test_clear_empty_cache() {
        let cache = PatternCache::new();
        assert_eq!(cache.clear(), 0);
    }

    #[test]
    fn test_counters_survive_clear() {
        let cache = PatternCache::new();
        cache.get_or_compile("x").unwrap();
        cache.get_or_compile("x").unwrap();
        cache.clear();
        let stats = cache.stats();
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_capacity_resets_when_full() {
        let cache = PatternCache::with_config(CacheConfig::with_capacity(2));
        cache.get_or_compile("a").unwrap();
        cache.get_or_compile("b").unwrap();
        assert_eq!(cache.size(), 2);

        cache.get_or_compile("c").unwrap();
        assert_eq!(cache.size(), 1);
        assert!(cache.contains("c"));
        assert!(!cache.contains("a"));
        assert_eq!(cache.stats().evictions, 2);
    }

    #[test]
    fn test_capacity_hit_does_not_evict() {
        let cache = PatternCache::with_config(CacheConfig::with_capacity(2));
        cache.get_or_compile("a").unwrap();
        cache.get_or_compile("b").unwrap();
        cache.get_or_compile("a").unwrap();
        assert_eq!(cache.size(), 2);
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_capacity_one() {
        let cache = PatternCache::with_config(CacheConfig::with_capacity(1));
        for p in ["a", "b", "c"] {
            cache.get_or_compile(p).unwrap();
            assert_eq!(cache.size(), 1);
            assert!(cache.contains(p));
        }
    }

    #[test]
    fn test_invalid_pattern_does_not_evict() {
        let cache = PatternCache::with_config(CacheConfig::with_capacity(1));
        cache.get_or_compile("a").unwrap();
        assert!(cache.get_or_compile("(").is_err());
        assert!(cache.contains("a"));
    }

    #[test]
    fn test_shared_is_singleton() {
        assert!(Arc::ptr_eq(PatternCache::shared(), PatternCache::shared()));
    }

    #[test]
    fn test_init_shared_reuses_first_instance() {
        // Whichever of `shared`/`init_shared` runs first creates the instance;
        // every later call, whatever its config, gets the same one.
        let first = PatternCache::init_shared(CacheConfig::unbounded());
        let second = PatternCache::init_shared(CacheConfig::with_capacity(7));
        assert!(Arc::ptr_eq(first, second));
        assert!(Arc::ptr_eq(first, PatternCache::shared()));
        assert_eq!(first.capacity(), second.capacity());
    }

    #[test]
    fn test_concurrent_same_pattern() {
        const THREADS: usize = 16;
        let cache = PatternCache::new();
        let barrier = Barrier::new(THREADS);

        std::thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    barrier.wait();
                    let re = cache.get_or_compile(r"^user-\d+$").unwrap();
                    assert!(re.is_match("user-42"));
                    assert!(!re.is_match("admin"));
                });
            }
        });

        assert_eq!(cache.size(), 1);
        let stored = cache.get(r"^user-\d+$").unwrap();
        let again = cache.get_or_compile(r"^user-\d+$").unwrap();
        assert!(Arc::ptr_eq(&stored, &again));
    }

    #[test]
    fn test_concurrent_distinct_patterns() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 50;
        let cache = PatternCache::new();

        std::thread::scope(|s| {
            for t in 0..THREADS {
                let cache = &cache;
                s.spawn(move || {
                    for i in 0..PER_THREAD {
                        let pattern = format!("^t{t}-{i}$");
                        let re = cache.get_or_compile(&pattern).unwrap();
                        assert!(re.is_match(&format!("t{t}-{i}")));
                    }
                });
            }
        });

        assert_eq!(cache.size(), THREADS * PER_THREAD);
    }

    #[test]
    fn test_concurrent_clear_and_compile() {
        let cache = PatternCache::new();

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for i in 0..200 {
                        let re = cache.get_or_compile(&format!("k{}", i % 10)).unwrap();
                        assert!(re.is_match(&format!("k{}", i % 10)));
                    }
                });
            }
            s.spawn(|| {
                for _ in 0..50 {
                    cache.clear();
                }
            });
        });

        assert!(cache.size() <= 10);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn repeated_compile_does_not_grow(
            literal in "[a-z0-9]{1,12}",
            repeats in 1usize..20,
        ) {
            let cache = PatternCache::new();
            let pattern = regex::escape(&literal);
            for _ in 0..repeats {
                cache.get_or_compile(&pattern).unwrap();
            }
            prop_assert_eq!(cache.size(), 1);
            prop_assert_eq!(cache.stats().misses, 1);
            prop_assert_eq!(cache.stats().hits, repeats as u64 - 1);
        }

        #[test]
        fn size_never_exceeds_capacity(
            capacity in 1usize..8,
            patterns in prop::collection::vec("[a-z]{1,4}", 1..40),
        ) {
            let cache = PatternCache::with_config(CacheConfig::with_capacity(capacity));
            for p in &patterns {
                cache.get_or_compile(p).unwrap();
                prop_assert!(cache.size() <= capacity);
                prop_assert!(cache.contains(p));
            }
        }

        #[test]
        fn size_counts_distinct_patterns(
            patterns in prop::collection::vec("[a-c]{1,3}", 0..30),
        ) {
            let cache = PatternCache::new();
            for p in &patterns {
                cache.get_or_compile(p).unwrap();
            }
            let distinct: std::collections::HashSet<_> = patterns.iter().collect();
            prop_assert_eq!(cache.size(), distinct.len());
        }
    }
}
