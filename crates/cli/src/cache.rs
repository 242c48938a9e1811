use crate::aggregator::ContextAggregator;
use blake3::Hasher;
use context_loader::Result;
use context_protocol::{Context, LoadingOptions};
use log::debug;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub ttl: Duration,
    /// Zero disables caching.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            capacity: 32,
        }
    }
}

/// [`ContextAggregator`] memoized by root and options, with a TTL and LRU
/// eviction. Concurrent misses for the same key both do the work.
pub struct CachedAggregator {
    inner: ContextAggregator,
    config: CacheConfig,
    entries: Mutex<MemCache>,
}

impl CachedAggregator {
    pub fn new(inner: ContextAggregator, config: CacheConfig) -> Self {
        Self {
            inner,
            config,
            entries: Mutex::new(MemCache::new()),
        }
    }

    pub fn inner(&self) -> &ContextAggregator {
        &self.inner
    }

    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut cache = self.lock();
        cache.map.clear();
        cache.order.clear();
    }

    pub async fn aggregate(&self, root: &Path, options: &LoadingOptions) -> Result<Context> {
        if self.config.capacity == 0 {
            return self.inner.aggregate(root, options).await;
        }

        let key = cache_key(root, options);
        if let Some(hit) = self.lock().get(&key, self.config.ttl) {
            debug!("Cache hit for {}", root.display());
            return Ok(hit);
        }

        let context = self.inner.aggregate(root, options).await?;
        self.lock()
            .insert(&key, context.clone(), self.config.capacity);
        Ok(context)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemCache> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Stable digest of everything that influences an aggregate.
pub fn cache_key(root: &Path, options: &LoadingOptions) -> String {
    let mut hasher = Hasher::new();
    hasher.update(root.to_string_lossy().as_bytes());
    hasher.update(
        format!(
            "|{}|{}|{:?}|{}|{}|{}",
            options.strategy,
            options.max_tokens,
            options.max_depth,
            options.query.as_deref().unwrap_or(""),
            options.optimize,
            options.optimization_strategy
        )
        .as_bytes(),
    );
    for (tag, list) in [
        ("i", &options.include_patterns),
        ("e", &options.exclude_patterns),
        ("t", &options.file_types),
    ] {
        for item in list {
            hasher.update(format!("|{tag}:{item}").as_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}

struct CacheEntry {
    created: Instant,
    context: Context,
}

struct MemCache {
    map: HashMap<String, CacheEntry>,
    order: VecDeque<String>,
}

impl MemCache {
    fn new() -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.order.push_front(key.to_string());
    }

    fn forget(&mut self, key: &str) {
        self.map.remove(key);
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
    }

    fn insert(&mut self, key: &str, context: Context, capacity: usize) {
        self.map.insert(
            key.to_string(),
            CacheEntry {
                created: Instant::now(),
                context,
            },
        );
        self.touch(key);
        while self.order.len() > capacity {
            if let Some(old) = self.order.pop_back() {
                self.map.remove(&old);
            }
        }
    }

    fn get(&mut self, key: &str, ttl: Duration) -> Option<Context> {
        let entry = self.map.get(key)?;
        if entry.created.elapsed() > ttl {
            self.forget(key);
            return None;
        }
        let context = entry.context.clone();
        self.touch(key);
        Some(context)
    }
}
