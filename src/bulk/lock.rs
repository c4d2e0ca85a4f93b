//! Keyed lock registry
//!
//! Hands out scoped critical sections keyed by an arbitrary comparable key,
//! serializing conflicting concurrent work on the same logical resource.
//! Locks are created atomically on first use and never removed, so the cache
//! is bounded by the cardinality of distinct keys seen.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::ReentrantMutex;

pub struct LockRegistry<K: Eq + Hash + Clone> {
    cache: DashMap<K, Arc<ReentrantMutex<()>>>,
}

impl<K: Eq + Hash + Clone> LockRegistry<K> {
    pub fn new() -> Self {
        Self {
            cache: DashMap::new(),
        }
    }

    /// Run `f` while holding the lock for `key`. The guard is released on
    /// every exit path, including unwinding.
    pub fn with_lock<R>(&self, key: K, f: impl FnOnce() -> R) -> R {
        let lock = self
            .cache
            .entry(key)
            .or_insert_with(|| Arc::new(ReentrantMutex::new(())))
            .clone();
        let _guard = lock.lock();
        f()
    }

    /// Number of distinct keys seen so far.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl<K: Eq + Hash + Clone> Default for LockRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn same_key_serializes_critical_sections() {
        let registry = Arc::new(LockRegistry::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let counter = Arc::clone(&counter);
                let max_seen = Arc::clone(&max_seen);
                thread::spawn(move || {
                    for _ in 0..100 {
                        registry.with_lock("shared".to_string(), || {
                            let inside = counter.fetch_add(1, Ordering::SeqCst) + 1;
                            max_seen.fetch_max(inside, Ordering::SeqCst);
                            counter.fetch_sub(1, Ordering::SeqCst);
                        });
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("worker panicked");
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn one_lock_per_distinct_key() {
        let registry = LockRegistry::new();
        registry.with_lock("a".to_string(), || {});
        registry.with_lock("b".to_string(), || {});
        registry.with_lock("a".to_string(), || {});
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn reentrant_acquisition_does_not_deadlock() {
        let registry = LockRegistry::new();
        let value = registry.with_lock("k".to_string(), || {
            registry.with_lock("k".to_string(), || 7)
        });
        assert_eq!(value, 7);
    }

    #[test]
    fn lock_released_after_panic_in_critical_section() {
        let registry = Arc::new(LockRegistry::new());
        let inner = Arc::clone(&registry);
        let result = thread::spawn(move || {
            inner.with_lock("k".to_string(), || panic!("boom"));
        })
        .join();
        assert!(result.is_err());

        // The key must be usable again by another thread.
        let value = registry.with_lock("k".to_string(), || 42);
        assert_eq!(value, 42);
    }

    #[test]
    fn returns_closure_result() {
        let registry = LockRegistry::new();
        assert_eq!(registry.with_lock(1u64, || "ok"), "ok");
    }
}
