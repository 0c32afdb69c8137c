//! A size-budgeted map with least-recently-used eviction.

use std::hash::Hash;

use rustc_hash::FxHashMap;

struct CacheEntry<V> {
    resource: V,
    size: u64,
    last_used: u64,
}

/// A keyed cache bounded by a byte budget.
///
/// Every entry carries an explicit size. When an insertion would push the
/// total above `capacity`, least-recently-used entries are evicted until the
/// total falls to `low_water` and the new entry fits. Evicted resources are
/// returned to the caller rather than dropped silently, so resources with
/// external lifetimes (GPU objects, file handles) can be released properly.
///
/// Reads through [`entry_for_key`](MemoryCache::entry_for_key) and
/// [`get_mut`](MemoryCache::get_mut) refresh an entry's recency;
/// [`peek`](MemoryCache::peek) does not. Recency is a monotonic counter,
/// not wall-clock time.
pub struct MemoryCache<K, V> {
    entries: FxHashMap<K, CacheEntry<V>>,
    capacity: u64,
    low_water: u64,
    used_capacity: u64,
    clock: u64,
}

impl<K: Eq + Hash + Clone, V> MemoryCache<K, V> {
    /// Create a cache with the given byte budget and eviction target.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or `low_water >= capacity`.
    #[must_use]
    pub fn new(capacity: u64, low_water: u64) -> Self {
        assert!(capacity > 0, "cache capacity must be positive");
        assert!(
            low_water < capacity,
            "low-water mark {low_water} must be below the capacity {capacity}"
        );

        Self {
            entries: FxHashMap::default(),
            capacity,
            low_water,
            used_capacity: 0,
            clock: 0,
        }
    }

    /// Insert `resource` under `key`, evicting as needed. Returns the
    /// displaced entries: the previous resource under this key, if any,
    /// followed by evicted entries in least-recently-used order.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero or exceeds the cache capacity.
    pub fn put_entry(&mut self, key: K, resource: V, size: u64) -> Vec<(K, V)> {
        self.put_entry_pinned(key, resource, size, |_| false)
    }

    /// Insert like [`put_entry`](MemoryCache::put_entry), but entries whose
    /// key satisfies `pinned` are exempt from eviction.
    ///
    /// When the pinned entries alone exceed the budget the insertion still
    /// succeeds and the cache runs over capacity; later insertions trim the
    /// excess once the pins lapse. [`free_capacity`](MemoryCache::free_capacity)
    /// reads zero while over budget.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero or exceeds the cache capacity.
    pub fn put_entry_pinned(
        &mut self,
        key: K,
        resource: V,
        size: u64,
        pinned: impl Fn(&K) -> bool,
    ) -> Vec<(K, V)> {
        assert!(size > 0, "cache entries must have a positive size");
        assert!(
            size <= self.capacity,
            "entry size {size} exceeds the cache capacity {}",
            self.capacity
        );

        let mut displaced = Vec::new();
        if let Some(previous) = self.entries.remove(&key) {
            self.used_capacity -= previous.size;
            displaced.push((key.clone(), previous.resource));
        }

        if self.used_capacity + size > self.capacity {
            self.evict(size, &pinned, &mut displaced);
        }

        self.used_capacity += size;
        self.clock += 1;
        self.entries.insert(
            key,
            CacheEntry {
                resource,
                size,
                last_used: self.clock,
            },
        );

        displaced
    }

    /// Look up `key`, refreshing its recency.
    pub fn entry_for_key(&mut self, key: &K) -> Option<&V> {
        self.clock += 1;
        let clock = self.clock;
        self.entries.get_mut(key).map(|entry| {
            entry.last_used = clock;
            &entry.resource
        })
    }

    /// Look up `key` for mutation, refreshing its recency.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.clock += 1;
        let clock = self.clock;
        self.entries.get_mut(key).map(|entry| {
            entry.last_used = clock;
            &mut entry.resource
        })
    }

    /// Look up `key` without touching its recency.
    #[must_use]
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.get(key).map(|entry| &entry.resource)
    }

    /// Whether an entry exists under `key`.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove and return the entry under `key`.
    pub fn remove_entry(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|entry| {
            self.used_capacity -= entry.size;
            entry.resource
        })
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.used_capacity = 0;
    }

    /// Change the byte budget. When the new capacity no longer exceeds the
    /// low-water mark, the mark is re-derived as 80% of the new capacity.
    /// The cache is then trimmed to the low-water mark; trimmed entries are
    /// returned in least-recently-used order.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn set_capacity(&mut self, capacity: u64) -> Vec<(K, V)> {
        assert!(capacity > 0, "cache capacity must be positive");

        self.capacity = capacity;
        if self.capacity <= self.low_water {
            self.low_water = capacity * 4 / 5;
        }

        let mut displaced = Vec::new();
        self.evict(0, &|_| false, &mut displaced);
        displaced
    }

    /// Change the eviction target. Values outside `[0, capacity)` are
    /// ignored.
    pub fn set_low_water(&mut self, low_water: u64) {
        if low_water < self.capacity {
            self.low_water = low_water;
        }
    }

    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    #[must_use]
    pub fn low_water(&self) -> u64 {
        self.low_water
    }

    #[must_use]
    pub fn used_capacity(&self) -> u64 {
        self.used_capacity
    }

    #[must_use]
    pub fn free_capacity(&self) -> u64 {
        self.capacity.saturating_sub(self.used_capacity)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evict least-recently-used entries until usage is at or below the
    /// low-water mark and `space_required` bytes are free. Pinned keys are
    /// skipped; with everything pinned this is a no-op.
    fn evict(&mut self, space_required: u64, pinned: &impl Fn(&K) -> bool, displaced: &mut Vec<(K, V)>) {
        if self.used_capacity <= self.low_water && self.free_capacity() >= space_required {
            return;
        }

        let mut by_age: Vec<(u64, K)> = self
            .entries
            .iter()
            .map(|(key, entry)| (entry.last_used, key.clone()))
            .collect();
        by_age.sort_unstable_by_key(|&(last_used, _)| last_used);

        for (_, key) in by_age {
            if self.used_capacity <= self.low_water && self.free_capacity() >= space_required {
                break;
            }
            if pinned(&key) {
                continue;
            }
            if let Some(entry) = self.entries.remove(&key) {
                self.used_capacity -= entry.size;
                displaced.push((key, entry.resource));
            }
        }
    }
}
