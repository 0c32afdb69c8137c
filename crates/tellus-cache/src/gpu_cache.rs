//! A budgeted cache for renderer-owned resources.

use std::hash::Hash;
use std::time::{Duration, Instant};

use rustc_hash::FxHashSet;

use crate::{AbsentResourceList, MemoryCache};

const MAX_RETRIEVAL_TRIES: u32 = 3;
const RETRIEVAL_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// A [`MemoryCache`] for opaque resource handles the renderer creates,
/// textures and framebuffers typically, plus the bookkeeping needed when a
/// resource has to be retrieved or built before it can be cached.
///
/// The cache itself never creates, binds, or destroys resources. Callers
/// insert already-created handles with their byte sizes and must release
/// whatever [`put_resource`](GpuResourceCache::put_resource) and
/// [`set_capacity`](GpuResourceCache::set_capacity) return, since those
/// handles are no longer reachable through the cache.
///
/// Retrieval bookkeeping keeps one in-flight marker per key and an
/// [`AbsentResourceList`] so a source that keeps failing is left alone for a
/// cooldown instead of being refetched every frame.
pub struct GpuResourceCache<K, R> {
    entries: MemoryCache<K, R>,
    current_retrievals: FxHashSet<K>,
    absent_resources: AbsentResourceList<K>,
}

impl<K: Eq + Hash + Clone, R> GpuResourceCache<K, R> {
    /// Create a cache with the given byte budget and eviction target.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or `low_water >= capacity`.
    #[must_use]
    pub fn new(capacity: u64, low_water: u64) -> Self {
        Self {
            entries: MemoryCache::new(capacity, low_water),
            current_retrievals: FxHashSet::default(),
            absent_resources: AbsentResourceList::new(
                MAX_RETRIEVAL_TRIES,
                RETRIEVAL_CHECK_INTERVAL,
            ),
        }
    }

    /// Insert a created resource. Returns displaced handles the caller must
    /// release. See [`MemoryCache::put_entry`] for the eviction contract.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero or exceeds the cache capacity.
    pub fn put_resource(&mut self, key: K, resource: R, size: u64) -> Vec<(K, R)> {
        self.entries.put_entry(key, resource, size)
    }

    /// Look up a resource, refreshing its recency.
    pub fn resource_for_key(&mut self, key: &K) -> Option<&R> {
        self.entries.entry_for_key(key)
    }

    /// Whether a resource is cached under `key`.
    #[must_use]
    pub fn contains_resource(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove and return the resource under `key` so the caller can release
    /// it.
    pub fn remove_resource(&mut self, key: &K) -> Option<R> {
        self.entries.remove_entry(key)
    }

    /// Drop every cached handle and forget all retrieval bookkeeping.
    /// Callers release the underlying resources separately, typically by
    /// destroying the rendering context that owns them.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.current_retrievals.clear();
        self.absent_resources = AbsentResourceList::new(
            MAX_RETRIEVAL_TRIES,
            RETRIEVAL_CHECK_INTERVAL,
        );
    }

    /// Whether the resource under `key` should be retrieved now: it is not
    /// cached, not already being retrieved, and not in its failure cooldown.
    pub fn should_retrieve(&mut self, key: &K, now: Instant) -> bool {
        !self.entries.contains_key(key)
            && !self.current_retrievals.contains(key)
            && !self.absent_resources.is_resource_absent(key, now)
    }

    /// Record that a retrieval for `key` has started.
    pub fn retrieval_begun(&mut self, key: K) {
        self.current_retrievals.insert(key);
    }

    /// Whether a retrieval for `key` is in flight.
    #[must_use]
    pub fn retrieval_in_progress(&self, key: &K) -> bool {
        self.current_retrievals.contains(key)
    }

    /// Record that the retrieval for `key` succeeded. The caller inserts the
    /// resulting resource separately via
    /// [`put_resource`](GpuResourceCache::put_resource).
    pub fn retrieval_completed(&mut self, key: &K) {
        self.current_retrievals.remove(key);
        self.absent_resources.unmark_resource_absent(key);
    }

    /// Record that the retrieval for `key` failed at time `now`, starting or
    /// extending its cooldown.
    pub fn retrieval_failed(&mut self, key: &K, now: Instant) {
        self.current_retrievals.remove(key);
        self.absent_resources.mark_resource_absent(key.clone(), now);
    }

    /// Change the byte budget, returning trimmed handles the caller must
    /// release. See [`MemoryCache::set_capacity`].
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn set_capacity(&mut self, capacity: u64) -> Vec<(K, R)> {
        self.entries.set_capacity(capacity)
    }

    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.entries.capacity()
    }

    #[must_use]
    pub fn low_water(&self) -> u64 {
        self.entries.low_water()
    }

    #[must_use]
    pub fn used_capacity(&self) -> u64 {
        self.entries.used_capacity()
    }

    #[must_use]
    pub fn free_capacity(&self) -> u64 {
        self.entries.free_capacity()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
