//! Backoff tracking for resources that repeatedly fail to load.

use std::hash::Hash;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

struct AbsentEntry {
    last_mark: Instant,
    tries: u32,
    permanent: bool,
}

/// Tracks resources that could not be retrieved, so callers stop asking for
/// them for a while instead of hammering a failing source.
///
/// A resource is reported absent while any of these hold: it was marked
/// permanently absent, it has failed more than the allowed number of tries,
/// or it was marked more recently than the minimum check interval. Entries
/// that have not been marked for longer than the try-again interval are
/// forgiven and dropped, giving the resource a fresh start.
///
/// Time is always passed in by the caller; the list never reads a clock of
/// its own.
pub struct AbsentResourceList<K> {
    max_tries: u32,
    min_check_interval: Duration,
    try_again_interval: Duration,
    possibly_absent: FxHashMap<K, AbsentEntry>,
}

impl<K: Eq + Hash> AbsentResourceList<K> {
    /// Default cooldown after which an absent resource is retried.
    pub const DEFAULT_TRY_AGAIN_INTERVAL: Duration = Duration::from_secs(60);

    /// Create a list allowing `max_tries` failures per resource, with marks
    /// younger than `min_check_interval` treated as still cooling down.
    #[must_use]
    pub fn new(max_tries: u32, min_check_interval: Duration) -> Self {
        Self {
            max_tries,
            min_check_interval,
            try_again_interval: Self::DEFAULT_TRY_AGAIN_INTERVAL,
            possibly_absent: FxHashMap::default(),
        }
    }

    /// Whether the resource is currently considered absent at time `now`.
    /// Expired entries are forgiven as a side effect.
    pub fn is_resource_absent(&mut self, key: &K, now: Instant) -> bool {
        let Some(entry) = self.possibly_absent.get(key) else {
            return false;
        };

        if entry.permanent {
            return true;
        }

        let since_last_mark = now.duration_since(entry.last_mark);
        if since_last_mark > self.try_again_interval {
            self.possibly_absent.remove(key);
            return false;
        }

        since_last_mark < self.min_check_interval || entry.tries > self.max_tries
    }

    /// Record a failed attempt for `key` at time `now`.
    pub fn mark_resource_absent(&mut self, key: K, now: Instant) {
        let entry = self.possibly_absent.entry(key).or_insert(AbsentEntry {
            last_mark: now,
            tries: 0,
            permanent: false,
        });
        entry.tries += 1;
        entry.last_mark = now;
    }

    /// Mark `key` absent until explicitly unmarked, with no forgiveness.
    pub fn mark_resource_absent_permanently(&mut self, key: K, now: Instant) {
        let entry = self.possibly_absent.entry(key).or_insert(AbsentEntry {
            last_mark: now,
            tries: 0,
            permanent: false,
        });
        entry.tries += 1;
        entry.last_mark = now;
        entry.permanent = true;
    }

    /// Forget everything known about `key`, typically after a successful
    /// retrieval.
    pub fn unmark_resource_absent(&mut self, key: &K) {
        self.possibly_absent.remove(key);
    }

    /// Number of resources currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.possibly_absent.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.possibly_absent.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_list() -> AbsentResourceList<&'static str> {
        AbsentResourceList::new(3, Duration::from_secs(10))
    }

    #[test]
    fn test_unknown_resources_are_not_absent() {
        let mut list = make_list();
        assert!(!list.is_resource_absent(&"tile", Instant::now()));
    }

    #[test]
    fn test_fresh_mark_is_absent_within_check_interval() {
        let mut list = make_list();
        let t0 = Instant::now();
        list.mark_resource_absent("tile", t0);
        assert!(list.is_resource_absent(&"tile", t0 + Duration::from_secs(5)));
        // Past the check interval with tries remaining, retry is allowed
        assert!(!list.is_resource_absent(&"tile", t0 + Duration::from_secs(15)));
    }

    #[test]
    fn test_exhausted_tries_stay_absent_until_forgiven() {
        let mut list = make_list();
        let t0 = Instant::now();
        for i in 0..4 {
            list.mark_resource_absent("tile", t0 + Duration::from_secs(i));
        }
        // Four failures exceed three tries; absent even past the check interval
        let later = t0 + Duration::from_secs(30);
        assert!(list.is_resource_absent(&"tile", later));
    }

    #[test]
    fn test_entries_are_forgiven_after_try_again_interval() {
        let mut list = make_list();
        let t0 = Instant::now();
        for i in 0..4 {
            list.mark_resource_absent("tile", t0 + Duration::from_secs(i));
        }
        let much_later = t0 + Duration::from_secs(120);
        assert!(!list.is_resource_absent(&"tile", much_later));
        assert!(list.is_empty());
    }

    #[test]
    fn test_permanent_marks_are_never_forgiven() {
        let mut list = make_list();
        let t0 = Instant::now();
        list.mark_resource_absent_permanently("gone", t0);
        assert!(list.is_resource_absent(&"gone", t0 + Duration::from_secs(3600)));
        list.unmark_resource_absent(&"gone");
        assert!(!list.is_resource_absent(&"gone", t0 + Duration::from_secs(3600)));
    }

    #[test]
    fn test_unmark_clears_failure_history() {
        let mut list = make_list();
        let t0 = Instant::now();
        for i in 0..4 {
            list.mark_resource_absent("tile", t0 + Duration::from_secs(i));
        }
        list.unmark_resource_absent(&"tile");
        assert!(!list.is_resource_absent(&"tile", t0 + Duration::from_secs(4)));
    }
}
