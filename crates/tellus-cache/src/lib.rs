//! Budgeted caches for terrain geometry and renderer resources.
//!
//! [`MemoryCache`] is a size-budgeted map with least-recently-used eviction.
//! [`GpuResourceCache`] layers retrieval bookkeeping on top of it for
//! resources that must be fetched or created before they can be cached,
//! using an [`AbsentResourceList`] to back off from sources that keep
//! failing.

mod absent;
mod gpu_cache;
mod memory_cache;

pub use absent::AbsentResourceList;
pub use gpu_cache::GpuResourceCache;
pub use memory_cache::MemoryCache;
