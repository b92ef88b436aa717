// Cache module for memoizing GitHub API reads in memory.
// Provides TTL entries, cache-bust keys, invalidation, and hit/miss telemetry.

pub mod key;
pub mod store;
pub mod telemetry;

pub use key::{CacheKey, KeyArgs};
pub use store::{CacheStats, CacheStore, CachedOperation};
pub use telemetry::{CacheMetrics, DEFAULT_TOP_N, OperationCounts};
