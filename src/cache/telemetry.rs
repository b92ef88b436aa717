// Cache hit/miss telemetry.
// Per-operation counters and the metrics snapshot shown in diagnostics.

use std::collections::HashMap;

use serde::Serialize;

/// Default number of operations reported in `top_operations`.
pub const DEFAULT_TOP_N: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Counters {
    hits: u64,
    misses: u64,
}

/// Hit/miss counts per operation. Counts only grow until `reset`.
#[derive(Debug, Default)]
pub struct Telemetry {
    counters: HashMap<&'static str, Counters>,
}

/// Hit/miss counts for one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationCounts {
    pub operation: String,
    pub hits: u64,
    pub misses: u64,
}

/// Snapshot of cache effectiveness.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    /// `hits / (hits + misses)`, or 0.0 before any request.
    pub hit_rate: f64,
    /// Operations ranked by hits, most first.
    pub top_operations: Vec<OperationCounts>,
}

impl Telemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&mut self, operation: &'static str) {
        self.counters.entry(operation).or_default().hits += 1;
    }

    pub fn record_miss(&mut self, operation: &'static str) {
        self.counters.entry(operation).or_default().misses += 1;
    }

    /// Zero every counter.
    pub fn reset(&mut self) {
        self.counters.clear();
    }

    /// Totals plus the `top_n` operations by hit count (ties broken by name).
    pub fn snapshot(&self, top_n: usize) -> CacheMetrics {
        let hits: u64 = self.counters.values().map(|c| c.hits).sum();
        let misses: u64 = self.counters.values().map(|c| c.misses).sum();
        let total = hits + misses;
        let hit_rate = if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        };

        let mut ranked: Vec<OperationCounts> = self
            .counters
            .iter()
            .map(|(operation, c)| OperationCounts {
                operation: operation.to_string(),
                hits: c.hits,
                misses: c.misses,
            })
            .collect();
        ranked.sort_by(|a, b| b.hits.cmp(&a.hits).then_with(|| a.operation.cmp(&b.operation)));
        ranked.truncate(top_n);

        CacheMetrics {
            hits,
            misses,
            hit_rate,
            top_operations: ranked,
        }
    }
}
