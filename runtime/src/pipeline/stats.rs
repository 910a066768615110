//! Run counters shared by the pipeline workers.

use crate::types::Category;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Lock-free counters for one run.
#[derive(Debug)]
pub struct RunStats {
    started: Instant,
    seen: AtomicU64,
    unique: AtomicU64,
    live: AtomicU64,
    delivered: AtomicU64,
    sink_failures: AtomicU64,
    categories: [AtomicU64; Category::COUNT],
}

/// Point-in-time copy of [`RunStats`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub elapsed_secs: f64,
    pub seen: u64,
    pub unique: u64,
    pub live: u64,
    pub delivered: u64,
    pub sink_failures: u64,
    /// Non-zero category counts, keyed by category name.
    pub categories: BTreeMap<String, u64>,
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStats {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            seen: AtomicU64::new(0),
            unique: AtomicU64::new(0),
            live: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            sink_failures: AtomicU64::new(0),
            categories: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    pub fn inc_seen(&self) {
        self.seen.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_unique(&self) {
        self.unique.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_live(&self) {
        self.live.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_sink_failure(&self) {
        self.sink_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_category(&self, category: Category) {
        self.categories[category.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn category_count(&self, category: Category) -> u64 {
        self.categories[category.index()].load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let categories = Category::ALL
            .iter()
            .filter_map(|&cat| {
                let n = self.category_count(cat);
                (n > 0).then(|| (cat.as_str().to_string(), n))
            })
            .collect();

        StatsSnapshot {
            elapsed_secs: self.started.elapsed().as_secs_f64(),
            seen: self.seen.load(Ordering::Relaxed),
            unique: self.unique.load(Ordering::Relaxed),
            live: self.live.load(Ordering::Relaxed),
            delivered: self.delivered(),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
            categories,
        }
    }
}
