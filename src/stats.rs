//! Statistics collaborator
//!
//! The status server only needs a text dump of process statistics. Anything
//! implementing [`StatsProvider`] can back `/stats.txt`; [`Stats`] is a small
//! thread-safe counter/gauge registry for hosts that have nothing better.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// Source of the generic statistics dump served at `/stats.txt`.
///
/// Called from listener threads, possibly concurrently, on every request.
pub trait StatsProvider: Send + Sync {
    fn dump_stats_as_text(&self) -> String;
}

impl<F> StatsProvider for F
where
    F: Fn() -> String + Send + Sync,
{
    fn dump_stats_as_text(&self) -> String {
        self()
    }
}

/// In-process counters and gauges.
pub struct Stats {
    started: Instant,
    counters: RwLock<BTreeMap<String, Arc<AtomicU64>>>,
    gauges: RwLock<BTreeMap<String, Arc<AtomicI64>>>,
}

impl Stats {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            counters: RwLock::new(BTreeMap::new()),
            gauges: RwLock::new(BTreeMap::new()),
        }
    }

    /// Add `by` to the named counter, creating it at zero first if needed
    pub fn incr(&self, name: &str, by: u64) {
        get_or_insert(&self.counters, name).fetch_add(by, Ordering::Relaxed);
    }

    pub fn set_gauge(&self, name: &str, value: i64) {
        get_or_insert(&self.gauges, name).store(value, Ordering::Relaxed);
    }

    pub fn counter(&self, name: &str) -> Option<u64> {
        read_value(&self.counters, name).map(|c| c.load(Ordering::Relaxed))
    }

    pub fn gauge(&self, name: &str) -> Option<i64> {
        read_value(&self.gauges, name).map(|g| g.load(Ordering::Relaxed))
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsProvider for Stats {
    fn dump_stats_as_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "uptime_secs: {}", self.started.elapsed().as_secs());

        if let Ok(counters) = self.counters.read() {
            out.push_str("Counters:\n");
            for (name, value) in counters.iter() {
                let _ = writeln!(out, "  {name}: {}", value.load(Ordering::Relaxed));
            }
        }
        if let Ok(gauges) = self.gauges.read() {
            out.push_str("Gauges:\n");
            for (name, value) in gauges.iter() {
                let _ = writeln!(out, "  {name}: {}", value.load(Ordering::Relaxed));
            }
        }
        out
    }
}

fn read_value<T>(map: &RwLock<BTreeMap<String, Arc<T>>>, name: &str) -> Option<Arc<T>> {
    map.read().ok()?.get(name).cloned()
}

fn get_or_insert<T: Default>(map: &RwLock<BTreeMap<String, Arc<T>>>, name: &str) -> Arc<T> {
    if let Some(value) = read_value(map, name) {
        return value;
    }
    let mut guard = map
        .write()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    Arc::clone(guard.entry(name.to_string()).or_default())
}
