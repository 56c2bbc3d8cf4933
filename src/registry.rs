//! Endpoint registry
//!
//! Exact-match mapping from request path to a text-producing handler.
//!
//! ```text
//! EndpointMap (caller, mutable) ──freeze──> EndpointRegistry (shared, read-only)
//!                                             + injected /stats.txt
//! ```
//!
//! The injected `/stats.txt` handler keeps a weak reference back to the
//! registry it lives in and looks up its supplement paths each time it runs.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use crate::logger;
use crate::stats::StatsProvider;

/// Handler producing the full response body for one path.
pub type EndpointHandler = Arc<dyn Fn() -> String + Send + Sync>;

/// Built-in statistics page, always present.
pub const STATS_PATH: &str = "/stats.txt";

/// Default secondary report appended to the statistics page when registered.
pub const ROCKSDB_INFO_PATH: &str = "/rocksdb_info.txt";

/// Caller-side endpoint table, filled before the server is constructed.
#[derive(Clone, Default)]
pub struct EndpointMap {
    handlers: HashMap<String, EndpointHandler>,
}

impl EndpointMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate `handler` with `path`, replacing any previous handler.
    ///
    /// Returns `true` if a handler was replaced.
    pub fn register<F>(&mut self, path: impl Into<String>, handler: F) -> bool
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.register_handler(path, Arc::new(handler))
    }

    pub fn register_handler(&mut self, path: impl Into<String>, handler: EndpointHandler) -> bool {
        self.handlers.insert(path.into(), handler).is_some()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.handlers.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for EndpointMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(sorted_paths(&self.handlers)).finish()
    }
}

/// Frozen endpoint table shared by all request threads.
pub struct EndpointRegistry {
    table: HashMap<String, EndpointHandler>,
}

impl EndpointRegistry {
    /// Freeze `endpoints` and install the `/stats.txt` composition handler.
    ///
    /// The stats page is `stats.dump_stats_as_text()` followed by the output
    /// of each registered `supplement_paths` handler, in the given order.
    /// A caller-supplied `/stats.txt` is replaced.
    pub fn new(
        endpoints: EndpointMap,
        stats: Arc<dyn StatsProvider>,
        supplement_paths: &[String],
    ) -> Arc<Self> {
        let mut supplements: Vec<String> = Vec::with_capacity(supplement_paths.len());
        for path in supplement_paths {
            if path != STATS_PATH && !supplements.contains(path) {
                supplements.push(path.clone());
            }
        }

        Arc::new_cyclic(|registry| {
            let mut table = endpoints.handlers;
            let handler = stats_handler(registry.clone(), stats, supplements);
            if table.insert(STATS_PATH.to_string(), handler).is_some() {
                logger::log_warning(&format!(
                    "Caller-supplied {STATS_PATH} handler replaced by the built-in stats page"
                ));
            }
            Self { table }
        })
    }

    /// Registry with the default `/rocksdb_info.txt` supplement.
    pub fn with_default_supplements(
        endpoints: EndpointMap,
        stats: Arc<dyn StatsProvider>,
    ) -> Arc<Self> {
        Self::new(endpoints, stats, &[ROCKSDB_INFO_PATH.to_string()])
    }

    pub fn lookup(&self, path: &str) -> Option<&EndpointHandler> {
        self.table.get(path)
    }

    /// Run the handler for `path`, if any
    pub fn invoke(&self, path: &str) -> Option<String> {
        self.lookup(path).map(|handler| handler())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.table.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Registered paths, sorted
    pub fn paths(&self) -> Vec<&str> {
        sorted_paths(&self.table)
    }
}

impl fmt::Debug for EndpointRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointRegistry")
            .field("paths", &self.paths())
            .finish()
    }
}

fn stats_handler(
    registry: Weak<EndpointRegistry>,
    stats: Arc<dyn StatsProvider>,
    supplements: Vec<String>,
) -> EndpointHandler {
    Arc::new(move || {
        let mut text = stats.dump_stats_as_text();
        if let Some(registry) = registry.upgrade() {
            for path in &supplements {
                if let Some(section) = registry.invoke(path) {
                    text.push_str(&section);
                }
            }
        }
        text
    })
}

fn sorted_paths(table: &HashMap<String, EndpointHandler>) -> Vec<&str> {
    let mut paths: Vec<&str> = table.keys().map(String::as_str).collect();
    paths.sort_unstable();
    paths
}
