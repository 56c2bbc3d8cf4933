//! Status server lifecycle
//!
//! [`StatusServer`] owns the frozen endpoint registry and, while serving,
//! the running listener. It is meant to be created once by the host's
//! top-level code and kept for the life of the process.

use std::net::SocketAddr;
use std::sync::Arc;

use hyper::Method;

use super::dispatch::{self, Reply};
use super::http::HttpListener;
use super::listener::{Listener, ListenerHandle, OnRequest};
use crate::config::{Config, DEFAULT_STATUS_PORT};
use crate::error::Result;
use crate::logger;
use crate::registry::{EndpointMap, EndpointRegistry, ROCKSDB_INFO_PATH};
use crate::stats::StatsProvider;

/// Embeddable HTTP status endpoint.
///
/// ```no_run
/// use std::sync::Arc;
/// use status_server::{StatusServer, Stats};
///
/// let stats = Arc::new(Stats::new());
/// let mut server = StatusServer::builder(stats)
///     .port(9999)
///     .endpoint("/build_info.txt", || "v1.0.0\n".to_string())
///     .start();
///
/// if !server.is_serving() {
///     // the host keeps running without its status page
/// }
/// server.stop();
/// ```
pub struct StatusServer {
    port: u16,
    registry: Arc<EndpointRegistry>,
    listener: Box<dyn Listener>,
    handle: Option<Box<dyn ListenerHandle>>,
}

impl StatusServer {
    pub fn builder(stats: Arc<dyn StatsProvider>) -> StatusServerBuilder {
        StatusServerBuilder::new(stats)
    }

    /// Builder with port and HTTP listener taken from `config`
    pub fn builder_from_config(
        config: &Config,
        stats: Arc<dyn StatsProvider>,
    ) -> Result<StatusServerBuilder> {
        Ok(StatusServerBuilder::new(stats)
            .port(config.server.port)
            .listener(HttpListener::from_config(config)?))
    }

    /// Start listening. Returns whether the server is serving afterwards.
    ///
    /// Failures are logged, never raised; already serving is a no-op.
    pub fn serve(&mut self) -> bool {
        if self.handle.is_some() {
            return true;
        }

        logger::log_server_starting(self.port);
        match self.try_serve() {
            Ok(()) => true,
            Err(e) => {
                logger::log_start_failed(self.port, &e);
                false
            }
        }
    }

    /// Start listening, returning the failure instead of logging it.
    pub fn try_serve(&mut self) -> Result<()> {
        if self.handle.is_some() {
            return Ok(());
        }

        let registry = Arc::clone(&self.registry);
        let on_request: OnRequest =
            Arc::new(move |method: &Method, path: &str, has_body: bool| {
                dispatch::handle_request(&registry, method, path, has_body)
            });

        let handle = self.listener.start(self.port, on_request)?;
        if let Some(addr) = handle.local_addr() {
            logger::log_server_listening(&addr);
        }
        self.handle = Some(handle);
        Ok(())
    }

    /// True iff a listener is running
    pub const fn is_serving(&self) -> bool {
        self.handle.is_some()
    }

    /// Stop the listener if one is running. Calling it again is a no-op.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.stop();
            logger::log_server_stopped(self.port);
        }
    }

    /// Dispatch one request as the listener would.
    pub fn handle_request(&self, method: &Method, path: &str, has_body: bool) -> Option<Reply> {
        dispatch::handle_request(&self.registry, method, path, has_body)
    }

    /// Page text for `path`, including the unsupported-path fallback
    pub fn page_content(&self, path: &str) -> String {
        dispatch::page_content(&self.registry, path)
    }

    /// Configured port
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Bound address while serving; differs from `port` when it was 0
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.handle.as_ref().and_then(|h| h.local_addr())
    }

    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }
}

impl Drop for StatusServer {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for StatusServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusServer")
            .field("port", &self.port)
            .field("serving", &self.is_serving())
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// Collects endpoints and options; the registry is frozen when the server is built.
pub struct StatusServerBuilder {
    port: u16,
    endpoints: EndpointMap,
    stats: Arc<dyn StatsProvider>,
    supplement_paths: Vec<String>,
    listener: Option<Box<dyn Listener>>,
}

impl StatusServerBuilder {
    pub fn new(stats: Arc<dyn StatsProvider>) -> Self {
        Self {
            port: DEFAULT_STATUS_PORT,
            endpoints: EndpointMap::new(),
            stats,
            supplement_paths: vec![ROCKSDB_INFO_PATH.to_string()],
            listener: None,
        }
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Replace all endpoints registered so far
    #[must_use]
    pub fn endpoints(mut self, endpoints: EndpointMap) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Register one endpoint; a later registration for the same path wins
    #[must_use]
    pub fn endpoint<F>(mut self, path: impl Into<String>, handler: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.endpoints.register(path, handler);
        self
    }

    /// Append another report to `/stats.txt` when `path` is registered
    #[must_use]
    pub fn supplement_path(mut self, path: impl Into<String>) -> Self {
        self.supplement_paths.push(path.into());
        self
    }

    /// Use a listener other than the default [`HttpListener`]
    #[must_use]
    pub fn listener(mut self, listener: impl Listener + 'static) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    /// Construct the server without serving
    pub fn build(self) -> StatusServer {
        let registry = EndpointRegistry::new(self.endpoints, self.stats, &self.supplement_paths);
        StatusServer {
            port: self.port,
            registry,
            listener: self
                .listener
                .unwrap_or_else(|| Box::new(HttpListener::default())),
            handle: None,
        }
    }

    /// Construct and serve. A start failure is logged and leaves the server
    /// non-serving; check [`StatusServer::is_serving`].
    pub fn start(self) -> StatusServer {
        let mut server = self.build();
        server.serve();
        server
    }

    pub fn try_start(self) -> Result<StatusServer> {
        let mut server = self.build();
        logger::log_server_starting(server.port);
        server.try_serve()?;
        Ok(server)
    }

    /// Construct and serve, terminating the process if the endpoint cannot start.
    pub fn start_or_die(self) -> StatusServer {
        let server = self.start();
        if !server.is_serving() {
            logger::log_error(&format!(
                "Status server is required but could not start at {}; exiting",
                server.port
            ));
            std::process::exit(1);
        }
        server
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StatusServerError;
    use crate::registry::STATS_PATH;
    use crate::server::dispatch::UNSUPPORTED_PATH_BODY;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory listener: records the callback so tests can fire requests at it.
    #[derive(Clone, Default)]
    struct FakeListener {
        fail: bool,
        starts: Arc<AtomicUsize>,
        stops: Arc<AtomicUsize>,
        on_request: Arc<Mutex<Option<OnRequest>>>,
    }

    impl FakeListener {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn request(&self, method: &Method, path: &str) -> Option<Reply> {
            let cb = self.on_request.lock().unwrap().clone()?;
            cb(method, path, false)
        }
    }

    struct FakeHandle {
        stops: Arc<AtomicUsize>,
    }

    impl ListenerHandle for FakeHandle {
        fn local_addr(&self) -> Option<SocketAddr> {
            None
        }

        fn stop(self: Box<Self>) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl Listener for FakeListener {
        fn start(&self, port: u16, on_request: OnRequest) -> Result<Box<dyn ListenerHandle>> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(StatusServerError::Bind {
                    addr: SocketAddr::from(([127, 0, 0, 1], port)),
                    source: std::io::ErrorKind::AddrInUse.into(),
                });
            }
            *self.on_request.lock().unwrap() = Some(on_request);
            Ok(Box::new(FakeHandle {
                stops: Arc::clone(&self.stops),
            }))
        }
    }

    fn stats(text: &'static str) -> Arc<dyn StatsProvider> {
        Arc::new(move || text.to_string())
    }

    #[test]
    fn test_start_routes_through_listener() {
        let fake = FakeListener::default();
        let server = StatusServer::builder(stats("S"))
            .endpoint("/build_info.txt", || "B".to_string())
            .listener(fake.clone())
            .start();

        assert!(server.is_serving());
        assert_eq!(
            fake.request(&Method::GET, "/build_info.txt"),
            Some(Reply::ok("B".to_string()))
        );
        assert_eq!(
            fake.request(&Method::GET, "/missing"),
            Some(Reply::ok(UNSUPPORTED_PATH_BODY.to_string()))
        );
        assert_eq!(fake.request(&Method::POST, "/build_info.txt"), None);
    }

    #[test]
    fn test_stats_composition_through_server() {
        let server = StatusServer::builder(stats("S"))
            .endpoint(ROCKSDB_INFO_PATH, || "R".to_string())
            .listener(FakeListener::default())
            .build();
        assert_eq!(server.page_content(STATS_PATH), "SR");

        let server = StatusServer::builder(stats("S"))
            .listener(FakeListener::default())
            .build();
        assert_eq!(server.page_content(STATS_PATH), "S");
    }

    #[test]
    fn test_custom_supplement_path() {
        let server = StatusServer::builder(stats("S"))
            .endpoint("/cache_info.txt", || "C".to_string())
            .endpoint(ROCKSDB_INFO_PATH, || "R".to_string())
            .supplement_path("/cache_info.txt")
            .listener(FakeListener::default())
            .build();
        assert_eq!(server.page_content(STATS_PATH), "SRC");
    }

    #[test]
    fn test_reregistration_last_wins() {
        let server = StatusServer::builder(stats("S"))
            .endpoint("/x.txt", || "first".to_string())
            .endpoint("/x.txt", || "second".to_string())
            .listener(FakeListener::default())
            .build();
        assert_eq!(server.page_content("/x.txt"), "second");
    }

    #[test]
    fn test_build_does_not_serve() {
        let fake = FakeListener::default();
        let server = StatusServer::builder(stats("S"))
            .listener(fake.clone())
            .build();
        assert!(!server.is_serving());
        assert_eq!(fake.starts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_failed_start_is_not_serving() {
        let server = StatusServer::builder(stats("S"))
            .listener(FakeListener::failing())
            .start();
        assert!(!server.is_serving());
        assert!(server.local_addr().is_none());
        // Dispatch still works without a listener.
        assert_eq!(server.page_content(STATS_PATH), "S");
    }

    #[test]
    fn test_try_start_reports_error() {
        let err = StatusServer::builder(stats("S"))
            .listener(FakeListener::failing())
            .try_start()
            .unwrap_err();
        assert!(matches!(err, StatusServerError::Bind { .. }));
    }

    #[test]
    fn test_serve_twice_starts_once() {
        let fake = FakeListener::default();
        let mut server = StatusServer::builder(stats("S"))
            .listener(fake.clone())
            .start();
        assert!(server.serve());
        assert_eq!(fake.starts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let fake = FakeListener::default();
        let mut server = StatusServer::builder(stats("S"))
            .listener(fake.clone())
            .start();

        server.stop();
        assert!(!server.is_serving());
        server.stop();
        assert!(!server.is_serving());
        assert_eq!(fake.stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_restart_after_stop() {
        let fake = FakeListener::default();
        let mut server = StatusServer::builder(stats("S"))
            .listener(fake.clone())
            .start();
        server.stop();
        assert!(server.serve());
        assert!(server.is_serving());
        assert_eq!(fake.starts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_drop_stops_listener() {
        let fake = FakeListener::default();
        {
            let _server = StatusServer::builder(stats("S"))
                .listener(fake.clone())
                .start();
        }
        assert_eq!(fake.stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_builder_from_config() {
        let mut config = Config::default();
        config.server.port = 0;
        config.server.host = "127.0.0.1".to_string();

        let server = StatusServer::builder_from_config(&config, stats("S"))
            .unwrap()
            .build();
        assert_eq!(server.port(), 0);
        assert!(server.registry().contains(STATS_PATH));
    }
}
