//! HTTP listener
//!
//! Default [`Listener`]: hyper over a dedicated tokio runtime.
//!
//! ```text
//! caller thread: bind (socket2) ──> build runtime ──> spawn "status-server"
//! status-server: accept loop ──> one task per connection (workers)
//! stop:          notify ──> close socket ──> drain ──> drop runtime ──> join
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::Notify;

use super::connection::{accept_connection, ConnectionContext};
use super::listener::{create_status_listener, Listener, ListenerHandle, OnRequest};
use crate::config::Config;
use crate::error::{Result, StatusServerError};
use crate::logger;

/// Tuning for [`HttpListener`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpListenerConfig {
    pub host: IpAddr,
    /// Tokio worker threads serving connections
    pub workers: usize,
    pub keep_alive: bool,
    pub connection_timeout: Duration,
    /// Grace period for in-flight requests on stop
    pub drain_timeout: Duration,
    /// Access log format, `None` to disable access logging
    pub access_log_format: Option<String>,
}

impl Default for HttpListenerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            workers: 1,
            keep_alive: true,
            connection_timeout: Duration::from_secs(30),
            drain_timeout: Duration::from_millis(100),
            access_log_format: None,
        }
    }
}

impl HttpListenerConfig {
    pub fn from_config(config: &Config) -> Result<Self> {
        let host = config.get_socket_addr()?.ip();
        Ok(Self {
            host,
            workers: config.server.workers.unwrap_or(1).max(1),
            keep_alive: config.performance.keep_alive,
            connection_timeout: Duration::from_secs(config.performance.connection_timeout),
            drain_timeout: Duration::from_millis(config.performance.drain_timeout_ms),
            access_log_format: config
                .logging
                .access_log
                .then(|| config.logging.access_log_format.clone()),
        })
    }
}

/// Plain HTTP/1.1 listener backed by hyper.
#[derive(Debug, Clone, Default)]
pub struct HttpListener {
    config: HttpListenerConfig,
}

impl HttpListener {
    pub const fn new(config: HttpListenerConfig) -> Self {
        Self { config }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(HttpListenerConfig::from_config(config)?))
    }

    pub const fn config(&self) -> &HttpListenerConfig {
        &self.config
    }
}

impl Listener for HttpListener {
    fn start(&self, port: u16, on_request: OnRequest) -> Result<Box<dyn ListenerHandle>> {
        let addr = SocketAddr::new(self.config.host, port);
        let bind_err = |source: std::io::Error| StatusServerError::Bind { addr, source };

        let std_listener = create_status_listener(addr).map_err(bind_err)?;
        let local_addr = std_listener.local_addr().map_err(bind_err)?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.workers)
            .thread_name("status-server-worker")
            .enable_all()
            .build()
            .map_err(StatusServerError::Runtime)?;

        let listener = {
            let _guard = runtime.enter();
            TcpListener::from_std(std_listener).map_err(bind_err)?
        };

        let ctx = Arc::new(ConnectionContext {
            on_request,
            keep_alive: self.config.keep_alive,
            connection_timeout: self.config.connection_timeout,
            access_log_format: self.config.access_log_format.clone(),
            active_connections: AtomicUsize::new(0),
        });
        let shutdown = Arc::new(Notify::new());
        let loop_shutdown = Arc::clone(&shutdown);
        let drain_timeout = self.config.drain_timeout;

        let thread = thread::Builder::new()
            .name("status-server".to_string())
            .spawn(move || {
                runtime.block_on(accept_loop(listener, ctx, loop_shutdown, drain_timeout));
                // Dropping the runtime here closes connections that outlived the drain.
            })
            .map_err(StatusServerError::Spawn)?;

        Ok(Box::new(HttpListenerHandle {
            local_addr,
            shutdown,
            thread: Some(thread),
        }))
    }
}

async fn accept_loop(
    listener: TcpListener,
    ctx: Arc<ConnectionContext>,
    shutdown: Arc<Notify>,
    drain_timeout: Duration,
) {
    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => accept_connection(stream, peer_addr, &ctx),
                    Err(e) => logger::log_error(&format!("Failed to accept status connection: {e}")),
                }
            }

            () = shutdown.notified() => break,
        }
    }

    drop(listener);
    drain_connections(&ctx.active_connections, drain_timeout).await;
}

/// Wait until no connection is active or `timeout` elapses
async fn drain_connections(active: &AtomicUsize, timeout: Duration) {
    let deadline = tokio::time::Instant::now() + timeout;
    while active.load(Ordering::SeqCst) > 0 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let remaining = active.load(Ordering::SeqCst);
    if remaining > 0 {
        logger::log_warning(&format!(
            "Closing {remaining} status connection(s) still open after {}ms",
            timeout.as_millis()
        ));
    }
}

struct HttpListenerHandle {
    local_addr: SocketAddr,
    shutdown: Arc<Notify>,
    thread: Option<JoinHandle<()>>,
}

impl HttpListenerHandle {
    fn shutdown_and_join(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        // notify_one keeps a permit if the loop is not parked in select! yet
        self.shutdown.notify_one();
        if thread.join().is_err() {
            logger::log_error("Status listener thread panicked");
        }
    }
}

impl ListenerHandle for HttpListenerHandle {
    fn local_addr(&self) -> Option<SocketAddr> {
        Some(self.local_addr)
    }

    fn stop(mut self: Box<Self>) {
        self.shutdown_and_join();
    }
}

impl Drop for HttpListenerHandle {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::dispatch::Reply;
    use std::io::{Read, Write};
    use std::net::TcpStream;

    fn loopback() -> HttpListener {
        HttpListener::new(HttpListenerConfig {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            ..HttpListenerConfig::default()
        })
    }

    fn echo_path() -> OnRequest {
        Arc::new(|_method: &hyper::Method, path: &str, _has_body: bool| {
            Some(Reply::ok(format!("path={path}")))
        })
    }

    #[test]
    fn test_config_from_defaults() {
        let cfg = HttpListenerConfig::from_config(&Config::default()).unwrap();
        assert_eq!(cfg, HttpListenerConfig::default());
    }

    #[test]
    fn test_config_access_log_enabled() {
        let mut config = Config::default();
        config.logging.access_log = true;
        config.logging.access_log_format = "common".to_string();
        config.server.workers = Some(0);

        let cfg = HttpListenerConfig::from_config(&config).unwrap();
        assert_eq!(cfg.access_log_format.as_deref(), Some("common"));
        assert_eq!(cfg.workers, 1);
    }

    #[test]
    fn test_start_serve_stop() {
        let handle = loopback().start(0, echo_path()).unwrap();
        let addr = handle.local_addr().unwrap();

        let mut stream = TcpStream::connect(addr).unwrap();
        stream
            .write_all(b"GET /x.txt?ignored=1 HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();

        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.ends_with("\r\n\r\npath=/x.txt"));

        handle.stop();
        assert!(TcpStream::connect(addr).is_err());
    }

    #[test]
    fn test_port_in_use() {
        let first = loopback().start(0, echo_path()).unwrap();
        let port = first.local_addr().unwrap().port();

        let err = loopback().start(port, echo_path()).err().unwrap();
        assert!(matches!(err, StatusServerError::Bind { .. }));
        first.stop();
    }
}
