//! Embeddable HTTP status endpoint
//!
//! Serves diagnostic text (build info, statistics, subsystem reports) to
//! monitoring tools over plain `GET` requests. A host registers path
//! handlers, starts one [`StatusServer`] at startup, and keeps it for the
//! life of the process.
//!
//! - `/stats.txt` is always served: the statistics dump, followed by the
//!   output of `/rocksdb_info.txt` (and any other supplement path) when
//!   registered.
//! - Unknown paths answer `200` with `"Unsupported http path.\n"`.
//! - Anything but a bodiless `GET` is dropped without a response.

pub mod config;
pub mod error;
pub mod logger;
pub mod registry;
pub mod server;
pub mod signal;
pub mod stats;

pub use crate::config::Config;
pub use error::{Result, StatusServerError};
pub use hyper::Method;
pub use registry::{EndpointHandler, EndpointMap, EndpointRegistry, ROCKSDB_INFO_PATH, STATS_PATH};
pub use server::{
    HttpListener, HttpListenerConfig, Listener, ListenerHandle, OnRequest, Reply, StatusServer,
    StatusServerBuilder, UNSUPPORTED_PATH_BODY,
};
pub use stats::{Stats, StatsProvider};
