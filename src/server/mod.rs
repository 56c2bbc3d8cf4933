// Server module entry point
// Status server lifecycle, request dispatch and the listeners it runs on

mod connection;
pub mod dispatch;
pub mod http;
pub mod listener;
mod status;

// Re-export commonly used types
pub use dispatch::{Reply, STATUS_OK, UNSUPPORTED_PATH_BODY};
pub use http::{HttpListener, HttpListenerConfig};
pub use listener::{create_status_listener, Listener, ListenerHandle, OnRequest};
pub use status::{StatusServer, StatusServerBuilder};
