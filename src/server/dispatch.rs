//! Request dispatch
//!
//! Maps one inbound request onto the endpoint registry. Protocol concerns
//! (sockets, parsing, writing) stay in the listener.

use hyper::Method;

use crate::logger;
use crate::registry::EndpointRegistry;

/// Body returned for any path without a registered handler.
pub const UNSUPPORTED_PATH_BODY: &str = "Unsupported http path.\n";

/// Status used for every answered request, matched or not.
pub const STATUS_OK: u16 = 200;

/// A response the listener should send verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    pub const fn ok(body: String) -> Self {
        Self {
            status: STATUS_OK,
            body,
        }
    }
}

/// Dispatch a request to its handler.
///
/// Returns `None` when the request must be dropped without any response:
/// a method other than GET, or a request carrying a body. Otherwise the
/// handler runs on the calling thread and its output becomes the body.
pub fn handle_request(
    registry: &EndpointRegistry,
    method: &Method,
    path: &str,
    has_body: bool,
) -> Option<Reply> {
    if *method != Method::GET {
        logger::log_debug(&format!("Rejected {method} {path}: only GET is served"));
        return None;
    }
    if has_body {
        logger::log_debug(&format!("Rejected GET {path}: request carries a body"));
        return None;
    }

    Some(Reply::ok(page_content(registry, path)))
}

/// Text for `path`, or [`UNSUPPORTED_PATH_BODY`] when nothing is registered
pub fn page_content(registry: &EndpointRegistry, path: &str) -> String {
    match registry.invoke(path) {
        Some(body) => body,
        None => UNSUPPORTED_PATH_BODY.to_string(),
    }
}
