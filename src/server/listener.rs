// Listener capability module
// The network side of the status server, injected so dispatch can be driven without sockets

use std::net::SocketAddr;
use std::sync::Arc;

use hyper::Method;
use socket2::{Domain, Protocol, Socket, Type};

use super::dispatch::Reply;
use crate::error::Result;

/// Per-request callback: `(method, path, has_body)`.
///
/// `None` means the listener must close the connection without responding.
pub type OnRequest = Arc<dyn Fn(&Method, &str, bool) -> Option<Reply> + Send + Sync>;

/// Something that can accept requests on a port and hand them to a callback.
///
/// `start` must not block the caller beyond binding: the accept loop runs
/// on the listener's own threads.
pub trait Listener: Send + Sync {
    fn start(&self, port: u16, on_request: OnRequest) -> Result<Box<dyn ListenerHandle>>;
}

/// A running listener.
pub trait ListenerHandle: Send {
    /// Actual bound address, if the listener has one
    fn local_addr(&self) -> Option<SocketAddr>;

    /// Stop accepting and release the listening socket.
    ///
    /// Returns once in-flight requests have finished or been closed.
    fn stop(self: Box<Self>);
}

/// Create a non-blocking `std::net::TcpListener` for the status port.
///
/// Only `SO_REUSEADDR` is set: a port still in `TIME_WAIT` can be reused,
/// but a port with a live listener fails with `AddrInUse`.
pub fn create_status_listener(addr: SocketAddr) -> std::io::Result<std::net::TcpListener> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(128)?;

    Ok(socket.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_ephemeral_port() {
        let listener = create_status_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }

    #[test]
    fn test_bind_port_in_use_fails() {
        let first = create_status_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = first.local_addr().unwrap();

        let err = create_status_listener(addr).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::AddrInUse);
    }
}
