// Connection handling module
// Serves a single TCP connection of the status listener over HTTP/1.1

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use http_body_util::Full;
use hyper::body::{Body as _, Bytes, Incoming};
use hyper::header::{CONTENT_TYPE, USER_AGENT};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use thiserror::Error;

use super::dispatch::Reply;
use super::listener::OnRequest;
use crate::logger::{self, AccessLogEntry};

/// Settings shared by every connection of one listener
pub struct ConnectionContext {
    pub on_request: OnRequest,
    pub keep_alive: bool,
    pub connection_timeout: Duration,
    /// Access log format, `None` when access logging is off
    pub access_log_format: Option<String>,
    pub active_connections: AtomicUsize,
}

/// Returned from the service to make hyper drop the connection unanswered
#[derive(Debug, Error)]
#[error("status request rejected: {method} {path}")]
pub struct RequestRejected {
    method: Method,
    path: String,
}

/// Accept a connection and serve it on a spawned task.
pub fn accept_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    ctx: &Arc<ConnectionContext>,
) {
    ctx.active_connections.fetch_add(1, Ordering::SeqCst);
    logger::log_debug(&format!("[Connection] Accepted from: {peer_addr}"));

    let ctx = Arc::clone(ctx);
    tokio::spawn(async move {
        let io = TokioIo::new(stream);

        let mut builder = http1::Builder::new();
        builder.keep_alive(ctx.keep_alive);

        let service_ctx = Arc::clone(&ctx);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| {
                let ctx = Arc::clone(&service_ctx);
                async move { serve_request(&req, &ctx, peer_addr) }
            }),
        );

        match tokio::time::timeout(ctx.connection_timeout, conn).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => logger::log_warning(&format!(
                "Status connection from {peer_addr} timed out after {} seconds",
                ctx.connection_timeout.as_secs()
            )),
        }

        ctx.active_connections.fetch_sub(1, Ordering::SeqCst);
    });
}

/// Run one request through the callback and turn its reply into a response.
fn serve_request(
    req: &Request<Incoming>,
    ctx: &ConnectionContext,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, RequestRejected> {
    let started = Instant::now();
    let method = req.method();
    let path = req.uri().path();
    let has_body = !req.body().is_end_stream();

    // Handlers may block; keep the other connections on this runtime moving.
    let reply = tokio::task::block_in_place(|| (ctx.on_request)(method, path, has_body));

    if let Some(format) = &ctx.access_log_format {
        let mut entry =
            AccessLogEntry::new(peer_addr.ip().to_string(), method.to_string(), path.to_string());
        entry.http_version = version_str(req.version()).to_string();
        entry.status = reply.as_ref().map(|r| r.status);
        entry.body_bytes = reply.as_ref().map_or(0, |r| r.body.len());
        entry.user_agent = req
            .headers()
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, format);
    }

    match reply {
        Some(reply) => Ok(build_text_response(reply)),
        None => Err(RequestRejected {
            method: method.clone(),
            path: path.to_string(),
        }),
    }
}

fn build_text_response(reply: Reply) -> Response<Full<Bytes>> {
    Response::builder()
        .status(reply.status)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from(reply.body)))
        .unwrap_or_else(|e| {
            logger::log_error(&format!("Failed to build status response: {e}"));
            Response::new(Full::new(Bytes::new()))
        })
}

fn version_str(version: hyper::Version) -> &'static str {
    match version {
        hyper::Version::HTTP_09 => "0.9",
        hyper::Version::HTTP_10 => "1.0",
        hyper::Version::HTTP_2 => "2",
        hyper::Version::HTTP_3 => "3",
        _ => "1.1",
    }
}
