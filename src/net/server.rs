//! RPC network server.
//!
//! # Responsibilities
//! - Bind the node's advertised `ip:port`
//! - Read request frames per connection and dispatch them to the directory
//! - Stop accepting on shutdown and drain live connections
//!
//! # Design Decisions
//! - Lookups go through `DirectoryLookup`, so services registered after the
//!   server starts are dispatchable immediately
//! - One task per connection; requests on a connection are served in order

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::ListenerConfig;
use crate::directory::DirectoryLookup;
use crate::lifecycle::Shutdown;
use crate::net::connection::{ConnectionId, ConnectionTracker};
use crate::net::listener::{Listener, ListenerError};
use crate::net::protocol::{decode_request, encode, FaultCode, RpcRequest, RpcResponse};
use crate::observability::metrics;

/// How long shutdown waits for live connections before giving up on them.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest request frame accepted, newline excluded. Longer frames get a
/// `bad_request` fault and the connection is closed.
pub const MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Errors starting the network server.
#[derive(Debug, Error)]
pub enum StartError {
    #[error("invalid listen address '{0}'")]
    InvalidAddress(String),

    #[error("failed to bind listener: {0}")]
    Bind(#[source] ListenerError),
}

/// Starts the server that dispatches inbound calls.
#[async_trait]
pub trait NetworkServer: Send + Sync {
    async fn start(
        &self,
        ip: &str,
        port: u16,
        lookup: Arc<dyn DirectoryLookup>,
    ) -> Result<ServerHandle, StartError>;
}

/// A running server.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: Shutdown,
    task: Option<JoinHandle<()>>,
    tracker: ConnectionTracker,
}

impl ServerHandle {
    /// Assemble a handle around an already-running accept task.
    pub fn new(
        local_addr: SocketAddr,
        shutdown: Shutdown,
        task: Option<JoinHandle<()>>,
        tracker: ConnectionTracker,
    ) -> Self {
        Self {
            local_addr,
            shutdown,
            task,
            tracker,
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting, then wait for live connections to finish.
    pub async fn shutdown(mut self) {
        self.shutdown.trigger();

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Accept loop terminated abnormally");
            }
        }

        if tokio::time::timeout(DRAIN_TIMEOUT, self.tracker.wait_idle())
            .await
            .is_err()
        {
            tracing::warn!(
                remaining = self.tracker.active(),
                "Drain timeout elapsed with live connections"
            );
        }

        tracing::info!(address = %self.local_addr, "Network server stopped");
    }
}

/// Line-oriented JSON RPC server over TCP.
#[derive(Debug, Clone, Default)]
pub struct TcpRpcServer {
    config: ListenerConfig,
}

impl TcpRpcServer {
    pub fn new(config: ListenerConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl NetworkServer for TcpRpcServer {
    async fn start(
        &self,
        ip: &str,
        port: u16,
        lookup: Arc<dyn DirectoryLookup>,
    ) -> Result<ServerHandle, StartError> {
        let ip: IpAddr = ip
            .parse()
            .map_err(|_| StartError::InvalidAddress(format!("{ip}:{port}")))?;

        let listener = Listener::bind(SocketAddr::new(ip, port), self.config.max_connections)
            .await
            .map_err(StartError::Bind)?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| StartError::Bind(ListenerError::Bind(e)))?;

        let shutdown = Shutdown::new();
        let tracker = ConnectionTracker::new();
        let task = tokio::spawn(accept_loop(
            listener,
            lookup,
            shutdown.clone(),
            tracker.clone(),
        ));

        tracing::info!(address = %local_addr, "Network server started");
        Ok(ServerHandle::new(local_addr, shutdown, Some(task), tracker))
    }
}

async fn accept_loop(
    listener: Listener,
    lookup: Arc<dyn DirectoryLookup>,
    shutdown: Shutdown,
    tracker: ConnectionTracker,
) {
    let mut stop = shutdown.subscribe();
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer, permit)) => {
                        let lookup = lookup.clone();
                        let stop = shutdown.subscribe();
                        let guard = tracker.track();
                        tokio::spawn(async move {
                            let _permit = permit;
                            let _guard = guard;
                            serve_connection(stream, peer, lookup, stop).await;
                        });
                    }
                    Err(ListenerError::Closed) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "Accept failed");
                    }
                }
            }
            _ = stop.recv() => {
                tracing::debug!("Accept loop received shutdown signal");
                break;
            }
        }
    }
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    lookup: Arc<dyn DirectoryLookup>,
    mut stop: broadcast::Receiver<()>,
) {
    let conn_id = ConnectionId::new();
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    tracing::debug!(conn = %conn_id, peer = %peer, "Connection opened");

    loop {
        let frame = tokio::select! {
            frame = read_frame(&mut reader, &mut buf) => frame,
            _ = stop.recv() => break,
        };

        let (response, close) = match frame {
            Ok(Frame::Line) => match std::str::from_utf8(&buf) {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => match decode_request(line) {
                    Ok(request) => (dispatch(lookup.as_ref(), request).await, false),
                    Err(e) => (
                        RpcResponse::fault(String::new(), FaultCode::BadRequest, e.to_string()),
                        false,
                    ),
                },
                Err(e) => (
                    RpcResponse::fault(String::new(), FaultCode::BadRequest, e.to_string()),
                    false,
                ),
            },
            Ok(Frame::Oversize) => {
                tracing::warn!(
                    conn = %conn_id,
                    peer = %peer,
                    limit = MAX_FRAME_BYTES,
                    "Frame too large, closing connection"
                );
                let message = format!("frame exceeds {MAX_FRAME_BYTES} bytes");
                (
                    RpcResponse::fault(String::new(), FaultCode::BadRequest, message),
                    true,
                )
            }
            Ok(Frame::Eof) => break,
            Err(e) => {
                tracing::debug!(conn = %conn_id, error = %e, "Read failed");
                break;
            }
        };

        let encoded = match encode(&response) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::error!(conn = %conn_id, error = %e, "Failed to encode response");
                break;
            }
        };
        if let Err(e) = writer.write_all(encoded.as_bytes()).await {
            tracing::debug!(conn = %conn_id, error = %e, "Write failed");
            break;
        }
        if close {
            let _ = writer.shutdown().await;
            break;
        }
    }

    tracing::debug!(conn = %conn_id, peer = %peer, "Connection closed");
}

/// Outcome of reading one newline-terminated frame into the buffer.
#[derive(Debug, PartialEq, Eq)]
enum Frame {
    Line,
    Oversize,
    Eof,
}

/// Read up to one frame. At most `MAX_FRAME_BYTES + 1` bytes are buffered, so
/// an unterminated frame cannot grow the buffer without limit.
async fn read_frame<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Frame>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let read = (&mut *reader)
        .take(MAX_FRAME_BYTES as u64 + 1)
        .read_until(b'\n', buf)
        .await?;

    if read == 0 {
        return Ok(Frame::Eof);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    } else if read > MAX_FRAME_BYTES {
        return Ok(Frame::Oversize);
    }
    Ok(Frame::Line)
}

/// Resolve and invoke the handler for one request.
pub async fn dispatch(lookup: &dyn DirectoryLookup, request: RpcRequest) -> RpcResponse {
    let start = Instant::now();
    let RpcRequest {
        id,
        service,
        version,
        method,
        params,
    } = request;

    let handler = match lookup.lookup(&service, &version) {
        Ok(handler) => handler,
        Err(e) => {
            metrics::record_request(metrics::UNKNOWN_SERVICE, FaultCode::NotFound.as_str(), start);
            tracing::debug!(request_id = %id, service = %service, "No handler registered");
            return RpcResponse::fault(id, FaultCode::NotFound, e.to_string());
        }
    };

    match handler.call(&method, params).await {
        Ok(result) => {
            metrics::record_request(&service, "ok", start);
            RpcResponse::ok(id, result)
        }
        Err(e) => {
            metrics::record_request(&service, FaultCode::HandlerError.as_str(), start);
            tracing::warn!(
                request_id = %id,
                service = %service,
                method = %method,
                error = %e,
                "Handler returned error"
            );
            RpcResponse::fault(id, FaultCode::HandlerError, e.to_string())
        }
    }
}
