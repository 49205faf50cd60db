//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → connection.rs (id, live-connection tracking)
//!     → protocol.rs (newline-delimited JSON frames)
//!     → server.rs (DirectoryLookup → ServiceHandler::call)
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - Each connection tracked for graceful shutdown
//! - The server only reads the directory; it never mutates it

pub mod connection;
pub mod listener;
pub mod protocol;
pub mod server;

pub use server::{NetworkServer, ServerHandle, StartError, TcpRpcServer};
