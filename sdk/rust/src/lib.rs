//! Client for calling services hosted by an xrpc node.

pub mod client;

pub use client::{CallError, RpcClient};
