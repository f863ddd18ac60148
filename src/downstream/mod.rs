//! Outbound calls to the downstream API provider.
//!
//! Split in two layers: [`transport`] is the raw wire interface
//! (`issue(method, path, headers, body)`), and [`client`] wraps it with
//! per-call auth header resolution and the single-retry policy for
//! authentication failures. All core-owned downstream traffic flows through
//! [`DownstreamClient`].

mod client;
mod transport;

pub use client::{DownstreamClient, DownstreamError};
pub use transport::{
    DownstreamRequest, DownstreamResponse, DownstreamTransport, HttpTransport, TransportError,
};
