//! Blocking GET client over a pooled connection agent.
//!
//! # Overview
//! [`Client`] wraps one long-lived, connection-pooling transport and offers
//! GET variants with optional basic-auth credentials, a request body, and
//! extra headers. Each call returns a [`Response`] holding the status line,
//! status code and the complete body.
//!
//! # Design
//! - Pool limits, the global timeout and the TLS toggle are fixed at
//!   construction ([`ClientConfig`]); the client is otherwise immutable and
//!   safe to share across threads.
//! - The method is always GET, even when a body is sent.
//! - A response body is always drained and closed before the call returns.
//!   Partial bodies are never handed out; they surface as
//!   [`ClientError::BodyReadError`].
//! - At most `max_connections_per_host` requests per host are in flight;
//!   further callers queue until a body is closed.
//! - [`Transport`] is the network seam; [`UreqTransport`] is the default.

pub mod client;
pub mod config;
pub mod error;
mod gate;
pub mod http;
pub mod transport;

pub use client::Client;
pub use config::ClientConfig;
pub use error::ClientError;
pub use http::{Credentials, HeaderEntry, HttpRequest, RawResponse, Response, ResponseBody};
pub use transport::{Transport, UreqTransport};
