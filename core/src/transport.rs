//! The network seam between [`Client`](crate::Client) and the wire.
//!
//! # Design
//! The client assembles an [`HttpRequest`] and hands it to a [`Transport`],
//! which returns the response head and a still-open [`ResponseBody`]. Draining
//! and closing that body stays in the client, so every transport gets the same
//! release guarantees. [`UreqTransport`] is the production implementation.
//!
//! ureq opens connections on demand, so `UreqTransport` enforces
//! `max_connections_per_host` itself: a request holds a host permit from
//! before it is sent until its body is closed, and requests over the cap
//! queue for a permit.

use std::io::{self, Read};
use std::sync::Arc;

use ureq::tls::TlsConfig;
use ureq::{Agent, BodyReader};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::gate::{host_key, HostGate, HostPermit};
use crate::http::{status_line, HttpRequest, RawResponse, ResponseBody};

/// Executes one request and returns the response with its body unread.
///
/// Implementations must be safe to call from many threads at once.
pub trait Transport: Send + Sync {
    fn send(&self, request: HttpRequest) -> Result<RawResponse, ClientError>;
}

/// [`Transport`] backed by a pooled `ureq::Agent`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
    /// `None` when `max_connections_per_host` is 0 (uncapped).
    gate: Option<Arc<HostGate>>,
}

impl std::fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

impl UreqTransport {
    pub fn new(config: &ClientConfig) -> Self {
        let mut builder = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(config.timeout))
            .max_idle_connections(config.max_idle_connections)
            .max_idle_connections_per_host(config.max_idle_connections_per_host);

        if config.skip_tls_verification {
            tracing::warn!("TLS certificate verification disabled for this client");
            builder = builder.tls_config(TlsConfig::builder().disable_verification(true).build());
        }

        let gate = (config.max_connections_per_host > 0)
            .then(|| HostGate::new(config.max_connections_per_host, config.timeout));

        Self {
            agent: builder.build().new_agent(),
            gate,
        }
    }

    /// The underlying agent, for requests this crate does not wrap.
    pub fn agent(&self) -> &Agent {
        &self.agent
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: HttpRequest) -> Result<RawResponse, ClientError> {
        let permit = match &self.gate {
            Some(gate) => Some(
                gate.acquire(host_key(&request.url))
                    .map_err(|e| ClientError::execution(&request.url, e))?,
            ),
            None => None,
        };

        let mut builder = self.agent.get(&request.url);
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }

        let result = match request.body.as_deref() {
            Some(body) => builder.force_send_body().send(body),
            None => builder.call(),
        };

        let response = result.map_err(|e| match e {
            ureq::Error::BadUri(reason) => ClientError::build(&request.url, reason),
            ureq::Error::Http(e) => ClientError::build(&request.url, e.to_string()),
            other => ClientError::execution(&request.url, other),
        })?;

        let status_code = response.status().as_u16();
        Ok(RawResponse {
            status_code,
            status: status_line(status_code),
            body: Box::new(UreqBody {
                reader: Some(response.into_body().into_reader()),
                permit,
            }),
        })
    }
}

/// An open ureq body. Dropping the reader hands a fully read connection back
/// to the agent's pool, or discards a connection that was not read to the end.
/// The host permit is released after the reader.
struct UreqBody {
    reader: Option<BodyReader<'static>>,
    permit: Option<HostPermit>,
}

impl Read for UreqBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.reader.as_mut() {
            Some(reader) => reader.read(buf),
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "body already closed")),
        }
    }
}

impl ResponseBody for UreqBody {
    fn close(&mut self) -> io::Result<()> {
        match self.reader.take() {
            Some(reader) => {
                drop(reader);
                self.permit.take();
                Ok(())
            }
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "body already closed")),
        }
    }
}
