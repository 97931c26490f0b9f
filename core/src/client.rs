//! Pooled GET client with guaranteed response draining.
//!
//! # Design
//! `Client` owns one transport (and its connection pool) for its whole life
//! and holds no per-request state, so a single instance is shared by
//! reference or `Arc` across threads. Every request variant funnels into
//! [`Client::execute`]: build, add credentials, add headers, send, drain.
//! The body is held by a guard whose `Drop` closes it, so the connection is
//! released on every exit path, including a failed read.

use std::io::Read;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::http::{
    Credentials, HeaderEntry, HttpRequest, RawResponse, Response, ResponseBody, METHOD,
};
use crate::transport::{Transport, UreqTransport};

#[derive(Debug, Clone)]
pub struct Client<T: Transport = UreqTransport> {
    config: ClientConfig,
    transport: T,
}

impl Client {
    /// Client with the default pool limits and timeout.
    pub fn new(skip_tls_verification: bool) -> Self {
        Self::with_config(ClientConfig::default().skip_tls_verification(skip_tls_verification))
    }

    pub fn with_config(config: ClientConfig) -> Self {
        let transport = UreqTransport::new(&config);
        Self { config, transport }
    }
}

impl<T: Transport> Client<T> {
    /// Client over a caller-supplied transport. The config is informational;
    /// the transport is already built.
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn get(&self, url: &str) -> Result<Response, ClientError> {
        self.execute(url, None, None, &[])
    }

    pub fn get_with_credentials(
        &self,
        url: &str,
        username: &str,
        password: &str,
    ) -> Result<Response, ClientError> {
        let credentials = Credentials::new(username, password);
        self.execute(url, None, Some(&credentials), &[])
    }

    pub fn get_with_payload_and_auth(
        &self,
        url: &str,
        username: &str,
        password: &str,
        payload: &[u8],
    ) -> Result<Response, ClientError> {
        let credentials = Credentials::new(username, password);
        self.execute(url, Some(payload), Some(&credentials), &[])
    }

    pub fn get_with_payload_auth_and_headers(
        &self,
        url: &str,
        username: &str,
        password: &str,
        payload: &[u8],
        headers: &[HeaderEntry],
    ) -> Result<Response, ClientError> {
        let credentials = Credentials::new(username, password);
        self.execute(url, Some(payload), Some(&credentials), headers)
    }

    pub fn get_with_payload_and_headers(
        &self,
        url: &str,
        payload: &[u8],
        headers: &[HeaderEntry],
    ) -> Result<Response, ClientError> {
        self.execute(url, Some(payload), None, headers)
    }

    /// Issue a GET to `url` and drain the response.
    ///
    /// Headers are applied after credentials with set semantics, so a later
    /// entry (or an explicit `Authorization`) replaces an earlier value. A
    /// non-2xx status is returned as data, not as an error.
    pub fn execute(
        &self,
        url: &str,
        body: Option<&[u8]>,
        credentials: Option<&Credentials>,
        headers: &[HeaderEntry],
    ) -> Result<Response, ClientError> {
        let mut request = HttpRequest::get(url)?;
        if let Some(body) = body {
            request = request.with_body(body);
        }
        if let Some(credentials) = credentials {
            request.set_basic_auth(credentials)?;
        }
        for entry in headers {
            request.set_header(&entry.key, &entry.value)?;
        }

        tracing::debug!(
            url,
            method = METHOD,
            has_body = body.is_some(),
            has_credentials = credentials.is_some(),
            headers = headers.len(),
            "sending request"
        );

        let RawResponse {
            status_code,
            status,
            body,
        } = self.transport.send(request)?;

        let mut guard = BodyGuard { url, body };
        let mut data = Vec::new();
        guard
            .body
            .read_to_end(&mut data)
            .map_err(|source| ClientError::BodyReadError {
                url: url.to_string(),
                source,
            })?;
        drop(guard);

        tracing::debug!(url, status_code, body_len = data.len(), "response drained");
        Ok(Response {
            body: data,
            status,
            status_code,
        })
    }
}

/// Closes the body exactly once when dropped.
struct BodyGuard<'a> {
    url: &'a str,
    body: Box<dyn ResponseBody>,
}

impl Drop for BodyGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.body.close() {
            tracing::warn!(url = self.url, "error closing response body: {e}");
        }
    }
}
