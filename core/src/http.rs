//! Request and response values exchanged with a [`Transport`](crate::Transport).
//!
//! # Design
//! `HttpRequest` is plain data: the client validates and assembles it, the
//! transport only puts it on the wire. Header setting follows set semantics
//! (a later value for the same name replaces the earlier one, names compare
//! case-insensitively), so applying caller headers in order is
//! last-write-wins.
//!
//! All fields use owned types so requests can be handed across threads.

use std::borrow::Cow;
use std::io::{self, Read};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use ureq::http::{HeaderName, HeaderValue, StatusCode, Uri};

use crate::error::ClientError;

/// Every request this crate issues is a GET, body or not.
pub const METHOD: &str = "GET";

/// One header to attach to an outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderEntry {
    pub key: String,
    pub value: String,
}

impl HeaderEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> From<(K, V)> for HeaderEntry {
    fn from((key, value): (K, V)) -> Self {
        Self::new(key, value)
    }
}

/// Username and password for HTTP Basic authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Value for the `Authorization` header.
    pub fn basic_auth_header(&self) -> String {
        let raw = format!("{}:{}", self.username, self.password);
        format!("Basic {}", STANDARD.encode(raw))
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A validated GET request described as plain data.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Start a GET request, rejecting anything that is not an absolute
    /// `http`/`https` URL with a host.
    pub fn get(url: &str) -> Result<Self, ClientError> {
        let uri: Uri = url
            .parse()
            .map_err(|e: ureq::http::uri::InvalidUri| ClientError::build(url, e.to_string()))?;
        match uri.scheme_str() {
            Some("http") | Some("https") => {}
            Some(other) => {
                return Err(ClientError::build(url, format!("unsupported scheme {other:?}")))
            }
            None => return Err(ClientError::build(url, "missing scheme")),
        }
        if uri.host().map_or(true, str::is_empty) {
            return Err(ClientError::build(url, "missing host"));
        }
        Ok(Self {
            url: url.to_string(),
            headers: Vec::new(),
            body: None,
        })
    }

    pub fn with_body(mut self, body: &[u8]) -> Self {
        self.body = Some(body.to_vec());
        self
    }

    /// Set `key` to `value`, replacing any existing value for that name.
    pub fn set_header(&mut self, key: &str, value: &str) -> Result<(), ClientError> {
        HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| ClientError::build(&self.url, format!("invalid header name {key:?}: {e}")))?;
        HeaderValue::from_str(value)
            .map_err(|e| ClientError::build(&self.url, format!("invalid value for header {key:?}: {e}")))?;
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(key));
        self.headers.push((key.to_string(), value.to_string()));
        Ok(())
    }

    pub fn set_basic_auth(&mut self, credentials: &Credentials) -> Result<(), ClientError> {
        self.set_header("Authorization", &credentials.basic_auth_header())
    }

    /// Current value of header `name`, if set.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A response body still attached to its connection.
///
/// `close` releases the underlying connection resource. The client calls it
/// exactly once per response, after the body has been drained or a read has
/// failed.
pub trait ResponseBody: Read + Send {
    fn close(&mut self) -> io::Result<()>;
}

/// Response head plus the still-open body, as returned by a transport.
pub struct RawResponse {
    pub status_code: u16,
    pub status: String,
    pub body: Box<dyn ResponseBody>,
}

impl std::fmt::Debug for RawResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawResponse")
            .field("status_code", &self.status_code)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// A fully drained response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub body: Vec<u8>,
    /// Status code plus its canonical reason phrase, e.g. `"200 OK"`. ureq
    /// does not keep the reason phrase the server sent, so a peer answering
    /// `200 Everything Fine` still reads as `"200 OK"`.
    pub status: String,
    pub status_code: u16,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Body as UTF-8, with invalid sequences replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Render a status code with its canonical reason: `"404 Not Found"`. Codes
/// without one render as the bare number.
pub fn status_line(code: u16) -> String {
    let reason = StatusCode::from_u16(code)
        .ok()
        .and_then(|s| s.canonical_reason());
    match reason {
        Some(reason) => format!("{code} {reason}"),
        None => code.to_string(),
    }
}
