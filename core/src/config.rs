//! Pool and transport settings fixed when a client is built.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default cap for every pool limit.
pub const DEFAULT_POOL_LIMIT: usize = 1000;

/// Default global timeout applied to every request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Settings for a [`Client`](crate::Client).
///
/// Immutable once handed to a client. Deserializes with defaults for missing
/// fields, so it can be embedded in a caller's own configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub max_idle_connections_per_host: usize,
    /// Requests in flight per scheme/host/port; further callers queue. 0 means
    /// no cap.
    pub max_connections_per_host: usize,
    pub max_idle_connections: usize,
    /// Covers the whole exchange, body read included. Also bounds the wait
    /// for a per-host connection slot.
    #[serde(rename = "timeout_ms", with = "duration_ms")]
    pub timeout: Duration,
    /// Accept any server certificate. Insecure.
    pub skip_tls_verification: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_idle_connections_per_host: DEFAULT_POOL_LIMIT,
            max_connections_per_host: DEFAULT_POOL_LIMIT,
            max_idle_connections: DEFAULT_POOL_LIMIT,
            timeout: DEFAULT_TIMEOUT,
            skip_tls_verification: false,
        }
    }
}

impl ClientConfig {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn skip_tls_verification(mut self, skip: bool) -> Self {
        self.skip_tls_verification = skip;
        self
    }

    /// Set all three pool caps to `limit`.
    pub fn pool_limit(mut self, limit: usize) -> Self {
        self.max_idle_connections_per_host = limit;
        self.max_connections_per_host = limit;
        self.max_idle_connections = limit;
        self
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{ser::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        if value.subsec_nanos() % 1_000_000 != 0 {
            return Err(S::Error::custom(format!(
                "timeout {value:?} is not a whole number of milliseconds"
            )));
        }
        let millis = u64::try_from(value.as_millis())
            .map_err(|_| S::Error::custom(format!("timeout {value:?} does not fit in u64 milliseconds")))?;
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
