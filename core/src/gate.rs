//! Per-host cap on connections in use.
//!
//! # Design
//! A permit is taken before a request goes out and released when its body is
//! closed, so at most `limit` exchanges per scheme/host/port are in flight.
//! Callers over the cap block on a `Condvar` until a permit frees up or the
//! wait deadline passes.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use ureq::http::Uri;

#[derive(Debug)]
pub(crate) struct HostGate {
    limit: usize,
    max_wait: Duration,
    in_use: Mutex<HashMap<String, usize>>,
    freed: Condvar,
}

impl HostGate {
    pub(crate) fn new(limit: usize, max_wait: Duration) -> Arc<Self> {
        Arc::new(Self {
            limit,
            max_wait,
            in_use: Mutex::new(HashMap::new()),
            freed: Condvar::new(),
        })
    }

    /// Block until `key` has a free slot. Fails with `TimedOut` after
    /// `max_wait`.
    pub(crate) fn acquire(self: &Arc<Self>, key: String) -> io::Result<HostPermit> {
        let deadline = Instant::now() + self.max_wait;
        let mut in_use = self.lock();
        loop {
            let count = in_use.get(&key).copied().unwrap_or(0);
            if count < self.limit {
                in_use.insert(key.clone(), count + 1);
                break;
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("no free connection slot for {key} within {:?}", self.max_wait),
                ));
            }
            tracing::trace!(key, count, "waiting for connection slot");
            let (guard, _) = self
                .freed
                .wait_timeout(in_use, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            in_use = guard;
        }
        Ok(HostPermit {
            gate: Arc::clone(self),
            key,
        })
    }

    #[cfg(test)]
    fn in_use(&self, key: &str) -> usize {
        self.lock().get(key).copied().unwrap_or(0)
    }

    // The map is only ever updated in full steps, so a poisoned lock still
    // holds consistent counts.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, usize>> {
        self.in_use.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A held slot. Dropping it frees the slot and wakes waiters.
#[derive(Debug)]
pub(crate) struct HostPermit {
    gate: Arc<HostGate>,
    key: String,
}

impl Drop for HostPermit {
    fn drop(&mut self) {
        let mut in_use = self.gate.lock();
        if let Some(count) = in_use.get_mut(&self.key) {
            *count -= 1;
            if *count == 0 {
                in_use.remove(&self.key);
            }
        }
        drop(in_use);
        self.gate.freed.notify_all();
    }
}

/// `scheme://host:port` for `url`, with the scheme's default port filled in.
pub(crate) fn host_key(url: &str) -> String {
    let Ok(uri) = url.parse::<Uri>() else {
        return url.to_string();
    };
    let scheme = uri.scheme_str().unwrap_or("http");
    let host = uri.host().unwrap_or_default().to_ascii_lowercase();
    let port = uri
        .port_u16()
        .unwrap_or(if scheme == "https" { 443 } else { 80 });
    format!("{scheme}://{host}:{port}")
}
