//! Capability traits for the collaborators the update protocol drives.
//!
//! The firmware crate implements these on top of ESP-IDF (WiFi station,
//! `EspHttpConnection`, the `esp_ota_*` API and `esp_restart`); the tests in
//! this crate implement them with in-memory fakes.

use std::time::Instant;

use crate::digest::IntegrityDigest;
use crate::error::{StorageError, TransportError};

/// Link status of the network stack
pub trait Connectivity {
    fn is_connected(&self) -> bool;
}

/// A response whose headers have arrived and whose body can be streamed
pub trait HttpResponse {
    fn status(&self) -> u16;

    /// Value of a header requested through `collect_headers` when the request was issued
    fn header(&self, name: &str) -> Option<&str>;

    /// Declared body size, `None` when the server did not send one
    fn content_length(&self) -> Option<u64>;

    /// Read the next part of the body. `Ok(0)` means end of stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;
}

/// Blocking HTTP client. Redirects must NOT be followed by the implementation.
pub trait HttpClient {
    type Response<'a>: HttpResponse
    where
        Self: 'a;

    fn get(&mut self, url: &str, collect_headers: &[&str]) -> Result<Self::Response<'_>, TransportError>;
}

/// Write session into the inactive firmware partition.
///
/// Call order: optional `set_digest`, then `begin`, `write`..., `commit`.
/// `begin` must keep a digest registered before it.
pub trait UpdateStorage {
    fn set_digest(&mut self, digest: &IntegrityDigest) -> Result<(), StorageError>;

    /// Reserve (erase) space for an image of `size` bytes
    fn begin(&mut self, size: u64) -> Result<(), StorageError>;

    fn write(&mut self, chunk: &[u8]) -> Result<(), StorageError>;

    /// Finalize the image, verify it and make it the next boot image
    fn commit(&mut self) -> Result<(), StorageError>;

    /// True once a commit fully completed
    fn is_finished(&self) -> bool;

    /// Diagnostic text for the last failure, if the platform has one
    fn last_error(&self) -> Option<String>;

    /// Drop an in-progress write session
    fn abort(&mut self);
}

/// Device-level control
pub trait DeviceControl {
    fn restart(&mut self) -> !;
}

/// Monotonic millisecond clock that is allowed to wrap around
pub trait Clock {
    fn now_ms(&self) -> u32;
}

/// `Instant`-backed clock, truncated to 32 bits like a hardware tick counter
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u32 {
        self.origin.elapsed().as_millis() as u32
    }
}

/// Read at most `limit` bytes of body as (lossy) UTF-8
pub fn read_body<R: HttpResponse + ?Sized>(response: &mut R, limit: usize) -> Result<String, TransportError> {
    let body = read_bytes(response, limit)?;
    Ok(String::from_utf8_lossy(&body).into_owned())
}

/// Read at most `limit` raw bytes of body
pub fn read_bytes<R: HttpResponse + ?Sized>(response: &mut R, limit: usize) -> Result<Vec<u8>, TransportError> {
    let mut body = Vec::new();
    let mut buf = [0u8; 256];
    while body.len() < limit {
        let want = buf.len().min(limit - body.len());
        let n = response.read(&mut buf[..want])?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&buf[..n]);
    }
    Ok(body)
}

/// Body text for error logs; transport failures while reading are folded into the text
pub fn diagnostic_body<R: HttpResponse + ?Sized>(response: &mut R) -> String {
    read_body(response, 512).unwrap_or_else(|e| format!("<unreadable body: {}>", e))
}
