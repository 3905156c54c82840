//! In-memory collaborators for driving the update protocol on the host
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use ota_core::{
    Clock, Connectivity, DeviceControl, DigestVerifier, HttpClient, HttpResponse, IntegrityDigest, StorageError,
    TransportError, UpdateStorage,
};

pub const RESTART_MARKER: &str = "device restart requested";

/// Canned HTTP reply
#[derive(Debug, Clone, Default)]
pub struct Reply {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub content_length: Option<u64>,
    pub fail_after: Option<usize>,
}

impl Reply {
    pub fn ok(body: impl AsRef<[u8]>) -> Self {
        let body = body.as_ref().to_vec();
        Self { status: 200, content_length: Some(body.len() as u64), body, ..Default::default() }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self { status, body: body.as_bytes().to_vec(), ..Default::default() }
    }

    pub fn redirect(location: &str) -> Self {
        Self::status(301, "Moved Permanently").with_header("Location", location)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_content_length(mut self, len: Option<u64>) -> Self {
        self.content_length = len;
        self
    }

    /// Body reads fail once `n` bytes were delivered
    pub fn failing_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }
}

type Handler = Box<dyn Fn(&str) -> Option<Reply>>;

pub struct FakeHttp {
    handler: Handler,
    pub requests: Vec<String>,
}

impl FakeHttp {
    pub fn new(routes: Vec<(&str, Reply)>) -> Self {
        let routes: HashMap<String, Reply> = routes.into_iter().map(|(u, r)| (u.to_string(), r)).collect();
        Self::from_fn(move |url| routes.get(url).cloned())
    }

    pub fn from_fn(f: impl Fn(&str) -> Option<Reply> + 'static) -> Self {
        Self { handler: Box::new(f), requests: Vec::new() }
    }
}

pub struct FakeResponse {
    reply: Reply,
    collected: Vec<String>,
    pos: usize,
}

impl HttpClient for FakeHttp {
    type Response<'a> = FakeResponse where Self: 'a;

    fn get(&mut self, url: &str, collect_headers: &[&str]) -> Result<Self::Response<'_>, TransportError> {
        self.requests.push(url.to_string());
        let reply = (self.handler)(url).ok_or_else(|| TransportError::new("connection refused"))?;
        Ok(FakeResponse {
            reply,
            collected: collect_headers.iter().map(|h| h.to_ascii_lowercase()).collect(),
            pos: 0,
        })
    }
}

impl HttpResponse for FakeResponse {
    fn status(&self) -> u16 {
        self.reply.status
    }

    fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        if !self.collected.contains(&name) {
            return None;
        }
        self.reply
            .headers
            .iter()
            .find(|(k, _)| k.to_ascii_lowercase() == name)
            .map(|(_, v)| v.as_str())
    }

    fn content_length(&self) -> Option<u64> {
        self.reply.content_length
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        if let Some(limit) = self.reply.fail_after {
            if self.pos >= limit {
                return Err(TransportError::new("connection reset"));
            }
        }
        let end = self.reply.fail_after.unwrap_or(usize::MAX).min(self.reply.body.len());
        let n = buf.len().min(end - self.pos).min(1000);
        buf[..n].copy_from_slice(&self.reply.body[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitBehaviour {
    Normal,
    Fail,
    SucceedWithoutFinishing,
}

pub struct FakeStorage {
    pub capacity: u64,
    pub digest_supported: bool,
    pub fail_write_at: Option<usize>,
    pub commit_behaviour: CommitBehaviour,
    pub calls: Vec<&'static str>,
    pub data: Vec<u8>,
    pub reserved: Option<u64>,
    pub verifier: Option<DigestVerifier>,
    pub finished: bool,
    pub last_error: Option<String>,
}

impl Default for FakeStorage {
    fn default() -> Self {
        Self {
            capacity: 1 << 20,
            digest_supported: true,
            fail_write_at: None,
            commit_behaviour: CommitBehaviour::Normal,
            calls: Vec::new(),
            data: Vec::new(),
            reserved: None,
            verifier: None,
            finished: false,
            last_error: None,
        }
    }
}

impl FakeStorage {
    pub fn committed(&self) -> bool {
        self.calls.contains(&"commit")
    }
}

impl UpdateStorage for FakeStorage {
    fn set_digest(&mut self, digest: &IntegrityDigest) -> Result<(), StorageError> {
        self.calls.push("set_digest");
        if !self.digest_supported {
            return Err(StorageError::new("digest verification unsupported"));
        }
        self.verifier = Some(DigestVerifier::new(digest.clone()));
        Ok(())
    }

    fn begin(&mut self, size: u64) -> Result<(), StorageError> {
        self.calls.push("begin");
        if size > self.capacity {
            return Err(StorageError::new(format!("partition holds {} bytes", self.capacity)));
        }
        self.reserved = Some(size);
        self.data.clear();
        Ok(())
    }

    fn write(&mut self, chunk: &[u8]) -> Result<(), StorageError> {
        if let Some(at) = self.fail_write_at {
            if self.data.len() + chunk.len() > at {
                return Err(StorageError::new("flash write failed"));
            }
        }
        if let Some(verifier) = self.verifier.as_mut() {
            verifier.update(chunk);
        }
        self.data.extend_from_slice(chunk);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        self.calls.push("commit");
        match self.commit_behaviour {
            CommitBehaviour::Fail => {
                self.last_error = Some("Flash Read Failed".to_string());
                Err(StorageError::new("commit failed"))
            }
            CommitBehaviour::SucceedWithoutFinishing => Ok(()),
            CommitBehaviour::Normal => {
                if self.reserved != Some(self.data.len() as u64) {
                    self.last_error = Some("Bad Size Given".to_string());
                    return Err(StorageError::new("size mismatch"));
                }
                if let Some(verifier) = self.verifier.take() {
                    if let Err(actual) = verifier.finish() {
                        self.last_error = Some(format!("MD5 Check Failed (got {})", actual));
                        return Err(StorageError::new("md5 mismatch"));
                    }
                }
                self.finished = true;
                Ok(())
            }
        }
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.clone()
    }

    fn abort(&mut self) {
        self.calls.push("abort");
        self.reserved = None;
        self.verifier = None;
        self.data.clear();
    }
}

#[derive(Clone)]
pub struct FakeNetwork(pub Rc<Cell<bool>>);

impl FakeNetwork {
    pub fn up() -> Self {
        Self(Rc::new(Cell::new(true)))
    }

    pub fn down() -> Self {
        Self(Rc::new(Cell::new(false)))
    }
}

impl Connectivity for FakeNetwork {
    fn is_connected(&self) -> bool {
        self.0.get()
    }
}

#[derive(Clone, Default)]
pub struct FakeDevice {
    pub restarts: Rc<RefCell<u32>>,
}

impl DeviceControl for FakeDevice {
    fn restart(&mut self) -> ! {
        *self.restarts.borrow_mut() += 1;
        panic!("{}", RESTART_MARKER);
    }
}

#[derive(Clone, Default)]
pub struct ManualClock(pub Rc<Cell<u32>>);

impl ManualClock {
    pub fn at(ms: u32) -> Self {
        Self(Rc::new(Cell::new(ms)))
    }

    pub fn advance(&self, ms: u32) {
        self.0.set(self.0.get().wrapping_add(ms));
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u32 {
        self.0.get()
    }
}

/// Deterministic firmware-like payload
pub fn firmware(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

pub fn md5_hex(data: &[u8]) -> String {
    use md5::{Digest, Md5};
    hex::encode(Md5::digest(data).as_slice())
}
