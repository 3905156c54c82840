/// Flash writer: stream a firmware binary into the update partition and commit it
use crate::digest::IntegrityDigest;
use crate::error::UpdateError;
use crate::platform::{diagnostic_body, Connectivity, DeviceControl, HttpClient, HttpResponse, UpdateStorage};
use crate::policy::TransportPolicy;

const HTTP_OK: u16 = 200;

/// Read/write granularity while streaming the image
pub const CHUNK_SIZE: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteState {
    Idle,
    Writing,
    Committing,
    Verified,
    Failed,
}

/// Proof that an image was written, committed and confirmed finished.
///
/// Only [`FlashWriter::flash`] creates one; activating it is the single path
/// to the post-update restart.
#[derive(Debug)]
#[must_use = "a verified image does nothing until activated"]
pub struct VerifiedImage {
    size: u64,
}

impl VerifiedImage {
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn activate<D: DeviceControl + ?Sized>(self, device: &mut D) -> ! {
        log::info!("Update completed ({} bytes). Rebooting", self.size);
        log::logger().flush();
        device.restart()
    }
}

pub struct FlashWriter<'a, H, S, N> {
    http: &'a mut H,
    storage: &'a mut S,
    network: &'a N,
    policy: TransportPolicy,
    state: WriteState,
}

impl<'a, H, S, N> FlashWriter<'a, H, S, N>
where
    H: HttpClient,
    S: UpdateStorage,
    N: Connectivity,
{
    pub fn new(http: &'a mut H, storage: &'a mut S, network: &'a N, policy: TransportPolicy) -> Self {
        Self { http, storage, network, policy, state: WriteState::Idle }
    }

    pub fn state(&self) -> WriteState {
        self.state
    }

    pub fn flash(&mut self, binary_url: &str, digest: Option<&IntegrityDigest>) -> Result<VerifiedImage, UpdateError> {
        let result = self.write_image(binary_url, digest);
        if result.is_err() {
            self.state = WriteState::Failed;
        }
        result
    }

    fn write_image(&mut self, binary_url: &str, digest: Option<&IntegrityDigest>) -> Result<VerifiedImage, UpdateError> {
        log::debug!("Fetching OTA from: {}", binary_url);

        // Checked again here; the caller's URL is not trusted blindly
        self.policy.check(binary_url)?;

        if !self.network.is_connected() {
            log::error!("Wifi not connected");
            return Err(UpdateError::ConnectivityUnavailable);
        }

        let mut response = self.http.get(binary_url, &[]).map_err(|e| {
            log::error!("Error initializing client: {}", e);
            UpdateError::from(e)
        })?;

        let status = response.status();
        if status != HTTP_OK {
            let body = diagnostic_body(&mut response);
            log::error!("[HTTP] [ERROR] [{}] fetching {}", status, binary_url);
            log::debug!("Response:\n{}", body);
            return Err(UpdateError::Http { status, body });
        }

        let size = match response.content_length() {
            Some(size) if size > 0 => size,
            _ => {
                log::error!("Fetched binary has 0 size");
                return Err(UpdateError::StorageSizeInvalid);
            }
        };

        if let Some(digest) = digest {
            self.storage.set_digest(digest).map_err(|e| {
                log::error!("Failed to set the expected MD5 {}: {}", digest, e);
                UpdateError::DigestRegistrationFailed
            })?;
        }

        if let Err(e) = self.storage.begin(size) {
            log::error!("Not enough space to begin OTA: {}", e);
            // Also forgets the digest registered above
            self.storage.abort();
            return Err(UpdateError::StorageReservationFailed { size });
        }

        self.state = WriteState::Writing;
        let written = stream_image(&mut response, &mut *self.storage, size);
        drop(response);

        if written != size {
            log::error!("Error. Written {} out of {}", written, size);
            self.storage.abort();
            return Err(UpdateError::StreamWriteIncomplete { expected: size, actual: written });
        }

        self.state = WriteState::Committing;
        if let Err(e) = self.storage.commit() {
            let detail = self.storage.last_error().unwrap_or_else(|| e.to_string());
            log::error!("Error Occurred: {}", detail);
            self.storage.abort();
            return Err(UpdateError::CommitFailed(detail));
        }

        if !self.storage.is_finished() {
            let detail = self
                .storage
                .last_error()
                .unwrap_or_else(|| "commit reported success but the update is not finished".to_string());
            log::error!("Undefined OTA update error: {}", detail);
            return Err(UpdateError::CommitAmbiguous(detail));
        }

        self.state = WriteState::Verified;
        Ok(VerifiedImage { size })
    }
}

/// Copy the response body into storage. Returns the byte count received; any
/// value other than `expected` means the image is unusable.
fn stream_image<R, S>(response: &mut R, storage: &mut S, expected: u64) -> u64
where
    R: HttpResponse + ?Sized,
    S: UpdateStorage + ?Sized,
{
    let mut buf = [0u8; CHUNK_SIZE];
    let mut written: u64 = 0;
    let mut last_pct: u64 = 0;

    loop {
        let n = match response.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                log::error!("Download interrupted after {} bytes: {}", written, e);
                break;
            }
        };

        let received = written + n as u64;
        if received > expected {
            log::error!("Server sent more than the declared {} bytes", expected);
            return received;
        }

        if let Err(e) = storage.write(&buf[..n]) {
            log::error!("Flash write failed at offset {}: {}", written, e);
            break;
        }
        written = received;

        let pct = written * 100 / expected;
        if pct / 10 > last_pct / 10 {
            log::info!("OTA: {}/{} bytes ({}%)", written, expected, pct);
            last_pct = pct;
        }
    }

    written
}
