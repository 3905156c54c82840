// OTA storage - writes firmware into the inactive slot using the ESP-IDF OTA API

use core::ffi::c_void;
use esp_idf_sys::{
    esp, esp_ota_abort, esp_ota_begin, esp_ota_end, esp_ota_get_boot_partition,
    esp_ota_get_next_update_partition, esp_ota_handle_t, esp_ota_set_boot_partition, esp_ota_write,
    esp_partition_t, EspError, ESP_ERR_OTA_VALIDATE_FAILED,
};
use ota_core::{DigestVerifier, IntegrityDigest, StorageError, UpdateStorage};

fn storage_err(context: &str, err: EspError) -> StorageError {
    StorageError::new(format!("{}: {}", context, err))
}

pub struct EspUpdateStorage {
    update_partition: *const esp_partition_t,
    ota_handle: Option<esp_ota_handle_t>,
    expected_size: u64,
    bytes_written: u64,
    verifier: Option<DigestVerifier>,
    finished: bool,
    last_error: Option<String>,
}

impl EspUpdateStorage {
    pub fn new() -> Result<Self, StorageError> {
        // Get the next OTA partition
        let update_partition = unsafe { esp_ota_get_next_update_partition(core::ptr::null()) };

        if update_partition.is_null() {
            return Err(StorageError::new("no OTA update partition in the partition table"));
        }

        Ok(Self {
            update_partition,
            ota_handle: None,
            expected_size: 0,
            bytes_written: 0,
            verifier: None,
            finished: false,
            last_error: None,
        })
    }

    fn partition_size(&self) -> u64 {
        unsafe { (*self.update_partition).size as u64 }
    }

    fn fail(&mut self, detail: String) -> StorageError {
        self.last_error = Some(detail.clone());
        StorageError::new(detail)
    }

    fn abort_session(&mut self) {
        if let Some(handle) = self.ota_handle.take() {
            unsafe { esp_ota_abort(handle) };
        }
        self.bytes_written = 0;
        self.expected_size = 0;
    }
}

impl UpdateStorage for EspUpdateStorage {
    fn set_digest(&mut self, digest: &IntegrityDigest) -> Result<(), StorageError> {
        self.verifier = Some(DigestVerifier::new(digest.clone()));
        Ok(())
    }

    fn begin(&mut self, size: u64) -> Result<(), StorageError> {
        // A stale session from an earlier failed attempt would hold the partition
        self.abort_session();
        self.finished = false;
        self.last_error = None;

        if size > self.partition_size() {
            let detail = format!("image of {} bytes exceeds partition of {} bytes", size, self.partition_size());
            return Err(self.fail(detail));
        }

        let mut handle: esp_ota_handle_t = 0;
        esp!(unsafe { esp_ota_begin(self.update_partition, size as usize, &mut handle as *mut _) })
            .map_err(|e| storage_err("esp_ota_begin", e))?;

        self.ota_handle = Some(handle);
        self.expected_size = size;
        self.bytes_written = 0;

        Ok(())
    }

    fn write(&mut self, chunk: &[u8]) -> Result<(), StorageError> {
        let handle = self.ota_handle.ok_or_else(|| StorageError::new("write without an active session"))?;

        esp!(unsafe { esp_ota_write(handle, chunk.as_ptr() as *const c_void, chunk.len()) })
            .map_err(|e| storage_err("esp_ota_write", e))?;

        if let Some(verifier) = self.verifier.as_mut() {
            verifier.update(chunk);
        }
        self.bytes_written += chunk.len() as u64;

        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        // A registered digest is good for this session only, whatever the outcome
        let verifier = self.verifier.take();
        let handle = self.ota_handle.take().ok_or_else(|| StorageError::new("commit without an active session"))?;

        if self.bytes_written != self.expected_size {
            unsafe { esp_ota_abort(handle) };
            let detail = format!("Bad Size Given: {} of {} bytes", self.bytes_written, self.expected_size);
            return Err(self.fail(detail));
        }

        if let Some(verifier) = verifier {
            let expected = verifier.expected().clone();
            if let Err(actual) = verifier.finish() {
                unsafe { esp_ota_abort(handle) };
                let detail = format!("MD5 Check Failed: expected {}, got {}", expected, actual);
                return Err(self.fail(detail));
            }
        }

        // esp_ota_end releases the handle whatever the outcome
        if let Err(e) = esp!(unsafe { esp_ota_end(handle) }) {
            let detail = if e.code() == ESP_ERR_OTA_VALIDATE_FAILED as i32 {
                "image validation failed".to_string()
            } else {
                format!("esp_ota_end: {}", e)
            };
            return Err(self.fail(detail));
        }

        // Set the new boot partition
        if let Err(e) = esp!(unsafe { esp_ota_set_boot_partition(self.update_partition) }) {
            return Err(self.fail(format!("esp_ota_set_boot_partition: {}", e)));
        }

        self.finished = true;
        Ok(())
    }

    fn is_finished(&self) -> bool {
        // The bootloader must agree, not just our own bookkeeping
        self.finished && unsafe { esp_ota_get_boot_partition() } == self.update_partition
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.clone()
    }

    fn abort(&mut self) {
        self.abort_session();
        self.verifier = None;
    }
}

impl Drop for EspUpdateStorage {
    fn drop(&mut self) {
        // Clean up any ongoing OTA operation
        self.abort_session();
    }
}
