/// Error types for the update check and flash pipeline
use thiserror::Error;

/// Why a fetched manifest was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ManifestError {
    #[error("error parsing remote path of new binary")]
    MissingBinaryUrl,
    #[error("error parsing version number")]
    MissingVersion,
    #[error("digest is not 32 hex characters long")]
    MalformedDigest,
    #[error("manifest is larger than {limit} bytes")]
    TooLong { limit: usize },
}

/// Failure reported by the HTTP transport collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl TransportError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self(detail.into())
    }
}

/// Failure reported by the update-storage collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct StorageError(pub String);

impl StorageError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self(detail.into())
    }
}

/// Everything that can stop a check/update cycle.
///
/// "No update available" is deliberately absent: it is reported as
/// [`crate::Resolution::UpToDate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpdateError {
    #[error("network is not connected")]
    ConnectivityUnavailable,

    #[error("refusing non-secure URL on a secure update checker: {url}")]
    InsecureUrlRejected { url: String },

    #[error("too many redirects (budget {budget})")]
    TooManyRedirects { budget: u16 },

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("not enough space to begin OTA ({size} bytes)")]
    StorageReservationFailed { size: u64 },

    #[error("fetched binary has 0 size")]
    StorageSizeInvalid,

    #[error("failed to register the expected digest")]
    DigestRegistrationFailed,

    #[error("written {actual} out of {expected} bytes")]
    StreamWriteIncomplete { expected: u64, actual: u64 },

    #[error("commit failed: {0}")]
    CommitFailed(String),

    #[error("undefined OTA update error: {0}")]
    CommitAmbiguous(String),
}
