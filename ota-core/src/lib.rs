//! OTA Core - Hardware-independent firmware update protocol for the ESP32 OTA agent
//!
//! This crate contains the update check, manifest resolution and flash streaming
//! logic. Everything that touches the radio, the HTTP stack or the flash is
//! reached through the capability traits in [`platform`], so the whole protocol
//! can be tested on the host platform without ESP32 hardware.

pub mod config;
pub mod digest;
pub mod error;
pub mod manifest;
pub mod platform;
pub mod policy;
pub mod resolver;
pub mod updater;
pub mod writer;

pub use config::{ConfigError, UpdaterConfig};
pub use digest::{DigestVerifier, IntegrityDigest};
pub use error::{ManifestError, StorageError, TransportError, UpdateError};
pub use manifest::UpdateManifest;
pub use platform::{
    Clock, Connectivity, DeviceControl, HttpClient, HttpResponse, MonotonicClock, UpdateStorage,
};
pub use policy::TransportPolicy;
pub use resolver::{ManifestResolver, Resolution};
pub use updater::{CheckOutcome, OtaUpdater};
pub use writer::{FlashWriter, VerifiedImage, WriteState};
