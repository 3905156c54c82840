/// Update orchestrator: rate-limited check, resolve, flash, restart
use crate::config::{UpdaterConfig, MIN_CHECK_INTERVAL};
use crate::error::UpdateError;
use crate::platform::{Clock, Connectivity, DeviceControl, HttpClient, MonotonicClock, UpdateStorage};
use crate::policy::TransportPolicy;
use crate::resolver::{ManifestResolver, Resolution, DEFAULT_HOP_BUDGET};
use crate::writer::FlashWriter;

/// How a check cycle ended when it did not restart the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Skipped: the previous check is more recent than the interval
    Throttled,
    /// Manifest fetched, published version not newer than ours
    UpToDate { published: u32 },
}

/// Periodic firmware update checker.
///
/// If the manifest URL begins with `https://`, no non-secure connection is
/// ever made by this instance, for the manifest, its redirects or the binary.
///
/// Not reentrant: the platform's update partition is a single write session,
/// so one updater must be driven from one polling loop.
pub struct OtaUpdater<N, H, S, D, C = MonotonicClock> {
    manifest_url: String,
    policy: TransportPolicy,
    current_version: u32,
    min_check_interval_ms: u32,
    last_check_ms: Option<u32>,
    network: N,
    http: H,
    storage: S,
    device: D,
    clock: C,
}

impl<N, H, S, D> OtaUpdater<N, H, S, D, MonotonicClock>
where
    N: Connectivity,
    H: HttpClient,
    S: UpdateStorage,
    D: DeviceControl,
{
    pub fn new(config: &UpdaterConfig, network: N, http: H, storage: S, device: D) -> Self {
        Self::with_clock(config, network, http, storage, device, MonotonicClock::new())
    }
}

impl<N, H, S, D, C> OtaUpdater<N, H, S, D, C>
where
    N: Connectivity,
    H: HttpClient,
    S: UpdateStorage,
    D: DeviceControl,
    C: Clock,
{
    pub fn with_clock(config: &UpdaterConfig, network: N, http: H, storage: S, device: D, clock: C) -> Self {
        let mut interval = config.check_interval();
        if interval < MIN_CHECK_INTERVAL {
            log::warn!("Check interval {:?} too short, using {:?}", interval, MIN_CHECK_INTERVAL);
            interval = MIN_CHECK_INTERVAL;
        }
        let min_check_interval_ms = interval.as_millis().min(u32::MAX as u128) as u32;
        Self {
            manifest_url: config.manifest_url.clone(),
            policy: TransportPolicy::for_url(&config.manifest_url),
            current_version: config.current_version,
            min_check_interval_ms,
            last_check_ms: None,
            network,
            http,
            storage,
            device,
            clock,
        }
    }

    pub fn manifest_url(&self) -> &str {
        &self.manifest_url
    }

    pub fn current_version(&self) -> u32 {
        self.current_version
    }

    pub fn is_secure_only(&self) -> bool {
        self.policy.is_secure_only()
    }

    pub fn last_check_ms(&self) -> Option<u32> {
        self.last_check_ms
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    /// Lets the polling loop re-establish the link between checks
    pub fn network_mut(&mut self) -> &mut N {
        &mut self.network
    }

    pub fn http(&self) -> &H {
        &self.http
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Check for an update and, if one is available, fetch and flash it.
    ///
    /// With `force == false` checks are limited to one per configured interval.
    /// Returns false when no update was available or anything failed; after a
    /// successful flash the device restarts, so this never returns true in practice.
    pub fn check_and_update(&mut self, force: bool) -> bool {
        match self.try_check_and_update(force) {
            Ok(CheckOutcome::Throttled) => false,
            Ok(CheckOutcome::UpToDate { published }) => {
                log::info!("Firmware up to date (running {}, published {})", self.current_version, published);
                false
            }
            Err(e) => {
                log::warn!("Update check failed: {}", e);
                false
            }
        }
    }

    /// Same as [`check_and_update`](Self::check_and_update) with the outcome kept structured
    pub fn try_check_and_update(&mut self, force: bool) -> Result<CheckOutcome, UpdateError> {
        let now = self.clock.now_ms();
        if !force {
            if let Some(last) = self.last_check_ms {
                // wrapping_sub keeps this correct across counter overflow
                if now.wrapping_sub(last) < self.min_check_interval_ms {
                    return Ok(CheckOutcome::Throttled);
                }
            }
        }

        // Recorded before anything can fail so a dead link does not cause a retry storm
        self.last_check_ms = Some(now);

        if !self.network.is_connected() {
            log::error!("Wifi not connected");
            return Err(UpdateError::ConnectivityUnavailable);
        }

        log::info!("Checking for updates");

        let resolution = ManifestResolver::new(&mut self.http, self.policy, self.current_version)
            .resolve(&self.manifest_url, DEFAULT_HOP_BUDGET)?;

        let manifest = match resolution {
            Resolution::UpToDate(manifest) => {
                return Ok(CheckOutcome::UpToDate { published: manifest.version });
            }
            Resolution::UpdateAvailable(manifest) => manifest,
        };

        log::info!(
            "Update found ({} -> {}). Performing update",
            self.current_version,
            manifest.version
        );

        let image = FlashWriter::new(&mut self.http, &mut self.storage, &self.network, self.policy)
            .flash(&manifest.binary_url, manifest.digest.as_ref())?;

        image.activate(&mut self.device)
    }
}
