/// Manifest resolution: fetch the manifest, follow permanent redirects, decide
use crate::error::{ManifestError, UpdateError};
use crate::manifest::UpdateManifest;
use crate::platform::{diagnostic_body, read_bytes, HttpClient, HttpResponse};
use crate::policy::TransportPolicy;

/// Manifest requests allowed per resolution, the first one included
pub const DEFAULT_HOP_BUDGET: u16 = 5;

pub const LOCATION_HEADER: &str = "Location";

const HTTP_OK: u16 = 200;
const HTTP_MOVED_PERMANENTLY: u16 = 301;

// Four short lines; anything longer is not a manifest
pub const MAX_MANIFEST_LEN: usize = 1024;

/// Result of a successful manifest fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Published version is strictly newer than the running one
    UpdateAvailable(UpdateManifest),
    /// Published version is the same or older
    UpToDate(UpdateManifest),
}

impl Resolution {
    pub fn is_available(&self) -> bool {
        matches!(self, Resolution::UpdateAvailable(_))
    }

    pub fn manifest(&self) -> &UpdateManifest {
        match self {
            Resolution::UpdateAvailable(m) | Resolution::UpToDate(m) => m,
        }
    }
}

pub struct ManifestResolver<'a, H> {
    http: &'a mut H,
    policy: TransportPolicy,
    current_version: u32,
}

impl<'a, H: HttpClient> ManifestResolver<'a, H> {
    pub fn new(http: &'a mut H, policy: TransportPolicy, current_version: u32) -> Self {
        Self { http, policy, current_version }
    }

    /// Fetch and evaluate the manifest at `url`.
    ///
    /// Only `301 Moved Permanently` with a `Location` header is followed, and
    /// each hop spends one unit of `hop_budget`. The budget is checked before
    /// every request, so a redirect loop costs at most `hop_budget` requests.
    pub fn resolve(&mut self, url: &str, hop_budget: u16) -> Result<Resolution, UpdateError> {
        let mut url = url.to_string();
        let mut hops_left = hop_budget;

        let body = loop {
            log::debug!("Fetching OTA config from: {}", url);

            if hops_left == 0 {
                log::error!("Too many retries/redirections");
                return Err(UpdateError::TooManyRedirects { budget: hop_budget });
            }

            self.policy.check(&url)?;

            let mut response = self.http.get(&url, &[LOCATION_HEADER]).map_err(|e| {
                log::error!("Error initializing client: {}", e);
                UpdateError::from(e)
            })?;

            let status = response.status();
            if status == HTTP_MOVED_PERMANENTLY {
                if let Some(location) = response.header(LOCATION_HEADER) {
                    log::info!("Manifest moved permanently to {}", location);
                    url = location.to_string();
                    hops_left -= 1;
                    continue;
                }
            }

            if status != HTTP_OK {
                let body = diagnostic_body(&mut response);
                log::error!("[HTTP] [ERROR] [{}] fetching {}", status, url);
                log::debug!("Response:\n{}", body);
                return Err(UpdateError::Http { status, body });
            }

            // One byte past the limit tells a full-size manifest from a cut-off one
            let bytes = read_bytes(&mut response, MAX_MANIFEST_LEN + 1)?;
            if bytes.len() > MAX_MANIFEST_LEN {
                log::error!("Manifest at {} exceeds {} bytes", url, MAX_MANIFEST_LEN);
                return Err(ManifestError::TooLong { limit: MAX_MANIFEST_LEN }.into());
            }
            break String::from_utf8_lossy(&bytes).into_owned();
        };

        let manifest = UpdateManifest::parse(&body).map_err(|e| {
            log::error!("Rejected update manifest: {}", e);
            UpdateError::from(e)
        })?;

        let available = manifest.is_newer_than(self.current_version);

        log::debug!("Fetched update information:");
        log::debug!("File url:           {}", manifest.binary_url);
        log::debug!("File MD5:           {}", manifest.digest.as_ref().map(|d| d.as_str()).unwrap_or(""));
        log::debug!("Current version:    {}", self.current_version);
        log::debug!(
            "Published version:  [{}] {}",
            manifest.version,
            manifest.version_label.as_deref().unwrap_or("")
        );
        log::debug!("Update available:   {}", if available { "YES" } else { "NO" });

        Ok(if available {
            Resolution::UpdateAvailable(manifest)
        } else {
            Resolution::UpToDate(manifest)
        })
    }
}
