/// Secure-transport policy shared by the resolver and the flash writer
use crate::error::UpdateError;

const HTTPS_PREFIX: &str = "https://";

/// Returns true if the URL uses the secure scheme (case-insensitive)
pub fn is_secure_url(url: &str) -> bool {
    url.len() >= HTTPS_PREFIX.len()
        && url.as_bytes()[..HTTPS_PREFIX.len()].eq_ignore_ascii_case(HTTPS_PREFIX.as_bytes())
}

/// Session-wide transport constraint.
///
/// Derived once from the manifest URL: an updater created with an `https://`
/// URL never makes a plain HTTP connection afterwards, redirects included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportPolicy {
    secure_only: bool,
}

impl TransportPolicy {
    pub fn for_url(url: &str) -> Self {
        Self { secure_only: is_secure_url(url) }
    }

    pub fn is_secure_only(&self) -> bool {
        self.secure_only
    }

    pub fn check(&self, url: &str) -> Result<(), UpdateError> {
        if self.secure_only && !is_secure_url(url) {
            log::error!("Trying to access a non-ssl URL on a secure update checker: {}", url);
            return Err(UpdateError::InsecureUrlRejected { url: url.to_string() });
        }
        Ok(())
    }
}
