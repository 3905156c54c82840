// Centralized version information

// Cargo package version from Cargo.toml
pub const CARGO_VERSION: &str = env!("CARGO_PKG_VERSION");

// Build number compared against the manifest; set by build.rs (validated there)
const BUILD_NUMBER: &str = env!("FIRMWARE_BUILD_NUMBER");

// Compiled-in manifest location, used until NVS holds one
pub const MANIFEST_URL: &str = env!("OTA_MANIFEST_URL");

pub fn build_number() -> u32 {
    BUILD_NUMBER.parse().unwrap_or(1)
}

// Full version string including Cargo version
pub fn full_version() -> String {
    format!("build {} ({})", build_number(), CARGO_VERSION)
}
