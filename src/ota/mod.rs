// OTA (Over-The-Air) update module
//
// Update flow (driven by ota_core::OtaUpdater):
// 1. Fetch the manifest, following permanent redirects
// 2. Compare the published build number with ours
// 3. Stream the binary into the next OTA partition, MD5-checked if published
// 4. Set boot partition
// 5. Restart

pub mod storage;

pub use storage::EspUpdateStorage;
