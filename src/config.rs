use anyhow::Result;
use serde::{Deserialize, Serialize};
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs};
use ota_core::UpdaterConfig;

const CONFIG_NAMESPACE: &str = "ota_agent";
const CONFIG_KEY: &str = "config";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // WiFi settings
    pub wifi_ssid: String,
    pub wifi_password: String,

    // OTA settings
    pub ota_manifest_url: String,
    pub ota_check_interval_secs: u32,

    // Logging
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        // Get WiFi credentials from environment variables set by build.rs
        // These come from wifi_config.h which should NOT be committed to git
        let wifi_ssid = env!("WIFI_SSID");
        let wifi_password = env!("WIFI_PASSWORD");

        log::info!("Config default: SSID='{}', Password={}",
            wifi_ssid,
            if wifi_password.is_empty() { "<empty>" } else { "<set>" }
        );

        Self {
            wifi_ssid: wifi_ssid.to_string(),
            wifi_password: wifi_password.to_string(),
            ota_manifest_url: crate::version::MANIFEST_URL.to_string(),
            ota_check_interval_secs: ota_core::config::DEFAULT_CHECK_INTERVAL.as_secs() as u32,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn save(&self, nvs_partition: EspDefaultNvsPartition) -> Result<()> {
        save_to_nvs(self, nvs_partition)?;
        log::info!("Configuration saved to NVS");
        Ok(())
    }

    /// The running build number always comes from the image itself, never from NVS,
    /// otherwise a freshly flashed image would keep reporting its predecessor's version.
    pub fn updater_config(&self) -> UpdaterConfig {
        UpdaterConfig {
            manifest_url: self.ota_manifest_url.clone(),
            current_version: crate::version::build_number(),
            check_interval_secs: self.ota_check_interval_secs,
        }
    }
}

pub fn load_or_default(nvs_partition: EspDefaultNvsPartition) -> Result<Config> {
    match load_from_nvs(nvs_partition.clone()) {
        Ok(mut config) => {
            log::info!("Loaded configuration from NVS");

            // If NVS has empty WiFi credentials, use the compiled-in ones
            if config.wifi_ssid.is_empty() || config.wifi_password.is_empty() {
                let default_config = Config::default();
                log::warn!("NVS WiFi credentials empty, using compiled defaults: SSID='{}'", default_config.wifi_ssid);
                config.wifi_ssid = default_config.wifi_ssid;
                config.wifi_password = default_config.wifi_password;

                // Save the updated config back to NVS
                if let Err(e) = config.save(nvs_partition) {
                    log::warn!("Failed to save updated config with WiFi credentials: {:?}", e);
                }
            }

            Ok(config)
        }
        Err(e) => {
            log::warn!("Failed to load config from NVS: {:?}, using defaults", e);
            let config = Config::default();

            // Try to save default config to NVS for next time
            if let Err(save_err) = config.save(nvs_partition) {
                log::warn!("Failed to save default config to NVS: {:?}", save_err);
            }

            Ok(config)
        }
    }
}

fn load_from_nvs(nvs_partition: EspDefaultNvsPartition) -> Result<Config> {
    let nvs = EspNvs::new(nvs_partition, CONFIG_NAMESPACE, true)?;

    let mut buf = vec![0u8; 1024]; // Max config size
    let data = nvs.get_blob(CONFIG_KEY, &mut buf)?
        .ok_or_else(|| anyhow::anyhow!("Config not found in NVS"))?;

    let config: Config = serde_json::from_slice(data)?;

    Ok(config)
}

fn save_to_nvs(config: &Config, nvs_partition: EspDefaultNvsPartition) -> Result<()> {
    let mut nvs = EspNvs::new(nvs_partition, CONFIG_NAMESPACE, true)?;

    let json = serde_json::to_vec(config)?;
    nvs.set_blob(CONFIG_KEY, &json)?;

    Ok(())
}
