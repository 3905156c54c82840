// ESP32 OTA agent: keeps the device on the latest published firmware build.
// The update protocol itself lives in the hardware-independent `ota-core` crate.

#[cfg(target_os = "espidf")]
mod config;
#[cfg(target_os = "espidf")]
mod logging;
#[cfg(target_os = "espidf")]
mod network;
#[cfg(target_os = "espidf")]
mod ota;
#[cfg(target_os = "espidf")]
mod system;
#[cfg(target_os = "espidf")]
mod version;

// Generate ESP-IDF app descriptor
#[cfg(target_os = "espidf")]
#[allow(unexpected_cfgs)]
mod app_desc {
    esp_idf_sys::esp_app_desc!();
}

// How often the loop wakes up; the updater's own interval decides whether to fetch
#[cfg(target_os = "espidf")]
const POLL_PERIOD_MS: u32 = 60 * 1000;

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    use esp_idf_hal::delay::FreeRtos;
    use esp_idf_hal::peripherals::Peripherals;
    use esp_idf_svc::{eventloop::EspSystemEventLoop, nvs::EspDefaultNvsPartition};
    use log::info;
    use ota_core::{Connectivity, OtaUpdater};

    use crate::network::{EspHttpClient, WifiManager};
    use crate::ota::EspUpdateStorage;
    use crate::system::EspDevice;

    // Initialize ESP-IDF
    esp_idf_svc::sys::link_patches();

    // Initialize our logger with colors and timestamps
    logging::init_logger()?;

    info!("ESP32 OTA agent {}", version::full_version());
    info!("Boot reason: {}", system::reset::get_reset_reason());
    if system::reset::was_software_reset() {
        info!("Software reset - possibly the first boot after an update");
    }

    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let config = config::load_or_default(nvs.clone())?;
    if !logging::set_max_level_from_str(&config.log_level) {
        log::warn!("Unknown log level '{}', keeping default", config.log_level);
    }

    let updater_config = config.updater_config();
    updater_config.validate()?;
    info!(
        "Update manifest: {} (check every {}s)",
        updater_config.manifest_url, updater_config.check_interval_secs
    );

    let mut wifi = WifiManager::new(peripherals.modem, sys_loop, nvs, &config.wifi_ssid, &config.wifi_password)?;
    if let Err(e) = wifi.connect() {
        // Not fatal: the loop below retries before every check
        log::warn!("Initial WiFi connection failed: {:?}", e);
    }

    let mut updater = OtaUpdater::new(
        &updater_config,
        wifi,
        EspHttpClient::new(),
        EspUpdateStorage::new()?,
        EspDevice,
    );

    loop {
        if !updater.network().is_connected() {
            if let Err(e) = updater.network_mut().connect() {
                log::warn!("WiFi reconnect failed: {:?}", e);
            }
        }

        // Returns only when there was nothing to flash or the attempt failed
        updater.check_and_update(false);

        FreeRtos::delay_ms(POLL_PERIOD_MS);
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    eprintln!("esp32-ota-agent runs on ESP-IDF targets only; host builds cover the ota-core crate");
    std::process::exit(1);
}
