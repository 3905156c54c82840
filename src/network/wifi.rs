use anyhow::{Result, bail};
use esp_idf_hal::modem::Modem;
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    wifi::{
        ClientConfiguration, Configuration, EspWifi,
        AuthMethod, BlockingWifi,
    },
    nvs::EspDefaultNvsPartition,
};
use ota_core::Connectivity;

pub struct WifiManager {
    wifi: BlockingWifi<EspWifi<'static>>,
    pub ssid: String,
}

impl WifiManager {
    pub fn new(
        modem: Modem,
        sys_loop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
        ssid: &str,
        password: &str,
    ) -> Result<Self> {
        log::info!("Initializing WiFi manager for SSID: '{}'", ssid);

        // Check if credentials are empty
        if ssid.is_empty() {
            log::error!("WiFi SSID is empty! Check wifi_config.h");
            bail!("WiFi SSID cannot be empty");
        }

        let mut esp_wifi = EspWifi::new(modem, sys_loop.clone(), Some(nvs))?;

        // Configure WiFi
        let cfg = Configuration::Client(ClientConfiguration {
            ssid: ssid.try_into()
                .map_err(|e| {
                    log::error!("Failed to convert SSID '{}': {:?}", ssid, e);
                    anyhow::anyhow!("Invalid SSID format: {}", ssid)
                })?,
            password: password.try_into()
                .map_err(|e| {
                    log::error!("Failed to convert password: {:?}", e);
                    anyhow::anyhow!("Invalid password format")
                })?,
            auth_method: if password.is_empty() {
                log::warn!("WiFi password is empty, using open network");
                AuthMethod::None
            } else {
                log::info!("Using WPA2 authentication");
                AuthMethod::WPA2Personal
            },
            ..Default::default()
        });

        log::info!("Setting WiFi configuration...");
        esp_wifi.set_configuration(&cfg)?;

        let wifi = BlockingWifi::wrap(esp_wifi, sys_loop)?;

        log::info!("WiFi manager initialized successfully");
        Ok(Self {
            wifi,
            ssid: ssid.to_string(),
        })
    }

    pub fn connect(&mut self) -> Result<()> {
        if !self.wifi.is_started()? {
            log::info!("Starting WiFi...");
            self.wifi.start()?;
        }

        log::info!("Connecting to {}...", self.ssid);
        self.wifi.connect()?;

        log::info!("Waiting for DHCP...");
        self.wifi.wait_netif_up()?;

        log::info!("WiFi connected, IP: {:?}", self.get_ip());
        Ok(())
    }

    pub fn get_ip(&self) -> Option<String> {
        self.wifi.wifi().sta_netif().get_ip_info().ok()
            .map(|ip_info| format!("{}", ip_info.ip))
    }
}

impl Connectivity for WifiManager {
    fn is_connected(&self) -> bool {
        match self.wifi.is_up() {
            Ok(up) => up,
            Err(e) => {
                log::warn!("Failed to query WiFi state: {:?}", e);
                false
            }
        }
    }
}
