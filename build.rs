use std::env;
use std::fs;
use std::path::Path;

const DEFAULT_MANIFEST_URL: &str = "https://your-ota-server.com/ota/cfg.txt";

fn main() -> anyhow::Result<()> {
    // Necessary for ESP-IDF; nothing to link when building for the host
    if env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }

    // Read WiFi configuration if it exists
    let wifi_config_path = "wifi_config.h";
    println!("cargo:rerun-if-changed={}", wifi_config_path);
    if Path::new(wifi_config_path).exists() {
        let contents = fs::read_to_string(wifi_config_path)?;

        // Parse SSID
        if let Some(ssid_line) = contents.lines().find(|l| l.contains("#define WIFI_SSID")) {
            if let Some(ssid) = ssid_line.split('"').nth(1) {
                println!("cargo:rustc-env=WIFI_SSID={}", ssid);
            }
        }

        // Parse Password
        if let Some(pass_line) = contents.lines().find(|l| l.contains("#define WIFI_PASSWORD")) {
            if let Some(pass) = pass_line.split('"').nth(1) {
                println!("cargo:rustc-env=WIFI_PASSWORD={}", pass);
            }
        }
    } else {
        // Use empty defaults if no config file
        println!("cargo:rustc-env=WIFI_SSID=");
        println!("cargo:rustc-env=WIFI_PASSWORD=");
        println!("cargo:warning=wifi_config.h not found! Copy wifi_config.h.example to wifi_config.h and add your credentials.");
    }

    // Update source and the build number this image reports to it
    println!("cargo:rerun-if-env-changed=OTA_MANIFEST_URL");
    println!("cargo:rerun-if-env-changed=FIRMWARE_BUILD_NUMBER");

    let manifest_url = env::var("OTA_MANIFEST_URL").unwrap_or_else(|_| DEFAULT_MANIFEST_URL.to_string());
    println!("cargo:rustc-env=OTA_MANIFEST_URL={}", manifest_url);

    let build_number = env::var("FIRMWARE_BUILD_NUMBER").unwrap_or_else(|_| "1".to_string());
    if build_number.parse::<u32>().map_or(true, |n| n == 0) {
        anyhow::bail!("FIRMWARE_BUILD_NUMBER must be a positive integer, got '{}'", build_number);
    }
    println!("cargo:rustc-env=FIRMWARE_BUILD_NUMBER={}", build_number);

    Ok(())
}
