/// Reset handling: boot reason reporting and the post-update restart

use esp_idf_hal::delay::FreeRtos;
use log::info;
use ota_core::DeviceControl;

/// Restart primitive handed to the updater
pub struct EspDevice;

impl DeviceControl for EspDevice {
    fn restart(&mut self) -> ! {
        info!("Restarting into the new firmware...");

        // Ensure log is flushed and give UART output time to drain
        log::logger().flush();
        FreeRtos::delay_ms(1000);

        esp_idf_hal::reset::restart()
    }
}

/// Get the last reset reason as a string
pub fn get_reset_reason() -> &'static str {
    let reason = unsafe { esp_idf_sys::esp_reset_reason() };

    match reason {
        esp_idf_sys::esp_reset_reason_t_ESP_RST_UNKNOWN => "Unknown",
        esp_idf_sys::esp_reset_reason_t_ESP_RST_POWERON => "Power-on",
        esp_idf_sys::esp_reset_reason_t_ESP_RST_EXT => "External pin",
        esp_idf_sys::esp_reset_reason_t_ESP_RST_SW => "Software reset",
        esp_idf_sys::esp_reset_reason_t_ESP_RST_PANIC => "Panic",
        esp_idf_sys::esp_reset_reason_t_ESP_RST_INT_WDT => "Interrupt watchdog",
        esp_idf_sys::esp_reset_reason_t_ESP_RST_TASK_WDT => "Task watchdog",
        esp_idf_sys::esp_reset_reason_t_ESP_RST_WDT => "Other watchdog",
        esp_idf_sys::esp_reset_reason_t_ESP_RST_DEEPSLEEP => "Deep sleep",
        esp_idf_sys::esp_reset_reason_t_ESP_RST_BROWNOUT => "Brownout",
        esp_idf_sys::esp_reset_reason_t_ESP_RST_SDIO => "SDIO",
        _ => "Unknown reason code",
    }
}

/// Software reset is what the updater leaves behind after flashing
pub fn was_software_reset() -> bool {
    let reason = unsafe { esp_idf_sys::esp_reset_reason() };
    reason == esp_idf_sys::esp_reset_reason_t_ESP_RST_SW
}
