pub mod http;
pub mod wifi;

pub use http::EspHttpClient;
pub use wifi::WifiManager;
