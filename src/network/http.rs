// HTTP transport for the updater, on top of the ESP-IDF HTTP client

use embedded_svc::http::Method;
use esp_idf_svc::http::client::{Configuration as HttpConfig, EspHttpConnection, FollowRedirectsPolicy};
use esp_idf_svc::sys::EspError;
use ota_core::config::CONNECTION_TIMEOUT;
use ota_core::{HttpClient, HttpResponse, TransportError};

const BUFFER_SIZE: usize = 4096;

fn transport_err(context: &str, err: EspError) -> TransportError {
    TransportError::new(format!("{}: {}", context, err))
}

/// One fresh connection per request; the previous one is dropped first
#[derive(Default)]
pub struct EspHttpClient {
    connection: Option<EspHttpConnection>,
}

impl EspHttpClient {
    pub fn new() -> Self {
        Self { connection: None }
    }
}

pub struct EspResponse<'a> {
    conn: &'a mut EspHttpConnection,
}

impl HttpClient for EspHttpClient {
    type Response<'a> = EspResponse<'a> where Self: 'a;

    // esp_http_client keeps every response header, so `collect_headers` needs no setup here
    fn get(&mut self, url: &str, _collect_headers: &[&str]) -> Result<Self::Response<'_>, TransportError> {
        self.connection = None;

        let config = HttpConfig {
            buffer_size: Some(BUFFER_SIZE),
            timeout: Some(CONNECTION_TIMEOUT),
            // 301 handling belongs to the resolver, which enforces the hop budget and https policy
            follow_redirects_policy: FollowRedirectsPolicy::FollowNone,
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        };

        let conn = self
            .connection
            .insert(EspHttpConnection::new(&config).map_err(|e| transport_err("client init", e))?);

        conn.initiate_request(Method::Get, url, &[])
            .map_err(|e| transport_err("request", e))?;
        conn.initiate_response().map_err(|e| transport_err("response", e))?;

        log::debug!("GET {} -> {}", url, conn.status());
        Ok(EspResponse { conn })
    }
}

impl HttpResponse for EspResponse<'_> {
    fn status(&self) -> u16 {
        self.conn.status()
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.conn.header(name)
    }

    fn content_length(&self) -> Option<u64> {
        self.conn.header("Content-Length").and_then(|v| v.trim().parse().ok())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        self.conn.read(buf).map_err(|e| transport_err("read", e))
    }
}
