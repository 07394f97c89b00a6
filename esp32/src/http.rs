use embedded_svc::http::{client::Client as HttpClient, Method};
use esp_idf_svc::http::client::EspHttpConnection;

use health_monitor_common::uplink::{TelemetryChannel, TelemetryError, VirtualPin};

pub fn new_client() -> anyhow::Result<HttpClient<EspHttpConnection>> {
    let connection = EspHttpConnection::new(&Default::default())?;
    Ok(HttpClient::wrap(connection))
}

/// Dashboard updates through the Blynk HTTP API, one GET per datastream.
pub struct BlynkHttp {
    server: String,
    client: Option<HttpClient<EspHttpConnection>>,
    token: String,
}

impl BlynkHttp {
    pub const DEFAULT_SERVER: &'static str = "http://blynk.cloud";

    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            client: None,
            token: String::new(),
        }
    }
}

impl TelemetryChannel for BlynkHttp {
    fn initialize(&mut self, auth_token: &str, _ssid: &str, _password: &str) -> Result<(), TelemetryError> {
        if auth_token.is_empty() {
            return Err(TelemetryError::Rejected("missing auth token".into()));
        }
        let client = new_client().map_err(|e| TelemetryError::Unreachable(e.to_string()))?;
        self.client = Some(client);
        self.token = auth_token.to_string();
        Ok(())
    }

    // Stateless HTTP, nothing to service between requests.
    fn pump(&mut self) {}

    fn publish(&mut self, pin: VirtualPin, value: f32) -> Result<(), TelemetryError> {
        let client = self.client.as_mut().ok_or(TelemetryError::NotInitialized)?;

        let url = format!(
            "{}/external/api/update?token={}&{}={:.1}",
            self.server, self.token, pin, value
        );
        let headers = [("accept", "text/plain")];

        let request = client
            .request(Method::Get, &url, &headers)
            .map_err(|e| TelemetryError::Unreachable(e.to_string()))?;
        log::debug!("-> GET {}/external/api/update ({})", self.server, pin);
        let response = request
            .submit()
            .map_err(|e| TelemetryError::Unreachable(e.to_string()))?;

        let status = response.status();
        log::debug!("<- {}", status);
        match status {
            200..=299 => Ok(()),
            _ => Err(TelemetryError::Rejected(format!("HTTP {}", status))),
        }
    }
}
