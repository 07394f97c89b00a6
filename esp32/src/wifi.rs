use embedded_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::modem::Modem;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::EspWifi;

use health_monitor_common::network::{LinkError, NetworkLink};

/// Station-mode WiFi seen as a [`NetworkLink`].
///
/// `begin` only configures the radio and starts association; the monitor
/// polls `is_connected` at its own pace.
pub struct EspLink {
    wifi: EspWifi<'static>,
}

impl EspLink {
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
    ) -> anyhow::Result<Self> {
        let wifi = EspWifi::new(modem, sysloop, Some(nvs))?;
        Ok(Self { wifi })
    }
}

impl NetworkLink for EspLink {
    fn begin(&mut self, ssid: &str, password: &str) -> Result<(), LinkError> {
        let wifi_configuration: Configuration = Configuration::Client(ClientConfiguration {
            ssid: ssid
                .try_into()
                .map_err(|_| LinkError::Credentials(format!("SSID too long: {}", ssid)))?,
            bssid: None,
            auth_method: AuthMethod::WPA2Personal,
            password: password
                .try_into()
                .map_err(|_| LinkError::Credentials("password too long".into()))?,
            channel: None,
            ..Default::default()
        });

        self.wifi
            .set_configuration(&wifi_configuration)
            .map_err(|e| LinkError::Start(e.to_string()))?;

        self.wifi.start().map_err(|e| LinkError::Start(e.to_string()))?;
        log::info!("Wifi started");

        self.wifi.connect().map_err(|e| LinkError::Start(e.to_string()))?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false) && self.wifi.sta_netif().is_up().unwrap_or(false)
    }

    fn local_ip(&self) -> Option<String> {
        self.wifi
            .sta_netif()
            .get_ip_info()
            .ok()
            .map(|info| info.ip.to_string())
    }
}
