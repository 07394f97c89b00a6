use std::time::Duration;

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::prelude::Peripherals;
use esp_idf_svc::log::EspLogger;
use esp_idf_svc::nvs::EspDefaultNvsPartition;

use health_monitor_common::sensor::AnalogPulseSensor;
use health_monitor_common::transport::TcpTransport;
use health_monitor_common::{Clock, Collaborators, Monitor, MonitorConfig, MonotonicClock};

mod dht22;
mod http;
mod led;
mod pulse;
mod wifi;

const SSID: &str = env!("WIFI_SSID");
const PASSWORD: &str = env!("WIFI_PASS");

/// Our App struct that holds the monitor wired to the board's peripherals.
struct App {
    monitor: Monitor,
    clock: MonotonicClock,
}

impl App {
    /// Create a new App struct.
    ///
    /// Takes the peripherals and builds one driver per attached device:
    /// pulse sensor on GPIO34, DHT22 on GPIO4, heartbeat LED on GPIO5 and
    /// send LED on GPIO18.
    fn new() -> anyhow::Result<Self> {
        let peripherals = Peripherals::take()?;
        let sysloop = EspSystemEventLoop::take()?;
        let nvs = EspDefaultNvsPartition::take()?;

        let mut config = MonitorConfig::analog_pulse();
        config.wifi.ssid = SSID.into();
        config.wifi.password = PASSWORD.into();
        config.dashboard.auth_token = option_env!("BLYNK_AUTH_TOKEN").unwrap_or_default().into();
        config.logging.api_key = option_env!("THINGSPEAK_API_KEY").unwrap_or_default().into();

        let pulse = pulse::AdcPulseInput::new(peripherals.adc1, peripherals.pins.gpio34)?;

        let collaborators = Collaborators {
            sensors: vec![
                Box::new(AnalogPulseSensor::new(pulse)),
                Box::new(dht22::Dht22::new(4)),
            ],
            link: Box::new(wifi::EspLink::new(peripherals.modem, sysloop, nvs)?),
            telemetry: Box::new(http::BlynkHttp::new(http::BlynkHttp::DEFAULT_SERVER)),
            transport: Box::new(TcpTransport::new(TcpTransport::DEFAULT_TIMEOUT)),
            heartbeat_led: Box::new(led::LedPin::new(peripherals.pins.gpio5)?),
            send_led: Box::new(led::LedPin::new(peripherals.pins.gpio18)?),
        };

        Ok(Self {
            monitor: Monitor::new(config, collaborators),
            clock: MonotonicClock::new(),
        })
    }

    /// Run the App: bring up sensors and WiFi, then tick the scheduler forever.
    fn run(&mut self) -> anyhow::Result<()> {
        self.monitor.start();
        self.monitor.connect(&self.clock, |ms| {
            std::thread::sleep(Duration::from_millis(ms.into()))
        });

        let tick = Duration::from_millis(self.monitor.config().timing.tick_ms.into());
        let mut scheduler = self.monitor.scheduler(self.clock.now_ms());

        loop {
            scheduler.tick(&mut self.monitor, self.clock.now_ms());
            std::thread::sleep(tick);
        }
    }
}

fn main() -> anyhow::Result<()> {
    // It is necessary to call this function once. Otherwise some patches to the runtime
    // implemented by esp-idf-sys might not link properly. See https://github.com/esp-rs/esp-idf-template/issues/71
    esp_idf_svc::sys::link_patches();

    // Bind the log crate to the ESP Logging facilities
    EspLogger::initialize_default();

    let mut app = App::new()?;

    app.run()
}
