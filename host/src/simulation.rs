//! Simulated hardware for running the monitor on a desktop.
//!
//! The sensors produce plausible but noisy values and now and then drop out,
//! so the validation and skip paths get exercised too.

use std::cell::Cell;
use std::time::{Duration, Instant};

use health_monitor_common::indicator::IndicatorPin;
use health_monitor_common::network::{LinkError, NetworkLink};
use health_monitor_common::sensor::{
    AnalogInput, AnalogPulseSensor, SensorDriver, SensorError, SensorEvent, SensorPointer,
};
use health_monitor_common::transport::{TcpTransport, Transport, TransportError};
use health_monitor_common::uplink::{TelemetryChannel, TelemetryError, VirtualPin};
use health_monitor_common::validator::DISCONNECTED_SENTINEL;
use health_monitor_common::{Channel, Collaborators, MonitorConfig, Variant};

/// Photo-interrupter output: a sine swinging around the beat threshold.
pub struct SimulatedPulseInput {
    rng: fastrand::Rng,
    phase: f32,
}

impl SimulatedPulseInput {
    /// Reads per simulated heartbeat.
    const READS_PER_BEAT: f32 = 8.0;

    pub fn new(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
            phase: 0.0,
        }
    }
}

impl AnalogInput for SimulatedPulseInput {
    fn read_raw(&mut self) -> Result<u16, SensorError> {
        self.phase += std::f32::consts::TAU / Self::READS_PER_BEAT;
        let noise = self.rng.i32(-15..=15) as f32;
        let raw = 500.0 + 100.0 * self.phase.sin() + noise;
        Ok(raw.clamp(0.0, 1023.0) as u16)
    }
}

const CLIMATE_CHANNELS: [Channel; 2] = [Channel::Temperature, Channel::Humidity];

/// Ambient temperature/humidity sensor that fails one read in twenty.
pub struct SimulatedClimateSensor {
    rng: fastrand::Rng,
    temperature: f32,
    humidity: f32,
}

impl SimulatedClimateSensor {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
            temperature: 23.5,
            humidity: 45.0,
        }
    }

    fn drift(&mut self, value: f32, step: f32, min: f32, max: f32) -> f32 {
        (value + (self.rng.f32() - 0.5) * step).clamp(min, max)
    }
}

impl SensorDriver for SimulatedClimateSensor {
    fn name(&self) -> &'static str {
        "DHT sensor"
    }

    fn channels(&self) -> &[Channel] {
        &CLIMATE_CHANNELS
    }

    fn initialize(&mut self) -> Result<(), SensorError> {
        Ok(())
    }

    fn sample(&mut self, channel: Channel) -> Option<f32> {
        if self.rng.u8(0..20) == 0 {
            return Some(f32::NAN);
        }
        match channel {
            Channel::Temperature => {
                self.temperature = self.drift(self.temperature, 0.4, 18.0, 30.0);
                Some(self.temperature)
            }
            Channel::Humidity => {
                self.humidity = self.drift(self.humidity, 2.0, 20.0, 80.0);
                Some(self.humidity)
            }
            _ => None,
        }
    }
}

const OXIMETER_CHANNELS: [Channel; 2] = [Channel::HeartRate, Channel::SpO2];

/// Pulse oximeter with a finger that is occasionally lifted off the sensor.
pub struct SimulatedOximeter {
    rng: fastrand::Rng,
    bpm: f32,
    spo2: f32,
    finger_present: bool,
    next_beat: Instant,
    pending: Option<SensorEvent>,
}

impl SimulatedOximeter {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
            bpm: 72.0,
            spo2: 97.0,
            finger_present: true,
            next_beat: Instant::now(),
            pending: None,
        }
    }

    fn beat_interval(&self) -> Duration {
        Duration::from_secs_f32(60.0 / self.bpm)
    }
}

impl SensorDriver for SimulatedOximeter {
    fn name(&self) -> &'static str {
        "pulse oximeter"
    }

    fn channels(&self) -> &[Channel] {
        &OXIMETER_CHANNELS
    }

    fn initialize(&mut self) -> Result<(), SensorError> {
        self.next_beat = Instant::now() + self.beat_interval();
        Ok(())
    }

    fn sample(&mut self, channel: Channel) -> Option<f32> {
        if !self.finger_present {
            return Some(0.0);
        }
        match channel {
            Channel::HeartRate => Some(self.bpm),
            Channel::SpO2 => Some(self.spo2),
            _ => None,
        }
    }

    fn update(&mut self) {
        // The finger comes and goes every few hundred iterations.
        if self.rng.u16(0..300) == 0 {
            self.finger_present = !self.finger_present;
            log::debug!("Simulated finger {}", if self.finger_present { "placed" } else { "lifted" });
        }
        if !self.finger_present {
            return;
        }

        let now = Instant::now();
        if now >= self.next_beat {
            self.bpm = (self.bpm + (self.rng.f32() - 0.5) * 4.0).clamp(55.0, 110.0);
            self.spo2 = (self.spo2 + (self.rng.f32() - 0.5)).clamp(93.0, 100.0);
            self.next_beat = now + self.beat_interval();
            self.pending = Some(SensorEvent::BeatDetected);
        }
    }

    fn poll_event(&mut self) -> Option<SensorEvent> {
        self.pending.take()
    }
}

const THERMOMETER_CHANNELS: [Channel; 1] = [Channel::Temperature];

/// One-wire body thermometer that sometimes reads as disconnected.
pub struct SimulatedThermometer {
    rng: fastrand::Rng,
    temperature: f32,
}

impl SimulatedThermometer {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
            temperature: 36.6,
        }
    }
}

impl SensorDriver for SimulatedThermometer {
    fn name(&self) -> &'static str {
        "body thermometer"
    }

    fn channels(&self) -> &[Channel] {
        &THERMOMETER_CHANNELS
    }

    fn initialize(&mut self) -> Result<(), SensorError> {
        Ok(())
    }

    fn sample(&mut self, channel: Channel) -> Option<f32> {
        if channel != Channel::Temperature {
            return None;
        }
        if self.rng.u8(0..30) == 0 {
            return Some(DISCONNECTED_SENTINEL);
        }
        self.temperature = (self.temperature + (self.rng.f32() - 0.5) * 0.2).clamp(35.5, 38.5);
        Some(self.temperature)
    }
}

/// Dashboard stand-in that logs every publish with the wall-clock time.
#[derive(Default)]
pub struct ConsoleTelemetry {
    session: Option<String>,
}

impl TelemetryChannel for ConsoleTelemetry {
    fn initialize(&mut self, auth_token: &str, ssid: &str, _password: &str) -> Result<(), TelemetryError> {
        if auth_token.is_empty() {
            log::warn!("No dashboard auth token set, publishing to the console only");
        }
        self.session = Some(format!("{}@{}", auth_token, ssid));
        Ok(())
    }

    fn pump(&mut self) {}

    fn publish(&mut self, pin: VirtualPin, value: f32) -> Result<(), TelemetryError> {
        if self.session.is_none() {
            return Err(TelemetryError::NotInitialized);
        }
        log::debug!(
            "[{}] {} <- {:.1}",
            chrono::Local::now().format("%H:%M:%S"),
            pin,
            value
        );
        Ok(())
    }
}

/// Network link that comes up after a few polls, or never when offline.
pub struct SimulatedLink {
    polls: Cell<u32>,
    up_after: Option<u32>,
}

impl SimulatedLink {
    pub fn new(up_after: Option<u32>) -> Self {
        Self {
            polls: Cell::new(0),
            up_after,
        }
    }
}

impl NetworkLink for SimulatedLink {
    fn begin(&mut self, ssid: &str, _password: &str) -> Result<(), LinkError> {
        log::debug!("Simulated association with '{}'", ssid);
        self.polls.set(0);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        let polls = self.polls.get();
        self.polls.set(polls.saturating_add(1));
        self.up_after.is_some_and(|n| polls >= n)
    }

    fn local_ip(&self) -> Option<String> {
        Some("127.0.0.1".into())
    }
}

/// Transport that logs the request instead of sending it.
#[derive(Default)]
pub struct DryRunTransport {
    target: Option<String>,
}

impl Transport for DryRunTransport {
    fn open(&mut self, host: &str, port: u16) -> Result<(), TransportError> {
        self.target = Some(format!("{}:{}", host, port));
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let target = self.target.as_deref().ok_or(TransportError::NotConnected)?;
        log::info!("Dry run, {} bytes not sent to {}", bytes.len(), target);
        log::debug!("{}", String::from_utf8_lossy(bytes));
        Ok(())
    }

    fn close(&mut self) {
        self.target = None;
    }
}

pub struct ConsolePin {
    name: &'static str,
}

impl ConsolePin {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl IndicatorPin for ConsolePin {
    fn set(&mut self, on: bool) {
        log::trace!("{} LED {}", self.name, if on { "on" } else { "off" });
    }
}

/// Wires simulated hardware for the configured variant.
///
/// Requests go out over TCP only when a logging api key is configured.
pub fn collaborators(config: &MonitorConfig, offline: bool, seed: u64) -> Collaborators {
    let sensors: Vec<SensorPointer> = match config.variant {
        Variant::AnalogPulse => vec![
            Box::new(AnalogPulseSensor::new(SimulatedPulseInput::new(seed))),
            Box::new(SimulatedClimateSensor::new(seed.wrapping_add(1))),
        ],
        Variant::Oximeter => vec![
            Box::new(SimulatedOximeter::new(seed)),
            Box::new(SimulatedThermometer::new(seed.wrapping_add(1))),
        ],
    };

    let transport: Box<dyn Transport> = if config.logging.api_key.is_empty() {
        Box::new(DryRunTransport::default())
    } else {
        Box::new(TcpTransport::new(TcpTransport::DEFAULT_TIMEOUT))
    };

    Collaborators {
        sensors,
        link: Box::new(SimulatedLink::new(if offline { None } else { Some(3) })),
        telemetry: Box::new(ConsoleTelemetry::default()),
        transport,
        heartbeat_led: Box::new(ConsolePin::new("heartbeat")),
        send_led: Box::new(ConsolePin::new("send")),
    }
}
