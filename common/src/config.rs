//! Monitor configuration.
//!
//! Everything has a default, so a JSON file only needs the keys it wants to
//! change. Credentials are usually injected from the environment.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::channel::Channel;
use crate::network::RetryPolicy;
use crate::uplink::VirtualPin;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Which sensor set the device carries.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Analog pulse sensor plus a temperature/humidity sensor.
    AnalogPulse,
    /// Pulse oximeter plus a one-wire body thermometer.
    #[default]
    Oximeter,
}

impl Variant {
    pub const fn channels(&self) -> &'static [Channel] {
        match self {
            Variant::AnalogPulse => &[Channel::HeartRate, Channel::Temperature, Channel::Humidity],
            Variant::Oximeter => &[Channel::HeartRate, Channel::SpO2, Channel::Temperature],
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct TimingConfig {
    /// Pause of the main loop between iterations.
    pub tick_ms: u32,
    /// Sampling and dashboard cadence.
    pub sample_ms: u32,
    /// Logging uplink cadence.
    pub upload_ms: u32,
    /// On-time of the heartbeat LED per detected beat.
    pub beat_pulse_ms: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            sample_ms: 1_000,
            upload_ms: 15_000,
            beat_pulse_ms: 50,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct WifiConfig {
    pub ssid: String,
    pub password: String,
    pub policy: RetryPolicy,
    pub retry_interval_ms: u32,
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            ssid: String::new(),
            password: String::new(),
            policy: RetryPolicy::default(),
            retry_interval_ms: 500,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PinAssignment {
    pub channel: Channel,
    pub pin: VirtualPin,
}

impl PinAssignment {
    pub const fn new(channel: Channel, pin: u8) -> Self {
        Self {
            channel,
            pin: VirtualPin(pin),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    pub auth_token: String,
    pub pins: Vec<PinAssignment>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldAssignment {
    pub channel: Channel,
    pub field: u8,
}

impl FieldAssignment {
    pub const fn new(channel: Channel, field: u8) -> Self {
        Self { channel, field }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub host: String,
    pub port: u16,
    pub path: String,
    pub api_key: String,
    pub fields: Vec<FieldAssignment>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            host: "api.thingspeak.com".into(),
            port: 80,
            path: "/update".into(),
            api_key: String::new(),
            fields: Vec::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    pub variant: Variant,
    pub timing: TimingConfig,
    pub wifi: WifiConfig,
    pub dashboard: DashboardConfig,
    pub logging: LoggingConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::oximeter()
    }
}

impl MonitorConfig {
    /// Pulse oximeter + body thermometer, gives up on WiFi after 20 attempts.
    pub fn oximeter() -> Self {
        Self::for_variant(Variant::Oximeter, RetryPolicy::Bounded { attempts: 20 })
    }

    /// Analog pulse sensor + temperature/humidity, waits for WiFi forever.
    pub fn analog_pulse() -> Self {
        Self::for_variant(Variant::AnalogPulse, RetryPolicy::Unbounded)
    }

    fn for_variant(variant: Variant, policy: RetryPolicy) -> Self {
        let channels = variant.channels();
        Self {
            variant,
            timing: TimingConfig::default(),
            wifi: WifiConfig {
                policy,
                ..WifiConfig::default()
            },
            dashboard: DashboardConfig {
                auth_token: String::new(),
                pins: (1u8..)
                    .zip(channels)
                    .map(|(n, c)| PinAssignment::new(*c, n))
                    .collect(),
            },
            logging: LoggingConfig {
                fields: (1u8..)
                    .zip(channels)
                    .map(|(n, c)| FieldAssignment::new(*c, n))
                    .collect(),
                ..LoggingConfig::default()
            },
        }
    }

    pub fn preset(variant: Variant) -> Self {
        match variant {
            Variant::AnalogPulse => Self::analog_pulse(),
            Variant::Oximeter => Self::oximeter(),
        }
    }

    /// Parses `json` on top of the preset of the variant it names, so a
    /// file only has to list what differs from that preset.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let overlay: Value = serde_json::from_str(json)?;
        let variant = match overlay.get("variant") {
            Some(v) => Variant::deserialize(v)?,
            None => Variant::default(),
        };

        let mut merged = serde_json::to_value(Self::preset(variant))?;
        merge(&mut merged, overlay);

        let config: Self = serde_json::from_value(merged)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Overrides credentials from `WIFI_SSID`, `WIFI_PASS`,
    /// `BLYNK_AUTH_TOKEN` and `THINGSPEAK_API_KEY`, looked up through `var`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(ssid) = var("WIFI_SSID") {
            self.wifi.ssid = ssid;
        }
        if let Some(password) = var("WIFI_PASS") {
            self.wifi.password = password;
        }
        if let Some(token) = var("BLYNK_AUTH_TOKEN") {
            self.dashboard.auth_token = token;
        }
        if let Some(key) = var("THINGSPEAK_API_KEY") {
            self.logging.api_key = key;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let timing = &self.timing;
        if timing.tick_ms == 0 || timing.sample_ms == 0 || timing.upload_ms == 0 {
            return Err(ConfigError::Invalid("cadences must be non-zero".into()));
        }
        if self.wifi.retry_interval_ms == 0 {
            return Err(ConfigError::Invalid("WiFi retry interval must be non-zero".into()));
        }
        if timing.sample_ms > timing.upload_ms {
            return Err(ConfigError::Invalid(
                "sample cadence must not exceed upload cadence".into(),
            ));
        }

        let channels = self.variant.channels();
        let mut seen = Vec::new();
        for f in &self.logging.fields {
            if !(1..=8).contains(&f.field) {
                return Err(ConfigError::Invalid(format!("field{} is out of range", f.field)));
            }
            if seen.contains(&f.field) {
                return Err(ConfigError::Invalid(format!("field{} assigned twice", f.field)));
            }
            if !channels.contains(&f.channel) {
                return Err(ConfigError::Invalid(format!(
                    "{} is not measured by this variant",
                    f.channel
                )));
            }
            seen.push(f.field);
        }

        for p in &self.dashboard.pins {
            if !channels.contains(&p.channel) {
                return Err(ConfigError::Invalid(format!(
                    "{} is not measured by this variant",
                    p.channel
                )));
            }
        }
        Ok(())
    }
}

/// Objects merge key by key; anything else in `overlay` replaces `base`.
fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                merge(base.entry(key).or_insert(Value::Null), value);
            }
        }
        (base, overlay) => *base = overlay,
    }
}
