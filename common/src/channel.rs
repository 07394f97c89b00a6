use serde::{Deserialize, Serialize};

/// One named measurement stream of the monitor.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Heart rate in beats per minute.
    HeartRate,
    /// Blood-oxygen saturation in percent.
    #[serde(rename = "spo2")]
    SpO2,
    /// Body or ambient temperature in °C.
    Temperature,
    /// Relative humidity in percent.
    Humidity,
}

impl Channel {
    pub const ALL: [Channel; 4] = [
        Channel::HeartRate,
        Channel::SpO2,
        Channel::Temperature,
        Channel::Humidity,
    ];

    /// Human readable name used on the status line.
    pub const fn label(&self) -> &'static str {
        match self {
            Channel::HeartRate => "Heart Rate",
            Channel::SpO2 => "SpO2",
            Channel::Temperature => "Temperature",
            Channel::Humidity => "Humidity",
        }
    }

    pub const fn unit(&self) -> &'static str {
        match self {
            Channel::HeartRate => "bpm",
            Channel::SpO2 => "%",
            Channel::Temperature => "°C",
            Channel::Humidity => "%",
        }
    }
}

impl core::fmt::Display for Channel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

/// The latest reading of one channel.
///
/// An invalid sample always carries a value of `0.0`, so it can be reported
/// in fixed-layout records without leaking the raw driver output.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Sample {
    pub value: f32,
    pub valid: bool,
    /// Monotonic milliseconds at capture.
    pub timestamp: u32,
}

impl Sample {
    pub const fn valid(value: f32, timestamp: u32) -> Self {
        Self {
            value,
            valid: true,
            timestamp,
        }
    }

    pub const fn invalid(timestamp: u32) -> Self {
        Self {
            value: 0.0,
            valid: false,
            timestamp,
        }
    }

    /// The value if the sample is valid.
    pub fn reading(&self) -> Option<f32> {
        self.valid.then_some(self.value)
    }
}
