//! Analog pulse sensor (KY-039 style photo-interrupter on an ADC pin).
//!
//! There is no peak detection: the heart rate is a straight linear map of
//! the raw ADC count, and a beat is reported whenever the signal rises above
//! a fixed threshold.

use super::{SensorDriver, SensorError, SensorEvent};
use crate::channel::Channel;

/// Source of raw ADC counts.
pub trait AnalogInput {
    fn read_raw(&mut self) -> Result<u16, SensorError>;
}

/// Linear map from ADC counts to beats per minute.
///
/// Uses integer arithmetic with truncation:
/// `(raw - in_min) * (out_max - out_min) / (in_max - in_min) + out_min`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PulseCalibration {
    pub in_min: i32,
    pub in_max: i32,
    pub out_min: i32,
    pub out_max: i32,
}

impl PulseCalibration {
    /// Uncalibrated default: 10-bit ADC range onto 60..100 bpm.
    pub const KY039_DEFAULT: Self = Self {
        in_min: 0,
        in_max: 1024,
        out_min: 60,
        out_max: 100,
    };

    pub const fn new(in_min: i32, in_max: i32, out_min: i32, out_max: i32) -> Self {
        Self {
            in_min,
            in_max,
            out_min,
            out_max,
        }
    }

    #[inline]
    pub fn to_bpm(&self, raw: u16) -> i32 {
        let span = self.in_max - self.in_min;
        if span == 0 {
            return self.out_min;
        }
        (raw as i32 - self.in_min) * (self.out_max - self.out_min) / span + self.out_min
    }
}

impl Default for PulseCalibration {
    fn default() -> Self {
        Self::KY039_DEFAULT
    }
}

const CHANNELS: [Channel; 1] = [Channel::HeartRate];

pub struct AnalogPulseSensor<A> {
    input: A,
    calibration: PulseCalibration,
    threshold: u16,
    above_threshold: bool,
    pending: Option<SensorEvent>,
    last_raw: Option<u16>,
}

impl<A: AnalogInput> AnalogPulseSensor<A> {
    pub const DEFAULT_THRESHOLD: u16 = 512;

    pub fn new(input: A) -> Self {
        Self::with_calibration(input, PulseCalibration::default())
    }

    pub fn with_calibration(input: A, calibration: PulseCalibration) -> Self {
        Self {
            input,
            calibration,
            threshold: Self::DEFAULT_THRESHOLD,
            above_threshold: false,
            pending: None,
            last_raw: None,
        }
    }

    pub fn set_threshold(&mut self, threshold: u16) {
        self.threshold = threshold;
    }

    pub fn calibration(&self) -> PulseCalibration {
        self.calibration
    }

    /// Last raw ADC count, for diagnostics.
    pub fn last_raw_value(&self) -> Option<u16> {
        self.last_raw
    }

    fn read(&mut self) -> Option<u16> {
        match self.input.read_raw() {
            Ok(raw) => {
                self.last_raw = Some(raw);
                Some(raw)
            }
            Err(e) => {
                log::debug!("Pulse sensor read failed: {}", e);
                None
            }
        }
    }
}

impl<A: AnalogInput> SensorDriver for AnalogPulseSensor<A> {
    fn name(&self) -> &'static str {
        "pulse sensor"
    }

    fn channels(&self) -> &[Channel] {
        &CHANNELS
    }

    fn initialize(&mut self) -> Result<(), SensorError> {
        self.input.read_raw().map(|_| ())
    }

    fn sample(&mut self, channel: Channel) -> Option<f32> {
        if channel != Channel::HeartRate {
            return None;
        }
        let raw = self.read()?;
        let bpm = self.calibration.to_bpm(raw);
        log::debug!("Heartbeat value: {} | BPM: {}", raw, bpm);
        Some(bpm as f32)
    }

    fn update(&mut self) {
        let Some(raw) = self.read() else {
            return;
        };
        let above = raw > self.threshold;
        if above && !self.above_threshold {
            self.pending = Some(SensorEvent::BeatDetected);
        }
        self.above_threshold = above;
    }

    fn poll_event(&mut self) -> Option<SensorEvent> {
        self.pending.take()
    }
}
