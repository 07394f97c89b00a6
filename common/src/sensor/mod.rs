//! Sensor drivers and the reader that polls them.
//!
//! A driver is an opaque capability: it knows its channels, can be
//! initialised once, sampled on demand and, if it needs it, serviced on every
//! scheduler iteration. Edge-triggered notifications (a detected heartbeat)
//! are queued by the driver and polled by the reader instead of being pushed
//! through a callback.

mod pulse;

pub use pulse::{AnalogInput, AnalogPulseSensor, PulseCalibration};

use crate::channel::Channel;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SensorError {
    #[error("sensor not detected")]
    NotDetected,
    #[error("sensor timed out")]
    Timeout,
    #[error("checksum mismatch")]
    Checksum,
    #[error("read failed: {0}")]
    ReadFailed(String),
}

/// Notification raised by a driver during [`SensorDriver::update`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SensorEvent {
    BeatDetected,
}

pub trait SensorDriver {
    /// Short name used in startup messages.
    fn name(&self) -> &'static str;

    /// Channels this driver produces.
    fn channels(&self) -> &[Channel];

    fn initialize(&mut self) -> Result<(), SensorError>;

    /// Latest raw value of `channel`, `None` if there is no reading yet.
    fn sample(&mut self, channel: Channel) -> Option<f32>;

    /// Continuous servicing, called on every scheduler iteration.
    fn update(&mut self) {}

    /// Takes the next pending event, if any.
    fn poll_event(&mut self) -> Option<SensorEvent> {
        None
    }
}

pub type SensorPointer = Box<dyn SensorDriver>;

struct Slot {
    driver: SensorPointer,
    ready: bool,
}

/// Polls a fixed set of drivers.
pub struct SensorReader {
    slots: Vec<Slot>,
}

impl SensorReader {
    pub fn new(drivers: Vec<SensorPointer>) -> Self {
        Self {
            slots: drivers
                .into_iter()
                .map(|driver| Slot {
                    driver,
                    ready: false,
                })
                .collect(),
        }
    }

    /// Initialises every driver and returns how many came up.
    ///
    /// A failed driver stays registered and its channels read as absent
    /// until [`SensorReader::retry_failed`] brings it up.
    pub fn initialize(&mut self) -> usize {
        for slot in self.slots.iter_mut() {
            match slot.driver.initialize() {
                Ok(()) => {
                    log::info!("Initializing {}... SUCCESS", slot.driver.name());
                    slot.ready = true;
                }
                Err(e) => {
                    log::error!("Initializing {}... FAILED ({})", slot.driver.name(), e);
                    slot.ready = false;
                }
            }
        }
        self.ready_count()
    }

    /// Retries [`SensorDriver::initialize`] on drivers that are not ready.
    /// Returns how many came up on this attempt.
    pub fn retry_failed(&mut self) -> usize {
        let mut recovered = 0;
        for slot in self.slots.iter_mut().filter(|s| !s.ready) {
            match slot.driver.initialize() {
                Ok(()) => {
                    log::info!("Initializing {}... SUCCESS (retry)", slot.driver.name());
                    slot.ready = true;
                    recovered += 1;
                }
                Err(e) => log::debug!("{} still unavailable: {}", slot.driver.name(), e),
            }
        }
        recovered
    }

    pub fn ready_count(&self) -> usize {
        self.slots.iter().filter(|s| s.ready).count()
    }

    /// All channels provided by the registered drivers, ready or not.
    pub fn channels(&self) -> Vec<Channel> {
        let mut channels = Vec::new();
        for slot in &self.slots {
            for channel in slot.driver.channels() {
                if !channels.contains(channel) {
                    channels.push(*channel);
                }
            }
        }
        channels
    }

    /// Services every ready driver and collects the events they raised.
    pub fn update(&mut self) -> Vec<SensorEvent> {
        let mut events = Vec::new();
        for slot in self.slots.iter_mut().filter(|s| s.ready) {
            slot.driver.update();
            while let Some(event) = slot.driver.poll_event() {
                events.push(event);
            }
        }
        events
    }

    /// Reads `channel` from the first ready driver that provides it.
    pub fn read(&mut self, channel: Channel) -> Option<f32> {
        self.slots
            .iter_mut()
            .filter(|s| s.ready)
            .find(|s| s.driver.channels().contains(&channel))
            .and_then(|s| s.driver.sample(channel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        channels: Vec<Channel>,
        value: f32,
        init_failures: u32,
        beats: u32,
    }

    impl SensorDriver for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn channels(&self) -> &[Channel] {
            &self.channels
        }

        fn initialize(&mut self) -> Result<(), SensorError> {
            if self.init_failures > 0 {
                self.init_failures -= 1;
                Err(SensorError::Timeout)
            } else {
                Ok(())
            }
        }

        fn sample(&mut self, _channel: Channel) -> Option<f32> {
            Some(self.value)
        }

        fn update(&mut self) {
            self.beats += 1;
        }

        fn poll_event(&mut self) -> Option<SensorEvent> {
            if self.beats > 0 {
                self.beats -= 1;
                Some(SensorEvent::BeatDetected)
            } else {
                None
            }
        }
    }

    fn fixed(channels: &[Channel], value: f32, fail: bool) -> SensorPointer {
        flaky(channels, value, if fail { u32::MAX } else { 0 })
    }

    fn flaky(channels: &[Channel], value: f32, init_failures: u32) -> SensorPointer {
        Box::new(Fixed {
            channels: channels.to_vec(),
            value,
            init_failures,
            beats: 0,
        })
    }

    #[test]
    fn test_failed_driver_reads_absent() {
        let mut reader = SensorReader::new(vec![
            fixed(&[Channel::HeartRate, Channel::SpO2], 80.0, true),
            fixed(&[Channel::Temperature], 36.6, false),
        ]);

        assert_eq!(reader.initialize(), 1);
        assert_eq!(reader.read(Channel::HeartRate), None);
        assert_eq!(reader.read(Channel::Temperature), Some(36.6));
        assert_eq!(
            reader.channels(),
            vec![Channel::HeartRate, Channel::SpO2, Channel::Temperature]
        );
    }

    #[test]
    fn test_update_drains_events_of_ready_drivers() {
        let mut reader = SensorReader::new(vec![
            fixed(&[Channel::HeartRate], 80.0, false),
            fixed(&[Channel::SpO2], 97.0, true),
        ]);
        reader.initialize();

        assert_eq!(reader.update(), vec![SensorEvent::BeatDetected]);
        assert_eq!(reader.update(), vec![SensorEvent::BeatDetected]);
    }

    #[test]
    fn test_retry_brings_up_driver_that_failed_once() {
        let mut reader = SensorReader::new(vec![flaky(&[Channel::Temperature, Channel::Humidity], 24.0, 1)]);

        assert_eq!(reader.initialize(), 0);
        assert_eq!(reader.read(Channel::Temperature), None);

        assert_eq!(reader.retry_failed(), 1);
        assert_eq!(reader.read(Channel::Temperature), Some(24.0));
        assert_eq!(reader.read(Channel::Humidity), Some(24.0));
        assert_eq!(reader.retry_failed(), 0);
        assert_eq!(reader.ready_count(), 1);
    }
}
