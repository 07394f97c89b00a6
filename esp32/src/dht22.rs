use std::time::{Duration, Instant};

use health_monitor_common::sensor::{SensorDriver, SensorError};
use health_monitor_common::Channel;

const CHANNELS: [Channel; 2] = [Channel::Temperature, Channel::Humidity];

/// Bit-banged DHT22 on a single GPIO.
///
/// One transaction yields both channels, so a reading is cached and reused
/// until the sensor's minimum read interval has passed.
pub struct Dht22 {
    pin: i32,
    last: Option<(Instant, Result<(f32, f32), SensorError>)>,
}

impl Dht22 {
    const MAX_DHT_DATA: usize = 5;
    const MIN_READ_INTERVAL: Duration = Duration::from_secs(2);

    pub fn new(pin: i32) -> Self {
        Self { pin, last: None }
    }

    /// Microseconds the line stayed at `state`, or `None` after `max_wait`.
    fn signal_level(&self, max_wait: u32, state: i32) -> Option<u32> {
        use esp_idf_svc::sys::*;

        let mut u_sec = 0;
        unsafe {
            while gpio_get_level(self.pin) == state {
                u_sec += 1;
                if u_sec > max_wait {
                    return None;
                }
                ets_delay_us(1);
            }
        }
        Some(u_sec)
    }

    /// Returns `(temperature, humidity)`.
    fn read(&self) -> Result<(f32, f32), SensorError> {
        use esp_idf_svc::sys::*;

        let mut data = [0u8; Self::MAX_DHT_DATA];

        unsafe {
            gpio_set_direction(self.pin, GPIO_MODE_DEF_OUTPUT);

            // Host start signal: low for 3 ms, then high for 25 us.
            gpio_set_level(self.pin, 0);
            ets_delay_us(3000);
            gpio_set_level(self.pin, 1);
            ets_delay_us(25);

            gpio_set_direction(self.pin, GPIO_MODE_DEF_INPUT);
        }

        // Sensor response: 80 us low, 80 us high.
        self.signal_level(85, 0).ok_or(SensorError::Timeout)?;
        self.signal_level(85, 1).ok_or(SensorError::Timeout)?;

        for bit in 0..40 {
            self.signal_level(56, 0).ok_or(SensorError::Timeout)?;
            let high = self.signal_level(75, 1).ok_or(SensorError::Timeout)?;

            // A one holds the line high for ~70 us, a zero for ~28 us.
            if high > 40 {
                data[bit / 8] |= 1 << (7 - bit % 8);
            }
        }

        let checksum = data[..4].iter().fold(0u8, |sum, b| sum.wrapping_add(*b));
        if data[4] != checksum {
            return Err(SensorError::Checksum);
        }

        let humidity = u16::from_be_bytes([data[0], data[1]]) as f32 / 10.0;
        let mut temperature = u16::from_be_bytes([data[2] & 0x7F, data[3]]) as f32 / 10.0;
        if data[2] & 0x80 != 0 {
            temperature = -temperature;
        }
        Ok((temperature, humidity))
    }

    fn latest(&mut self) -> Result<(f32, f32), SensorError> {
        let stale = match &self.last {
            Some((at, _)) => at.elapsed() >= Self::MIN_READ_INTERVAL,
            None => true,
        };
        if stale {
            self.last = Some((Instant::now(), self.read()));
        }
        match &self.last {
            Some((_, reading)) => reading.clone(),
            None => Err(SensorError::NotDetected),
        }
    }
}

impl SensorDriver for Dht22 {
    fn name(&self) -> &'static str {
        "DHT sensor"
    }

    fn channels(&self) -> &[Channel] {
        &CHANNELS
    }

    /// Only configures the line; the sensor is not ready to answer until
    /// about a second after power-up, so read errors surface per sample.
    fn initialize(&mut self) -> Result<(), SensorError> {
        use esp_idf_svc::sys::{esp, *};

        let result = unsafe {
            esp!(gpio_set_direction(self.pin, GPIO_MODE_DEF_INPUT))
                .and_then(|_| esp!(gpio_set_pull_mode(self.pin, gpio_pull_mode_t_GPIO_PULLUP_ONLY)))
        };
        result.map_err(|e| SensorError::ReadFailed(e.to_string()))
    }

    fn sample(&mut self, channel: Channel) -> Option<f32> {
        match self.latest() {
            Ok((temperature, humidity)) => match channel {
                Channel::Temperature => Some(temperature),
                Channel::Humidity => Some(humidity),
                _ => None,
            },
            Err(e) => {
                log::warn!("Failed to read from DHT sensor: {}", e);
                None
            }
        }
    }
}
