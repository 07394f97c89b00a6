use crate::channel::{Channel, Sample};

/// Value the one-wire temperature driver reports for a disconnected sensor.
pub const DISCONNECTED_SENTINEL: f32 = -127.0;

/// Physiologically plausible range of a channel.
///
/// The lower bound is always exclusive; the upper bound is exclusive unless
/// `max_inclusive` is set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: f32,
    pub max: f32,
    pub max_inclusive: bool,
}

impl Bounds {
    pub const HEART_RATE: Self = Self::exclusive(0.0, 200.0);
    pub const SPO2: Self = Self::up_to(0.0, 100.0);
    pub const TEMPERATURE: Self = Self::exclusive(0.0, 50.0);
    pub const HUMIDITY: Self = Self::up_to(0.0, 100.0);

    pub const fn exclusive(min: f32, max: f32) -> Self {
        Self {
            min,
            max,
            max_inclusive: false,
        }
    }

    pub const fn up_to(min: f32, max: f32) -> Self {
        Self {
            min,
            max,
            max_inclusive: true,
        }
    }

    pub const fn for_channel(channel: Channel) -> Self {
        match channel {
            Channel::HeartRate => Self::HEART_RATE,
            Channel::SpO2 => Self::SPO2,
            Channel::Temperature => Self::TEMPERATURE,
            Channel::Humidity => Self::HUMIDITY,
        }
    }

    /// NaN never satisfies either comparison, so it is rejected here too.
    pub fn contains(&self, value: f32) -> bool {
        let below_max = if self.max_inclusive {
            value <= self.max
        } else {
            value < self.max
        };
        value > self.min && below_max
    }
}

/// Classifies raw driver readings.
///
/// Never fails: anything implausible, absent or non-finite becomes an
/// invalid sample with a zero value.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReadingValidator;

impl ReadingValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn is_valid(&self, channel: Channel, value: f32) -> bool {
        if !value.is_finite() {
            return false;
        }
        if channel == Channel::Temperature && value == DISCONNECTED_SENTINEL {
            return false;
        }
        Bounds::for_channel(channel).contains(value)
    }

    pub fn validate(&self, channel: Channel, raw: Option<f32>, timestamp: u32) -> Sample {
        match raw {
            Some(value) if self.is_valid(channel, value) => Sample::valid(value, timestamp),
            _ => Sample::invalid(timestamp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(channel: Channel, value: f32) -> (f32, bool) {
        let sample = ReadingValidator::new().validate(channel, Some(value), 0);
        (sample.value, sample.valid)
    }

    #[test]
    fn test_heart_rate_bounds() {
        assert_eq!(check(Channel::HeartRate, 72.3), (72.3, true));
        assert_eq!(check(Channel::HeartRate, 199.9), (199.9, true));
        assert_eq!(check(Channel::HeartRate, 0.0), (0.0, false));
        assert_eq!(check(Channel::HeartRate, 200.0), (0.0, false));
        assert_eq!(check(Channel::HeartRate, -5.0), (0.0, false));
    }

    #[test]
    fn test_heart_rate_sweep() {
        let validator = ReadingValidator::new();
        for tenth in -100..2500 {
            let v = tenth as f32 / 10.0;
            let sample = validator.validate(Channel::HeartRate, Some(v), 0);
            if v > 0.0 && v < 200.0 {
                assert_eq!((sample.value, sample.valid), (v, true), "v = {v}");
            } else {
                assert_eq!((sample.value, sample.valid), (0.0, false), "v = {v}");
            }
        }
    }

    #[test]
    fn test_spo2_upper_bound_is_inclusive() {
        assert_eq!(check(Channel::SpO2, 100.0), (100.0, true));
        assert_eq!(check(Channel::SpO2, 100.5), (0.0, false));
        assert_eq!(check(Channel::SpO2, 0.0), (0.0, false));
        assert_eq!(check(Channel::SpO2, 97.0), (97.0, true));
    }

    #[test]
    fn test_temperature_bounds_and_sentinel() {
        assert_eq!(check(Channel::Temperature, 36.5), (36.5, true));
        assert_eq!(check(Channel::Temperature, 50.0), (0.0, false));
        assert_eq!(check(Channel::Temperature, 0.0), (0.0, false));
        assert_eq!(check(Channel::Temperature, DISCONNECTED_SENTINEL), (0.0, false));
    }

    #[test]
    fn test_humidity_bounds() {
        assert_eq!(check(Channel::Humidity, 45.0), (45.0, true));
        assert_eq!(check(Channel::Humidity, 100.0), (100.0, true));
        assert_eq!(check(Channel::Humidity, 0.0), (0.0, false));
    }

    #[test]
    fn test_non_finite_and_absent_are_invalid() {
        let validator = ReadingValidator::new();
        assert!(!validator.validate(Channel::Temperature, Some(f32::NAN), 3).valid);
        assert!(!validator.validate(Channel::HeartRate, Some(f32::INFINITY), 3).valid);

        let absent = validator.validate(Channel::SpO2, None, 3);
        assert_eq!(absent, Sample::invalid(3));
    }
}
