//! Status LEDs.

use crate::clock::elapsed_ms;

/// A single digital output driving an indicator.
pub trait IndicatorPin {
    fn set(&mut self, on: bool);
}

/// Output that goes nowhere, for boards without the LED fitted.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPin;

impl IndicatorPin for NoPin {
    fn set(&mut self, _on: bool) {}
}

/// Drives an [`IndicatorPin`] either as a level or as a timed pulse.
///
/// A pulse never blocks: [`Indicator::pulse`] switches the pin on and
/// [`Indicator::service`], called every iteration, switches it off once the
/// duration has passed.
pub struct Indicator {
    pin: Box<dyn IndicatorPin>,
    lit: bool,
    pulse: Option<(u32, u32)>,
}

impl Indicator {
    pub fn new(mut pin: Box<dyn IndicatorPin>) -> Self {
        pin.set(false);
        Self {
            pin,
            lit: false,
            pulse: None,
        }
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }

    /// Sets a steady level, cancelling any pulse in progress.
    pub fn set(&mut self, on: bool) {
        self.pulse = None;
        self.write(on);
    }

    pub fn pulse(&mut self, now: u32, duration_ms: u32) {
        self.pulse = Some((now, duration_ms));
        self.write(true);
    }

    pub fn service(&mut self, now: u32) {
        if let Some((started, duration)) = self.pulse {
            if elapsed_ms(started, now) >= duration {
                self.pulse = None;
                self.write(false);
            }
        }
    }

    fn write(&mut self, on: bool) {
        if self.lit != on {
            self.lit = on;
            self.pin.set(on);
        }
    }
}
