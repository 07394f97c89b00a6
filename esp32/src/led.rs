use esp_idf_svc::hal::gpio::{Output, OutputPin, PinDriver};
use esp_idf_svc::hal::peripheral::Peripheral;

use health_monitor_common::indicator::IndicatorPin;

pub struct LedPin<P: OutputPin> {
    driver: PinDriver<'static, P, Output>,
}

impl<P: OutputPin> LedPin<P> {
    pub fn new(pin: impl Peripheral<P = P> + 'static) -> anyhow::Result<Self> {
        Ok(Self {
            driver: PinDriver::output(pin)?,
        })
    }
}

impl<P: OutputPin> IndicatorPin for LedPin<P> {
    fn set(&mut self, on: bool) {
        let result = if on {
            self.driver.set_high()
        } else {
            self.driver.set_low()
        };
        if let Err(e) = result {
            log::warn!("LED write failed: {}", e);
        }
    }
}
