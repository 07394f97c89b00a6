use esp_idf_svc::hal::adc::attenuation::DB_11;
use esp_idf_svc::hal::adc::oneshot::config::AdcChannelConfig;
use esp_idf_svc::hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
use esp_idf_svc::hal::gpio::ADCPin;
use esp_idf_svc::hal::peripheral::Peripheral;

use health_monitor_common::sensor::{AnalogInput, SensorError};

/// Pulse sensor signal on an ADC1 pin.
///
/// The 12-bit conversion is scaled down to the 10-bit range the pulse
/// calibration and beat threshold are expressed in.
pub struct AdcPulseInput<P: ADCPin> {
    channel: AdcChannelDriver<'static, P, AdcDriver<'static, P::Adc>>,
}

impl<P: ADCPin> AdcPulseInput<P> {
    pub fn new(
        adc: impl Peripheral<P = P::Adc> + 'static,
        pin: impl Peripheral<P = P> + 'static,
    ) -> anyhow::Result<Self> {
        let driver = AdcDriver::new(adc)?;
        let config = AdcChannelConfig {
            attenuation: DB_11,
            ..Default::default()
        };
        let channel = AdcChannelDriver::new(driver, pin, &config)?;
        Ok(Self { channel })
    }
}

impl<P: ADCPin> AnalogInput for AdcPulseInput<P> {
    fn read_raw(&mut self) -> Result<u16, SensorError> {
        self.channel
            .read_raw()
            .map(|raw| raw >> 2)
            .map_err(|e| SensorError::ReadFailed(e.to_string()))
    }
}
