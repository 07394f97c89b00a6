use serde::{Deserialize, Serialize};

use crate::config::PinAssignment;
use crate::store::SampleStore;

/// Dashboard datastream slot (`V1`, `V2`, ...).
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct VirtualPin(pub u8);

impl core::fmt::Display for VirtualPin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "V{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TelemetryError {
    #[error("dashboard not initialized")]
    NotInitialized,
    #[error("dashboard rejected the request: {0}")]
    Rejected(String),
    #[error("dashboard unreachable: {0}")]
    Unreachable(String),
}

/// Low-latency telemetry SDK.
pub trait TelemetryChannel {
    fn initialize(&mut self, auth_token: &str, ssid: &str, password: &str)
        -> Result<(), TelemetryError>;

    /// Services the channel; called on every scheduler iteration.
    fn pump(&mut self);

    fn publish(&mut self, pin: VirtualPin, value: f32) -> Result<(), TelemetryError>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PushReport {
    pub published: usize,
    pub omitted: usize,
    pub failed: usize,
}

pub struct DashboardUplink {
    channel: Box<dyn TelemetryChannel>,
    pins: Vec<PinAssignment>,
    initialized: bool,
}

impl DashboardUplink {
    pub fn new(channel: Box<dyn TelemetryChannel>, pins: Vec<PinAssignment>) -> Self {
        Self {
            channel,
            pins,
            initialized: false,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn initialize(
        &mut self,
        auth_token: &str,
        ssid: &str,
        password: &str,
    ) -> Result<(), TelemetryError> {
        self.channel.initialize(auth_token, ssid, password)?;
        self.initialized = true;
        Ok(())
    }

    pub fn pump(&mut self) {
        if self.initialized {
            self.channel.pump();
        }
    }

    /// Publishes every valid channel; invalid ones are left out of this push
    /// rather than sent as zeros.
    pub fn push(&mut self, store: &SampleStore) -> Result<PushReport, TelemetryError> {
        if !self.initialized {
            return Err(TelemetryError::NotInitialized);
        }

        let mut report = PushReport::default();
        for assignment in &self.pins {
            let Some(value) = store.get(assignment.channel).and_then(|s| s.reading()) else {
                report.omitted += 1;
                continue;
            };

            match self.channel.publish(assignment.pin, value) {
                Ok(()) => report.published += 1,
                Err(e) => {
                    log::warn!("Dashboard publish of {} to {} failed: {}", assignment.channel, assignment.pin, e);
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }
}
