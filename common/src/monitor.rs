//! The monitor context and its three periodic tasks.
//!
//! [`Monitor`] owns every piece of state the loop touches: the sample store,
//! the sensor drivers, both uplinks, the network link and the indicators.
//! The scheduler hands it to each task by `&mut`, in this order:
//!
//! 1. `service` (every tick): pumps the dashboard, services the drivers and
//!    turns beat events into LED pulses.
//! 2. `sample` (short cadence): reads, validates and stores every channel,
//!    prints the readings line and pushes valid values to the dashboard.
//! 3. `upload` (long cadence): sends the batched record to the logging
//!    endpoint.
//!
//! While the link is down both uplinks are skipped.

use crate::clock::Clock;
use crate::config::MonitorConfig;
use crate::indicator::{Indicator, IndicatorPin};
use crate::network::{Association, AssociationState, NetworkLink};
use crate::scheduler::{Scheduler, Task, TaskError};
use crate::sensor::{SensorEvent, SensorPointer, SensorReader};
use crate::store::SampleStore;
use crate::transport::Transport;
use crate::uplink::{DashboardUplink, LoggingUplink, SendOutcome, TelemetryChannel};
use crate::validator::ReadingValidator;

pub const SERVICE_TASK: &str = "service";
pub const SAMPLE_TASK: &str = "sample";
pub const UPLOAD_TASK: &str = "upload";

/// External capabilities the monitor is wired to.
pub struct Collaborators {
    pub sensors: Vec<SensorPointer>,
    pub link: Box<dyn NetworkLink>,
    pub telemetry: Box<dyn TelemetryChannel>,
    pub transport: Box<dyn Transport>,
    pub heartbeat_led: Box<dyn IndicatorPin>,
    pub send_led: Box<dyn IndicatorPin>,
}

/// Counters for diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MonitorStats {
    pub services: u64,
    pub samples: u64,
    pub beats: u64,
    pub dashboard_pushes: u64,
    pub uploads_sent: u64,
    pub uploads_skipped: u64,
    pub uploads_failed: u64,
    pub offline_skips: u64,
}

pub struct Monitor {
    config: MonitorConfig,
    sensors: SensorReader,
    validator: ReadingValidator,
    store: SampleStore,
    dashboard: DashboardUplink,
    logging: LoggingUplink,
    link: Box<dyn NetworkLink>,
    heartbeat: Indicator,
    stats: MonitorStats,
}

impl Monitor {
    pub fn new(config: MonitorConfig, collaborators: Collaborators) -> Self {
        let Collaborators {
            sensors,
            link,
            telemetry,
            transport,
            heartbeat_led,
            send_led,
        } = collaborators;

        let store = SampleStore::new(config.variant.channels());
        let dashboard = DashboardUplink::new(telemetry, config.dashboard.pins.clone());
        let logging = LoggingUplink::new(transport, config.logging.clone(), Indicator::new(send_led));

        Self {
            sensors: SensorReader::new(sensors),
            validator: ReadingValidator::new(),
            store,
            dashboard,
            logging,
            link,
            heartbeat: Indicator::new(heartbeat_led),
            stats: MonitorStats::default(),
            config,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn store(&self) -> &SampleStore {
        &self.store
    }

    pub fn stats(&self) -> MonitorStats {
        self.stats
    }

    pub fn heartbeat(&self) -> &Indicator {
        &self.heartbeat
    }

    pub fn is_online(&self) -> bool {
        self.link.is_connected()
    }

    pub fn is_dashboard_ready(&self) -> bool {
        self.dashboard.is_initialized()
    }

    /// Initialises the sensor drivers. Returns how many came up.
    pub fn start(&mut self) -> usize {
        log::info!("=================================");
        log::info!("Health Monitoring System Starting");
        log::info!("=================================");

        let ready = self.sensors.initialize();
        let provided = self.sensors.channels();
        for channel in self.store.channels() {
            if !provided.contains(&channel) {
                log::warn!("No sensor provides {}", channel);
            }
        }
        ready
    }

    /// Associates with the configured network, blocking per the retry
    /// policy, then brings up the dashboard when online.
    pub fn connect(&mut self, clock: &dyn Clock, pause: impl FnMut(u32)) -> AssociationState {
        let wifi = &self.config.wifi;
        let mut association = Association::new(wifi.policy, wifi.retry_interval_ms);
        let state = association.run(self.link.as_mut(), &wifi.ssid, &wifi.password, clock, pause);

        match state {
            AssociationState::Connected => {
                self.ensure_dashboard();
            }
            _ => log::warn!("Continuing in offline mode"),
        }

        log::info!("System Ready!");
        state
    }

    /// Builds the scheduler with the three tasks in priority order.
    pub fn scheduler(&self, start_ms: u32) -> Scheduler<Monitor> {
        let timing = &self.config.timing;
        Scheduler::new(start_ms)
            .with_task(Task::continuous(SERVICE_TASK, Monitor::service))
            .with_task(Task::periodic(SAMPLE_TASK, timing.sample_ms, Monitor::sample))
            .with_task(Task::periodic(UPLOAD_TASK, timing.upload_ms, Monitor::upload))
    }

    fn ensure_dashboard(&mut self) -> bool {
        if self.dashboard.is_initialized() {
            return true;
        }
        let wifi = &self.config.wifi;
        match self
            .dashboard
            .initialize(&self.config.dashboard.auth_token, &wifi.ssid, &wifi.password)
        {
            Ok(()) => {
                log::info!("Dashboard initialized");
                true
            }
            Err(e) => {
                log::warn!("Dashboard initialization failed: {}", e);
                false
            }
        }
    }

    /// Continuous task.
    pub fn service(&mut self, now: u32) -> Result<(), TaskError> {
        self.stats.services += 1;
        self.dashboard.pump();

        for event in self.sensors.update() {
            match event {
                SensorEvent::BeatDetected => {
                    log::debug!("Beat!");
                    self.stats.beats += 1;
                    self.heartbeat.pulse(now, self.config.timing.beat_pulse_ms);
                }
            }
        }
        self.heartbeat.service(now);
        Ok(())
    }

    /// Short-cadence task. Drivers that failed to initialise are retried
    /// first.
    pub fn sample(&mut self, now: u32) -> Result<(), TaskError> {
        self.stats.samples += 1;
        self.sensors.retry_failed();

        let channels: Vec<_> = self.store.channels().collect();
        for channel in channels {
            let raw = self.sensors.read(channel);
            let sample = self.validator.validate(channel, raw, now);
            if let (Some(value), false) = (raw, sample.valid) {
                log::warn!("Invalid {} reading: {}", channel, value);
            }
            self.store.set(channel, sample);
        }

        log::info!("{}", self.store.status_line());

        if !self.link.is_connected() {
            self.stats.offline_skips += 1;
            log::debug!("Offline, dashboard push skipped");
            return Ok(());
        }

        if !self.ensure_dashboard() {
            return Ok(());
        }
        let report = self.dashboard.push(&self.store)?;
        self.stats.dashboard_pushes += 1;
        log::debug!(
            "Dashboard: {} published, {} omitted, {} failed",
            report.published,
            report.omitted,
            report.failed
        );
        Ok(())
    }

    /// Long-cadence task.
    pub fn upload(&mut self, _now: u32) -> Result<(), TaskError> {
        if !self.link.is_connected() {
            self.stats.offline_skips += 1;
            log::info!("Offline, logging update skipped");
            return Ok(());
        }

        match self.logging.send(&self.store) {
            Ok(SendOutcome::Sent { .. }) => {
                self.stats.uploads_sent += 1;
                Ok(())
            }
            Ok(SendOutcome::Skipped) => {
                self.stats.uploads_skipped += 1;
                Ok(())
            }
            Err(e) => {
                self.stats.uploads_failed += 1;
                Err(e.into())
            }
        }
    }
}
