use std::time::Duration;

use anyhow::Context;
use health_monitor_common::{Clock, Monitor, MonitorConfig, MonotonicClock};

mod simulation;

/// Our App struct that holds the monitor and the clock that drives it.
///
/// The App struct loads the configuration, wires the monitor to simulated
/// hardware and runs the scheduler loop.
struct App {
    monitor: Monitor,
    clock: MonotonicClock,
    max_ticks: Option<u64>,
}

impl App {
    /// Create a new App struct.
    ///
    /// The configuration comes from the file named by `HEALTH_MONITOR_CONFIG`
    /// (or the default preset), with credentials taken from the environment.
    fn new() -> anyhow::Result<Self> {
        let mut config = match std::env::var("HEALTH_MONITOR_CONFIG") {
            Ok(path) => MonitorConfig::load(&path)
                .with_context(|| format!("loading configuration from {}", path))?,
            Err(_) => MonitorConfig::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());

        // HEALTH_MONITOR_OFFLINE=1 keeps the simulated link down.
        let offline = std::env::var("HEALTH_MONITOR_OFFLINE").is_ok_and(|v| v == "1");

        let max_ticks = match std::env::var("HEALTH_MONITOR_TICKS") {
            Ok(ticks) => Some(
                ticks
                    .parse()
                    .with_context(|| format!("HEALTH_MONITOR_TICKS is not a number: {}", ticks))?,
            ),
            Err(_) => None,
        };

        let collaborators = simulation::collaborators(&config, offline, fastrand::u64(..));

        Ok(Self {
            monitor: Monitor::new(config, collaborators),
            clock: MonotonicClock::new(),
            max_ticks,
        })
    }

    /// Run the App: bring up sensors and network, then tick the scheduler
    /// forever (or for `HEALTH_MONITOR_TICKS` iterations).
    fn run(&mut self) -> anyhow::Result<()> {
        self.monitor.start();
        self.monitor.connect(&self.clock, |ms| {
            std::thread::sleep(Duration::from_millis(ms.into()))
        });

        let tick = Duration::from_millis(self.monitor.config().timing.tick_ms.into());
        let mut scheduler = self.monitor.scheduler(self.clock.now_ms());

        loop {
            scheduler.tick(&mut self.monitor, self.clock.now_ms());

            if self.max_ticks.is_some_and(|max| scheduler.ticks() >= max) {
                break;
            }
            std::thread::sleep(tick);
        }

        let stats = self.monitor.stats();
        log::info!(
            "Stopped after {} ticks: {} samples, {} beats, {} dashboard pushes, {} uploads sent, {} skipped, {} failed",
            scheduler.ticks(),
            stats.samples,
            stats.beats,
            stats.dashboard_pushes,
            stats.uploads_sent,
            stats.uploads_skipped,
            stats.uploads_failed
        );
        Ok(())
    }
}

/// A minimal main function that initializes the App and runs it.
fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut app = App::new()?;

    app.run()
}
