//! Cooperative scheduler over a fixed, ordered list of periodic tasks.
//!
//! The scheduler never sleeps and never spawns anything. The caller drives it
//! by calling [`Scheduler::tick`] from its main loop with the current time of
//! a monotonic millisecond clock; every task that is due runs to completion,
//! in insertion order, before `tick` returns.

use crate::clock::elapsed_ms;
use crate::sensor::SensorError;
use crate::uplink::{TelemetryError, UplinkError};

/// Error returned by a task action. It is logged by the scheduler and never
/// stops the remaining tasks of the tick.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("sensor error: {0}")]
    Sensor(#[from] SensorError),

    #[error("dashboard error: {0}")]
    Telemetry(#[from] TelemetryError),

    #[error("logging uplink error: {0}")]
    Uplink(#[from] UplinkError),
}

/// Work performed by a task: receives the shared context and the tick time.
pub type TaskAction<C> = fn(&mut C, u32) -> Result<(), TaskError>;

/// How often a task runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cadence {
    /// On every scheduler iteration.
    EveryTick,
    /// At most once per period, in milliseconds.
    Every(u32),
}

impl Cadence {
    pub fn is_due(self, last_run: u32, now: u32) -> bool {
        match self {
            Cadence::EveryTick => true,
            Cadence::Every(period) => elapsed_ms(last_run, now) >= period,
        }
    }
}

pub struct Task<C> {
    name: &'static str,
    cadence: Cadence,
    last_run: u32,
    action: TaskAction<C>,
}

impl<C> Task<C> {
    /// A task that must run every iteration, e.g. to keep a driver's
    /// detection state alive.
    pub fn continuous(name: &'static str, action: TaskAction<C>) -> Self {
        Self {
            name,
            cadence: Cadence::EveryTick,
            last_run: 0,
            action,
        }
    }

    pub fn periodic(name: &'static str, period_ms: u32, action: TaskAction<C>) -> Self {
        Self {
            name,
            cadence: Cadence::Every(period_ms),
            last_run: 0,
            action,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    pub fn last_run(&self) -> u32 {
        self.last_run
    }
}

impl<C> core::fmt::Debug for Task<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("cadence", &self.cadence)
            .field("last_run", &self.last_run)
            .finish()
    }
}

/// What happened during one [`Scheduler::tick`].
#[derive(Debug, Default)]
pub struct TickReport {
    pub ran: Vec<&'static str>,
    pub failed: Vec<(&'static str, TaskError)>,
}

impl TickReport {
    pub fn did_run(&self, name: &str) -> bool {
        self.ran.iter().any(|n| *n == name)
    }
}

pub struct Scheduler<C> {
    tasks: Vec<Task<C>>,
    started_at: u32,
    ticks: u64,
}

impl<C> Scheduler<C> {
    /// Creates an empty scheduler. Periodic tasks added later first fire one
    /// full period after `start_ms`.
    pub fn new(start_ms: u32) -> Self {
        Self {
            tasks: Vec::new(),
            started_at: start_ms,
            ticks: 0,
        }
    }

    /// Appends a task. Tasks run in the order they were added.
    pub fn with_task(mut self, mut task: Task<C>) -> Self {
        task.last_run = self.started_at;
        self.tasks.push(task);
        self
    }

    pub fn tasks(&self) -> &[Task<C>] {
        &self.tasks
    }

    /// Number of completed iterations.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Runs one iteration at time `now`.
    pub fn tick(&mut self, ctx: &mut C, now: u32) -> TickReport {
        let mut report = TickReport::default();

        for task in self.tasks.iter_mut() {
            if !task.cadence.is_due(task.last_run, now) {
                continue;
            }
            task.last_run = now;

            match (task.action)(ctx, now) {
                Ok(()) => report.ran.push(task.name),
                Err(e) => {
                    log::warn!("Task '{}' failed: {}", task.name, e);
                    report.ran.push(task.name);
                    report.failed.push((task.name, e));
                }
            }
        }

        self.ticks += 1;
        report
    }
}
