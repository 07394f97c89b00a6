//! Core of the health monitor: a cooperative scheduler that samples heart
//! rate, SpO2, temperature and humidity sensors, validates the readings and
//! forwards them to a live dashboard and a logging endpoint.
//!
//! Everything here runs on a single thread and never sleeps. Hardware and
//! network stacks plug in through the traits in [`sensor`], [`network`],
//! [`uplink`], [`transport`] and [`indicator`], so the same core drives the
//! board firmware and the desktop simulator.

pub mod channel;
pub mod clock;
pub mod config;
pub mod indicator;
pub mod monitor;
pub mod network;
pub mod scheduler;
pub mod sensor;
pub mod store;
pub mod transport;
pub mod uplink;
pub mod validator;

pub use channel::{Channel, Sample};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{ConfigError, MonitorConfig, Variant};
pub use monitor::{Collaborators, Monitor, MonitorStats};
pub use network::{Association, AssociationState, NetworkLink, RetryPolicy};
pub use scheduler::{Cadence, Scheduler, Task, TaskError, TickReport};
pub use store::SampleStore;
pub use validator::ReadingValidator;
