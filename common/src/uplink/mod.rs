//! The two outbound paths of the monitor.
//!
//! - **dashboard**: live values, pushed on the short cadence through an
//!   opaque telemetry SDK.
//! - **logging**: one batched HTTP POST on the long cadence over a
//!   short-lived connection.

mod dashboard;
mod logging;

pub use dashboard::{DashboardUplink, PushReport, TelemetryChannel, TelemetryError, VirtualPin};
pub use logging::{encode_request, LoggingRecord, LoggingUplink, SendOutcome, UplinkError};
