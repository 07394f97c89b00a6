//! WiFi association as a steppable state machine.
//!
//! Instead of a blocking `while !connected { delay(500) }` loop, the caller
//! steps an [`Association`] with the current time. Each step either observes
//! the link coming up or, once per retry interval, counts a failed attempt.
//! The retry policy decides whether the device eventually gives up and runs
//! offline or keeps trying forever.

use serde::{Deserialize, Serialize};

use crate::clock::{elapsed_ms, Clock};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    #[error("invalid credentials: {0}")]
    Credentials(String),
    #[error("link failed to start: {0}")]
    Start(String),
}

/// The network stack, seen from the monitor.
pub trait NetworkLink {
    /// Starts associating with `ssid`. Must not block until connected.
    fn begin(&mut self, ssid: &str, password: &str) -> Result<(), LinkError>;

    fn is_connected(&self) -> bool;

    fn local_ip(&self) -> Option<String> {
        None
    }
}

/// What to do when the link does not come up.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RetryPolicy {
    /// Give up after this many failed polls and continue offline.
    Bounded { attempts: u32 },
    /// Keep polling forever; the device does nothing else until online.
    Unbounded,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::Bounded { attempts: 20 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssociationState {
    Disconnected,
    Connecting { attempts: u32, last_poll: u32 },
    Connected,
    Failed { attempts: u32 },
}

impl AssociationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AssociationState::Connected | AssociationState::Failed { .. })
    }
}

#[derive(Debug)]
pub struct Association {
    policy: RetryPolicy,
    interval_ms: u32,
    state: AssociationState,
}

impl Association {
    pub fn new(policy: RetryPolicy, interval_ms: u32) -> Self {
        Self {
            policy,
            interval_ms,
            state: AssociationState::Disconnected,
        }
    }

    pub fn state(&self) -> AssociationState {
        self.state
    }

    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    /// Advances the state machine once.
    pub fn step(
        &mut self,
        link: &mut dyn NetworkLink,
        ssid: &str,
        password: &str,
        now: u32,
    ) -> AssociationState {
        self.state = match self.state {
            AssociationState::Disconnected => {
                log::info!("Connecting to WiFi: {}", ssid);
                match link.begin(ssid, password) {
                    Ok(()) => AssociationState::Connecting {
                        attempts: 0,
                        last_poll: now,
                    },
                    Err(e) => {
                        log::warn!("WiFi start failed: {}", e);
                        match self.policy {
                            RetryPolicy::Bounded { .. } => AssociationState::Failed { attempts: 0 },
                            RetryPolicy::Unbounded => AssociationState::Disconnected,
                        }
                    }
                }
            }
            AssociationState::Connecting {
                attempts,
                last_poll,
            } => {
                if link.is_connected() {
                    log::info!("WiFi connected!");
                    if let Some(ip) = link.local_ip() {
                        log::info!("IP address: {}", ip);
                    }
                    AssociationState::Connected
                } else if elapsed_ms(last_poll, now) >= self.interval_ms {
                    let attempts = attempts.saturating_add(1);
                    log::debug!("WiFi not up yet (attempt {})", attempts);
                    match self.policy {
                        RetryPolicy::Bounded { attempts: max } if attempts >= max => {
                            log::warn!("WiFi connection failed after {} attempts", attempts);
                            AssociationState::Failed { attempts }
                        }
                        _ => AssociationState::Connecting {
                            attempts,
                            last_poll: now,
                        },
                    }
                } else {
                    self.state
                }
            }
            terminal => terminal,
        };
        self.state
    }

    /// Steps until connected or failed, calling `pause` between steps.
    ///
    /// With [`RetryPolicy::Unbounded`] and a link that never comes up this
    /// does not return.
    pub fn run(
        &mut self,
        link: &mut dyn NetworkLink,
        ssid: &str,
        password: &str,
        clock: &dyn Clock,
        mut pause: impl FnMut(u32),
    ) -> AssociationState {
        loop {
            let state = self.step(link, ssid, password, clock.now_ms());
            if state.is_terminal() {
                return state;
            }
            pause(self.interval_ms);
        }
    }
}
