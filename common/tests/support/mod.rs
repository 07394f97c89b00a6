//! Fakes for the monitor's collaborators. Each fake keeps its observations
//! behind an `Rc` so a test can inspect them after handing the fake over.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use health_monitor_common::indicator::IndicatorPin;
use health_monitor_common::network::{LinkError, NetworkLink};
use health_monitor_common::sensor::{SensorDriver, SensorError, SensorEvent};
use health_monitor_common::transport::{Transport, TransportError};
use health_monitor_common::uplink::{TelemetryChannel, TelemetryError, VirtualPin};
use health_monitor_common::{Channel, Collaborators};

/// Returns queued values per channel; repeats the last one when the queue
/// runs dry.
pub struct ScriptedSensor {
    channels: Vec<Channel>,
    script: HashMap<Channel, VecDeque<Option<f32>>>,
    last: HashMap<Channel, Option<f32>>,
    init_failures: u32,
    beats: VecDeque<bool>,
    pending_beats: u32,
    pub updates: Rc<Cell<u32>>,
}

impl ScriptedSensor {
    pub fn new(channels: &[Channel]) -> Self {
        Self {
            channels: channels.to_vec(),
            script: HashMap::new(),
            last: HashMap::new(),
            init_failures: 0,
            beats: VecDeque::new(),
            pending_beats: 0,
            updates: Rc::new(Cell::new(0)),
        }
    }

    pub fn with_values(mut self, channel: Channel, values: &[Option<f32>]) -> Self {
        self.script
            .entry(channel)
            .or_default()
            .extend(values.iter().copied());
        self
    }

    pub fn constant(self, channel: Channel, value: f32) -> Self {
        self.with_values(channel, &[Some(value)])
    }

    pub fn failing_init(self) -> Self {
        self.failing_init_times(u32::MAX)
    }

    /// Fails the first `times` calls to `initialize`.
    pub fn failing_init_times(mut self, times: u32) -> Self {
        self.init_failures = times;
        self
    }

    /// One entry per `update` call; `true` raises a beat.
    pub fn with_beats(mut self, beats: &[bool]) -> Self {
        self.beats.extend(beats.iter().copied());
        self
    }
}

impl SensorDriver for ScriptedSensor {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn channels(&self) -> &[Channel] {
        &self.channels
    }

    fn initialize(&mut self) -> Result<(), SensorError> {
        if self.init_failures > 0 {
            self.init_failures -= 1;
            Err(SensorError::Timeout)
        } else {
            Ok(())
        }
    }

    fn sample(&mut self, channel: Channel) -> Option<f32> {
        let next = self.script.get_mut(&channel).and_then(|q| q.pop_front());
        match next {
            Some(value) => {
                self.last.insert(channel, value);
                value
            }
            None => self.last.get(&channel).copied().flatten(),
        }
    }

    fn update(&mut self) {
        self.updates.set(self.updates.get() + 1);
        if self.beats.pop_front() == Some(true) {
            self.pending_beats += 1;
        }
    }

    fn poll_event(&mut self) -> Option<SensorEvent> {
        if self.pending_beats > 0 {
            self.pending_beats -= 1;
            Some(SensorEvent::BeatDetected)
        } else {
            None
        }
    }
}

#[derive(Debug, Default)]
pub struct TransportLog {
    pub opens: Vec<(String, u16)>,
    pub writes: Vec<Vec<u8>>,
    pub closes: u32,
}

impl TransportLog {
    pub fn calls(&self) -> usize {
        self.opens.len() + self.writes.len() + self.closes as usize
    }

    pub fn written(&self) -> String {
        String::from_utf8(self.writes.concat()).unwrap()
    }
}

pub struct RecordingTransport {
    pub log: Rc<RefCell<TransportLog>>,
    pub refuse: bool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            log: Rc::default(),
            refuse: false,
        }
    }

    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::new()
        }
    }
}

impl Transport for RecordingTransport {
    fn open(&mut self, host: &str, port: u16) -> Result<(), TransportError> {
        self.log.borrow_mut().opens.push((host.to_string(), port));
        if self.refuse {
            Err(TransportError::Connect {
                host: host.to_string(),
                port,
                source: None,
            })
        } else {
            Ok(())
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.log.borrow_mut().writes.push(bytes.to_vec());
        Ok(())
    }

    fn close(&mut self) {
        self.log.borrow_mut().closes += 1;
    }
}

#[derive(Debug, Default)]
pub struct TelemetryLog {
    pub initialized: bool,
    pub pumps: u32,
    pub published: Vec<(VirtualPin, f32)>,
}

pub struct RecordingTelemetry {
    pub log: Rc<RefCell<TelemetryLog>>,
}

impl RecordingTelemetry {
    pub fn new() -> Self {
        Self { log: Rc::default() }
    }
}

impl TelemetryChannel for RecordingTelemetry {
    fn initialize(&mut self, _auth_token: &str, _ssid: &str, _password: &str) -> Result<(), TelemetryError> {
        self.log.borrow_mut().initialized = true;
        Ok(())
    }

    fn pump(&mut self) {
        self.log.borrow_mut().pumps += 1;
    }

    fn publish(&mut self, pin: VirtualPin, value: f32) -> Result<(), TelemetryError> {
        self.log.borrow_mut().published.push((pin, value));
        Ok(())
    }
}

/// Link that comes up after `up_after` polls of `is_connected`, or never.
pub struct FakeLink {
    pub polls: Rc<Cell<u32>>,
    pub up_after: Option<u32>,
    pub forced: Rc<Cell<Option<bool>>>,
}

impl FakeLink {
    pub fn online() -> Self {
        Self::up_after(0)
    }

    pub fn offline() -> Self {
        Self {
            polls: Rc::default(),
            up_after: None,
            forced: Rc::default(),
        }
    }

    pub fn up_after(polls: u32) -> Self {
        Self {
            up_after: Some(polls),
            ..Self::offline()
        }
    }
}

impl NetworkLink for FakeLink {
    fn begin(&mut self, _ssid: &str, _password: &str) -> Result<(), LinkError> {
        Ok(())
    }

    fn is_connected(&self) -> bool {
        if let Some(forced) = self.forced.get() {
            return forced;
        }
        let polls = self.polls.get();
        self.polls.set(polls + 1);
        self.up_after.is_some_and(|n| polls >= n)
    }
}

pub struct RecordingPin(pub Rc<RefCell<Vec<bool>>>);

impl IndicatorPin for RecordingPin {
    fn set(&mut self, on: bool) {
        self.0.borrow_mut().push(on);
    }
}

/// Handles onto everything the fakes record.
pub struct Handles {
    pub transport: Rc<RefCell<TransportLog>>,
    pub telemetry: Rc<RefCell<TelemetryLog>>,
    pub heartbeat_led: Rc<RefCell<Vec<bool>>>,
    pub send_led: Rc<RefCell<Vec<bool>>>,
    pub link: Rc<Cell<Option<bool>>>,
}

pub fn collaborators(
    sensors: Vec<Box<dyn SensorDriver>>,
    link: FakeLink,
    transport: RecordingTransport,
) -> (Collaborators, Handles) {
    let telemetry = RecordingTelemetry::new();
    let heartbeat_led = Rc::new(RefCell::new(Vec::new()));
    let send_led = Rc::new(RefCell::new(Vec::new()));

    let handles = Handles {
        transport: transport.log.clone(),
        telemetry: telemetry.log.clone(),
        heartbeat_led: heartbeat_led.clone(),
        send_led: send_led.clone(),
        link: link.forced.clone(),
    };

    let collaborators = Collaborators {
        sensors,
        link: Box::new(link),
        telemetry: Box::new(telemetry),
        transport: Box::new(transport),
        heartbeat_led: Box::new(RecordingPin(heartbeat_led)),
        send_led: Box::new(RecordingPin(send_led)),
    };

    (collaborators, handles)
}
