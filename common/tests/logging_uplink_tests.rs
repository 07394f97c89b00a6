mod support;

use std::cell::RefCell;
use std::rc::Rc;

use health_monitor_common::config::{FieldAssignment, LoggingConfig};
use health_monitor_common::indicator::Indicator;
use health_monitor_common::uplink::{LoggingUplink, SendOutcome, UplinkError};
use health_monitor_common::{Channel, MonitorConfig, Sample, SampleStore};

use support::{RecordingPin, RecordingTransport, TransportLog};

struct Rig {
    uplink: LoggingUplink,
    transport: Rc<RefCell<TransportLog>>,
    led: Rc<RefCell<Vec<bool>>>,
}

fn rig(transport: RecordingTransport) -> Rig {
    rig_with(
        LoggingConfig {
            api_key: "WRITEKEY".into(),
            ..MonitorConfig::oximeter().logging
        },
        transport,
    )
}

fn rig_with(config: LoggingConfig, transport: RecordingTransport) -> Rig {
    let led = Rc::new(RefCell::new(Vec::new()));
    let log = transport.log.clone();
    let uplink = LoggingUplink::new(
        Box::new(transport),
        config,
        Indicator::new(Box::new(RecordingPin(led.clone()))),
    );
    Rig {
        uplink,
        transport: log,
        led,
    }
}

fn oximeter_store() -> SampleStore {
    SampleStore::new(&[Channel::HeartRate, Channel::SpO2, Channel::Temperature])
}

#[test]
fn test_all_invalid_makes_no_transport_calls() {
    let mut rig = rig(RecordingTransport::new());
    let store = oximeter_store();

    let outcome = rig.uplink.send(&store).unwrap();

    assert_eq!(outcome, SendOutcome::Skipped);
    assert_eq!(rig.transport.borrow().calls(), 0);
    assert!(!rig.uplink.indicator().is_lit());
}

#[test]
fn test_valid_channel_outside_record_does_not_count() {
    let config = LoggingConfig {
        api_key: "K".into(),
        fields: vec![FieldAssignment::new(Channel::SpO2, 1)],
        ..LoggingConfig::default()
    };
    let mut rig = rig_with(config, RecordingTransport::new());
    let mut store = oximeter_store();
    store.set(Channel::HeartRate, Sample::valid(72.0, 0));

    let outcome = rig.uplink.send(&store).unwrap();

    assert_eq!(outcome, SendOutcome::Skipped);
    assert_eq!(rig.transport.borrow().calls(), 0);
}

#[test]
fn test_heart_rate_and_temperature_record() {
    let mut rig = rig(RecordingTransport::new());
    let mut store = oximeter_store();
    store.set(Channel::HeartRate, Sample::valid(72.3, 0));
    store.set(Channel::SpO2, Sample::invalid(0));
    store.set(Channel::Temperature, Sample::valid(36.5, 0));

    rig.uplink.send(&store).unwrap();

    let body = "WRITEKEY&field1=72.3&field2=0&field3=36.5\r\n\r\n";
    let written = rig.transport.borrow().written();
    assert!(written.ends_with(&format!("Content-Length: {}\r\n\r\n{}", body.len(), body)));
    assert_eq!(body.len(), 45);
}

#[test]
fn test_single_valid_channel_is_sent() {
    let mut rig = rig(RecordingTransport::new());
    let mut store = oximeter_store();
    store.set(Channel::Temperature, Sample::valid(36.5, 1_000));

    let outcome = rig.uplink.send(&store).unwrap();

    let log = rig.transport.borrow();
    let body = "WRITEKEY&field1=0&field2=0&field3=36.5\r\n\r\n";
    assert_eq!(log.opens, vec![("api.thingspeak.com".to_string(), 80)]);
    assert_eq!(log.closes, 1);
    assert!(log.written().ends_with(body));
    assert_eq!(outcome, SendOutcome::Sent { bytes: log.written().len() });
}

#[test]
fn test_request_headers() {
    let mut rig = rig(RecordingTransport::new());
    let mut store = oximeter_store();
    store.set(Channel::HeartRate, Sample::valid(72.0, 0));
    store.set(Channel::SpO2, Sample::valid(97.0, 0));
    store.set(Channel::Temperature, Sample::valid(36.6, 0));

    rig.uplink.send(&store).unwrap();

    let written = rig.transport.borrow().written();
    let (head, body) = written.split_once("\r\n\r\n").unwrap();
    let lines: Vec<_> = head.split("\r\n").collect();

    assert_eq!(lines[0], "POST /update HTTP/1.1");
    assert!(lines.contains(&"Host: api.thingspeak.com"));
    assert!(lines.contains(&"Connection: close"));
    assert!(lines.contains(&"X-THINGSPEAKAPIKEY: WRITEKEY"));
    assert!(lines.contains(&"Content-Type: application/x-www-form-urlencoded"));
    assert_eq!(body, "WRITEKEY&field1=72&field2=97&field3=36.6\r\n\r\n");
    assert!(lines.contains(&format!("Content-Length: {}", body.len()).as_str()));
}

#[test]
fn test_failed_open_closes_once_and_reports() {
    let mut rig = rig(RecordingTransport::refusing());
    let mut store = oximeter_store();
    store.set(Channel::HeartRate, Sample::valid(72.0, 0));

    let result = rig.uplink.send(&store);

    assert!(matches!(result, Err(UplinkError::Transport(_))));
    let log = rig.transport.borrow();
    assert_eq!(log.opens.len(), 1);
    assert!(log.writes.is_empty());
    assert_eq!(log.closes, 1);
}

#[test]
fn test_indicator_lit_only_during_attempt() {
    let mut rig = rig(RecordingTransport::refusing());
    let mut store = oximeter_store();
    store.set(Channel::HeartRate, Sample::valid(72.0, 0));

    let _ = rig.uplink.send(&store);

    assert_eq!(*rig.led.borrow(), vec![false, true, false]);
    assert!(!rig.uplink.indicator().is_lit());
}

#[test]
fn test_one_connection_per_send() {
    let mut rig = rig(RecordingTransport::new());
    let mut store = oximeter_store();
    store.set(Channel::HeartRate, Sample::valid(80.0, 0));

    rig.uplink.send(&store).unwrap();
    rig.uplink.send(&store).unwrap();

    let log = rig.transport.borrow();
    assert_eq!(log.opens.len(), 2);
    assert_eq!(log.closes, 2);
}
