use core::fmt::Write as _;

use crate::config::LoggingConfig;
use crate::indicator::Indicator;
use crate::store::SampleStore;
use crate::transport::{ScopedConnection, Transport, TransportError};

#[derive(Debug, thiserror::Error)]
pub enum UplinkError {
    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// Request written; `bytes` is the full request size.
    Sent { bytes: usize },
    /// Nothing valid to report, no connection attempted.
    Skipped,
}

/// One batched record: the api key plus one numbered field per channel.
#[derive(Clone, Debug, PartialEq)]
pub struct LoggingRecord {
    pub api_key: String,
    pub fields: Vec<(u8, f32)>,
}

impl LoggingRecord {
    /// Builds the record from the latest samples. Invalid channels are
    /// reported as `0` so the field layout never changes.
    pub fn from_snapshot(store: &SampleStore, config: &LoggingConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            fields: config
                .fields
                .iter()
                .map(|f| (f.field, store.value_or_zero(f.channel)))
                .collect(),
        }
    }

    /// True when no configured field has a valid reading in `store`.
    pub fn is_empty_for(store: &SampleStore, config: &LoggingConfig) -> bool {
        config
            .fields
            .iter()
            .all(|f| store.get(f.channel).and_then(|s| s.reading()).is_none())
    }

    /// `<key>&field1=<v>&field2=<v>...\r\n\r\n`
    pub fn body(&self) -> String {
        let mut body = self.api_key.clone();
        for (field, value) in &self.fields {
            let _ = write!(body, "&field{}={}", field, value);
        }
        body.push_str("\r\n\r\n");
        body
    }
}

/// Wraps `body` in the POST request expected by the logging endpoint.
pub fn encode_request(config: &LoggingConfig, body: &str) -> String {
    let mut request = String::with_capacity(192 + body.len());
    let _ = write!(request, "POST {} HTTP/1.1\r\n", config.path);
    let _ = write!(request, "Host: {}\r\n", config.host);
    request.push_str("Connection: close\r\n");
    let _ = write!(request, "X-THINGSPEAKAPIKEY: {}\r\n", config.api_key);
    request.push_str("Content-Type: application/x-www-form-urlencoded\r\n");
    let _ = write!(request, "Content-Length: {}\r\n", body.len());
    request.push_str("\r\n");
    request.push_str(body);
    request
}

pub struct LoggingUplink {
    transport: Box<dyn Transport>,
    config: LoggingConfig,
    indicator: Indicator,
}

impl LoggingUplink {
    pub fn new(transport: Box<dyn Transport>, config: LoggingConfig, indicator: Indicator) -> Self {
        Self {
            transport,
            config,
            indicator,
        }
    }

    pub fn config(&self) -> &LoggingConfig {
        &self.config
    }

    pub fn indicator(&self) -> &Indicator {
        &self.indicator
    }

    /// Delivers the current snapshot, or skips when every channel of the
    /// record is invalid.
    ///
    /// Opens at most one connection; it is closed on every path. The send
    /// indicator is lit for the duration of the attempt.
    pub fn send(&mut self, store: &SampleStore) -> Result<SendOutcome, UplinkError> {
        if LoggingRecord::is_empty_for(store, &self.config) {
            log::info!("Skipping logging update - no valid data");
            return Ok(SendOutcome::Skipped);
        }

        let record = LoggingRecord::from_snapshot(store, &self.config);
        let request = encode_request(&self.config, &record.body());

        self.indicator.set(true);
        let result = Self::deliver(
            self.transport.as_mut(),
            &self.config.host,
            self.config.port,
            request.as_bytes(),
        );
        self.indicator.set(false);

        match result {
            Ok(()) => {
                log::info!("Data sent to {}", self.config.host);
                Ok(SendOutcome::Sent {
                    bytes: request.len(),
                })
            }
            Err(e) => {
                log::warn!("Connection to {} failed: {}", self.config.host, e);
                Err(e.into())
            }
        }
    }

    fn deliver(
        transport: &mut dyn Transport,
        host: &str,
        port: u16,
        request: &[u8],
    ) -> Result<(), TransportError> {
        let mut conn = ScopedConnection::new(transport);
        conn.open(host, port)?;
        conn.write(request)
    }
}
