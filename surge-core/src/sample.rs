use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

use crate::http::TransportErrorKind;

/// Closed failure taxonomy. Causes are carried as data, never as the discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorKind {
    /// A response was received with a status other than 200.
    HttpStatus(u16),
    /// The per-request deadline expired.
    Timeout,
    /// Connection or protocol failure before a status was received.
    Transport(TransportErrorKind),
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HttpStatus(code) => write!(f, "http_status:{code}"),
            Self::Timeout => f.write_str("timeout"),
            Self::Transport(kind) => write!(f, "transport:{kind}"),
        }
    }
}

/// How a single request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Status(u16),
    Timeout,
    Transport(TransportErrorKind),
}

impl Outcome {
    pub const SUCCESS_STATUS: u16 = 200;

    pub fn is_success(self) -> bool {
        matches!(self, Self::Status(Self::SUCCESS_STATUS))
    }
}

/// Immutable record of one completed dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSample {
    success: bool,
    latency: Duration,
    event_count: u64,
    status_code: Option<u16>,
    error_kind: Option<ErrorKind>,
    observed_at: Instant,
    bytes_sent: u64,
    bytes_received: u64,
}

impl ResultSample {
    pub fn new(outcome: Outcome, latency: Duration, event_count: u64, observed_at: Instant) -> Self {
        let (status_code, error_kind) = match outcome {
            Outcome::Status(code) if outcome.is_success() => (Some(code), None),
            Outcome::Status(code) => (Some(code), Some(ErrorKind::HttpStatus(code))),
            Outcome::Timeout => (None, Some(ErrorKind::Timeout)),
            Outcome::Transport(kind) => (None, Some(ErrorKind::Transport(kind))),
        };

        Self {
            success: outcome.is_success(),
            latency,
            event_count,
            status_code,
            error_kind,
            observed_at,
            bytes_sent: 0,
            bytes_received: 0,
        }
    }

    #[must_use]
    pub fn with_bytes(mut self, sent: u64, received: u64) -> Self {
        self.bytes_sent = sent;
        self.bytes_received = received;
        self
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error_kind
    }

    pub fn observed_at(&self) -> Instant {
        self.observed_at
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_status_200_is_success() {
        let now = Instant::now();
        let ok = ResultSample::new(Outcome::Status(200), Duration::from_millis(5), 1, now);
        assert!(ok.success());
        assert_eq!(ok.status_code(), Some(200));
        assert_eq!(ok.error_kind(), None);

        let created = ResultSample::new(Outcome::Status(201), Duration::from_millis(5), 1, now);
        assert!(!created.success());
        assert_eq!(created.status_code(), Some(201));
        assert_eq!(created.error_kind(), Some(ErrorKind::HttpStatus(201)));
    }

    #[test]
    fn transport_failures_carry_no_status() {
        let now = Instant::now();
        let timeout = ResultSample::new(Outcome::Timeout, Duration::from_secs(30), 50, now);
        assert!(!timeout.success());
        assert_eq!(timeout.status_code(), None);
        assert_eq!(timeout.error_kind(), Some(ErrorKind::Timeout));
        assert_eq!(timeout.event_count(), 50);

        let refused = ResultSample::new(
            Outcome::Transport(TransportErrorKind::Connect),
            Duration::from_millis(1),
            1,
            now,
        );
        assert_eq!(refused.status_code(), None);
        assert_eq!(
            refused.error_kind().map(|k| k.to_string()).as_deref(),
            Some("transport:connect")
        );
    }

    #[test]
    fn error_kind_labels() {
        assert_eq!(ErrorKind::HttpStatus(503).to_string(), "http_status:503");
        assert_eq!(ErrorKind::Timeout.to_string(), "timeout");
    }
}
