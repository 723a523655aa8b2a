use bytes::Bytes;

use crate::config::IngestMode;

/// Produces request bodies. The core never looks inside them.
pub trait PayloadSource: Send + Sync {
    /// Body for one dispatch covering `event_count` events. In `Single` mode `event_count` is 1.
    fn payload(&self, mode: IngestMode, event_count: u64) -> Bytes;
}

/// One dispatch's payload handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit {
    pub mode: IngestMode,
    pub body: Bytes,
}

impl WorkUnit {
    pub fn new(mode: IngestMode, body: Bytes) -> Self {
        Self { mode, body }
    }
}

/// Sends the same body for every dispatch, regardless of size.
#[derive(Debug, Clone, Default)]
pub struct FixedPayload(pub Bytes);

impl PayloadSource for FixedPayload {
    fn payload(&self, _mode: IngestMode, _event_count: u64) -> Bytes {
        self.0.clone()
    }
}
