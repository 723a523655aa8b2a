//! Synthetic analytics events for the ingestion API.

mod events;

use bytes::Bytes;
use rand::Rng;
use serde::{Deserialize, Serialize};
use surge_core::{IngestMode, PayloadSource};

pub use events::{generate_batch, generate_event};

/// Which kind of event a scenario sends. `Mixed` picks one of the concrete kinds per event.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
pub enum EventType {
    #[serde(rename = "cl")]
    #[strum(serialize = "cl")]
    Click,
    #[serde(rename = "ac")]
    #[strum(serialize = "ac")]
    Action,
    #[serde(rename = "im")]
    #[strum(serialize = "im")]
    Impression,
    #[serde(rename = "er")]
    #[strum(serialize = "er")]
    Error,
    #[default]
    #[serde(rename = "mixed")]
    #[strum(serialize = "mixed")]
    Mixed,
}

impl EventType {
    pub const CONCRETE: [EventType; 4] = [
        EventType::Click,
        EventType::Action,
        EventType::Impression,
        EventType::Error,
    ];

    /// Resolves `Mixed` to a random concrete kind.
    pub fn resolve<R: Rng>(self, rng: &mut R) -> EventType {
        match self {
            EventType::Mixed => Self::CONCRETE[rng.random_range(0..Self::CONCRETE.len())],
            other => other,
        }
    }
}

/// Generates a fresh body for every dispatch: one event object in single mode, a batch
/// envelope otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventGenerator {
    event_type: EventType,
}

impl EventGenerator {
    pub fn new(event_type: EventType) -> Self {
        Self { event_type }
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }
}

impl PayloadSource for EventGenerator {
    fn payload(&self, mode: IngestMode, event_count: u64) -> Bytes {
        let mut rng = rand::rng();
        let value = match mode {
            IngestMode::Single => generate_event(self.event_type, &mut rng),
            IngestMode::Batch => generate_batch(self.event_type, event_count, &mut rng),
        };
        Bytes::from(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn event_type_codes_round_trip_through_strum_and_serde() {
        assert_eq!(EventType::from_str("im").ok(), Some(EventType::Impression));
        assert_eq!(EventType::Mixed.to_string(), "mixed");
        let parsed: EventType = serde_json::from_str("\"er\"")
            .unwrap_or_else(|err| panic!("deserialize: {err}"));
        assert_eq!(parsed, EventType::Error);
        assert!(EventType::from_str("xx").is_err());
    }

    #[test]
    fn mixed_resolves_to_concrete_kinds() {
        let mut rng = rand::rng();
        for _ in 0..50 {
            assert_ne!(EventType::Mixed.resolve(&mut rng), EventType::Mixed);
        }
        assert_eq!(EventType::Click.resolve(&mut rng), EventType::Click);
    }

    #[test]
    fn single_mode_body_is_one_event() {
        let body = EventGenerator::new(EventType::Click).payload(IngestMode::Single, 1);
        let value: serde_json::Value =
            serde_json::from_slice(&body).unwrap_or_else(|err| panic!("json: {err}"));
        assert_eq!(value["event_type"], "cl");
        assert!(value.get("events").is_none());
    }

    #[test]
    fn batch_mode_body_is_an_envelope_of_the_requested_size() {
        let body = EventGenerator::default().payload(IngestMode::Batch, 7);
        let value: serde_json::Value =
            serde_json::from_slice(&body).unwrap_or_else(|err| panic!("json: {err}"));
        assert!(value["batchId"].is_string());
        assert!(value["sentAt"].is_string());
        assert!(value["clientInfo"]["deviceId"].is_string());
        assert_eq!(value["events"].as_array().map(Vec::len), Some(7));
    }
}
