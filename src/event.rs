//! Raw event model and the broadcast envelope shared by the ingestion path
//! and every outbound subscriber stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::aggregate::Summary;

/// A single raw event as delivered by the broker ingress.
///
/// The payload is kept opaque: aggregation only needs one numeric field,
/// everything else rides along untouched into sample buffers and subscriber
/// frames. Events are immutable once constructed.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StreamEvent {
    /// The parsed JSON body exactly as it arrived on the input topic.
    pub payload: Value,
    /// Arrival timestamp assigned by the consumer.
    pub received_at: DateTime<Utc>,
}

impl StreamEvent {
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            received_at: Utc::now(),
        }
    }

    /// Build an event with an explicit arrival timestamp.
    pub fn with_received_at(payload: Value, received_at: DateTime<Utc>) -> Self {
        Self {
            payload,
            received_at,
        }
    }

    /// Extract the numeric field used for aggregation.
    ///
    /// Lookup order is `payload.times`, then top-level `value`. An event
    /// carrying neither (or a non-numeric field) aggregates as `0.0` rather
    /// than being excluded, so summary counts always mean "events observed",
    /// not "values observed". The chain is presence-based, not falsy-based:
    /// a `payload.times` of `0` is used as-is instead of falling through to
    /// `value`, since `0` is a legitimate measurement.
    pub fn metric_value(&self) -> f64 {
        self.payload
            .get("payload")
            .and_then(|inner| inner.get("times"))
            .and_then(Value::as_f64)
            .or_else(|| self.payload.get("value").and_then(Value::as_f64))
            .unwrap_or(0.0)
    }
}

/// Envelope delivered to subscribers: either a raw event or a finished
/// summary, tagged so clients can route without sniffing the body.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum BroadcastMessage {
    Event(StreamEvent),
    Summary(Summary),
}

impl BroadcastMessage {
    /// Serialize the envelope to the compact JSON used on the wire.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn metric_value_prefers_nested_times() {
        let event = StreamEvent::new(json!({"payload": {"times": 7}, "value": 3}));
        assert_eq!(event.metric_value(), 7.0);
    }

    #[test]
    fn metric_value_keeps_a_zero_times_field() {
        let event = StreamEvent::new(json!({"payload": {"times": 0}, "value": 9}));
        assert_eq!(event.metric_value(), 0.0);
    }

    #[test]
    fn metric_value_falls_back_to_value_field() {
        let event = StreamEvent::new(json!({"value": 3.5}));
        assert_eq!(event.metric_value(), 3.5);
    }

    #[test]
    fn missing_or_non_numeric_field_counts_as_zero() {
        assert_eq!(StreamEvent::new(json!({"name": "x"})).metric_value(), 0.0);
        assert_eq!(StreamEvent::new(json!({"value": "nan"})).metric_value(), 0.0);
    }

    #[test]
    fn envelope_is_tagged_by_type() {
        let event = StreamEvent::new(json!({"value": 1}));
        let frame = BroadcastMessage::Event(event).to_json_string().unwrap();
        assert!(frame.contains("\"type\":\"event\""));
        assert!(frame.contains("\"data\""));
    }
}
