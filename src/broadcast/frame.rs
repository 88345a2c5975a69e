//! Text framing for the subscriber wire.
//!
//! Each delivered message becomes a three-part text block: an `id:` line
//! carrying a fresh identifier, a `data:` line with the JSON payload, and a
//! blank terminator line. Identifiers are per-frame and never act as a
//! resume cursor — a reconnecting client starts from the live feed.

use uuid::Uuid;

use crate::event::BroadcastMessage;

/// One rendered subscriber frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WireFrame {
    id: Uuid,
    data: String,
}

impl WireFrame {
    /// Frame a broadcast message, serializing its payload to compact JSON.
    pub fn from_message(message: &BroadcastMessage) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: Uuid::new_v4(),
            data: message.to_json_string()?,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    /// Render the full text block, blank-line terminated.
    pub fn render(&self) -> String {
        format!("id: {}\ndata: {}\n\n", self.id, self.data)
    }

    /// Reconnect-delay hint sent once at stream start.
    pub fn retry_hint(retry_ms: u64) -> String {
        format!("retry: {retry_ms}\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::StreamEvent;
    use serde_json::json;

    #[test]
    fn renders_id_data_and_terminator() {
        let message = BroadcastMessage::Event(StreamEvent::new(json!({"value": 2})));
        let frame = WireFrame::from_message(&message).unwrap();
        let rendered = frame.render();

        assert!(rendered.starts_with(&format!("id: {}\n", frame.id())));
        assert!(rendered.contains("\ndata: {"));
        assert!(rendered.ends_with("\n\n"));
    }

    #[test]
    fn frames_get_distinct_ids() {
        let message = BroadcastMessage::Event(StreamEvent::new(json!({"value": 2})));
        let a = WireFrame::from_message(&message).unwrap();
        let b = WireFrame::from_message(&message).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn retry_hint_is_a_bare_block() {
        assert_eq!(WireFrame::retry_hint(3000), "retry: 3000\n\n");
    }
}
