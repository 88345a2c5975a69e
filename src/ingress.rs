//! Broker ingress boundary.
//!
//! The broker client lives outside this crate; it hands raw message bodies
//! to the service one at a time. The only work done here is turning a body
//! into a [`StreamEvent`]. Malformed payloads are reported and skipped
//! upstream of the window controller, so they never disturb the open window.

use thiserror::Error;

use crate::event::StreamEvent;

#[derive(Debug, Error)]
pub enum IngressError {
    #[error("malformed event payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Parse one raw message body into an event, stamping the arrival time.
pub fn parse_event(raw: &str) -> Result<StreamEvent, IngressError> {
    let payload = serde_json::from_str(raw)?;
    Ok(StreamEvent::new(payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_bodies() {
        let event = parse_event(r#"{"value": 4}"#).unwrap();
        assert_eq!(event.metric_value(), 4.0);
    }

    #[test]
    fn rejects_invalid_json() {
        assert!(matches!(
            parse_event("{not json"),
            Err(IngressError::Malformed(_))
        ));
    }
}
