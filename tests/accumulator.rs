use chrono::{Duration as ChronoDuration, Utc};
use serde_json::json;
use streamsum::aggregate::{SAMPLE_CAPACITY, WindowStats};
use streamsum::event::StreamEvent;

fn event(value: f64) -> StreamEvent {
    StreamEvent::new(json!({ "value": value }))
}

#[test]
fn records_running_statistics() {
    let mut stats = WindowStats::new();
    for value in [3.0, -1.0, 7.5] {
        stats.record(&event(value));
    }

    assert_eq!(stats.count(), 3);
    assert_eq!(stats.sum(), 9.5);
    assert_eq!(stats.min(), -1.0);
    assert_eq!(stats.max(), 7.5);
    assert!(stats.window_start().is_some());
}

#[test]
fn empty_window_normalizes_min_max_to_zero() {
    let stats = WindowStats::new();
    assert_eq!(stats.min(), 0.0);
    assert_eq!(stats.max(), 0.0);
    assert!(stats.is_empty());
    assert!(stats.window_start().is_none());
}

#[test]
fn missing_metric_field_counts_as_zero() {
    let mut stats = WindowStats::new();
    stats.record(&event(5.0));
    stats.record(&StreamEvent::new(json!({ "name": "no value here" })));

    let summary = stats.summarize();
    assert_eq!(summary.statistics.total_events, 2);
    assert_eq!(summary.statistics.sum_of_values, 5.0);
    assert_eq!(summary.statistics.min_value, 0.0);
    assert_eq!(summary.statistics.average_value, 2.5);
}

#[test]
fn sample_buffer_evicts_oldest_past_capacity() {
    let mut stats = WindowStats::new();
    for value in 0..8 {
        stats.record(&event(value as f64));
    }

    let summary = stats.summarize();
    assert_eq!(summary.event_sample.len(), SAMPLE_CAPACITY);
    let sampled: Vec<f64> = summary
        .event_sample
        .iter()
        .map(StreamEvent::metric_value)
        .collect();
    assert_eq!(sampled, vec![3.0, 4.0, 5.0, 6.0, 7.0]);
}

#[test]
fn summary_window_span_uses_first_and_last_arrival() {
    let start = Utc::now();
    let end = start + ChronoDuration::milliseconds(1500);

    let mut stats = WindowStats::new();
    stats.record(&StreamEvent::with_received_at(json!({"value": 1}), start));
    stats.record(&StreamEvent::with_received_at(json!({"value": 2}), end));

    let summary = stats.summarize();
    assert_eq!(summary.aggregation_period.start, start);
    assert_eq!(summary.aggregation_period.end, end);
    assert_eq!(summary.aggregation_period.duration_ms, 1500);
    assert!(summary.id.starts_with("summary-"));
}

#[test]
fn summary_serializes_with_wire_field_names() {
    let mut stats = WindowStats::new();
    stats.record(&event(4.0));

    let json = serde_json::to_value(stats.summarize()).unwrap();
    assert!(json.get("aggregationPeriod").is_some());
    assert!(json.get("eventSample").is_some());
    assert_eq!(json["statistics"]["totalEvents"], 1);
    assert_eq!(json["statistics"]["sumOfValues"], 4.0);
    assert_eq!(json["statistics"]["averageValue"], 4.0);
    assert_eq!(json["statistics"]["minValue"], 4.0);
    assert_eq!(json["statistics"]["maxValue"], 4.0);
    assert!(json["aggregationPeriod"].get("durationMs").is_some());
}

#[test]
fn default_state_is_fully_zeroed() {
    let mut stats = WindowStats::new();
    for value in [9.0, -4.0] {
        stats.record(&event(value));
    }

    stats = WindowStats::default();
    assert_eq!(stats.count(), 0);
    assert_eq!(stats.sum(), 0.0);
    assert_eq!(stats.min(), 0.0);
    assert_eq!(stats.max(), 0.0);
    assert!(stats.last_event_time().is_none());
    assert!(stats.summarize().event_sample.is_empty());
}
