//! Pure running-statistics accumulator for one aggregation window.
//!
//! No I/O and no locking lives here; the controller owns serialization of
//! access. The accumulator is replaced wholesale on reset (`mem::take`), so a
//! half-cleared window is never observable.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::StreamEvent;

/// Number of trailing raw events retained inside each summary.
pub const SAMPLE_CAPACITY: usize = 5;

/// Mutable state of the open aggregation window.
///
/// Invariant: `count == 0` exactly when `window_start` is `None`.
#[derive(Debug, Clone)]
pub struct WindowStats {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    window_start: Option<DateTime<Utc>>,
    last_event_time: Option<DateTime<Utc>>,
    samples: VecDeque<StreamEvent>,
}

impl Default for WindowStats {
    fn default() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            window_start: None,
            last_event_time: None,
            samples: VecDeque::with_capacity(SAMPLE_CAPACITY),
        }
    }
}

impl WindowStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the running statistics.
    ///
    /// Total over any well-formed event: a missing or non-numeric metric
    /// field contributes `0.0` but still counts (see
    /// [`StreamEvent::metric_value`]).
    pub fn record(&mut self, event: &StreamEvent) {
        let value = event.metric_value();
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);

        if self.window_start.is_none() {
            self.window_start = Some(event.received_at);
        }
        self.last_event_time = Some(event.received_at);

        if self.samples.len() == SAMPLE_CAPACITY {
            self.samples.pop_front();
        }
        self.samples.push_back(event.clone());
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Minimum observed value, normalized to `0.0` for an empty window since
    /// infinities are not representable on the wire.
    pub fn min(&self) -> f64 {
        if self.min.is_finite() { self.min } else { 0.0 }
    }

    /// Maximum observed value, normalized like [`WindowStats::min`].
    pub fn max(&self) -> f64 {
        if self.max.is_finite() { self.max } else { 0.0 }
    }

    pub fn window_start(&self) -> Option<DateTime<Utc>> {
        self.window_start
    }

    pub fn last_event_time(&self) -> Option<DateTime<Utc>> {
        self.last_event_time
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Freeze the current state into an immutable [`Summary`].
    ///
    /// Callers are expected to skip empty windows entirely; an empty snapshot
    /// still yields a well-formed (all-zero) summary rather than panicking.
    pub fn summarize(&self) -> Summary {
        let emitted_at = Utc::now();
        let start = self.window_start.unwrap_or(emitted_at);
        let end = self.last_event_time.unwrap_or(emitted_at);
        let average = if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        };

        Summary {
            id: format!("summary-{}", Uuid::new_v4()),
            timestamp: emitted_at,
            aggregation_period: WindowSpan {
                start,
                end,
                duration_ms: (end - start).num_milliseconds(),
            },
            statistics: SummaryStatistics {
                total_events: self.count,
                sum_of_values: self.sum,
                average_value: average,
                min_value: self.min(),
                max_value: self.max(),
            },
            event_sample: self.samples.iter().cloned().collect(),
        }
    }
}

/// Immutable aggregation result published to the summary topic and fanned
/// out to subscribers. Field names follow the external wire schema.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub aggregation_period: WindowSpan,
    pub statistics: SummaryStatistics,
    pub event_sample: Vec<StreamEvent>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WindowSpan {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_ms: i64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStatistics {
    pub total_events: u64,
    pub sum_of_values: f64,
    pub average_value: f64,
    pub min_value: f64,
    pub max_value: f64,
}
