//! Dual-trigger window controller.
//!
//! A two-state machine (Idle / Accumulating) guarded by a single mutex.
//! Both drivers — the ingress path calling [`WindowController::observe`] and
//! the periodic ticker calling [`WindowController::tick`] — funnel through
//! that one lock, so a snapshot-then-reset can never interleave with a
//! concurrent update. The lock is never held across an await point.

use std::mem;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Summary;
use super::accumulator::{SummaryStatistics, WindowStats};
use crate::config::AggregationConfig;
use crate::event::StreamEvent;

/// Owns the live [`WindowStats`] and decides when a window closes.
///
/// A window closes on whichever trigger fires first: the running count
/// reaching `batch_size`, or the ticker firing while events are buffered.
/// Closing is atomic: the window is swapped out wholesale and summarized,
/// so the next event lands in a fresh window with no leakage of prior
/// min/max/sum.
#[derive(Debug)]
pub struct WindowController {
    window: Mutex<WindowStats>,
    batch_size: u64,
    interval: Duration,
}

impl WindowController {
    pub fn new(config: &AggregationConfig) -> Self {
        Self {
            window: Mutex::new(WindowStats::new()),
            batch_size: config.batch_size,
            interval: config.interval,
        }
    }

    /// Wall-clock period between timer triggers.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Fold one event into the open window.
    ///
    /// Returns `Some(summary)` when this event was the `batch_size`-th of
    /// its window: the count trigger preempts the timer, and the window is
    /// reset before the lock is released. A ticker firing in the same
    /// instant then observes an idle window and emits nothing, so a window
    /// is summarized at most once.
    pub fn observe(&self, event: &StreamEvent) -> Option<Summary> {
        let mut window = self.window.lock().expect("window lock poisoned");
        window.record(event);
        if window.count() >= self.batch_size {
            let summary = Self::close(&mut window);
            tracing::debug!(
                count = summary.statistics.total_events,
                "batch threshold reached, window closed"
            );
            return Some(summary);
        }
        None
    }

    /// Timer trigger: close the window if anything is buffered.
    ///
    /// An idle tick is a no-op — empty summaries are never emitted.
    pub fn tick(&self) -> Option<Summary> {
        let mut window = self.window.lock().expect("window lock poisoned");
        if window.is_empty() {
            return None;
        }
        let summary = Self::close(&mut window);
        tracing::debug!(
            count = summary.statistics.total_events,
            "interval elapsed, window closed"
        );
        Some(summary)
    }

    /// Non-destructive read of the open window for health/status endpoints.
    pub fn progress(&self) -> WindowProgress {
        let window = self.window.lock().expect("window lock poisoned");
        WindowProgress {
            buffered_count: window.count(),
            window_start: window.window_start(),
            statistics_so_far: SummaryStatistics {
                total_events: window.count(),
                sum_of_values: window.sum(),
                average_value: if window.count() == 0 {
                    0.0
                } else {
                    window.sum() / window.count() as f64
                },
                min_value: window.min(),
                max_value: window.max(),
            },
        }
    }

    // Snapshot-then-reset under the caller's lock guard.
    fn close(window: &mut WindowStats) -> Summary {
        mem::take(window).summarize()
    }
}

/// Point-in-time view of the open window, serialized for status queries.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WindowProgress {
    pub buffered_count: u64,
    pub window_start: Option<DateTime<Utc>>,
    pub statistics_so_far: SummaryStatistics,
}
