//! Broker egress boundary.
//!
//! Finished summaries leave the process through a [`SummaryPublisher`],
//! which a broker-client collaborator implements against the summary topic.
//! A failed publish is non-fatal by design: the window has already been
//! reset, the summary is still broadcast to local subscribers, and the
//! failure is logged.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;

use crate::aggregate::Summary;

#[derive(Debug, Error)]
pub enum EgressError {
    /// The downstream topic could not be reached (broker down, network
    /// error, timeout). Recoverable; the next summary is attempted anyway.
    #[error("summary topic unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// Abstraction over the output-topic producer.
#[async_trait]
pub trait SummaryPublisher: Send + Sync {
    async fn publish_summary(&self, summary: &Summary) -> Result<(), EgressError>;
}

/// Logs each summary as structured JSON instead of producing to a broker.
/// Useful standalone and as the default collaborator in demos.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogPublisher;

#[async_trait]
impl SummaryPublisher for LogPublisher {
    async fn publish_summary(&self, summary: &Summary) -> Result<(), EgressError> {
        let body = serde_json::to_string(summary)?;
        tracing::info!(summary_id = %summary.id, %body, "summary published");
        Ok(())
    }
}

/// In-memory publisher for tests and snapshots.
#[derive(Clone, Default)]
pub struct MemoryPublisher {
    entries: Arc<Mutex<Vec<Summary>>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every summary published so far.
    pub fn snapshot(&self) -> Vec<Summary> {
        self.entries.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

#[async_trait]
impl SummaryPublisher for MemoryPublisher {
    async fn publish_summary(&self, summary: &Summary) -> Result<(), EgressError> {
        self.entries.lock().unwrap().push(summary.clone());
        Ok(())
    }
}
