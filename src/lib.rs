//! # Streamsum: streaming event aggregation with live fan-out
//!
//! Streamsum consumes a stream of discrete events, folds them into rolling
//! statistical summaries using a dual-trigger window (count threshold or
//! wall-clock interval, whichever fires first), and fans out every raw event
//! and every finished summary to any number of long-lived subscribers.
//!
//! The broker client and the HTTP/SSE routing layer stay outside the crate;
//! they plug in at two seams: raw payloads go into
//! [`service::AggregatorService::intake`], and finished summaries leave
//! through an [`egress::SummaryPublisher`] implementation.
//!
//! ## Quick start
//!
//! ```
//! use std::sync::Arc;
//! use streamsum::config::{AggregationConfig, HubConfig};
//! use streamsum::egress::MemoryPublisher;
//! use streamsum::service::AggregatorService;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let service = AggregatorService::new(
//!     &AggregationConfig::default(),
//!     &HubConfig::default(),
//!     Arc::new(MemoryPublisher::new()),
//! );
//! service.start();
//!
//! // A connection handler subscribes for the live feed:
//! let subscription = service.subscribe().unwrap();
//!
//! // The broker ingress adapter pushes raw message bodies:
//! service.intake().send(r#"{"value": 41}"#.to_string()).unwrap();
//!
//! drop(subscription);
//! service.shutdown().await;
//! # }
//! ```
//!
//! ## Module guide
//!
//! - [`event`] - Raw event model and the tagged broadcast envelope
//! - [`aggregate`] - Running statistics and the dual-trigger window controller
//! - [`broadcast`] - Fan-out hub, subscription handles, and wire framing
//! - [`ingress`] / [`egress`] - Contracts at the broker boundary
//! - [`service`] - Task wiring, lifecycle, and status queries
//! - [`config`] - Scalar configuration loaded once at startup

pub mod aggregate;
pub mod broadcast;
pub mod config;
pub mod egress;
pub mod event;
pub mod ingress;
pub mod service;

pub use aggregate::{Summary, WindowController, WindowProgress};
pub use broadcast::{BroadcastHub, Subscription, WireFrame};
pub use event::{BroadcastMessage, StreamEvent};
pub use service::AggregatorService;
