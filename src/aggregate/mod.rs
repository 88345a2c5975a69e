//! Rolling aggregation: running statistics plus the dual-trigger window
//! controller that turns buffered events into immutable summaries.

pub mod accumulator;
pub mod controller;

pub use accumulator::{SAMPLE_CAPACITY, Summary, SummaryStatistics, WindowSpan, WindowStats};
pub use controller::{WindowController, WindowProgress};
