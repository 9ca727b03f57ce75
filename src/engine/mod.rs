//! Traffic summarization and plan-upgrade projection
//!
//! Everything in here is synchronous and free of I/O: samples and reports go in,
//! summaries, node aggregates and upgrade projections come out.

pub mod aggregator;
pub mod classifier;
pub mod correlator;
pub mod identity;
pub mod preview;
pub mod reducer;
pub mod upgrade;
pub mod utilization;

pub use aggregator::aggregate_node;
pub use correlator::{correlate, summarize_traffic, Correlation};
pub use identity::NodeIndex;
pub use preview::{preview_nodes, PreviewBatch};
pub use upgrade::simulate_upgrades;
