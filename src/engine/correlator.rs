use super::identity::NodeIndex;
use super::reducer::{average_daily_peaks, reduce_bandwidth};
use crate::config::EngineOptions;
use crate::error::DataQualityIssue;
use crate::models::{InterfaceSample, NodeMetadata, TrafficSummary};
use std::collections::HashSet;
use tracing::debug;

/// Summaries produced by one correlation pass, plus what had to be skipped
#[derive(Debug, Default)]
pub struct Correlation {
    pub summaries: Vec<TrafficSummary>,
    pub issues: Vec<DataQualityIssue>,
}

/// Reduce every sample and attach it to the node claiming its interface
pub fn summarize_traffic(
    samples: &[InterfaceSample],
    metadata: &[NodeMetadata],
    options: &EngineOptions,
) -> Correlation {
    correlate(samples, &NodeIndex::build(metadata), options)
}

/// Same as [`summarize_traffic`] against a prebuilt index.
///
/// An interface is summarized at most once: later samples for it (another group,
/// another telemetry table) are dropped.
pub fn correlate(
    samples: &[InterfaceSample],
    index: &NodeIndex,
    options: &EngineOptions,
) -> Correlation {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut correlation = Correlation {
        summaries: Vec::new(),
        issues: index.issues().to_vec(),
    };

    for sample in samples {
        if !seen.insert(sample.interface.as_str()) {
            debug!(
                "Skipping repeated interface {} in group {}",
                sample.interface, sample.group
            );
            continue;
        }

        let Some(ip) = index.ip_of(&sample.interface) else {
            correlation.issues.push(DataQualityIssue::UnknownInterface {
                interface: sample.interface.clone(),
            });
            continue;
        };

        correlation.summaries.push(TrafficSummary {
            ip: ip.to_string(),
            interface: sample.interface.clone(),
            state: index.state_of(&sample.interface).map(str::to_string),
            group: sample.group.clone(),
            in_avg: average_daily_peaks(&sample.inbound),
            out_avg: average_daily_peaks(&sample.outbound),
            bandwidth: reduce_bandwidth(&sample.bandwidth, options.bandwidth),
        });
    }

    correlation
}
