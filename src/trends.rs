//! Daily trend documents → per-interface sample series

use crate::config::DayRange;
use crate::models::{InterfaceSample, TrendDocument};
use std::collections::HashMap;

/// Group the trend elements of every day in `range` by (interface, group).
///
/// Days are taken in ascending order, so the n-th entry of each series is the n-th
/// day on which the interface reported. Interfaces rejected by `keep` are dropped.
/// Groups come out in order of first appearance.
pub fn group_trends<'a>(
    documents: impl IntoIterator<Item = &'a TrendDocument>,
    range: &DayRange,
    keep: impl Fn(&str) -> bool,
) -> Vec<InterfaceSample> {
    let mut days: Vec<&TrendDocument> = documents
        .into_iter()
        .filter(|doc| range.contains_key(&doc.day))
        .collect();
    days.sort_by(|a, b| a.day.cmp(&b.day));

    let mut positions: HashMap<(&str, &str), usize> = HashMap::new();
    let mut samples: Vec<InterfaceSample> = Vec::new();

    for doc in days {
        for trend in &doc.trends {
            for element in &trend.elements {
                if !keep(&element.interface) {
                    continue;
                }

                let key = (element.interface.as_str(), trend.group.as_str());
                let position = *positions.entry(key).or_insert_with(|| {
                    samples.push(InterfaceSample {
                        interface: element.interface.clone(),
                        group: trend.group.clone(),
                        ..InterfaceSample::default()
                    });
                    samples.len() - 1
                });

                let sample = &mut samples[position];
                sample.inbound.push(element.inbound.clone());
                sample.outbound.push(element.outbound.clone());
                sample.bandwidth.push(element.bandwidth.clone());
            }
        }
    }

    samples
}
