use super::aggregator::aggregate_node;
use super::upgrade::simulate_upgrades;
use crate::config::EngineOptions;
use crate::error::DataQualityIssue;
use crate::models::{NodePreview, NodeReport, TrafficSummary};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
pub struct PreviewBatch {
    pub previews: Vec<NodePreview>,
    pub issues: Vec<DataQualityIssue>,
    /// Reported nodes with no traffic summary under their IP
    pub without_traffic: usize,
}

/// Join node reports with traffic summaries by IP and project upgrades for each node.
///
/// Nodes without traffic are left out, as are nodes whose client count does not
/// match their plan totals.
pub fn preview_nodes(
    reports: &[NodeReport],
    summaries: &[TrafficSummary],
    options: &EngineOptions,
) -> PreviewBatch {
    let mut traffic_by_ip: HashMap<&str, Vec<&TrafficSummary>> = HashMap::new();
    for summary in summaries {
        traffic_by_ip
            .entry(summary.ip.as_str())
            .or_default()
            .push(summary);
    }

    let mut batch = PreviewBatch::default();

    for report in reports {
        let plan_total = report.plan_total();
        if report.clients != plan_total {
            batch.issues.push(DataQualityIssue::ClientCountMismatch {
                ip: report.ip.clone(),
                clients: report.clients,
                plan_total,
            });
            continue;
        }

        let Some(traffic) = traffic_by_ip.get(report.ip.as_str()) else {
            batch.without_traffic += 1;
            continue;
        };

        let aggregate = aggregate_node(traffic.iter().copied(), report, options);
        let base_plan = options
            .base_plan
            .or_else(|| aggregate.clients_by_plan.keys().next().copied());
        let upgrades = match base_plan {
            Some(base) => simulate_upgrades(&aggregate, base, options.safety_margin),
            None => BTreeMap::new(),
        };

        batch.previews.push(NodePreview { aggregate, upgrades });
    }

    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::summarize_traffic;
    use crate::models::{InterfaceSample, NodeMetadata, Plan};

    fn report(ip: &str, clients: u64) -> NodeReport {
        let mut clients_by_plan = BTreeMap::new();
        clients_by_plan.insert(Plan::from_kbps(1024), 8);
        clients_by_plan.insert(Plan::from_kbps(2048), 2);
        NodeReport {
            ip: ip.to_string(),
            central: "VALENCIA".to_string(),
            model: "ALCATEL".to_string(),
            bras: "CAR-BRAS01".to_string(),
            theoretical_traffic: 12.0,
            clients,
            clients_active: clients,
            clients_cut_off: 1,
            clients_suspended: 0,
            clients_by_plan,
        }
    }

    fn traffic(ip: &str, interface: &str, in_avg: f64) -> TrafficSummary {
        TrafficSummary {
            ip: ip.to_string(),
            interface: interface.to_string(),
            state: Some("Carabobo".to_string()),
            group: "ABA".to_string(),
            in_avg,
            out_avg: in_avg / 2.0,
            bandwidth: 100_000_000.0,
        }
    }

    #[test]
    fn test_join_by_ip() {
        let reports = vec![
            report("10.1.1.1", 10),
            report("10.1.1.2", 10),
            report("10.1.1.3", 12),
        ];
        let summaries = vec![
            traffic("10.1.1.1", "VAL-DSLAM01-GE0/1", 3_000_000.0),
            traffic("10.1.1.1", "VAL-DSLAM01-GE0/2", 3_000_000.0),
            traffic("10.1.1.3", "VAL-DSLAM03-GE0/1", 1_000_000.0),
            traffic("10.9.9.9", "ORPHAN-GE0/1", 1_000_000.0),
        ];

        let batch = preview_nodes(&reports, &summaries, &EngineOptions::default());

        assert_eq!(batch.previews.len(), 1);
        assert_eq!(batch.without_traffic, 1);
        assert_eq!(
            batch.issues,
            vec![DataQualityIssue::ClientCountMismatch {
                ip: "10.1.1.3".to_string(),
                clients: 12,
                plan_total: 10,
            }]
        );

        let preview = &batch.previews[0];
        assert_eq!(preview.aggregate.in_avg_mbps, 6.0);
        assert_eq!(preview.aggregate.factor, Some(0.5));
        assert_eq!(preview.aggregate.element, "VAL-DSLAM01");
        assert_eq!(preview.upgrades.len(), 2);
        // 10 clients on 2 Mbps at factor 0.5, against 100 * 0.8
        assert_eq!(preview.upgrades["2"].new_theoretical_traffic_mbps, 10.0);
        assert!(preview.upgrades["2"].is_upgradable);
    }

    #[test]
    fn test_configured_base_plan() {
        let options = EngineOptions {
            base_plan: Some(Plan::from_kbps(2048)),
            ..EngineOptions::default()
        };
        let batch = preview_nodes(
            &[report("10.1.1.1", 10)],
            &[traffic("10.1.1.1", "VAL-DSLAM01-GE0/1", 1_000_000.0)],
            &options,
        );

        let labels: Vec<_> = batch.previews[0].upgrades.keys().cloned().collect();
        assert_eq!(labels, vec!["2".to_string()]);
    }

    #[test]
    fn test_raw_samples_to_preview() {
        let metadata = vec![NodeMetadata {
            ip: "10.1.1.1".to_string(),
            interfaces: Some(vec!["VAL-DSLAM01-GE0/1".to_string()]),
            lag: Some("VAL-DSLAM01-LAG-1".to_string()),
            state: Some("Carabobo".to_string()),
        }];
        let samples = vec![
            InterfaceSample {
                interface: "VAL-DSLAM01-LAG-1".to_string(),
                group: "ABA".to_string(),
                // Second day peaks at zero and is dropped
                inbound: vec![vec![200e6, 500e6], vec![0.0, 0.0]],
                outbound: vec![vec![100e6], vec![0.0]],
                bandwidth: vec![vec![1e9], vec![1e9]],
            },
            InterfaceSample {
                interface: "VAL-DSLAM01-GE0/1".to_string(),
                group: "ABA".to_string(),
                inbound: vec![vec![100e6], vec![100e6]],
                outbound: vec![vec![20e6], vec![40e6]],
                bandwidth: vec![vec![1e9], vec![1e9]],
            },
        ];

        let options = EngineOptions::default();
        let correlation = summarize_traffic(&samples, &metadata, &options);
        assert!(correlation.issues.is_empty());
        assert_eq!(correlation.summaries.len(), 2);

        let batch = preview_nodes(&[report("10.1.1.1", 10)], &correlation.summaries, &options);
        let node = &batch.previews[0].aggregate;

        assert_eq!(node.in_avg_mbps, 500.0);
        assert_eq!(node.out_avg_mbps, 100.0);
        assert_eq!(node.bandwidth_mbps, 1000.0);
        assert_eq!(node.element, "VAL-DSLAM01");
        assert_eq!(node.state.as_deref(), Some("Carabobo"));
        // 10 clients on 2 Mbps at factor 500/12 exceed 1000 * 0.8
        let upgrades = &batch.previews[0].upgrades;
        assert!(upgrades["1"].is_upgradable);
        assert!(!upgrades["2"].is_upgradable);
        assert_eq!(upgrades["2"].benefited_clients, 8);
    }
}
