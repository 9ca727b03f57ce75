//! Per-node traffic totals
//!
//! A node's interfaces split into LAG groups and direct links. Whichever side carries
//! more traffic is taken as the node's path, and its last interface names the element.

use super::classifier::is_lag_with;
use super::utilization::Utilization;
use crate::config::EngineOptions;
use crate::models::{NodeReport, NodeTrafficAggregate, TrafficSummary};
use regex::Regex;
use std::sync::LazyLock;

const BITS_PER_MEGABIT: f64 = 1e6;

static ELEMENT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z0-9-]+)-.*$").expect("Invalid element regex"));

#[derive(Debug, Default)]
struct Bucket<'a> {
    in_avg: f64,
    out_avg: f64,
    bandwidth: f64,
    last_interface: Option<&'a str>,
}

impl<'a> Bucket<'a> {
    fn add(&mut self, summary: &'a TrafficSummary) {
        self.in_avg += summary.in_avg;
        self.out_avg += summary.out_avg;
        self.bandwidth += summary.bandwidth;
        self.last_interface = Some(&summary.interface);
    }

    fn peak(&self) -> f64 {
        self.in_avg.max(self.out_avg)
    }
}

pub fn aggregate_node<'a>(
    summaries: impl IntoIterator<Item = &'a TrafficSummary>,
    report: &NodeReport,
    options: &EngineOptions,
) -> NodeTrafficAggregate {
    let mut lag = Bucket::default();
    let mut direct = Bucket::default();
    let mut state = None;

    for summary in summaries {
        if is_lag_with(&summary.interface, options.lag_matching) {
            lag.add(summary);
        } else {
            direct.add(summary);
        }
        state = summary.state.clone();
    }

    // Ties go to the direct links
    let lag_wins = lag.peak() > direct.peak();
    let winner = if lag_wins { &lag } else { &direct };

    let in_avg_mbps = winner.in_avg / BITS_PER_MEGABIT;
    let out_avg_mbps = winner.out_avg / BITS_PER_MEGABIT;
    let utilization = Utilization::compute(in_avg_mbps.max(out_avg_mbps), report);

    NodeTrafficAggregate {
        central: report.central.clone(),
        ip: report.ip.clone(),
        theoretical_traffic_mbps: report.theoretical_traffic,
        model: report.model.clone(),
        bras: report.bras.clone(),
        clients: report.clients,
        clients_active: report.clients_active,
        clients_cut_off: report.clients_cut_off,
        clients_suspended: report.clients_suspended,
        state,
        clients_by_plan: report.clients_by_plan.clone(),
        element: extract_element(winner.last_interface.unwrap_or_default(), lag_wins),
        in_avg_mbps,
        out_avg_mbps,
        bandwidth_mbps: winner.bandwidth / BITS_PER_MEGABIT,
        media: utilization.media,
        factor: utilization.factor,
        plan_loads: utilization.plan_loads,
    }
}

/// Canonical element name of an interface: the uppercased name up to its last
/// `-` delimited segment. LAG names are first cut at `LAG`.
pub fn extract_element(interface: &str, lag: bool) -> String {
    let upper = interface.to_uppercase();
    let candidate = if lag {
        upper.split("LAG").next().unwrap_or_default()
    } else {
        upper.as_str()
    };

    ELEMENT_PATTERN
        .captures(candidate)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}
