use crate::models::{NodeReport, Plan};
use std::collections::BTreeMap;

/// How a node's measured peak relates to what its subscribers contracted
#[derive(Debug, Clone, PartialEq)]
pub struct Utilization {
    pub factor: Option<f64>,
    pub media: Option<f64>,
    pub plan_loads: BTreeMap<String, f64>,
}

impl Utilization {
    pub fn compute(peak_mbps: f64, report: &NodeReport) -> Self {
        let factor = ratio(peak_mbps, report.theoretical_traffic);
        let media = ratio(peak_mbps, report.clients_active as f64);
        Self {
            factor,
            media,
            plan_loads: plan_loads(&report.clients_by_plan, factor),
        }
    }
}

/// `numerator / denominator`, or `None` when the denominator is zero
pub fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        None
    } else {
        Some(numerator / denominator)
    }
}

/// Projected load of one plan tier in Mbps
pub fn plan_load(plan: Plan, clients: u64, factor: f64) -> f64 {
    clients as f64 * plan.mbps() * factor
}

/// `factor_<label>` → projected load, for every plan of the node
pub fn plan_loads(clients_by_plan: &BTreeMap<Plan, u64>, factor: Option<f64>) -> BTreeMap<String, f64> {
    let factor = factor.unwrap_or(0.0);
    clients_by_plan
        .iter()
        .map(|(plan, clients)| (plan.load_key(), plan_load(*plan, *clients, factor)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(theoretical: f64, active: u64) -> NodeReport {
        let mut clients_by_plan = BTreeMap::new();
        clients_by_plan.insert(Plan::from_kbps(1024), 10);
        clients_by_plan.insert(Plan::from_kbps(4096), 5);
        NodeReport {
            ip: "10.0.0.1".to_string(),
            theoretical_traffic: theoretical,
            clients: 15,
            clients_active: active,
            clients_by_plan,
            ..NodeReport::default()
        }
    }

    #[test]
    fn test_factor_and_loads() {
        let utilization = Utilization::compute(15.0, &report(30.0, 15));

        assert_eq!(utilization.factor, Some(0.5));
        assert_eq!(utilization.media, Some(1.0));
        assert_eq!(utilization.plan_loads["factor_1"], 5.0);
        assert_eq!(utilization.plan_loads["factor_4"], 10.0);
    }

    #[test]
    fn test_zero_denominators_are_undefined() {
        let utilization = Utilization::compute(15.0, &report(0.0, 0));

        assert_eq!(utilization.factor, None);
        assert_eq!(utilization.media, None);
        assert_eq!(utilization.plan_loads["factor_4"], 0.0);
    }
}
