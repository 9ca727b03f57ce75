//! Plan-upgrade simulation
//!
//! For a target plan, every subscriber on a slower plan is moved onto it. The node's
//! current factor is applied to the new distribution to project its load, and the
//! upgrade is feasible when the measured bandwidth, less a safety margin, covers it.

use super::utilization::plan_loads;
use crate::models::{NodeTrafficAggregate, Plan, UpgradeProjection};
use std::collections::BTreeMap;

/// One projection per node plan at or above `base_plan`, keyed by plan label.
pub fn simulate_upgrades(
    aggregate: &NodeTrafficAggregate,
    base_plan: Plan,
    safety_margin: f64,
) -> BTreeMap<String, UpgradeProjection> {
    aggregate
        .clients_by_plan
        .keys()
        .rev()
        .take_while(|plan| **plan >= base_plan)
        .map(|target| {
            let projection = project(aggregate, *target, safety_margin);
            (target.label(), projection)
        })
        .collect()
}

fn project(aggregate: &NodeTrafficAggregate, target: Plan, safety_margin: f64) -> UpgradeProjection {
    let (migrated, benefited_clients) = migrate(&aggregate.clients_by_plan, target);
    let loads = plan_loads(&migrated, aggregate.factor);
    let new_theoretical_traffic_mbps = loads.values().sum();

    UpgradeProjection {
        target_plan: target,
        benefited_clients,
        new_theoretical_traffic_mbps,
        is_upgradable: is_upgradable(
            aggregate.bandwidth_mbps,
            new_theoretical_traffic_mbps,
            safety_margin,
        ),
        plan_loads: loads,
    }
}

/// Moves every subscriber below `target` onto it. Returns the new distribution and
/// the number of subscribers moved.
pub fn migrate(clients_by_plan: &BTreeMap<Plan, u64>, target: Plan) -> (BTreeMap<Plan, u64>, u64) {
    let mut migrated = clients_by_plan.clone();
    let mut moved = 0;

    for (plan, clients) in migrated.iter_mut() {
        if *plan < target {
            moved += *clients;
            *clients = 0;
        }
    }
    *migrated.entry(target).or_insert(0) += moved;

    (migrated, moved)
}

pub fn is_upgradable(bandwidth_mbps: f64, projected_mbps: f64, safety_margin: f64) -> bool {
    bandwidth_mbps * (1.0 - safety_margin) >= projected_mbps
}
