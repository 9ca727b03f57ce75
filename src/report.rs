//! Subscriber registry ingestion
//!
//! The registry is a CSV export with one row per (node, plan, status) and a subscriber
//! count. Rows are folded into one [`NodeReport`] per node IP.

use crate::error::{ConfigError, DataQualityIssue};
use crate::models::{NodeReport, Plan, RegistryRecord};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::Read;
use std::path::Path;

pub const STATUS_ACTIVE: &str = "ACTIVO";
pub const STATUS_CUT_OFF: &str = "CORTADO";
pub const STATUS_SUSPENDED: &str = "SUSPENDIDO";

const REQUIRED_COLUMNS: [&str; 9] = [
    "Coid",
    "Name Coid",
    "Provider.1",
    "DSLAMIP",
    "Nrpname",
    "Location",
    "Downstream",
    "Status",
    "Cantidad",
];

#[derive(Debug, Default)]
pub struct RegistryReports {
    pub reports: Vec<NodeReport>,
    pub issues: Vec<DataQualityIssue>,
}

/// Restore a dotted IP from a registry value whose dots were stripped.
///
/// The digits are split into groups of three counted from the right, so
/// `"101168196"` becomes `"101.168.196"`. Values that already contain a dot are
/// returned untouched.
pub fn string_to_ip(raw: &str) -> String {
    let raw = raw.trim();
    if raw.contains('.') {
        return raw.to_string();
    }

    let reversed: Vec<char> = raw.chars().rev().collect();
    let dotted: String = reversed
        .chunks(3)
        .map(|chunk| chunk.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(".");
    dotted.chars().rev().collect()
}

pub fn read_registry(path: &Path) -> Result<Vec<RegistryRecord>, ConfigError> {
    let file = std::fs::File::open(path).map_err(|e| ConfigError::MalformedReport {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    read_registry_from(file, &path.display().to_string())
}

/// Parse registry rows, failing on a missing column or an unreadable row
pub fn read_registry_from<R: Read>(source: R, name: &str) -> Result<Vec<RegistryRecord>, ConfigError> {
    let malformed = |reason: String| ConfigError::MalformedReport {
        path: name.to_string(),
        reason,
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(source);

    let headers = reader.headers().map_err(|e| malformed(e.to_string()))?.clone();
    check_columns(&headers).map_err(malformed)?;

    reader
        .deserialize()
        .enumerate()
        .map(|(i, row)| row.map_err(|e| malformed(format!("row {}: {}", i + 1, e))))
        .collect()
}

fn check_columns(headers: &StringRecord) -> Result<(), String> {
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|h| h == *column))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(format!("missing columns: {}", missing.join(", ")))
    }
}

#[derive(Debug, Default)]
struct NodeTally {
    central: String,
    model: String,
    bras: String,
    has_active: bool,
    plans: BTreeMap<Plan, u64>,
    active: u64,
    without_plan: u64,
    cut_off: u64,
    suspended: u64,
}

/// Fold registry rows into node reports, in order of first appearance.
///
/// Only nodes with at least one active row are reported. Every report lists every
/// plan seen in the registry, with zero where the node has no subscribers on it.
pub fn build_reports(records: &[RegistryRecord]) -> RegistryReports {
    let mut order: Vec<String> = Vec::new();
    let mut tallies: HashMap<String, NodeTally> = HashMap::new();

    for record in records {
        let ip = string_to_ip(&record.dslam_ip);
        let tally = tallies.entry(ip.clone()).or_insert_with(|| {
            order.push(ip);
            NodeTally::default()
        });

        match record.status.to_uppercase().as_str() {
            STATUS_ACTIVE => {
                if !tally.has_active {
                    tally.has_active = true;
                    tally.central = record.name_coid.clone();
                    tally.model = record.provider.clone();
                    tally.bras = format!("{}-{}", record.location, record.nrp_name);
                }
                tally.active += record.cantidad;
                match downstream_plan(record.downstream) {
                    Some(plan) => *tally.plans.entry(plan).or_insert(0) += record.cantidad,
                    None => tally.without_plan += record.cantidad,
                }
            }
            STATUS_CUT_OFF => tally.cut_off += record.cantidad,
            STATUS_SUSPENDED => tally.suspended += record.cantidad,
            _ => {}
        }
    }

    let catalog: BTreeSet<Plan> = tallies
        .values()
        .filter(|tally| tally.has_active)
        .flat_map(|tally| tally.plans.keys().copied())
        .collect();

    let mut batch = RegistryReports::default();
    for ip in order {
        let Some(tally) = tallies.remove(&ip) else {
            continue;
        };
        if !tally.has_active {
            continue;
        }

        if tally.without_plan > 0 {
            batch.issues.push(DataQualityIssue::MissingDownstream {
                ip: ip.clone(),
                clients: tally.without_plan,
            });
        }

        let mut clients_by_plan: BTreeMap<Plan, u64> =
            catalog.iter().map(|plan| (*plan, 0)).collect();
        clients_by_plan.extend(tally.plans);

        let theoretical_traffic = clients_by_plan
            .iter()
            .map(|(plan, clients)| plan.mbps() * *clients as f64)
            .sum();

        batch.reports.push(NodeReport {
            ip,
            central: tally.central,
            model: tally.model,
            bras: tally.bras,
            theoretical_traffic,
            clients: clients_by_plan.values().sum(),
            clients_active: tally.active,
            clients_cut_off: tally.cut_off,
            clients_suspended: tally.suspended,
            clients_by_plan,
        });
    }

    batch
}

fn downstream_plan(downstream: Option<f64>) -> Option<Plan> {
    downstream
        .filter(|kbps| kbps.is_finite() && *kbps >= 0.0 && *kbps <= u32::MAX as f64)
        .map(|kbps| Plan::from_kbps(kbps.round() as u32))
}
