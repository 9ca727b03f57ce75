use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Subscriber service tier, identified by its contracted downstream in kbps
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Plan {
    kbps: u32,
}

impl Plan {
    pub const fn from_kbps(kbps: u32) -> Self {
        Self { kbps }
    }

    pub fn kbps(self) -> u32 {
        self.kbps
    }

    /// Capacity in Mbps, using the registry's 1024 kbps per Mbps convention
    pub fn mbps(self) -> f64 {
        self.kbps as f64 / 1024.0
    }

    /// Field-safe label: `0_5`, `2`, `10`
    pub fn label(self) -> String {
        format!("{}", self.mbps()).replace('.', "_")
    }

    /// Key under which this plan's projected load is stored
    pub fn load_key(self) -> String {
        format!("factor_{}", self.label())
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Mbps", self.mbps())
    }
}

// Plans key maps in stored documents, so they travel as strings.
impl Serialize for Plan {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.kbps)
    }
}

impl<'de> Deserialize<'de> for Plan {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PlanVisitor;

        impl Visitor<'_> for PlanVisitor {
            type Value = Plan;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a downstream capacity in kbps")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Plan, E> {
                v.trim()
                    .parse::<u32>()
                    .map(Plan::from_kbps)
                    .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Plan, E> {
                u32::try_from(v)
                    .map(Plan::from_kbps)
                    .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(v), &self))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Plan, E> {
                u32::try_from(v)
                    .map(Plan::from_kbps)
                    .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Plan, E> {
                if v.is_finite() && v >= 0.0 && v <= u32::MAX as f64 {
                    Ok(Plan::from_kbps(v.round() as u32))
                } else {
                    Err(E::invalid_value(de::Unexpected::Float(v), &self))
                }
            }
        }

        deserializer.deserialize_any(PlanVisitor)
    }
}

/// Raw row from the subscriber registry CSV export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryRecord {
    #[serde(rename = "Coid")]
    pub coid: String,
    #[serde(rename = "Name Coid")]
    pub name_coid: String,
    #[serde(rename = "Provider.1")]
    pub provider: String,
    #[serde(rename = "DSLAMIP")]
    pub dslam_ip: String,
    #[serde(rename = "Nrpname")]
    pub nrp_name: String,
    #[serde(rename = "Location")]
    pub location: String,
    /// Contracted downstream in kbps
    #[serde(rename = "Downstream")]
    pub downstream: Option<f64>,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Cantidad")]
    pub cantidad: u64,
}

/// One day of telemetry as stored in an `ehealth*` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendDocument {
    /// Day key, `YYYYMMDD`
    pub day: String,
    #[serde(default)]
    pub trends: Vec<Trend>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trend {
    pub group: String,
    #[serde(default)]
    pub elements: Vec<TrendElement>,
}

/// Intra-day samples of a single interface
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendElement {
    pub interface: String,
    #[serde(rename = "in", default)]
    pub inbound: Vec<f64>,
    #[serde(rename = "out", default)]
    pub outbound: Vec<f64>,
    #[serde(default)]
    pub bandwidth: Vec<f64>,
}

/// Per-interface series over a day window. Outer vectors are days, inner are samples.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InterfaceSample {
    pub interface: String,
    pub group: String,
    #[serde(rename = "in")]
    pub inbound: Vec<Vec<f64>>,
    #[serde(rename = "out")]
    pub outbound: Vec<Vec<f64>>,
    pub bandwidth: Vec<Vec<f64>>,
}

/// Interface membership of a node, from the `ip_interfaces` table
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NodeMetadata {
    pub ip: String,
    #[serde(default)]
    pub interfaces: Option<Vec<String>>,
    #[serde(default)]
    pub lag: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// Reduced traffic of one interface, in bits per second
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrafficSummary {
    pub ip: String,
    pub interface: String,
    pub state: Option<String>,
    pub group: String,
    pub in_avg: f64,
    pub out_avg: f64,
    pub bandwidth: f64,
}

/// Subscriber counts of a node, built from the registry report
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NodeReport {
    pub ip: String,
    pub central: String,
    pub model: String,
    #[serde(default)]
    pub bras: String,
    /// Sum of contracted capacity over active subscribers, in Mbps
    pub theoretical_traffic: f64,
    pub clients: u64,
    pub clients_active: u64,
    pub clients_cut_off: u64,
    pub clients_suspended: u64,
    pub clients_by_plan: BTreeMap<Plan, u64>,
}

impl NodeReport {
    pub fn plan_total(&self) -> u64 {
        self.clients_by_plan.values().sum()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NodeTrafficAggregate {
    pub central: String,
    pub ip: String,
    pub theoretical_traffic_mbps: f64,
    pub model: String,
    pub bras: String,
    pub clients: u64,
    pub clients_active: u64,
    pub clients_cut_off: u64,
    pub clients_suspended: u64,
    pub state: Option<String>,
    pub clients_by_plan: BTreeMap<Plan, u64>,
    pub element: String,
    pub in_avg_mbps: f64,
    pub out_avg_mbps: f64,
    pub bandwidth_mbps: f64,
    /// Peak Mbps per active client; `None` without active clients
    pub media: Option<f64>,
    /// Peak Mbps over theoretical Mbps; `None` without theoretical traffic
    pub factor: Option<f64>,
    /// Projected load per plan, keyed `factor_<label>`
    pub plan_loads: BTreeMap<String, f64>,
}

impl NodeTrafficAggregate {
    pub fn peak_mbps(&self) -> f64 {
        self.in_avg_mbps.max(self.out_avg_mbps)
    }
}

/// Outcome of moving every subscriber below `target_plan` onto it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpgradeProjection {
    pub target_plan: Plan,
    pub benefited_clients: u64,
    pub new_theoretical_traffic_mbps: f64,
    pub plan_loads: BTreeMap<String, f64>,
    pub is_upgradable: bool,
}

/// Document stored in `traffic_aba`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodePreview {
    #[serde(flatten)]
    pub aggregate: NodeTrafficAggregate,
    #[serde(default)]
    pub upgrades: BTreeMap<String, UpgradeProjection>,
}

impl NodePreview {
    /// Projections from the fastest target plan down
    pub fn upgrades_by_capacity(&self) -> Vec<&UpgradeProjection> {
        let mut projections: Vec<_> = self.upgrades.values().collect();
        projections.sort_by(|a, b| b.target_plan.cmp(&a.target_plan));
        projections
    }
}
