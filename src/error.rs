use thiserror::Error;

/// Structural problems that must stop a run before anything is computed or written
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid {name} `{value}`: expected a day formatted as YYYYMMDD (e.g. 20240101)")]
    InvalidDay { name: &'static str, value: String },

    #[error("firstday {first} is after lastday {last}")]
    InvertedRange { first: String, last: String },

    #[error("malformed report {path}: {reason}")]
    MalformedReport { path: String, reason: String },

    #[error("safety margin must be within [0, 1), got {0}")]
    InvalidSafetyMargin(f64),
}

/// Per-record anomalies. The offending record is skipped and the batch continues.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataQualityIssue {
    #[error("interface {interface} is not claimed by any node")]
    UnknownInterface { interface: String },

    #[error("interface {interface} is claimed by {kept_ip} and {ignored_ip}; keeping {kept_ip}")]
    DuplicateInterface {
        interface: String,
        kept_ip: String,
        ignored_ip: String,
    },

    #[error("node {ip} reports {clients} clients but its plans add up to {plan_total}")]
    ClientCountMismatch {
        ip: String,
        clients: u64,
        plan_total: u64,
    },

    #[error("node {ip} has {clients} active clients without a downstream plan")]
    MissingDownstream { ip: String, clients: u64 },
}
