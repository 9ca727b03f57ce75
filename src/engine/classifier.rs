use crate::config::LagMatching;

const LAG_DELIMITERS: [&str; 4] = ["-LAG-", "_LAG_", "-LAG_", "_LAG-"];

/// True when the interface name denotes a link-aggregation group
pub fn is_lag(interface: &str) -> bool {
    is_lag_with(interface, LagMatching::Delimited)
}

pub fn is_lag_with(interface: &str, matching: LagMatching) -> bool {
    let upper = interface.to_uppercase();
    match matching {
        LagMatching::Delimited => LAG_DELIMITERS.iter().any(|pattern| upper.contains(pattern)),
        LagMatching::Substring => upper.contains("LAG"),
    }
}
