//! Interface → node resolution
//!
//! Built once per run from the node metadata, then shared read-only by the correlator.

use crate::error::DataQualityIssue;
use crate::models::NodeMetadata;
use std::collections::{HashMap, HashSet};

/// Interfaces grouped by the state of the nodes that claim them
#[derive(Debug, Default)]
struct StateBucket {
    state: Option<String>,
    interfaces: HashSet<String>,
}

#[derive(Debug, Default)]
pub struct NodeIndex {
    owners: HashMap<String, String>,
    buckets: Vec<StateBucket>,
    issues: Vec<DataQualityIssue>,
}

/// Every name a node answers to: its member interfaces plus its LAG, if any
pub fn claimed_interfaces(node: &NodeMetadata) -> Vec<&str> {
    node.interfaces
        .iter()
        .flatten()
        .map(String::as_str)
        .chain(node.lag.as_deref().filter(|lag| !lag.is_empty()))
        .collect()
}

impl NodeIndex {
    pub fn build(metadata: &[NodeMetadata]) -> Self {
        let mut index = NodeIndex::default();

        for node in metadata {
            let claimed = claimed_interfaces(node);
            let bucket = index.bucket_mut(node.state.as_deref());
            bucket
                .interfaces
                .extend(claimed.iter().map(|interface| interface.to_string()));

            for interface in claimed {
                match index.owners.get(interface) {
                    None => {
                        index.owners.insert(interface.to_string(), node.ip.clone());
                    }
                    Some(kept_ip) if *kept_ip != node.ip => {
                        index.issues.push(DataQualityIssue::DuplicateInterface {
                            interface: interface.to_string(),
                            kept_ip: kept_ip.clone(),
                            ignored_ip: node.ip.clone(),
                        });
                    }
                    Some(_) => {}
                }
            }
        }

        index
    }

    fn bucket_mut(&mut self, state: Option<&str>) -> &mut StateBucket {
        let position = self
            .buckets
            .iter()
            .position(|bucket| bucket.state.as_deref() == state);

        match position {
            Some(i) => &mut self.buckets[i],
            None => {
                self.buckets.push(StateBucket {
                    state: state.map(str::to_string),
                    interfaces: HashSet::new(),
                });
                let last = self.buckets.len() - 1;
                &mut self.buckets[last]
            }
        }
    }

    /// IP of the first node that claimed the interface
    pub fn ip_of(&self, interface: &str) -> Option<&str> {
        self.owners.get(interface).map(String::as_str)
    }

    /// State of the first state bucket holding the interface.
    ///
    /// This answers "does any node in state S claim this interface", which is weaker
    /// than an exact per-node lookup when an interface is claimed twice.
    pub fn state_of(&self, interface: &str) -> Option<&str> {
        self.buckets
            .iter()
            .find(|bucket| bucket.interfaces.contains(interface))
            .and_then(|bucket| bucket.state.as_deref())
    }

    pub fn contains(&self, interface: &str) -> bool {
        self.owners.contains_key(interface)
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Duplicate claims found while building the index
    pub fn issues(&self) -> &[DataQualityIssue] {
        &self.issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(ip: &str, interfaces: &[&str], lag: Option<&str>, state: Option<&str>) -> NodeMetadata {
        NodeMetadata {
            ip: ip.to_string(),
            interfaces: Some(interfaces.iter().map(|s| s.to_string()).collect()),
            lag: lag.map(str::to_string),
            state: state.map(str::to_string),
        }
    }

    #[test]
    fn test_resolves_members_and_lag() {
        let index = NodeIndex::build(&[
            node("10.0.0.1", &["A-GE0/1", "A-GE0/2"], Some("A-LAG-1"), Some("Zulia")),
            node("10.0.0.2", &["B-GE0/1"], None, None),
        ]);

        assert_eq!(index.ip_of("A-GE0/2"), Some("10.0.0.1"));
        assert_eq!(index.ip_of("A-LAG-1"), Some("10.0.0.1"));
        assert_eq!(index.ip_of("B-GE0/1"), Some("10.0.0.2"));
        assert_eq!(index.ip_of("C-GE0/1"), None);

        assert_eq!(index.state_of("A-LAG-1"), Some("Zulia"));
        assert_eq!(index.state_of("B-GE0/1"), None);
        assert_eq!(index.len(), 4);
        assert!(index.issues().is_empty());
    }

    #[test]
    fn test_duplicate_claim_keeps_first() {
        let index = NodeIndex::build(&[
            node("10.0.0.1", &["SHARED"], None, Some("Lara")),
            node("10.0.0.2", &["SHARED"], None, Some("Miranda")),
        ]);

        assert_eq!(index.ip_of("SHARED"), Some("10.0.0.1"));
        assert_eq!(index.state_of("SHARED"), Some("Lara"));
        assert_eq!(
            index.issues(),
            &[DataQualityIssue::DuplicateInterface {
                interface: "SHARED".to_string(),
                kept_ip: "10.0.0.1".to_string(),
                ignored_ip: "10.0.0.2".to_string(),
            }]
        );
    }

    #[test]
    fn test_node_without_interfaces() {
        let bare = NodeMetadata {
            ip: "10.0.0.9".to_string(),
            interfaces: None,
            lag: Some("Z-LAG-2".to_string()),
            state: None,
        };
        let index = NodeIndex::build(&[bare]);
        assert_eq!(index.ip_of("Z-LAG-2"), Some("10.0.0.9"));
    }
}
