//! Batch jobs behind `update_db`
//!
//! Each job reads its inputs, computes the full result set in memory, and only then
//! replaces the target table.

use crate::config::{DayRange, EngineOptions};
use crate::db::{self, DbConn};
use crate::engine::{correlate, preview_nodes, NodeIndex};
use crate::error::DataQualityIssue;
use crate::models::NodeReport;
use crate::report::{self, RegistryReports};
use crate::trends;
use anyhow::Result;
use std::path::Path;
use tracing::{info, warn};

const MAX_LOGGED_ISSUES: usize = 10;

/// Open the previewer store, creating its schema if needed
pub async fn open_previewer(path: &Path) -> Result<DbConn> {
    info!("Connecting to previewer store at {:?}", path);
    let previewer = db::connect_previewer(path).await?;
    db::init_previewer_schema(&previewer).await?;
    Ok(previewer)
}

/// Parse the registry and fold it into node reports. Touches no store.
pub fn load_registry(registry: &Path) -> Result<RegistryReports> {
    info!("Reading registry from {:?}", registry);
    let records = report::read_registry(registry)?;
    info!("Parsed {} registry rows", records.len());

    let batch = report::build_reports(&records);
    log_issues("registry", &batch.issues);
    Ok(batch)
}

/// Store node reports in `aba`
pub async fn update_aba(previewer: &DbConn, reports: &[NodeReport]) -> Result<usize> {
    let written = db::replace_table(previewer, db::ABA_TABLE, reports).await?;
    info!("Stored {} node reports in {}", written, db::ABA_TABLE);
    Ok(written)
}

/// `update_db aba`: the registry is parsed before the store is opened, so a
/// malformed file leaves the store untouched.
pub async fn ingest_registry(previewer_db: &Path, registry: &Path) -> Result<usize> {
    let batch = load_registry(registry)?;
    let previewer = open_previewer(previewer_db).await?;
    update_aba(&previewer, &batch.reports).await
}

/// Summarize telemetry for the day range into `traffic`
pub async fn update_traffic(
    taccess: &DbConn,
    previewer: &DbConn,
    range: &DayRange,
    options: &EngineOptions,
) -> Result<usize> {
    info!(
        "Summarizing traffic for {} ({} days), bandwidth reduction: {}",
        range,
        range.days(),
        options.bandwidth
    );

    let metadata = db::fetch_metadata(taccess).await?;
    let index = NodeIndex::build(&metadata);
    if index.is_empty() {
        warn!("No interfaces claimed in {}, every sample will be skipped", db::METADATA_TABLE);
    }
    info!(
        "Indexed {} interfaces across {} nodes",
        index.len(),
        metadata.len()
    );

    let mut samples = Vec::new();
    for table in db::TELEMETRY_TABLES {
        let docs = db::fetch_trends(taccess, table, range).await?;
        let grouped = trends::group_trends(&docs, range, |interface| index.contains(interface));
        info!(
            "{}: {} days, {} interface series",
            table,
            docs.len(),
            grouped.len()
        );
        samples.extend(grouped);
    }

    let correlation = correlate(&samples, &index, options);
    log_issues("traffic", &correlation.issues);

    let written = db::replace_table(previewer, db::TRAFFIC_TABLE, &correlation.summaries).await?;
    info!("Stored {} traffic summaries in {}", written, db::TRAFFIC_TABLE);
    Ok(written)
}

/// Join `aba` with `traffic` and store node previews with upgrade projections
pub async fn update_traffic_aba(previewer: &DbConn, options: &EngineOptions) -> Result<usize> {
    let reports = db::fetch_reports(previewer).await?;
    let summaries = db::fetch_summaries(previewer).await?;
    info!(
        "Loaded {} node reports and {} traffic summaries",
        reports.len(),
        summaries.len()
    );

    match options.base_plan {
        Some(plan) => info!("Upgrade candidates from {} ({} kbps)", plan, plan.kbps()),
        None => info!("Upgrade candidates from each node's lowest plan"),
    }

    let batch = preview_nodes(&reports, &summaries, options);
    log_issues("traffic-aba", &batch.issues);
    if batch.without_traffic > 0 {
        info!("{} reported nodes have no traffic and were left out", batch.without_traffic);
    }

    let upgradable = batch
        .previews
        .iter()
        .filter(|preview| preview.upgrades.values().any(|u| u.is_upgradable))
        .count();

    let written = db::replace_table(previewer, db::TRAFFIC_ABA_TABLE, &batch.previews).await?;
    info!(
        "Stored {} node previews in {} ({} with at least one feasible upgrade)",
        written,
        db::TRAFFIC_ABA_TABLE,
        upgradable
    );
    Ok(written)
}

fn log_issues(stage: &str, issues: &[DataQualityIssue]) {
    for issue in issues.iter().take(MAX_LOGGED_ISSUES) {
        warn!("{}: {}", stage, issue);
    }
    if issues.len() > MAX_LOGGED_ISSUES {
        warn!(
            "{}: {} more data quality issues not shown",
            stage,
            issues.len() - MAX_LOGGED_ISSUES
        );
    }
    if !issues.is_empty() {
        info!("{}: {} data quality issues in total", stage, issues.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NodeMetadata, Plan, Trend, TrendDocument, TrendElement};

    const REGISTRY: &str = "\
Coid,Name Coid,Provider.1,DSLAMIP,Nrpname,Location,Downstream,Status,Cantidad
C07,VALENCIA NORTE,ALCATEL,172168101154,NRP03,CAR,2048,ACTIVO,100
C07,VALENCIA NORTE,ALCATEL,172168101154,NRP03,CAR,10240,ACTIVO,20
C07,VALENCIA NORTE,ALCATEL,172168101154,NRP03,CAR,2048,CORTADO,3
";

    fn element(interface: &str, inbound: Vec<f64>, outbound: Vec<f64>, bandwidth: f64) -> TrendElement {
        TrendElement {
            interface: interface.to_string(),
            inbound,
            outbound,
            bandwidth: vec![bandwidth],
        }
    }

    fn day(day: &str, elements: Vec<TrendElement>) -> TrendDocument {
        TrendDocument {
            day: day.to_string(),
            trends: vec![Trend {
                group: "ABA-CAR".to_string(),
                elements,
            }],
        }
    }

    #[tokio::test]
    async fn test_full_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let registry = dir.path().join("registry.csv");
        std::fs::write(&registry, REGISTRY).unwrap();

        let taccess = db::connect_taccess(&dir.path().join("taccess.db")).await.unwrap();
        db::init_taccess_schema(&taccess).await.unwrap();
        let previewer = open_previewer(&dir.path().join("previewer.db")).await.unwrap();

        let metadata = vec![NodeMetadata {
            ip: "172.168.101.154".to_string(),
            interfaces: Some(vec!["CAR-DSLAM07-GE0/1".to_string()]),
            lag: Some("CAR-DSLAM07-LAG-1".to_string()),
            state: Some("Carabobo".to_string()),
        }];
        let trends = vec![
            day(
                "20240101",
                vec![
                    element("CAR-DSLAM07-LAG-1", vec![100e6, 300e6], vec![50e6], 1e9),
                    element("CAR-DSLAM07-GE0/1", vec![10e6], vec![5e6], 1e9),
                ],
            ),
            day(
                "20240102",
                vec![
                    element("CAR-DSLAM07-LAG-1", vec![500e6], vec![100e6], 2e9),
                    element("CAR-DSLAM07-GE0/1", vec![20e6], vec![5e6], 1e9),
                ],
            ),
            // Outside the refreshed range
            day(
                "20240105",
                vec![element("CAR-DSLAM07-LAG-1", vec![9e9], vec![9e9], 9e9)],
            ),
        ];
        db::replace_table(&taccess, db::METADATA_TABLE, &metadata).await.unwrap();
        db::replace_table(&taccess, db::TELEMETRY_TABLES[0], &trends).await.unwrap();

        let options = EngineOptions::default();
        let range = DayRange::parse("20240101", "20240102").unwrap();

        let batch = load_registry(&registry).unwrap();
        assert_eq!(update_aba(&previewer, &batch.reports).await.unwrap(), 1);
        assert_eq!(update_traffic(&taccess, &previewer, &range, &options).await.unwrap(), 2);
        assert_eq!(update_traffic_aba(&previewer, &options).await.unwrap(), 1);

        let previews = db::fetch_previews(&previewer).await.unwrap();
        assert_eq!(previews.len(), 1);

        let node = &previews[0].aggregate;
        assert_eq!(node.ip, "172.168.101.154");
        assert_eq!(node.central, "VALENCIA NORTE");
        assert_eq!(node.bras, "CAR-NRP03");
        assert_eq!(node.element, "CAR-DSLAM07");
        assert_eq!(node.state.as_deref(), Some("Carabobo"));
        assert_eq!(node.in_avg_mbps, 400.0);
        assert_eq!(node.out_avg_mbps, 75.0);
        assert_eq!(node.bandwidth_mbps, 2000.0);
        assert_eq!(node.theoretical_traffic_mbps, 400.0);
        assert_eq!(node.factor, Some(1.0));
        assert_eq!(node.clients_cut_off, 3);

        let upgrades = &previews[0].upgrades;
        assert_eq!(upgrades.len(), 2);
        assert_eq!(upgrades["10"].target_plan, Plan::from_kbps(10240));
        assert_eq!(upgrades["10"].benefited_clients, 100);
        assert_eq!(upgrades["10"].new_theoretical_traffic_mbps, 1200.0);
        assert!(upgrades["10"].is_upgradable);
        assert_eq!(upgrades["2"].benefited_clients, 0);
        assert_eq!(upgrades["2"].new_theoretical_traffic_mbps, 400.0);
    }

    #[tokio::test]
    async fn test_malformed_registry_leaves_store_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let registry = dir.path().join("registry.csv");
        std::fs::write(&registry, "Coid,DSLAMIP\nC01,172168101154\n").unwrap();
        let previewer_db = dir.path().join("previewer.db");

        let err = ingest_registry(&previewer_db, &registry).await.unwrap_err();

        assert!(err.to_string().contains("missing columns"));
        assert!(!previewer_db.exists());
    }
}
