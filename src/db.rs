use crate::config::DayRange;
use crate::models::{NodeMetadata, NodePreview, NodeReport, TrafficSummary, TrendDocument};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use surrealdb::engine::local::{Db, RocksDb};
use surrealdb::Surreal;

pub type DbConn = Surreal<Db>;

/// Telemetry tables, one trend document per day each
pub const TELEMETRY_TABLES: [&str; 4] = ["ehealth1", "ehealth2", "ehealth3", "ehealth4"];
pub const METADATA_TABLE: &str = "ip_interfaces";

pub const ABA_TABLE: &str = "aba";
pub const TRAFFIC_TABLE: &str = "traffic";
pub const TRAFFIC_ABA_TABLE: &str = "traffic_aba";

async fn connect(path: &Path, namespace: &str, database: &str) -> Result<DbConn> {
    let db = Surreal::new::<RocksDb>(path.to_string_lossy().into_owned())
        .await
        .with_context(|| format!("opening store at {}", path.display()))?;
    db.use_ns(namespace).use_db(database).await?;
    Ok(db)
}

/// Source store holding interface metadata and daily telemetry
pub async fn connect_taccess(path: &Path) -> Result<DbConn> {
    connect(path, "taccess", "ehealth").await
}

/// Reporting store read by the plan previewer
pub async fn connect_previewer(path: &Path) -> Result<DbConn> {
    connect(path, "plan_previewer", "previewer").await
}

pub async fn init_taccess_schema(db: &DbConn) -> Result<()> {
    let mut schema = format!(
        "DEFINE TABLE IF NOT EXISTS {METADATA_TABLE} SCHEMALESS;\n\
         DEFINE INDEX IF NOT EXISTS idx_{METADATA_TABLE}_ip ON {METADATA_TABLE} FIELDS ip;\n"
    );
    for table in TELEMETRY_TABLES {
        schema.push_str(&format!(
            "DEFINE TABLE IF NOT EXISTS {table} SCHEMALESS;\n\
             DEFINE INDEX IF NOT EXISTS idx_{table}_day ON {table} FIELDS day;\n"
        ));
    }

    db.query(schema).await?.check()?;
    Ok(())
}

pub async fn init_previewer_schema(db: &DbConn) -> Result<()> {
    db.query(
        r#"
        -- Node reports from the subscriber registry
        DEFINE TABLE IF NOT EXISTS aba SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_aba_ip ON aba FIELDS ip UNIQUE;

        -- One summary per interface
        DEFINE TABLE IF NOT EXISTS traffic SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_traffic_interface ON traffic FIELDS interface UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_traffic_ip ON traffic FIELDS ip;

        -- Node previews with upgrade projections
        DEFINE TABLE IF NOT EXISTS traffic_aba SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_traffic_aba_ip ON traffic_aba FIELDS ip UNIQUE;
        "#,
    )
    .await?
    .check()?;

    Ok(())
}

/// Replace the whole content of `table` with `docs`.
///
/// Delete and insert run in one transaction, so readers see either the old set or
/// the new one, never an empty table.
pub async fn replace_table<T: Serialize>(db: &DbConn, table: &str, docs: &[T]) -> Result<usize> {
    let payload = serde_json::to_value(docs)
        .with_context(|| format!("serializing {} documents for {}", docs.len(), table))?;

    let statement = if docs.is_empty() {
        format!("BEGIN TRANSACTION; DELETE {table}; COMMIT TRANSACTION;")
    } else {
        format!("BEGIN TRANSACTION; DELETE {table}; INSERT INTO {table} $docs; COMMIT TRANSACTION;")
    };

    db.query(statement)
        .bind(("docs", payload))
        .await
        .with_context(|| format!("replacing {table}"))?
        .check()
        .with_context(|| format!("replacing {table}"))?;

    Ok(docs.len())
}

/// Every document of `table`, without the record id
async fn select_all<T: DeserializeOwned>(db: &DbConn, table: &str) -> Result<Vec<T>> {
    let rows: Vec<T> = db
        .query(format!("SELECT * OMIT id FROM {table}"))
        .await?
        .take(0)
        .with_context(|| format!("reading {table}"))?;
    Ok(rows)
}

pub async fn fetch_metadata(db: &DbConn) -> Result<Vec<NodeMetadata>> {
    select_all(db, METADATA_TABLE).await
}

/// Trend documents of one telemetry table within the day range
pub async fn fetch_trends(db: &DbConn, table: &str, range: &DayRange) -> Result<Vec<TrendDocument>> {
    let docs: Vec<TrendDocument> = db
        .query(format!(
            "SELECT day, trends FROM {table} WHERE day >= $first AND day <= $last ORDER BY day"
        ))
        .bind(("first", range.first_key()))
        .bind(("last", range.last_key()))
        .await?
        .take(0)
        .with_context(|| format!("reading {table}"))?;
    Ok(docs)
}

pub async fn fetch_reports(db: &DbConn) -> Result<Vec<NodeReport>> {
    select_all(db, ABA_TABLE).await
}

pub async fn fetch_summaries(db: &DbConn) -> Result<Vec<TrafficSummary>> {
    select_all(db, TRAFFIC_TABLE).await
}

pub async fn fetch_previews(db: &DbConn) -> Result<Vec<NodePreview>> {
    select_all(db, TRAFFIC_ABA_TABLE).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineOptions;
    use crate::engine::preview_nodes;
    use crate::models::Plan;
    use std::collections::BTreeMap;

    fn summary(interface: &str) -> TrafficSummary {
        TrafficSummary {
            ip: "172.168.101.154".to_string(),
            interface: interface.to_string(),
            state: None,
            group: "ABA".to_string(),
            in_avg: 1.5e6,
            out_avg: 0.5e6,
            bandwidth: 1e9,
        }
    }

    #[tokio::test]
    async fn test_replace_table_swaps_content() {
        let dir = tempfile::tempdir().unwrap();
        let db = connect_previewer(&dir.path().join("previewer.db")).await.unwrap();
        init_previewer_schema(&db).await.unwrap();

        replace_table(&db, TRAFFIC_TABLE, &[summary("A"), summary("B"), summary("C")])
            .await
            .unwrap();
        replace_table(&db, TRAFFIC_TABLE, &[summary("D")]).await.unwrap();

        let rows = fetch_summaries(&db).await.unwrap();
        assert_eq!(rows, vec![summary("D")]);

        let none: Vec<TrafficSummary> = Vec::new();
        replace_table(&db, TRAFFIC_TABLE, &none).await.unwrap();
        assert!(fetch_summaries(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reports_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let db = connect_previewer(&dir.path().join("previewer.db")).await.unwrap();
        init_previewer_schema(&db).await.unwrap();

        let mut clients_by_plan = BTreeMap::new();
        clients_by_plan.insert(Plan::from_kbps(512), 4);
        clients_by_plan.insert(Plan::from_kbps(2048), 6);
        let report = NodeReport {
            ip: "190.202.101.110".to_string(),
            central: "EL HATILLO".to_string(),
            model: "ZTE".to_string(),
            bras: "CCS-NRP02".to_string(),
            theoretical_traffic: 14.0,
            clients: 10,
            clients_active: 10,
            clients_cut_off: 1,
            clients_suspended: 2,
            clients_by_plan,
        };

        replace_table(&db, ABA_TABLE, std::slice::from_ref(&report)).await.unwrap();
        let rows = fetch_reports(&db).await.unwrap();
        assert_eq!(rows, vec![report]);
    }

    #[tokio::test]
    async fn test_previews_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let db = connect_previewer(&dir.path().join("previewer.db")).await.unwrap();
        init_previewer_schema(&db).await.unwrap();

        let mut clients_by_plan = BTreeMap::new();
        clients_by_plan.insert(Plan::from_kbps(512), 4);
        clients_by_plan.insert(Plan::from_kbps(2048), 6);
        clients_by_plan.insert(Plan::from_kbps(10240), 0);
        let report = NodeReport {
            ip: "172.168.101.154".to_string(),
            central: "CHACAO".to_string(),
            model: "HUAWEI".to_string(),
            bras: "CCS-NRP01".to_string(),
            theoretical_traffic: 14.0,
            clients: 10,
            clients_active: 0,
            clients_cut_off: 1,
            clients_suspended: 2,
            clients_by_plan,
        };

        let batch = preview_nodes(
            std::slice::from_ref(&report),
            &[summary("CCS-DSLAM01-GE0/1")],
            &EngineOptions::default(),
        );
        assert_eq!(batch.previews.len(), 1);
        // media is undefined without active clients
        assert_eq!(batch.previews[0].aggregate.media, None);

        replace_table(&db, TRAFFIC_ABA_TABLE, &batch.previews).await.unwrap();
        let rows = fetch_previews(&db).await.unwrap();
        assert_eq!(rows, batch.previews);
        assert_eq!(rows[0].upgrades.len(), 3);
    }
}
