//! Synthetic data generator for the plan previewer
//!
//! Produces a consistent set of inputs for a dry run:
//! - node metadata and daily trend documents, written into the telemetry store
//! - a subscriber registry CSV for `update_db aba`
//!
//! Usage:
//!   cargo run --release --bin generate_synthetic -- [OPTIONS]
//!
//! Options:
//!   --nodes <N>          Number of access nodes (default: 40)
//!   --first-day <DAY>    First telemetry day, YYYYMMDD (default: 20240101)
//!   --days <N>           Days of telemetry (default: 7)
//!   --outage-rate <F>    Probability of an interface reporting nothing on a day (default: 0.05)
//!   --seed <N>           Random seed for reproducibility (optional)
//!   --registry <PATH>    Registry CSV output (default: data/registry.csv)

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use clap::Parser;
use csv::WriterBuilder;
use plan_previewer::config::DEFAULT_TACCESS_DB;
use plan_previewer::db::{self, METADATA_TABLE, TELEMETRY_TABLES};
use plan_previewer::models::{NodeMetadata, RegistryRecord, Trend, TrendDocument, TrendElement};
use plan_previewer::report::{STATUS_ACTIVE, STATUS_CUT_OFF, STATUS_SUSPENDED};
use rand::prelude::*;
use rand::rngs::StdRng;
use std::path::PathBuf;
use tracing::info;

const STATES: [(&str, &str); 5] = [
    ("Distrito Capital", "CCS"),
    ("Miranda", "MIR"),
    ("Zulia", "ZUL"),
    ("Carabobo", "CAR"),
    ("Lara", "LAR"),
];

const MODELS: [&str; 3] = ["HUAWEI", "ZTE", "ALCATEL"];

/// Downstream tiers in kbps
const PLANS_KBPS: [u32; 6] = [512, 1024, 2048, 4096, 6144, 10240];

const SAMPLES_PER_DAY: usize = 24;
const MEMBER_LINK_BPS: f64 = 1e9;

#[derive(Parser, Debug)]
#[command(name = "generate_synthetic")]
#[command(about = "Generate synthetic telemetry and a subscriber registry")]
struct Args {
    /// Number of access nodes
    #[arg(long, default_value = "40")]
    nodes: usize,

    /// First telemetry day, YYYYMMDD
    #[arg(long, default_value = "20240101")]
    first_day: String,

    /// Days of telemetry
    #[arg(long, default_value = "7")]
    days: i64,

    /// Probability of an interface reporting nothing on a given day
    #[arg(long, default_value = "0.05")]
    outage_rate: f64,

    /// Probability of a node being uplinked through a LAG
    #[arg(long, default_value = "0.6")]
    lag_rate: f64,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Registry CSV output
    #[arg(long, default_value = "data/registry.csv")]
    registry: PathBuf,

    /// Telemetry store to seed
    #[arg(long, env = "TACCESS_DB_PATH", default_value = DEFAULT_TACCESS_DB)]
    taccess_db: PathBuf,
}

/// A generated access node and its uplinks
struct SyntheticNode {
    ip: String,
    element: String,
    state: &'static str,
    region: &'static str,
    members: Vec<String>,
    lag: Option<String>,
    /// Mean busy-hour load in bits per second
    busy_hour_bps: f64,
}

/// IPs with three-digit octets survive the registry's dot stripping
fn generate_ip(rng: &mut impl Rng) -> String {
    format!(
        "{}.{}.{}.{}",
        rng.gen_range(100..=223),
        rng.gen_range(100..=254),
        rng.gen_range(100..=254),
        rng.gen_range(100..=254)
    )
}

fn generate_node(index: usize, lag_rate: f64, rng: &mut impl Rng) -> SyntheticNode {
    let (state, region) = STATES[rng.gen_range(0..STATES.len())];
    let element = format!("{}-DSLAM{:03}", region, index + 1);
    let member_count = rng.gen_range(1..=3);
    let members = (1..=member_count)
        .map(|port| format!("{}-GE0/{}", element, port))
        .collect();
    let lag = rng.gen_bool(lag_rate).then(|| format!("{}-LAG-1", element));

    SyntheticNode {
        ip: generate_ip(rng),
        element,
        state,
        region,
        members,
        lag,
        busy_hour_bps: rng.gen_range(50e6..600e6),
    }
}

/// One day of hourly samples shaped around an evening peak
fn daily_curve(peak_bps: f64, rng: &mut impl Rng) -> Vec<f64> {
    (0..SAMPLES_PER_DAY)
        .map(|hour| {
            let distance = (hour as f64 - 21.0).abs().min(12.0);
            let shape = 1.0 - distance / 14.0;
            (peak_bps * shape * rng.gen_range(0.85..1.15)).max(0.0)
        })
        .collect()
}

fn element_for(interface: &str, peak_bps: f64, bandwidth_bps: f64, down: bool, rng: &mut impl Rng) -> TrendElement {
    if down {
        return TrendElement {
            interface: interface.to_string(),
            inbound: vec![0.0; SAMPLES_PER_DAY],
            outbound: vec![0.0; SAMPLES_PER_DAY],
            bandwidth: vec![0.0; SAMPLES_PER_DAY],
        };
    }

    TrendElement {
        interface: interface.to_string(),
        inbound: daily_curve(peak_bps, rng),
        outbound: daily_curve(peak_bps * 0.35, rng),
        bandwidth: vec![bandwidth_bps; SAMPLES_PER_DAY],
    }
}

fn node_elements(node: &SyntheticNode, outage_rate: f64, rng: &mut impl Rng) -> Vec<TrendElement> {
    let member_count = node.members.len() as f64;
    let mut elements: Vec<TrendElement> = node
        .members
        .iter()
        .map(|member| {
            let down = rng.gen_bool(outage_rate);
            element_for(member, node.busy_hour_bps / member_count, MEMBER_LINK_BPS, down, rng)
        })
        .collect();

    if let Some(lag) = &node.lag {
        let down = rng.gen_bool(outage_rate);
        elements.push(element_for(
            lag,
            node.busy_hour_bps,
            MEMBER_LINK_BPS * member_count,
            down,
            rng,
        ));
    }

    elements
}

fn registry_rows(node: &SyntheticNode, index: usize, rng: &mut impl Rng) -> Vec<RegistryRecord> {
    // Half of the registry carries IPs with their dots stripped
    let dslam_ip = if index % 2 == 0 {
        node.ip.replace('.', "")
    } else {
        node.ip.clone()
    };
    let model = MODELS[rng.gen_range(0..MODELS.len())];

    let row = |downstream: u32, status: &str, cantidad: u64| RegistryRecord {
        coid: format!("{}{:04}", node.region, index + 1),
        name_coid: format!("CENTRAL {} {}", node.region, index + 1),
        provider: model.to_string(),
        dslam_ip: dslam_ip.clone(),
        nrp_name: format!("NRP{:02}", index % 7 + 1),
        location: node.region.to_string(),
        downstream: Some(downstream as f64),
        status: status.to_string(),
        cantidad,
    };

    let mut rows = Vec::new();
    for kbps in PLANS_KBPS {
        // Slower plans dominate the subscriber base
        let weight = 10240.0 / kbps as f64;
        let active = (rng.gen_range(0.0..6.0) * weight.sqrt()).round() as u64;
        if active > 0 {
            rows.push(row(kbps, STATUS_ACTIVE, active));
        }
        if rng.gen_bool(0.3) {
            rows.push(row(kbps, STATUS_CUT_OFF, rng.gen_range(1..5)));
        }
        if rng.gen_bool(0.2) {
            rows.push(row(kbps, STATUS_SUSPENDED, rng.gen_range(1..3)));
        }
    }
    rows
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let args = Args::parse();
    let first_day = NaiveDate::parse_from_str(&args.first_day, "%Y%m%d")
        .with_context(|| format!("invalid --first-day {}", args.first_day))?;

    println!("🔧 Synthetic Data Generator");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Nodes:            {}", args.nodes);
    println!("Days:             {} from {}", args.days, args.first_day);
    println!("Outage rate:      {:.1}%", args.outage_rate * 100.0);
    println!("LAG rate:         {:.1}%", args.lag_rate * 100.0);
    println!("Registry:         {}", args.registry.display());
    println!("Telemetry store:  {}", args.taccess_db.display());
    if let Some(seed) = args.seed {
        println!("Random seed:      {}", seed);
    }
    println!();

    let mut rng: StdRng = match args.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    let nodes: Vec<SyntheticNode> = (0..args.nodes)
        .map(|i| generate_node(i, args.lag_rate, &mut rng))
        .collect();

    let metadata: Vec<NodeMetadata> = nodes
        .iter()
        .map(|node| NodeMetadata {
            ip: node.ip.clone(),
            interfaces: Some(node.members.clone()),
            lag: node.lag.clone(),
            state: Some(node.state.to_string()),
        })
        .collect();

    // Nodes are spread over the telemetry tables by index
    let mut documents: Vec<Vec<TrendDocument>> = vec![Vec::new(); TELEMETRY_TABLES.len()];
    for offset in 0..args.days {
        let day = (first_day + Duration::days(offset)).format("%Y%m%d").to_string();
        for (table, docs) in documents.iter_mut().enumerate() {
            let trends = nodes
                .iter()
                .enumerate()
                .filter(|(i, _)| i % TELEMETRY_TABLES.len() == table)
                .map(|(_, node)| Trend {
                    group: format!("ABA-{}", node.region),
                    elements: node_elements(node, args.outage_rate, &mut rng),
                })
                .collect();
            docs.push(TrendDocument {
                day: day.clone(),
                trends,
            });
        }
    }

    println!("📝 Writing registry...");
    if let Some(parent) = args.registry.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = WriterBuilder::new()
        .has_headers(true)
        .from_path(&args.registry)?;
    let mut registry_count = 0;
    for (i, node) in nodes.iter().enumerate() {
        for row in registry_rows(node, i, &mut rng) {
            writer.serialize(&row)?;
            registry_count += 1;
        }
    }
    writer.flush()?;

    println!("💾 Seeding telemetry store...");
    if let Some(parent) = args.taccess_db.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let taccess = db::connect_taccess(&args.taccess_db).await?;
    db::init_taccess_schema(&taccess).await?;

    let metadata_count = db::replace_table(&taccess, METADATA_TABLE, &metadata).await?;
    info!("Stored {} node metadata records", metadata_count);
    for (table, docs) in TELEMETRY_TABLES.iter().zip(&documents) {
        let written = db::replace_table(&taccess, table, docs).await?;
        info!("Stored {} trend documents in {}", written, table);
    }

    let lag_nodes = nodes.iter().filter(|node| node.lag.is_some()).count();
    let last_day = first_day + Duration::days(args.days.max(1) - 1);

    println!("\n✅ Generation complete!");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Nodes:             {:>8} ({} behind a LAG)", nodes.len(), lag_nodes);
    println!("Registry rows:     {:>8}", registry_count);
    println!("Trend documents:   {:>8}", documents.iter().map(Vec::len).sum::<usize>());
    println!();
    println!("Next steps:");
    println!("  update_db aba {}", args.registry.display());
    println!(
        "  update_db traffic {} {}",
        args.first_day,
        last_day.format("%Y%m%d")
    );
    println!("  update_db traffic-aba");

    if let Some(sample) = nodes.first() {
        println!("\n📍 Sample node: {} ({}) → {}", sample.element, sample.state, sample.ip);
    }

    Ok(())
}
