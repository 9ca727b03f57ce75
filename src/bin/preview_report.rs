//! Node preview report
//! Prints what `update_db traffic-aba` stored: utilization per node and which
//! plan upgrades each node could absorb
//!
//! Run: ./target/release/preview_report [section] [--ip IP] [--limit N]
//! Sections: all, summary, nodes, upgrades

use anyhow::Result;
use clap::Parser;
use plan_previewer::config::DEFAULT_PREVIEWER_DB;
use plan_previewer::db;
use plan_previewer::models::NodePreview;
use std::cmp::Ordering;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "preview_report")]
#[command(about = "Print stored node previews and upgrade projections")]
struct Args {
    /// all, summary, nodes, upgrades
    #[arg(default_value = "all")]
    section: String,

    /// Only show this node
    #[arg(long)]
    ip: Option<String>,

    /// Rows per table, busiest nodes first
    #[arg(long, default_value = "20")]
    limit: usize,

    #[arg(long, env = "PLAN_PREVIEWER_DB_PATH", default_value = DEFAULT_PREVIEWER_DB)]
    previewer_db: PathBuf,
}

fn print_section_header(title: &str) {
    println!("\n{}", "═".repeat(80));
    println!("  {}", title);
    println!("{}\n", "═".repeat(80));
}

fn fmt_ratio(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}%", v * 100.0),
        None => "n/a".to_string(),
    }
}

/// Busiest first; nodes without a factor sink to the bottom
fn by_factor_desc(a: &NodePreview, b: &NodePreview) -> Ordering {
    match (a.aggregate.factor, b.aggregate.factor) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.aggregate.ip.cmp(&b.aggregate.ip),
    }
}

fn run_summary_section(previews: &[NodePreview]) {
    print_section_header("📊 SUMMARY");

    let clients: u64 = previews.iter().map(|p| p.aggregate.clients).sum();
    let active: u64 = previews.iter().map(|p| p.aggregate.clients_active).sum();
    let bandwidth: f64 = previews.iter().map(|p| p.aggregate.bandwidth_mbps).sum();
    let peak: f64 = previews.iter().map(|p| p.aggregate.peak_mbps()).sum();
    let upgradable = previews
        .iter()
        .filter(|p| p.upgrades.values().any(|u| u.is_upgradable))
        .count();

    println!("  Nodes:                {:>12}", previews.len());
    println!("  Clients:              {:>12}", clients);
    println!("  Active Clients:       {:>12}", active);
    println!("  Uplink Capacity:      {:>10.1} Mbps", bandwidth);
    println!("  Peak Traffic:         {:>10.1} Mbps", peak);
    if bandwidth > 0.0 {
        println!("  Overall Utilization:  {:>11.1}%", peak / bandwidth * 100.0);
    }
    println!("  Upgradable Nodes:     {:>12}", upgradable);
}

fn run_nodes_section(previews: &[NodePreview], limit: usize) {
    print_section_header("🖧 NODE UTILIZATION");

    println!(
        "  {:20} {:16} {:>8} {:>10} {:>10} {:>8} {:>8}",
        "Element", "IP", "Clients", "Peak Mbps", "BW Mbps", "Factor", "Media"
    );
    println!("  {}", "─".repeat(86));

    for preview in previews.iter().take(limit) {
        let node = &preview.aggregate;
        println!(
            "  {:20} {:16} {:>8} {:>10.1} {:>10.1} {:>8} {:>8}",
            node.element,
            node.ip,
            node.clients,
            node.peak_mbps(),
            node.bandwidth_mbps,
            fmt_ratio(node.factor),
            fmt_ratio(node.media)
        );
    }
}

fn run_upgrades_section(previews: &[NodePreview], limit: usize) {
    print_section_header("⬆ UPGRADE PROJECTIONS");

    for preview in previews.iter().take(limit) {
        let node = &preview.aggregate;
        println!(
            "\n{} ({}) · {} clients · {:.1} of {:.1} Mbps",
            node.element,
            node.ip,
            node.clients,
            node.peak_mbps(),
            node.bandwidth_mbps
        );
        if preview.upgrades.is_empty() {
            println!("  no candidate plans");
            continue;
        }

        println!(
            "  {:>12} {:>10} {:>16} {:>10}",
            "Target", "Benefited", "New Traffic Mbps", "Feasible"
        );
        println!("  {}", "─".repeat(51));
        for projection in preview.upgrades_by_capacity() {
            println!(
                "  {:>12} {:>10} {:>16.1} {:>10}",
                projection.target_plan.to_string(),
                projection.benefited_clients,
                projection.new_theoretical_traffic_mbps,
                if projection.is_upgradable { "✓" } else { "✗" }
            );
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let previewer = db::connect_previewer(&args.previewer_db).await?;
    let mut previews = db::fetch_previews(&previewer).await?;
    if let Some(ip) = &args.ip {
        previews.retain(|p| &p.aggregate.ip == ip);
    }
    previews.sort_by(by_factor_desc);

    println!("\n{}", "█".repeat(80));
    println!("{}  PLAN PREVIEW  {}", "█".repeat(32), "█".repeat(32));
    println!("{}\n", "█".repeat(80));

    if previews.is_empty() {
        println!("No node previews found. Run `update_db traffic-aba` first.");
        return Ok(());
    }

    match args.section.as_str() {
        "all" => {
            run_summary_section(&previews);
            run_nodes_section(&previews, args.limit);
            run_upgrades_section(&previews, args.limit);
        }
        "summary" => run_summary_section(&previews),
        "nodes" => run_nodes_section(&previews, args.limit),
        "upgrades" => run_upgrades_section(&previews, args.limit),
        _ => {
            println!("Unknown section: {}", args.section);
            println!("Available: all, summary, nodes, upgrades");
        }
    }

    println!("\n{}", "█".repeat(80));
    Ok(())
}
