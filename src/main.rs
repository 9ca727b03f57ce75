//! Plan previewer store updater
//!
//! Usage:
//!   update_db aba <REGISTRY_CSV>
//!   update_db traffic <FIRSTDAY> <LASTDAY> [--bandwidth-reduction global-peak]
//!   update_db traffic-aba [--base-plan-kbps N] [--safety-margin F]
//!
//! Store locations come from `--taccess-db` / `--previewer-db` or the
//! `TACCESS_DB_PATH` / `PLAN_PREVIEWER_DB_PATH` environment variables (a `.env`
//! file is honoured).

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use plan_previewer::config::{
    BandwidthReduction, DayRange, EngineOptions, LagMatching, DEFAULT_PREVIEWER_DB,
    DEFAULT_SAFETY_MARGIN, DEFAULT_TACCESS_DB,
};
use plan_previewer::models::Plan;
use plan_previewer::{db, pipeline};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "update_db")]
#[command(about = "Refresh the plan previewer store from telemetry and the subscriber registry")]
struct Cli {
    /// Telemetry source store
    #[arg(long, global = true, env = "TACCESS_DB_PATH", default_value = DEFAULT_TACCESS_DB)]
    taccess_db: PathBuf,

    /// Plan previewer store
    #[arg(long, global = true, env = "PLAN_PREVIEWER_DB_PATH", default_value = DEFAULT_PREVIEWER_DB)]
    previewer_db: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest the subscriber registry report (CSV export)
    Aba {
        /// e.g. data/Clientes_ABA_Registros.csv
        file: PathBuf,
    },

    /// Summarize interface traffic between two days, inclusive
    Traffic {
        /// First day, YYYYMMDD
        firstday: String,
        /// Last day, YYYYMMDD
        lastday: String,

        #[arg(long, env = "BANDWIDTH_REDUCTION", value_enum, default_value_t = BandwidthReduction::default())]
        bandwidth_reduction: BandwidthReduction,
    },

    /// Join registry and traffic into node previews with upgrade projections
    TrafficAba(PreviewArgs),
}

#[derive(Args, Debug)]
struct PreviewArgs {
    #[arg(long, env = "LAG_MATCHING", value_enum, default_value_t = LagMatching::default())]
    lag_matching: LagMatching,

    /// Share of measured bandwidth held back when judging upgrades
    #[arg(long, env = "UPGRADE_SAFETY_MARGIN", default_value_t = DEFAULT_SAFETY_MARGIN)]
    safety_margin: f64,

    /// Lowest upgrade target in kbps (defaults to each node's lowest plan)
    #[arg(long, env = "UPGRADE_BASE_PLAN_KBPS")]
    base_plan_kbps: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Aba { file } => {
            pipeline::ingest_registry(&cli.previewer_db, &file).await?;
        }
        Command::Traffic {
            firstday,
            lastday,
            bandwidth_reduction,
        } => {
            // Validate before touching either store
            let range = DayRange::parse(&firstday, &lastday)?;
            let options = EngineOptions {
                bandwidth: bandwidth_reduction,
                ..EngineOptions::default()
            };

            info!("Connecting to telemetry store at {:?}", cli.taccess_db);
            let taccess = db::connect_taccess(&cli.taccess_db).await?;
            db::init_taccess_schema(&taccess).await?;
            let previewer = pipeline::open_previewer(&cli.previewer_db).await?;

            pipeline::update_traffic(&taccess, &previewer, &range, &options).await?;
        }
        Command::TrafficAba(args) => {
            let options = EngineOptions {
                lag_matching: args.lag_matching,
                safety_margin: args.safety_margin,
                base_plan: args.base_plan_kbps.map(Plan::from_kbps),
                ..EngineOptions::default()
            }
            .validate()?;

            let previewer = pipeline::open_previewer(&cli.previewer_db).await?;
            pipeline::update_traffic_aba(&previewer, &options).await?;
        }
    }

    Ok(())
}
