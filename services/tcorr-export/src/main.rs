//! Tcorr export service.
//!
//! Batch tool around the Tcorr processor:
//! - `scenes`: resolve Tcorr for every scene input document and write one
//!   asset per scene into the catalog
//! - `monthly`: composite the gridded scene assets into monthly
//!   climatologies per WRS2 tile

mod config;
mod export;
mod monthly;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use ssebop_common::Wrs2Tile;
use tcorr_processor::{AssetCatalog, FilesystemCatalog, TcorrSourceKind};

use config::ExportConfig;
use export::{list_scene_files, Exporter};
use monthly::{parse_months, MonthlyExporter};

#[derive(Parser, Debug)]
#[command(name = "tcorr-export")]
#[command(about = "Export gridded Tcorr images and monthly climatologies")]
struct Args {
    /// YAML configuration file
    #[arg(long, env = "TCORR_EXPORT_CONFIG")]
    config: Option<PathBuf>,

    /// Asset catalog root (overrides config)
    #[arg(long, env = "TCORR_CATALOG_DIR")]
    catalog: Option<PathBuf>,

    /// Replace existing outputs
    #[arg(long)]
    overwrite: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve and write Tcorr for scene input documents
    Scenes {
        /// Directory of scene input JSON documents (overrides config)
        #[arg(long)]
        scenes: Option<PathBuf>,

        /// Tcorr source, e.g. GRIDDED_COLD, SCENE or a constant
        #[arg(long)]
        tcorr_source: Option<String>,

        /// Tmax source
        #[arg(long)]
        tmax_source: Option<String>,

        /// Maximum concurrent scenes
        #[arg(long)]
        max_concurrent: Option<usize>,
    },

    /// Build monthly gridded composites
    Monthly {
        /// WRS2 tiles such as p044r033 (default: all tiles with scenes)
        #[arg(long = "wrs2-tile", value_delimiter = ',')]
        tiles: Vec<Wrs2Tile>,

        /// Months, e.g. 7 or 5-9 or 6,7,8
        #[arg(long, default_value = "1-12")]
        months: String,

        /// Only use scenes from these years
        #[arg(long, value_delimiter = ',')]
        years: Vec<i32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args.log_level, args.json_logs)?;

    let mut config = match &args.config {
        Some(path) => ExportConfig::load(path)?,
        None => ExportConfig::default(),
    };
    if let Some(catalog) = &args.catalog {
        config.catalog_dir = catalog.clone();
    }
    config.overwrite |= args.overwrite;

    let catalog: Arc<dyn AssetCatalog> = Arc::new(FilesystemCatalog::new(&config.catalog_dir));

    match args.command {
        Command::Scenes {
            scenes,
            tcorr_source,
            tmax_source,
            max_concurrent,
        } => {
            if let Some(dir) = scenes {
                config.scenes_dir = dir;
            }
            if let Some(source) = tcorr_source {
                config.tcorr_source = source
                    .parse::<TcorrSourceKind>()
                    .context("Invalid --tcorr-source")?;
            }
            if let Some(source) = tmax_source {
                config.tmax_source = source;
            }
            if let Some(n) = max_concurrent {
                config.max_concurrent = n;
            }

            info!(
                scenes_dir = %config.scenes_dir.display(),
                catalog_dir = %config.catalog_dir.display(),
                "Starting Tcorr scene export"
            );
            let paths = list_scene_files(&config.scenes_dir).await?;
            let exporter = Exporter::new(catalog, config)?;
            let summary = exporter.run(paths).await;
            anyhow::ensure!(summary.failed == 0, "{} scenes failed", summary.failed);
        }
        Command::Monthly {
            tiles,
            months,
            years,
        } => {
            config.validate()?;
            let months = parse_months(&months)?;
            let years = (!years.is_empty()).then_some(years);

            info!(
                catalog_dir = %config.catalog_dir.display(),
                months = ?months,
                "Starting monthly composite export"
            );
            MonthlyExporter::new(catalog, config, years)
                .run(tiles, &months)
                .await?;
        }
    }

    Ok(())
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);
    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}
