use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use depthmap::{ingest_csv, Config, QueryService, RenderRequest, RowStore, SqliteRowStore};
use tracing::info;

#[derive(Parser)]
#[command(version, about = "Ingest depth rows and render them as colormapped frames")]
struct Cli {
    /// TOML config file, environment variables still override it.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resample a CSV and store its rows.
    Ingest {
        csv: PathBuf,

        /// Replace every stored row with the rows of this file.
        #[arg(long)]
        clear_db: bool,
    },

    /// Render a depth range to a PNG file.
    Render {
        #[arg(long, allow_negative_numbers = true)]
        depth_min: f64,

        #[arg(long, allow_negative_numbers = true)]
        depth_max: f64,

        #[arg(long)]
        colormap: Option<String>,

        #[arg(short, long)]
        out: PathBuf,
    },

    /// Remove every stored row.
    Clear,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    depthmap::init(&config);

    let mut store = SqliteRowStore::open(&config.db_path)
        .with_context(|| format!("failed to open {:?}", config.db_path))?;

    match cli.command {
        Command::Ingest { csv, clear_db } => {
            let report = ingest_csv(&csv, &mut store, clear_db)?;
            info!(
                rows_read = report.rows_read,
                rows_skipped = report.rows_skipped,
                inserted = report.inserted,
                updated = report.updated,
                "ingested {csv:?}"
            );
        }
        Command::Render {
            depth_min,
            depth_max,
            colormap,
            out,
        } => {
            let service = QueryService::new(store, config.default_colormap, config.depth_bounds);
            let request = RenderRequest::new(depth_min, depth_max, colormap.as_deref());
            let frame = service.render_frame(&request)?;
            std::fs::write(&out, &frame.bytes)
                .with_context(|| format!("failed to write {out:?}"))?;
            let stats = service.frame_stats(&request)?;
            info!(width = frame.width, height = frame.height, ?stats, "saved {out:?}");
        }
        Command::Clear => {
            let removed = store.clear()?;
            info!(removed, "cleared {:?}", config.db_path);
        }
    }

    Ok(())
}
