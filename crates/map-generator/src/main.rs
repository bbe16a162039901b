//! Map Generation CLI
//!
//! Pre-renders every available configuration into the static tree.
//!
//! Usage:
//!   generate-maps all --static-root static
//!   generate-maps cell-heatmap --legend-dir templates/color_scales --report report.json

use anyhow::Result;
use capacity_datasets::DatasetKind;
use capacity_viz::MapPipeline;
use clap::{Parser, ValueEnum};
use map_generator::generate;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Target {
    CountryCapacity,
    CellHeatmap,
    GsUtilization,
    Heatmap,
    All,
}

impl Target {
    fn kinds(self) -> Vec<DatasetKind> {
        match self {
            Target::CountryCapacity => vec![DatasetKind::CountryCapacity],
            Target::CellHeatmap => vec![DatasetKind::CellHeatmap],
            Target::GsUtilization => vec![DatasetKind::GsUtilization],
            Target::Heatmap => vec![DatasetKind::Heatmap],
            Target::All => DatasetKind::ALL.to_vec(),
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "generate-maps",
    about = "Pre-generate satellite capacity map documents"
)]
struct Args {
    /// Which map family to generate
    #[arg(value_enum)]
    target: Target,

    /// Root of the static tree holding data and visualizations
    #[arg(short, long, default_value = "static")]
    static_root: PathBuf,

    /// Directory with legend template overrides
    #[arg(short, long)]
    legend_dir: Option<PathBuf>,

    /// Also write the generation report as JSON
    #[arg(long)]
    report: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("{}", "=".repeat(60));
    info!("Capacity Map Generator");
    info!("{}", "=".repeat(60));
    info!("Static root: {:?}", args.static_root);

    let mut pipeline = MapPipeline::new(&args.static_root);
    if let Some(dir) = &args.legend_dir {
        pipeline = pipeline.with_legend_dir(dir);
    }

    let report = generate(&pipeline, &args.target.kinds());

    if let Some(path) = &args.report {
        info!("Writing report to {:?}", path);
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, &report)?;
    }

    info!("\n{}", "=".repeat(60));
    info!("SUMMARY ({})", report.generated_at.format("%Y-%m-%d %H:%M:%S UTC"));
    info!("{}", "=".repeat(60));
    for (kind, counts) in &report.by_kind {
        info!(
            "  {}: {} generated, {} skipped, {} failed",
            kind, counts.generated, counts.skipped, counts.failed
        );
    }
    info!(
        "Total: {} generated, {} skipped, {} failed",
        report.totals.generated, report.totals.skipped, report.totals.failed
    );

    Ok(())
}
