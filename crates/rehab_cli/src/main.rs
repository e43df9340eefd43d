//! Rehab CLI
//!
//! Workspace preview, scripted session replay and progress archive dumps.

mod script;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rehab_core::{
    FileSink, GridCellSpace, HandSide, NullSink, ProgressSink, ProgressStore, ReferenceFrame, RehabConfig,
    TherapyProgress, Vec3,
};

use script::{parse_script, Replay};

#[derive(Parser)]
#[command(name = "rehab")]
#[command(about = "Drive the rehab engine from the command line", long_about = None)]
struct Cli {
    /// Config file (.yaml, .yml or .json). Falls back to REHAB_PROFILE.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the generated cells around a head pose
    Workspace {
        /// Head height in metres
        #[arg(long, default_value = "1.6")]
        head_height: f32,

        /// Head yaw in degrees
        #[arg(long, default_value = "0")]
        yaw: f32,

        /// Train the left hand instead of the configured one
        #[arg(long)]
        left: bool,
    },

    /// Replay a JSON script, printing engine events as JSON lines
    Simulate {
        /// Script file
        #[arg(long)]
        script: PathBuf,

        /// Progress archive to append results to
        #[arg(long)]
        progress: Option<PathBuf>,

        /// Override the configured seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Dump a progress archive
    Progress {
        /// Archive path
        #[arg(long)]
        file: PathBuf,

        /// Number of history entries to show
        #[arg(long, default_value = "10")]
        recent: usize,
    },
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "rehab_cli=info,rehab_core=info".into()),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(path: Option<&Path>) -> Result<RehabConfig> {
    match path {
        Some(path) => {
            RehabConfig::load(path).with_context(|| format!("failed to load config {}", path.display()))
        }
        None => Ok(RehabConfig::from_env_or_default()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Workspace { head_height, yaw, left } => print_workspace(config, head_height, yaw, left),
        Commands::Simulate { script, progress, seed } => simulate(config, &script, progress, seed),
        Commands::Progress { file, recent } => print_progress(&file, recent),
    }
}

fn print_workspace(mut config: RehabConfig, head_height: f32, yaw: f32, left: bool) -> Result<()> {
    if left {
        config.grid.hand = HandSide::Left;
    }
    let mut space = GridCellSpace::new(config.grid.clone());
    let frame = ReferenceFrame::from_yaw(Vec3::new(0.0, head_height, 0.0), yaw);
    let workspace = space.rebuild(&frame);

    println!("{} cells, {} hand", workspace.len(), config.grid.hand);
    for cell in workspace.cells() {
        let p = workspace.world_position(cell);
        println!("  {:<14} [{:>6.3}, {:>6.3}, {:>6.3}]", cell.grid_index.to_string(), p.x, p.y, p.z);
    }
    Ok(())
}

fn simulate(mut config: RehabConfig, script: &Path, progress: Option<PathBuf>, seed: Option<u64>) -> Result<()> {
    if let Some(seed) = seed {
        config.seed = seed;
    }
    let text = std::fs::read_to_string(script).with_context(|| format!("failed to read {}", script.display()))?;
    let steps = parse_script(&text).with_context(|| format!("invalid script {}", script.display()))?;

    let (sink, table): (Box<dyn ProgressSink>, TherapyProgress) = match progress {
        Some(path) => {
            let sink = FileSink::open(&path)?;
            let table = sink.archive().progress.clone();
            (Box::new(sink), table)
        }
        None => (Box::new(NullSink), TherapyProgress::new()),
    };

    let mut replay = Replay::new(config, sink, table)?;
    tracing::info!("Replaying {} steps from {}", steps.len(), script.display());

    for event in replay.run(&steps) {
        println!("{}", serde_json::to_string(&event)?);
    }

    let engine = replay.engine();
    let summary = serde_json::json!({
        "ledger": engine.ledger().summary(),
        "progress": engine.progress(),
    });
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

fn print_progress(file: &Path, recent: usize) -> Result<()> {
    let archive = ProgressStore::load_from_path(file)?;
    println!("Archive v{} updated {}", archive.version, archive.updated_at);

    for (mode, levels) in archive.progress.modes() {
        let row: Vec<String> = levels.iter().map(|p| format!("{:>3}", p)).collect();
        println!("  {:<24} {}", mode.to_string(), row.join(" "));
    }

    println!("\nRecent ({} of {}):", recent.min(archive.history.len()), archive.history.len());
    for entry in archive.history.recent(recent) {
        println!(
            "  {}  {:<24} level {:<2} {:>3}%",
            entry.timestamp,
            entry.mode.to_string(),
            entry.level_index,
            entry.percent
        );
    }
    Ok(())
}
