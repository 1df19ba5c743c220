use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;

use wristflick_rs::recording::load_recording;
use wristflick_rs::{
    replay, AimMode, EngineConfig, GestureEvent, GestureKind, ReplayReport, SelectSource,
};

#[derive(Parser, Debug)]
#[command(name = "wristflick")]
#[command(about = "Replay a wrist sensor recording through the gesture engine", long_about = None)]
struct Args {
    /// JSON-lines recording (.jsonl or .jsonl.gz)
    #[arg(value_name = "RECORDING")]
    recording: PathBuf,

    /// Engine config JSON; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of arcs on the selection ring
    #[arg(long)]
    arcs: Option<usize>,

    /// Gesture that confirms a selection
    #[arg(long, value_enum)]
    select: Option<SelectArg>,

    /// Disable shake-to-delete
    #[arg(long)]
    no_delete: bool,

    /// Aim estimation mode
    #[arg(long, value_enum)]
    aim_mode: Option<AimModeArg>,

    /// Output directory for the replay summary
    #[arg(long, default_value = "wristflick_sessions")]
    output_dir: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SelectArg {
    Flick,
    Clench,
    Both,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AimModeArg {
    Vector,
    PitchRoll,
}

#[derive(Serialize)]
struct ReplaySummary {
    recording: String,
    config: EngineConfig,
    #[serde(flatten)]
    report: ReplayReport,
}

fn ts_now() -> String {
    Utc::now().format("%H:%M:%S").to_string()
}

fn ts_now_clean() -> String {
    Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

fn build_config(args: &Args) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(arcs) = args.arcs {
        config.arc_count = arcs;
    }
    if let Some(select) = args.select {
        config.select_source = match select {
            SelectArg::Flick => SelectSource::Flick,
            SelectArg::Clench => SelectSource::Clench,
            SelectArg::Both => SelectSource::Both,
        };
    }
    if args.no_delete {
        config.delete_enabled = false;
    }
    if let Some(mode) = args.aim_mode {
        config.aim.mode = match mode {
            AimModeArg::Vector => AimMode::VectorProjection,
            AimModeArg::PitchRoll => AimMode::PitchRoll,
        };
    }
    Ok(config)
}

fn print_event(event: &GestureEvent) {
    match event.kind {
        GestureKind::Select => println!(
            "[{}] SELECT  arc {:?} via {:?} (peak {:.2}) at {:.3}s",
            ts_now(),
            event.arc,
            event.detector,
            event.magnitude,
            event.timestamp_ns as f64 * 1e-9
        ),
        GestureKind::Delete => println!(
            "[{}] DELETE  energy {:.2} at {:.3}s",
            ts_now(),
            event.magnitude,
            event.timestamp_ns as f64 * 1e-9
        ),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    println!("[{}] Wristflick replay starting", ts_now());
    println!("  Recording: {}", args.recording.display());
    println!("  Output Dir: {}", args.output_dir.display());

    let config = build_config(&args)?;
    let records = load_recording(&args.recording)
        .with_context(|| format!("loading recording {}", args.recording.display()))?;
    println!("  Records: {}", records.len());

    let report = replay(&config, &records, print_event)?;
    for offset in &report.calibrations {
        println!("[{}] CALIBRATE -> {:?}", ts_now(), offset);
    }

    let summary = ReplaySummary {
        recording: args.recording.display().to_string(),
        config,
        report,
    };

    std::fs::create_dir_all(&args.output_dir)?;
    let filename = args
        .output_dir
        .join(format!("replay_{}.json", ts_now_clean()));
    std::fs::write(&filename, serde_json::to_string_pretty(&summary)?)?;

    println!(
        "[{}] Done: {} selects, {} deletes, {} dropped. Summary: {}",
        ts_now(),
        summary.report.stats.selects,
        summary.report.stats.deletes,
        summary.report.stats.dropped_outputs,
        filename.display()
    );
    Ok(())
}
