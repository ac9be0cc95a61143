use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use crossbeam::channel::unbounded;
use serde_json::json;
use workout_tracker::config::{StationaryPolicy, TrackerConfig};
use workout_tracker::provider::{
    drain_into, HealthDataSink, JsonDirectorySink, LocationProvider, RecordedSession, ReplayProvider,
};
use workout_tracker::tracker::WorkoutTracker;
use workout_tracker::types::ActivityKind;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PolicyArg {
    Freeze,
    LogOnly,
}

#[derive(Parser, Debug)]
struct Args {
    /// Path to a recorded session (.json or .json.gz)
    #[arg(long, conflicts_with = "session_dir")]
    log: Option<PathBuf>,

    /// Directory of recorded sessions to batch replay
    #[arg(long)]
    session_dir: Option<PathBuf>,

    /// Tracker config JSON; missing fields use defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Activity override (running, walking, cycling)
    #[arg(long)]
    activity: Option<ActivityKind>,

    /// Stationary policy override
    #[arg(long, value_enum)]
    policy: Option<PolicyArg>,

    /// Dwell time override in seconds
    #[arg(long)]
    dwell_secs: Option<f64>,

    /// Write finished workouts as JSON into this directory
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

fn build_config(args: &Args, session: &RecordedSession) -> anyhow::Result<TrackerConfig> {
    let mut config = match args.config.as_ref() {
        Some(path) => TrackerConfig::from_json_file(path)?,
        None => TrackerConfig::default(),
    };
    if let Some(kind) = args.activity.or(session.activity) {
        config.activity = kind;
    }
    if let Some(policy) = args.policy {
        config.motion.policy = match policy {
            PolicyArg::Freeze => StationaryPolicy::FreezeDistance,
            PolicyArg::LogOnly => StationaryPolicy::LogOnly,
        };
    }
    if let Some(dwell) = args.dwell_secs {
        config.motion.dwell_secs = dwell;
    }
    config.validate()?;
    Ok(config)
}

fn run_once(path: &Path, args: &Args) -> anyhow::Result<serde_json::Value> {
    let session = RecordedSession::load(path)?;
    let config = build_config(args, &session)?;
    let mut tracker = WorkoutTracker::new(config);

    let (tx, rx) = unbounded();
    let mut provider = ReplayProvider::new(session.events);
    provider.start_updates(tx)?;
    let stats = drain_into(&mut tracker, &rx);
    provider.stop_updates();

    // Recordings cut off mid-session still produce a workout.
    let mut summaries = stats.summaries;
    if let Some(last_ts) = tracker.route().points().last().map(|p| p.fix.timestamp) {
        if let Some(summary) = tracker.stop(last_ts) {
            log::warn!("[REPLAY] {} ended without stop; closing at {:.1}", path.display(), last_ts);
            summaries.push(summary);
        }
    }

    if let Some(dir) = args.output_dir.as_ref() {
        let mut sink = JsonDirectorySink::new(dir)?;
        for summary in &summaries {
            sink.write_workout(summary)?;
        }
    }

    let snapshot = tracker.snapshot();
    Ok(json!({
        "log": path.display().to_string(),
        "activity": tracker.activity().to_string(),
        "events": stats.events,
        "fixes": stats.fixes,
        "accepted": stats.accepted,
        "rejected": snapshot.rejected_fixes,
        "workouts": summaries.iter().map(|s| json!({
            "id": s.session_id,
            "start": s.start_time,
            "distance_m": s.total_distance,
            "active_secs": s.active_duration,
            "avg_pace_min_km": s.average_pace,
            "max_speed": s.max_speed,
            "elevation_gain_m": s.elevation_gain,
            "calories": s.estimated_calories,
            "splits": s.splits.len(),
            "points": s.route.len(),
        })).collect::<Vec<_>>(),
    }))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut results = Vec::new();

    if let Some(dir) = args.session_dir.as_ref() {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .filter(|p| {
                let name = p.file_name().and_then(|n| n.to_str()).unwrap_or("");
                name.ends_with(".json") || name.ends_with(".json.gz")
            })
            .collect();
        paths.sort();
        for path in paths {
            match run_once(&path, &args) {
                Ok(res) => results.push(res),
                Err(e) => eprintln!("Failed {}: {}", path.display(), e),
            }
        }
    } else if let Some(log) = args.log.as_ref() {
        results.push(run_once(log, &args)?);
    } else {
        anyhow::bail!("Provide --log or --session-dir");
    }

    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
