//! Boundary with the platform: location providers feed events in, health sinks
//! take finished workouts out. Real platform adapters implement these traits
//! outside this crate; the replay and JSON directory versions live here.

use crossbeam::channel::{Receiver, Sender};
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{TrackerError, TrackerResult};
use crate::summary::WorkoutSummary;
use crate::tracker::WorkoutTracker;
use crate::types::{ActivityKind, LocationFix};

/// Advisory provider state. Never aborts a workout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    Available,
    NoSignal,
    PermissionDenied,
    Failed(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlAction {
    Start,
    Pause,
    Resume,
    Stop,
    SetActivity(ActivityKind),
}

/// Everything that can arrive at the tracker, in delivery order.
///
/// Providers only produce `Fix` and `Status`; `Control` marks come from
/// recorded sessions, where UI actions are logged alongside the fixes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedEvent {
    Fix(LocationFix),
    Status { status: ProviderStatus, timestamp: f64 },
    Control { action: ControlAction, timestamp: f64 },
}

impl FeedEvent {
    pub fn timestamp(&self) -> f64 {
        match self {
            FeedEvent::Fix(fix) => fix.timestamp,
            FeedEvent::Status { timestamp, .. } | FeedEvent::Control { timestamp, .. } => *timestamp,
        }
    }
}

pub trait LocationProvider {
    /// Begin delivering events into `sink`.
    fn start_updates(&mut self, sink: Sender<FeedEvent>) -> TrackerResult<()>;
    fn stop_updates(&mut self);
    fn is_running(&self) -> bool;
}

pub trait HealthDataSink {
    fn write_workout(&mut self, summary: &WorkoutSummary) -> TrackerResult<()>;
    fn read_workouts(&self) -> TrackerResult<Vec<WorkoutSummary>>;
}

// ─── Recorded sessions ───────────────────────────────────────────────────────

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RecordedSession {
    #[serde(default)]
    pub activity: Option<ActivityKind>,
    pub events: Vec<FeedEvent>,
}

impl RecordedSession {
    /// Load a `.json` or `.json.gz` recording.
    pub fn load(path: &Path) -> TrackerResult<Self> {
        let file = File::open(path)?;
        if path.extension().map(|e| e == "gz").unwrap_or(false) {
            let reader = BufReader::new(GzDecoder::new(file));
            Ok(serde_json::from_reader(reader)?)
        } else {
            Ok(serde_json::from_reader(BufReader::new(file))?)
        }
    }
}

/// Provider that plays back a recorded session in one burst.
pub struct ReplayProvider {
    events: Vec<FeedEvent>,
    running: bool,
    delivered: usize,
}

impl ReplayProvider {
    pub fn new(events: Vec<FeedEvent>) -> Self {
        Self {
            events,
            running: false,
            delivered: 0,
        }
    }

    pub fn from_path(path: &Path) -> TrackerResult<Self> {
        Ok(Self::new(RecordedSession::load(path)?.events))
    }

    pub fn delivered(&self) -> usize {
        self.delivered
    }
}

impl LocationProvider for ReplayProvider {
    fn start_updates(&mut self, sink: Sender<FeedEvent>) -> TrackerResult<()> {
        self.running = true;
        for event in self.events.iter().skip(self.delivered) {
            sink.send(event.clone())
                .map_err(|_| TrackerError::ProviderFailed("event channel closed".to_string()))?;
            self.delivered += 1;
        }
        log::debug!("[REPLAY] delivered {}/{} events", self.delivered, self.events.len());
        Ok(())
    }

    fn stop_updates(&mut self) {
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

// ─── Pump ────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default)]
pub struct PumpStats {
    pub events: usize,
    pub fixes: usize,
    pub accepted: usize,
    pub summaries: Vec<WorkoutSummary>,
}

/// Drain whatever is queued on `rx` into the tracker, one event at a time.
///
/// Event timestamps double as "now" so recordings replay deterministically.
pub fn drain_into(tracker: &mut WorkoutTracker, rx: &Receiver<FeedEvent>) -> PumpStats {
    let mut stats = PumpStats::default();
    for event in rx.try_iter() {
        stats.events += 1;
        let now = event.timestamp();
        match event {
            FeedEvent::Fix(fix) => {
                stats.fixes += 1;
                if tracker.process_fix(&fix, now).is_accepted() {
                    stats.accepted += 1;
                }
            }
            FeedEvent::Status { status, .. } => tracker.report_provider_status(status, now),
            FeedEvent::Control { action, .. } => match action {
                ControlAction::Start => {
                    tracker.start(now);
                }
                ControlAction::Pause => {
                    tracker.pause(now);
                }
                ControlAction::Resume => {
                    tracker.resume(now);
                }
                ControlAction::Stop => {
                    if let Some(summary) = tracker.stop(now) {
                        stats.summaries.push(summary);
                    }
                }
                ControlAction::SetActivity(kind) => tracker.set_activity(kind),
            },
        }
        tracker.check_signal(now);
    }
    stats
}

// ─── Sinks ───────────────────────────────────────────────────────────────────

/// Writes each finished workout as `workout_<session id>.json` in a directory.
pub struct JsonDirectorySink {
    dir: PathBuf,
}

impl JsonDirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> TrackerResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn path_for(&self, summary: &WorkoutSummary) -> PathBuf {
        self.dir.join(format!("workout_{}.json", summary.session_id))
    }
}

impl HealthDataSink for JsonDirectorySink {
    fn write_workout(&mut self, summary: &WorkoutSummary) -> TrackerResult<()> {
        let json = serde_json::to_string_pretty(summary)?;
        fs::write(self.path_for(summary), json)
            .map_err(|e| TrackerError::SinkFailed(format!("{}: {}", summary.session_id, e)))?;
        Ok(())
    }

    fn read_workouts(&self) -> TrackerResult<Vec<WorkoutSummary>> {
        let mut paths: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with("workout_") && n.ends_with(".json"))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        let mut workouts = Vec::with_capacity(paths.len());
        for path in paths {
            let text = fs::read_to_string(&path)?;
            workouts.push(serde_json::from_str(&text)?);
        }
        Ok(workouts)
    }
}

/// Wall-clock seconds for live adapters.
pub fn current_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackerConfig;
    use crossbeam::channel::unbounded;
    use std::io::Write;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "workout_tracker_{}_{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn control(action: ControlAction, timestamp: f64) -> FeedEvent {
        FeedEvent::Control { action, timestamp }
    }

    #[test]
    fn test_feed_event_json_shape() {
        let json = r#"[
            {"type": "control", "action": "start", "timestamp": 0.0},
            {"type": "fix", "timestamp": 1.0, "latitude": 32.2, "longitude": -110.9, "horizontal_accuracy": 5.0},
            {"type": "status", "status": "no_signal", "timestamp": 2.0},
            {"type": "control", "action": {"set_activity": "cycling"}, "timestamp": 3.0}
        ]"#;
        let events: Vec<FeedEvent> = serde_json::from_str(json).unwrap();
        assert_eq!(events.len(), 4);
        assert!(matches!(events[1], FeedEvent::Fix(_)));
        assert_eq!(
            events[3],
            control(ControlAction::SetActivity(ActivityKind::Cycling), 3.0)
        );
    }

    #[test]
    fn test_replay_provider_delivers_in_order() {
        let events = vec![
            control(ControlAction::Start, 0.0),
            FeedEvent::Fix(LocationFix::new(1.0, 32.2, -110.9, 5.0)),
            control(ControlAction::Stop, 2.0),
        ];
        let (tx, rx) = unbounded();
        let mut provider = ReplayProvider::new(events.clone());
        provider.start_updates(tx).unwrap();
        assert!(provider.is_running());
        assert_eq!(provider.delivered(), 3);
        let received: Vec<FeedEvent> = rx.try_iter().collect();
        assert_eq!(received, events);
        provider.stop_updates();
        assert!(!provider.is_running());

        // restarting picks up after the last delivered event
        let (tx, rx) = unbounded();
        provider.start_updates(tx).unwrap();
        assert_eq!(provider.delivered(), 3);
        assert_eq!(rx.try_iter().count(), 0);
    }

    #[test]
    fn test_replay_provider_reports_closed_channel() {
        let (tx, rx) = unbounded();
        drop(rx);
        let mut provider = ReplayProvider::new(vec![control(ControlAction::Start, 0.0)]);
        assert!(matches!(provider.start_updates(tx), Err(TrackerError::ProviderFailed(_))));
    }

    #[test]
    fn test_load_gzipped_recording() {
        let dir = temp_dir("gz");
        fs::create_dir_all(&dir).unwrap();
        let session = RecordedSession {
            activity: Some(ActivityKind::Walking),
            events: vec![control(ControlAction::Start, 0.0)],
        };
        let path = dir.join("session.json.gz");
        let file = File::create(&path).unwrap();
        let mut gz = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        gz.write_all(serde_json::to_string(&session).unwrap().as_bytes()).unwrap();
        gz.finish().unwrap();

        let loaded = RecordedSession::load(&path).unwrap();
        assert_eq!(loaded.activity, Some(ActivityKind::Walking));
        assert_eq!(loaded.events.len(), 1);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_drain_applies_controls_and_collects_summary() {
        let mut tracker = WorkoutTracker::new(TrackerConfig::default());
        let (tx, rx) = unbounded();
        tx.send(control(ControlAction::Start, 0.0)).unwrap();
        tx.send(FeedEvent::Fix(LocationFix::new(1.0, 32.2, -110.9, 5.0))).unwrap();
        tx.send(control(ControlAction::Stop, 2.0)).unwrap();
        let stats = drain_into(&mut tracker, &rx);
        assert_eq!(stats.events, 3);
        assert_eq!(stats.fixes, 1);
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.summaries.len(), 1);
        assert_eq!(stats.summaries[0].route.len(), 1);
    }

    #[test]
    fn test_json_directory_sink_roundtrip() {
        let dir = temp_dir("sink");
        let mut sink = JsonDirectorySink::new(&dir).unwrap();
        let mut tracker = WorkoutTracker::new(TrackerConfig::default());
        tracker.start(10.0);
        let summary = tracker.stop(20.0).unwrap();
        sink.write_workout(&summary).unwrap();
        assert!(sink.path_for(&summary).exists());

        let workouts = sink.read_workouts().unwrap();
        assert_eq!(workouts.len(), 1);
        assert_eq!(workouts[0].session_id, summary.session_id);
        let _ = fs::remove_dir_all(&dir);
    }
}
