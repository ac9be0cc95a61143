use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Session state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No workout yet
    Idle,
    /// Fixes flow through the pipeline
    Tracking,
    /// Pipeline closed, session kept
    Paused,
    /// Finished; a fresh start is needed
    Stopped,
}

/// Start/pause/resume/stop bookkeeping and active-time accounting.
///
/// Invalid transitions return `false` and change nothing, so repeated UI
/// taps are harmless.
#[derive(Debug, Clone)]
pub struct WorkoutTimeline {
    state: SessionState,
    session_id: Option<String>,
    start_time: Option<f64>,
    paused_since: Option<f64>,
    paused_total: f64,
    stopped_at: Option<f64>,
}

impl WorkoutTimeline {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            session_id: None,
            start_time: None,
            paused_since: None,
            paused_total: 0.0,
            stopped_at: None,
        }
    }

    /// Idle or Stopped → Tracking with fresh accounting.
    pub fn start(&mut self, now: f64) -> bool {
        match self.state {
            SessionState::Idle | SessionState::Stopped => {
                *self = Self::new();
                self.state = SessionState::Tracking;
                self.start_time = Some(now);
                self.session_id = Some(format!("session_{}", (now * 1000.0).round() as i64));
                true
            }
            SessionState::Tracking | SessionState::Paused => false,
        }
    }

    pub fn pause(&mut self, now: f64) -> bool {
        match self.state {
            SessionState::Tracking => {
                self.state = SessionState::Paused;
                self.paused_since = Some(now);
                true
            }
            _ => false,
        }
    }

    pub fn resume(&mut self, now: f64) -> bool {
        match self.state {
            SessionState::Paused => {
                if let Some(since) = self.paused_since.take() {
                    self.paused_total += (now - since).max(0.0);
                }
                self.state = SessionState::Tracking;
                true
            }
            _ => false,
        }
    }

    pub fn stop(&mut self, now: f64) -> bool {
        match self.state {
            SessionState::Tracking | SessionState::Paused => {
                if let Some(since) = self.paused_since.take() {
                    self.paused_total += (now - since).max(0.0);
                }
                self.state = SessionState::Stopped;
                self.stopped_at = Some(now);
                true
            }
            _ => false,
        }
    }

    /// Wall time since start minus paused time. Frozen while paused and after stop.
    pub fn active_duration(&self, now: f64) -> f64 {
        let Some(start) = self.start_time else {
            return 0.0;
        };
        let end = match (self.stopped_at, self.paused_since) {
            (Some(stopped), _) => stopped,
            (None, Some(paused)) => paused,
            (None, None) => now,
        };
        (end - start - self.paused_total).max(0.0)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_tracking(&self) -> bool {
        self.state == SessionState::Tracking
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn start_time(&self) -> Option<f64> {
        self.start_time
    }

    /// When the current pause began, if paused.
    pub fn paused_since(&self) -> Option<f64> {
        self.paused_since
    }

    pub fn paused_total(&self) -> f64 {
        self.paused_total
    }

    /// RFC 3339 rendering of the start time.
    pub fn start_time_rfc3339(&self) -> Option<String> {
        let start = self.start_time?;
        Utc.timestamp_millis_opt((start * 1000.0).round() as i64)
            .single()
            .map(|dt| dt.to_rfc3339())
    }
}

impl Default for WorkoutTimeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_state_transitions() {
        let mut timeline = WorkoutTimeline::new();
        assert_eq!(timeline.state(), SessionState::Idle);

        assert!(timeline.start(0.0));
        assert_eq!(timeline.state(), SessionState::Tracking);

        assert!(timeline.pause(10.0));
        assert_eq!(timeline.state(), SessionState::Paused);

        assert!(timeline.resume(20.0));
        assert!(timeline.is_tracking());

        assert!(timeline.stop(30.0));
        assert_eq!(timeline.state(), SessionState::Stopped);
    }

    #[test]
    fn test_invalid_state_transitions_are_noops() {
        let mut timeline = WorkoutTimeline::new();
        assert!(!timeline.resume(1.0));
        assert!(!timeline.pause(1.0));
        assert!(!timeline.stop(1.0));
        assert_eq!(timeline.state(), SessionState::Idle);

        timeline.start(0.0);
        assert!(!timeline.start(1.0));
        assert!(!timeline.resume(1.0));
        timeline.pause(2.0);
        assert!(!timeline.pause(3.0));
        timeline.stop(4.0);
        assert!(!timeline.pause(5.0));
        assert!(!timeline.resume(5.0));
        assert_eq!(timeline.state(), SessionState::Stopped);
    }

    #[test]
    fn test_active_duration_excludes_pauses() {
        let mut timeline = WorkoutTimeline::new();
        timeline.start(100.0);
        timeline.pause(160.0);
        assert_eq!(timeline.active_duration(500.0), 60.0);
        timeline.resume(400.0);
        assert_eq!(timeline.active_duration(430.0), 90.0);
        timeline.pause(450.0);
        timeline.stop(600.0);
        assert_eq!(timeline.active_duration(10_000.0), 110.0);
    }

    #[test]
    fn test_restart_after_stop() {
        let mut timeline = WorkoutTimeline::new();
        timeline.start(0.0);
        timeline.pause(5.0);
        timeline.stop(50.0);
        assert!(timeline.start(100.0));
        assert_eq!(timeline.paused_total(), 0.0);
        assert_eq!(timeline.active_duration(110.0), 10.0);
        assert_eq!(timeline.session_id(), Some("session_100000"));
    }

    #[test]
    fn test_start_time_rfc3339() {
        let mut timeline = WorkoutTimeline::new();
        timeline.start(0.0);
        assert_eq!(
            timeline.start_time_rfc3339().as_deref(),
            Some("1970-01-01T00:00:00+00:00")
        );
    }
}
