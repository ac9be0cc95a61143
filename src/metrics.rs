//! Read-side metrics recomputed after every processed fix.

use serde::{Deserialize, Serialize};

use crate::motion::MotionState;
use crate::provider::ProviderStatus;
use crate::timeline::SessionState;
use crate::types::LocationFix;

/// Below this the pace would blow up, so it reads zero.
pub const MIN_PACE_SPEED: f64 = 0.1;

/// Minutes per kilometre, zero when effectively not moving.
pub fn pace_min_per_km(speed_ms: f64) -> f64 {
    if speed_ms < MIN_PACE_SPEED {
        return 0.0;
    }
    1000.0 / speed_ms / 60.0
}

/// Snapshot handed to UI listeners and the replay tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub session_state: SessionState,
    pub motion_state: MotionState,
    pub current_speed: f64,
    pub current_pace: f64,
    pub current_altitude: Option<f64>,
    pub accuracy: Option<f64>,
    pub is_gps_ready: bool,
    pub provider_status: ProviderStatus,
    pub total_distance: f64,
    pub elevation_gain: f64,
    pub elevation_loss: f64,
    pub active_duration: f64,
    pub max_speed: f64,
    pub route_points: usize,
    pub accepted_fixes: u64,
    pub rejected_fixes: u64,
}

impl Default for MetricsSnapshot {
    fn default() -> Self {
        Self {
            session_state: SessionState::Idle,
            motion_state: MotionState::Moving,
            current_speed: 0.0,
            current_pace: 0.0,
            current_altitude: None,
            accuracy: None,
            is_gps_ready: false,
            provider_status: ProviderStatus::Available,
            total_distance: 0.0,
            elevation_gain: 0.0,
            elevation_loss: 0.0,
            active_duration: 0.0,
            max_speed: 0.0,
            route_points: 0,
            accepted_fixes: 0,
            rejected_fixes: 0,
        }
    }
}

/// Tracks raw-fix arrival independent of session state, for the readiness indicator.
#[derive(Clone, Debug)]
pub struct GpsHealth {
    last_fix_time: Option<f64>,
    accuracy: Option<f64>,
    altitude: Option<f64>,
    status: ProviderStatus,
    silence_threshold: f64,
}

impl GpsHealth {
    pub fn new(silence_threshold: f64) -> Self {
        Self {
            last_fix_time: None,
            accuracy: None,
            altitude: None,
            status: ProviderStatus::Available,
            silence_threshold,
        }
    }

    /// Record a raw fix, accepted or not. Returns true if this ended an outage.
    pub fn observe(&mut self, fix: &LocationFix) -> bool {
        self.last_fix_time = Some(fix.timestamp);
        self.accuracy = Some(fix.horizontal_accuracy);
        if fix.has_valid_altitude() {
            self.altitude = Some(fix.altitude);
        }
        let recovered = self.status != ProviderStatus::Available;
        self.status = ProviderStatus::Available;
        recovered
    }

    pub fn set_status(&mut self, status: ProviderStatus) {
        self.status = status;
    }

    /// Flip to NoSignal once the fix stream has been quiet too long.
    pub fn check_silence(&mut self, now: f64) -> bool {
        if self.status != ProviderStatus::Available {
            return false;
        }
        let silent = match self.last_fix_time {
            Some(t) => now - t > self.silence_threshold,
            None => false,
        };
        if silent {
            self.status = ProviderStatus::NoSignal;
        }
        silent
    }

    pub fn silence_duration(&self, now: f64) -> Option<f64> {
        self.last_fix_time.map(|t| (now - t).max(0.0))
    }

    pub fn is_ready(&self, accuracy_threshold: f64) -> bool {
        self.status == ProviderStatus::Available
            && self
                .accuracy
                .map(|a| a > 0.0 && a <= accuracy_threshold)
                .unwrap_or(false)
    }

    pub fn accuracy(&self) -> Option<f64> {
        self.accuracy
    }

    pub fn altitude(&self) -> Option<f64> {
        self.altitude
    }

    pub fn status(&self) -> &ProviderStatus {
        &self.status
    }
}

/// Inputs gathered from the pipeline stages for one recompute.
pub struct MetricsInputs<'a> {
    pub session_state: SessionState,
    pub motion_state: MotionState,
    pub smoothed_speed: f64,
    pub total_distance: f64,
    pub elevation_gain: f64,
    pub elevation_loss: f64,
    pub active_duration: f64,
    pub route_points: usize,
    pub health: &'a GpsHealth,
    pub accuracy_threshold: f64,
}

#[derive(Clone, Debug, Default)]
pub struct MetricsReporter {
    snapshot: MetricsSnapshot,
    accepted: u64,
    rejected: u64,
    max_speed: f64,
}

impl MetricsReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn record_accepted(&mut self) {
        self.accepted += 1;
    }

    pub fn record_rejected(&mut self) {
        self.rejected += 1;
    }

    pub fn recompute(&mut self, inputs: MetricsInputs<'_>) -> &MetricsSnapshot {
        let current_speed = match inputs.motion_state {
            MotionState::Stationary => 0.0,
            MotionState::Moving => inputs.smoothed_speed.max(0.0),
        };
        if inputs.session_state == SessionState::Tracking && current_speed > self.max_speed {
            self.max_speed = current_speed;
        }
        self.snapshot = MetricsSnapshot {
            session_state: inputs.session_state,
            motion_state: inputs.motion_state,
            current_speed,
            current_pace: pace_min_per_km(current_speed),
            current_altitude: inputs.health.altitude(),
            accuracy: inputs.health.accuracy(),
            is_gps_ready: inputs.health.is_ready(inputs.accuracy_threshold),
            provider_status: inputs.health.status().clone(),
            total_distance: inputs.total_distance,
            elevation_gain: inputs.elevation_gain,
            elevation_loss: inputs.elevation_loss,
            active_duration: inputs.active_duration,
            max_speed: self.max_speed,
            route_points: inputs.route_points,
            accepted_fixes: self.accepted,
            rejected_fixes: self.rejected,
        };
        &self.snapshot
    }

    pub fn snapshot(&self) -> &MetricsSnapshot {
        &self.snapshot
    }

    pub fn max_speed(&self) -> f64 {
        self.max_speed
    }
}
