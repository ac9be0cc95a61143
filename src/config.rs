//! Tracker configuration.
//!
//! Every threshold the pipeline uses lives here with a field-tuned default.
//! None of them are derived values; they are meant to be overridden from a
//! JSON file when a device or activity needs different behaviour.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{TrackerError, TrackerResult};
use crate::types::ActivityKind;

// ─── Activity profile ────────────────────────────────────────────────────────

/// Per-activity thresholds. Exactly one is active per session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActivityProfile {
    pub kind: ActivityKind,
    /// Smoothed or implied speed above this is an outlier (m/s).
    pub max_speed: f64,
    /// Fixes with horizontal accuracy worse than this are rejected (m).
    pub accuracy_threshold: f64,
    /// Minimum distance between route points (m).
    pub min_distance: f64,
    /// Minimum time between route points (s).
    pub min_interval: f64,
}

impl ActivityProfile {
    pub fn for_activity(kind: ActivityKind) -> Self {
        match kind {
            ActivityKind::Running => Self {
                kind,
                max_speed: 8.0,
                accuracy_threshold: 10.0,
                min_distance: 3.0,
                min_interval: 1.0,
            },
            ActivityKind::Walking => Self {
                kind,
                max_speed: 4.0,
                accuracy_threshold: 10.0,
                min_distance: 2.0,
                min_interval: 1.0,
            },
            ActivityKind::Cycling => Self {
                kind,
                max_speed: 20.0,
                accuracy_threshold: 15.0,
                min_distance: 5.0,
                min_interval: 1.0,
            },
        }
    }
}

/// Optional overrides applied on top of [`ActivityProfile::for_activity`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileOverrides {
    pub max_speed: Option<f64>,
    pub accuracy_threshold: Option<f64>,
    pub min_distance: Option<f64>,
    pub min_interval: Option<f64>,
}

// ─── Stage configs ───────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    pub process_noise: f64,
    pub measurement_noise: f64,
    /// Reported speed is trusted only when its accuracy is below this (m/s).
    pub reported_speed_accuracy_threshold: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            process_noise: 0.5,
            measurement_noise: 0.5,
            reported_speed_accuracy_threshold: 5.0,
        }
    }
}

/// What a detected stationary period does to distance accumulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationaryPolicy {
    /// Fixes are still drawn on the route but add no distance or elevation.
    FreezeDistance,
    /// Stationary is reported (speed and pace read zero) but distance keeps accumulating.
    LogOnly,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Smoothed speed at or below this starts the dwell timer (m/s).
    pub stop_speed: f64,
    /// Smoothed speed above this ends a stationary period immediately (m/s).
    pub resume_speed: f64,
    /// Continuous low-speed time before declaring stationary (s).
    pub dwell_secs: f64,
    pub policy: StationaryPolicy,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            stop_speed: 0.3,
            resume_speed: 0.8,
            dwell_secs: 30.0,
            policy: StationaryPolicy::FreezeDistance,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Recent fixes kept for positional smoothing.
    pub history_len: usize,
    /// Fixes less accurate than this get a smoothed position (m).
    pub smoothing_accuracy_threshold: f64,
    /// History entries blended into a smoothed position.
    pub smoothing_window: usize,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            history_len: 10,
            smoothing_accuracy_threshold: 5.0,
            smoothing_window: 3,
        }
    }
}

// ─── Top level ───────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub activity: ActivityKind,
    pub overrides: ProfileOverrides,
    pub estimator: EstimatorConfig,
    pub motion: MotionConfig,
    pub route: RouteConfig,
    /// Fixes at least this old when delivered are stale (s).
    pub max_fix_age_secs: f64,
    /// No raw fix for this long marks GPS as not ready (s).
    pub gps_silence_secs: f64,
    pub body_mass_kg: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            activity: ActivityKind::Running,
            overrides: ProfileOverrides::default(),
            estimator: EstimatorConfig::default(),
            motion: MotionConfig::default(),
            route: RouteConfig::default(),
            max_fix_age_secs: 5.0,
            gps_silence_secs: 10.0,
            body_mass_kg: 70.0,
        }
    }
}

impl TrackerConfig {
    pub fn for_activity(activity: ActivityKind) -> Self {
        Self {
            activity,
            ..Self::default()
        }
    }

    /// Load and validate a JSON config. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> TrackerResult<Self> {
        let text = fs::read_to_string(path)?;
        let config: TrackerConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Profile for `kind` with this config's overrides applied.
    pub fn profile_for(&self, kind: ActivityKind) -> ActivityProfile {
        let mut profile = ActivityProfile::for_activity(kind);
        let o = &self.overrides;
        if let Some(v) = o.max_speed {
            profile.max_speed = v;
        }
        if let Some(v) = o.accuracy_threshold {
            profile.accuracy_threshold = v;
        }
        if let Some(v) = o.min_distance {
            profile.min_distance = v;
        }
        if let Some(v) = o.min_interval {
            profile.min_interval = v;
        }
        profile
    }

    pub fn profile(&self) -> ActivityProfile {
        self.profile_for(self.activity)
    }

    pub fn validate(&self) -> TrackerResult<()> {
        let est = &self.estimator;
        if est.process_noise <= 0.0 || est.measurement_noise <= 0.0 {
            return Err(TrackerError::InvalidConfig(
                "estimator noise terms must be positive".to_string(),
            ));
        }
        let motion = &self.motion;
        if motion.stop_speed < 0.0 || motion.resume_speed <= motion.stop_speed {
            return Err(TrackerError::InvalidConfig(format!(
                "resume_speed ({}) must exceed stop_speed ({})",
                motion.resume_speed, motion.stop_speed
            )));
        }
        if motion.dwell_secs < 0.0 {
            return Err(TrackerError::InvalidConfig("dwell_secs must not be negative".to_string()));
        }
        if self.route.history_len == 0 || self.route.smoothing_window == 0 {
            return Err(TrackerError::InvalidConfig(
                "route history and smoothing window must be non-empty".to_string(),
            ));
        }
        let profile = self.profile();
        if profile.max_speed <= 0.0 || profile.accuracy_threshold <= 0.0 {
            return Err(TrackerError::InvalidConfig(
                "max_speed and accuracy_threshold must be positive".to_string(),
            ));
        }
        if self.max_fix_age_secs <= 0.0 || self.body_mass_kg <= 0.0 {
            return Err(TrackerError::InvalidConfig(
                "max_fix_age_secs and body_mass_kg must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
