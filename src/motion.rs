//! Moving / Stationary detection over smoothed speed.
//!
//! Moving → Stationary needs the speed to stay at or below `stop_speed` for a
//! full dwell period. Stationary → Moving happens on the first sample above
//! `resume_speed`. The gap between the two thresholds is the hysteresis band.

use serde::{Deserialize, Serialize};

use crate::config::MotionConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionState {
    Moving,
    Stationary,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MotionTransition {
    BecameStationary { at: f64, dwell_secs: f64 },
    ResumedMoving { at: f64, speed: f64 },
}

#[derive(Clone, Debug)]
pub struct MotionStateTracker {
    state: MotionState,
    /// Start of the current low-speed run while Moving.
    low_speed_since: Option<f64>,
    stationary_since: Option<f64>,
    stop_speed: f64,
    resume_speed: f64,
    dwell_secs: f64,
}

impl MotionStateTracker {
    pub fn new(config: &MotionConfig) -> Self {
        Self {
            state: MotionState::Moving,
            low_speed_since: None,
            stationary_since: None,
            stop_speed: config.stop_speed,
            resume_speed: config.resume_speed,
            dwell_secs: config.dwell_secs,
        }
    }

    pub fn update(&mut self, smoothed_speed: f64, timestamp: f64) -> Option<MotionTransition> {
        match self.state {
            MotionState::Moving => {
                if smoothed_speed > self.stop_speed {
                    self.low_speed_since = None;
                    return None;
                }
                let since = *self.low_speed_since.get_or_insert(timestamp);
                let dwell = timestamp - since;
                if dwell >= self.dwell_secs {
                    self.state = MotionState::Stationary;
                    self.stationary_since = Some(timestamp);
                    log::info!("[MOTION] stationary after {:.1}s below {:.2} m/s", dwell, self.stop_speed);
                    return Some(MotionTransition::BecameStationary {
                        at: timestamp,
                        dwell_secs: dwell,
                    });
                }
                None
            }
            MotionState::Stationary => {
                if smoothed_speed > self.resume_speed {
                    self.state = MotionState::Moving;
                    self.low_speed_since = None;
                    self.stationary_since = None;
                    log::info!("[MOTION] moving again at {:.2} m/s", smoothed_speed);
                    return Some(MotionTransition::ResumedMoving {
                        at: timestamp,
                        speed: smoothed_speed,
                    });
                }
                None
            }
        }
    }

    pub fn reset(&mut self) {
        self.state = MotionState::Moving;
        self.low_speed_since = None;
        self.stationary_since = None;
    }

    /// Drop a partial dwell run; used when the fix stream is interrupted.
    pub fn clear_dwell(&mut self) {
        self.low_speed_since = None;
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn is_stationary(&self) -> bool {
        self.state == MotionState::Stationary
    }

    pub fn stationary_since(&self) -> Option<f64> {
        self.stationary_since
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(dwell: f64) -> MotionStateTracker {
        MotionStateTracker::new(&MotionConfig {
            stop_speed: 0.3,
            resume_speed: 0.8,
            dwell_secs: dwell,
            ..MotionConfig::default()
        })
    }

    #[test]
    fn test_starts_moving() {
        let t = tracker(30.0);
        assert_eq!(t.state(), MotionState::Moving);
        assert!(t.stationary_since().is_none());
    }

    #[test]
    fn test_no_stationary_before_dwell() {
        let mut t = tracker(30.0);
        for s in 0..30 {
            assert!(t.update(0.0, s as f64).is_none());
            assert_eq!(t.state(), MotionState::Moving);
        }
        let transition = t.update(0.0, 30.0);
        assert!(matches!(transition, Some(MotionTransition::BecameStationary { .. })));
        assert_eq!(t.stationary_since(), Some(30.0));
    }

    #[test]
    fn test_brief_slowdown_resets_dwell() {
        let mut t = tracker(10.0);
        for s in 0..8 {
            t.update(0.1, s as f64);
        }
        t.update(2.0, 8.0);
        for s in 9..18 {
            t.update(0.1, s as f64);
        }
        assert_eq!(t.state(), MotionState::Moving);
        t.update(0.1, 19.0);
        assert_eq!(t.state(), MotionState::Stationary);
    }

    #[test]
    fn test_hysteresis_band_holds_stationary() {
        let mut t = tracker(0.0);
        t.update(0.0, 0.0);
        assert!(t.is_stationary());
        for (i, s) in [0.4, 0.79, 0.8, 0.5].iter().enumerate() {
            assert!(t.update(*s, 1.0 + i as f64).is_none());
            assert!(t.is_stationary());
        }
        assert!(matches!(
            t.update(0.81, 10.0),
            Some(MotionTransition::ResumedMoving { .. })
        ));
        assert_eq!(t.state(), MotionState::Moving);
    }

    #[test]
    fn test_never_stationary_above_stop_speed() {
        let mut t = tracker(5.0);
        for s in 0..100 {
            t.update(0.31, s as f64);
        }
        assert_eq!(t.state(), MotionState::Moving);
    }

    #[test]
    fn test_reset() {
        let mut t = tracker(0.0);
        t.update(0.0, 0.0);
        t.reset();
        assert_eq!(t.state(), MotionState::Moving);
        assert!(t.stationary_since().is_none());
    }
}
