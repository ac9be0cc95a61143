use serde::{Deserialize, Serialize};

use crate::config::EstimatorConfig;
use crate::geodesy::distance_m;
use crate::types::LocationFix;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EstimatorState {
    pub speed: f64,
    pub variance: f64,
}

impl EstimatorState {
    pub const INITIAL: EstimatorState = EstimatorState {
        speed: 0.0,
        variance: 1.0,
    };
}

impl Default for EstimatorState {
    fn default() -> Self {
        Self::INITIAL
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedSource {
    Reported,
    Derived,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeasuredSpeed {
    pub value: f64,
    pub source: SpeedSource,
}

/// Pick the speed measurement for `fix`.
///
/// Platform speed wins when it is valid and its accuracy is tight; otherwise
/// fall back to distance over time from the previous accepted fix. `None` when
/// neither is available (first fix of a segment without reported speed).
pub fn select_measured_speed(
    fix: &LocationFix,
    previous: Option<&LocationFix>,
    accuracy_threshold: f64,
) -> Option<MeasuredSpeed> {
    if fix.reported_speed >= 0.0
        && fix.speed_accuracy >= 0.0
        && fix.speed_accuracy < accuracy_threshold
    {
        return Some(MeasuredSpeed {
            value: fix.reported_speed,
            source: SpeedSource::Reported,
        });
    }
    implied_speed(fix, previous).map(|value| MeasuredSpeed {
        value,
        source: SpeedSource::Derived,
    })
}

/// Distance over time between two fixes, if time moved forward.
pub fn implied_speed(fix: &LocationFix, previous: Option<&LocationFix>) -> Option<f64> {
    let prev = previous?;
    let dt = fix.timestamp - prev.timestamp;
    if dt <= 0.0 {
        return None;
    }
    Some(distance_m(&prev.coordinate(), &fix.coordinate()) / dt)
}

/// Uncommitted result of one filter step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpeedProposal {
    pub state: EstimatorState,
    pub gain: f64,
}

impl SpeedProposal {
    pub fn smoothed_speed(&self) -> f64 {
        self.state.speed
    }
}

/// Scalar Kalman filter over speed.
///
/// `propose` computes the next state without touching the filter so an
/// outlier can be dropped; `commit` makes it current.
#[derive(Clone, Debug)]
pub struct SpeedEstimator {
    state: EstimatorState,
    process_noise: f64,
    measurement_noise: f64,
    updates: u64,
}

impl SpeedEstimator {
    pub fn new(config: &EstimatorConfig) -> Self {
        Self {
            state: EstimatorState::INITIAL,
            process_noise: config.process_noise,
            measurement_noise: config.measurement_noise,
            updates: 0,
        }
    }

    pub fn propose(&self, measured: f64) -> SpeedProposal {
        let predicted_variance = self.state.variance + self.process_noise;
        let gain = predicted_variance / (predicted_variance + self.measurement_noise);
        let speed = self.state.speed + gain * (measured - self.state.speed);
        let variance = (1.0 - gain) * predicted_variance;
        SpeedProposal {
            state: EstimatorState { speed, variance },
            gain,
        }
    }

    pub fn commit(&mut self, proposal: SpeedProposal) {
        self.state = proposal.state;
        self.updates += 1;
    }

    /// Propose and commit in one step.
    pub fn update(&mut self, measured: f64) -> f64 {
        let proposal = self.propose(measured);
        self.commit(proposal);
        self.state.speed
    }

    pub fn reset(&mut self) {
        self.state = EstimatorState::INITIAL;
        self.updates = 0;
    }

    pub fn state(&self) -> EstimatorState {
        self.state
    }

    pub fn smoothed_speed(&self) -> f64 {
        self.state.speed
    }

    pub fn update_count(&self) -> u64 {
        self.updates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn estimator() -> SpeedEstimator {
        SpeedEstimator::new(&EstimatorConfig::default())
    }

    #[test]
    fn test_step_converges_within_five_updates() {
        let mut est = estimator();
        let mut speed = 0.0;
        for _ in 0..5 {
            speed = est.update(5.0);
        }
        assert!((speed - 5.0).abs() < 0.1, "speed after 5 updates: {}", speed);
    }

    #[test]
    fn test_no_overshoot_on_step() {
        let mut est = estimator();
        for _ in 0..50 {
            let s = est.update(5.0);
            assert!(s <= 5.0 + 1e-9);
        }
    }

    #[test]
    fn test_variance_bounded_positive() {
        let mut est = estimator();
        for i in 0..200 {
            est.update((i % 7) as f64);
            let v = est.state().variance;
            assert!(v > 0.0 && v < 1.0 + 0.5);
        }
    }

    #[test]
    fn test_propose_does_not_mutate() {
        let mut est = estimator();
        est.update(3.0);
        let before = est.state();
        let proposal = est.propose(30.0);
        assert!(proposal.smoothed_speed() > before.speed);
        assert_eq!(est.state(), before);
        assert_eq!(est.update_count(), 1);
    }

    #[test]
    fn test_first_gain() {
        // p = 1 + 0.5, k = 1.5 / 2.0
        let est = estimator();
        let proposal = est.propose(4.0);
        assert_abs_diff_eq!(proposal.gain, 0.75, epsilon = 1e-12);
        assert_abs_diff_eq!(proposal.smoothed_speed(), 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(proposal.state.variance, 0.375, epsilon = 1e-12);
    }

    #[test]
    fn test_reset() {
        let mut est = estimator();
        est.update(4.0);
        est.reset();
        assert_eq!(est.state(), EstimatorState::INITIAL);
    }

    #[test]
    fn test_selects_reported_speed_when_accurate() {
        let prev = LocationFix::new(0.0, 32.2, -110.9, 5.0);
        let fix = LocationFix::new(1.0, 32.2, -110.9, 5.0).with_speed(3.2, 0.5);
        let m = select_measured_speed(&fix, Some(&prev), 5.0).unwrap();
        assert_eq!(m.source, SpeedSource::Reported);
        assert_eq!(m.value, 3.2);
    }

    #[test]
    fn test_falls_back_to_derived() {
        let prev = LocationFix::new(0.0, 32.2, -110.9, 5.0);
        let moved = crate::geodesy::offset_m(&prev.coordinate(), 10.0, 0.0);
        let invalid = LocationFix::new(2.0, moved.latitude, moved.longitude, 5.0).with_speed(-1.0, 0.5);
        let m = select_measured_speed(&invalid, Some(&prev), 5.0).unwrap();
        assert_eq!(m.source, SpeedSource::Derived);
        assert_abs_diff_eq!(m.value, 5.0, epsilon = 0.01);

        let low_confidence = invalid.clone().with_speed(4.0, 7.0);
        let m = select_measured_speed(&low_confidence, Some(&prev), 5.0).unwrap();
        assert_eq!(m.source, SpeedSource::Derived);
    }

    #[test]
    fn test_no_measurement_without_history() {
        let fix = LocationFix::new(1.0, 32.2, -110.9, 5.0);
        assert!(select_measured_speed(&fix, None, 5.0).is_none());
    }
}
