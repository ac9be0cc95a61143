use serde::{Deserialize, Serialize};

use crate::config::ActivityProfile;
use crate::types::LocationFix;

/// Why a fix was kept out of the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    Stale,
    BadAccuracy,
    SpeedOutlier,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected(RejectReason),
}

/// Stateless gate on fix age and horizontal accuracy.
#[derive(Clone, Debug)]
pub struct FixValidator {
    max_age_secs: f64,
}

impl FixValidator {
    pub fn new(max_age_secs: f64) -> Self {
        Self { max_age_secs }
    }

    /// Checks run in order, first failure wins.
    pub fn validate(&self, fix: &LocationFix, profile: &ActivityProfile, now: f64) -> Verdict {
        if now - fix.timestamp >= self.max_age_secs {
            return Verdict::Rejected(RejectReason::Stale);
        }
        // NaN accuracy fails both comparisons, so test the accepting range instead
        let acc = fix.horizontal_accuracy;
        if !(acc > 0.0 && acc <= profile.accuracy_threshold) {
            return Verdict::Rejected(RejectReason::BadAccuracy);
        }
        Verdict::Accepted
    }
}

impl Default for FixValidator {
    fn default() -> Self {
        Self::new(5.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ActivityKind;

    fn running() -> ActivityProfile {
        ActivityProfile::for_activity(ActivityKind::Running)
    }

    #[test]
    fn test_accepts_fresh_accurate_fix() {
        let fix = LocationFix::new(100.0, 32.2, -110.9, 5.0);
        assert_eq!(FixValidator::default().validate(&fix, &running(), 100.5), Verdict::Accepted);
    }

    #[test]
    fn test_stale_boundary() {
        let v = FixValidator::default();
        let fix = LocationFix::new(100.0, 32.2, -110.9, 5.0);
        assert_eq!(v.validate(&fix, &running(), 104.99), Verdict::Accepted);
        assert_eq!(v.validate(&fix, &running(), 105.0), Verdict::Rejected(RejectReason::Stale));
    }

    #[test]
    fn test_stale_checked_before_accuracy() {
        let fix = LocationFix::new(0.0, 32.2, -110.9, 500.0);
        assert_eq!(
            FixValidator::default().validate(&fix, &running(), 60.0),
            Verdict::Rejected(RejectReason::Stale)
        );
    }

    #[test]
    fn test_bad_accuracy() {
        let v = FixValidator::default();
        for acc in [0.0, -1.0, 10.01, 50.0, f64::NAN] {
            let fix = LocationFix::new(1.0, 32.2, -110.9, acc);
            assert_eq!(
                v.validate(&fix, &running(), 1.0),
                Verdict::Rejected(RejectReason::BadAccuracy),
                "accuracy {}",
                acc
            );
        }
        let edge = LocationFix::new(1.0, 32.2, -110.9, 10.0);
        assert_eq!(v.validate(&edge, &running(), 1.0), Verdict::Accepted);
    }

    #[test]
    fn test_deterministic() {
        let v = FixValidator::default();
        let fix = LocationFix::new(10.0, 32.2, -110.9, 12.0);
        let first = v.validate(&fix, &running(), 11.0);
        for _ in 0..10 {
            assert_eq!(v.validate(&fix, &running(), 11.0), first);
        }
    }
}
