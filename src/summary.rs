use serde::{Deserialize, Serialize};

use crate::metrics::pace_min_per_km;
use crate::route::RouteAccumulator;
use crate::splits::{compute_splits, Split, SPLIT_DISTANCE_M};
use crate::timeline::WorkoutTimeline;
use crate::types::{ActivityKind, LocationFix};

/// Finished-workout record handed to a health data sink.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSummary {
    pub session_id: String,
    pub activity: ActivityKind,
    /// RFC 3339
    pub start_time: Option<String>,
    pub start_timestamp: f64,
    pub end_timestamp: f64,
    pub active_duration: f64,
    pub total_distance: f64,
    pub elevation_gain: f64,
    pub elevation_loss: f64,
    pub average_speed: f64,
    pub average_pace: f64,
    pub max_speed: f64,
    pub estimated_calories: f64,
    pub splits: Vec<Split>,
    pub route: Vec<LocationFix>,
}

/// kcal = MET × kg × hours
pub fn estimate_calories(activity: ActivityKind, body_mass_kg: f64, active_secs: f64) -> f64 {
    activity.met() * body_mass_kg * (active_secs.max(0.0) / 3600.0)
}

pub struct SummaryInputs<'a> {
    pub activity: ActivityKind,
    pub timeline: &'a WorkoutTimeline,
    pub route: &'a RouteAccumulator,
    pub max_speed: f64,
    pub body_mass_kg: f64,
    pub end: f64,
}

impl WorkoutSummary {
    pub fn build(inputs: SummaryInputs<'_>) -> Self {
        let SummaryInputs {
            activity,
            timeline,
            route,
            max_speed,
            body_mass_kg,
            end,
        } = inputs;

        let active_duration = timeline.active_duration(end);
        let total_distance = route.total_distance();
        let average_speed = if active_duration > 0.0 {
            total_distance / active_duration
        } else {
            0.0
        };

        Self {
            session_id: timeline.session_id().unwrap_or("session_unknown").to_string(),
            activity,
            start_time: timeline.start_time_rfc3339(),
            start_timestamp: timeline.start_time().unwrap_or(end),
            end_timestamp: end,
            active_duration,
            total_distance,
            elevation_gain: route.elevation_gain(),
            elevation_loss: route.elevation_loss(),
            average_speed,
            average_pace: pace_min_per_km(average_speed),
            max_speed,
            estimated_calories: estimate_calories(activity, body_mass_kg, active_duration),
            splits: compute_splits(route.points(), SPLIT_DISTANCE_M),
            route: route.fixes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ActivityProfile, RouteConfig};
    use crate::geodesy::offset_m;
    use crate::types::Coordinate;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_calories_per_activity() {
        // 1 h at 70 kg
        assert_abs_diff_eq!(estimate_calories(ActivityKind::Running, 70.0, 3600.0), 686.0, epsilon = 1e-9);
        assert_abs_diff_eq!(estimate_calories(ActivityKind::Walking, 70.0, 3600.0), 245.0, epsilon = 1e-9);
        assert_abs_diff_eq!(estimate_calories(ActivityKind::Cycling, 70.0, 1800.0), 262.5, epsilon = 1e-9);
        assert_eq!(estimate_calories(ActivityKind::Running, 70.0, -5.0), 0.0);
    }

    #[test]
    fn test_build_summary() {
        let origin = Coordinate::new(32.2226, -110.9747);
        let profile = ActivityProfile::for_activity(ActivityKind::Running);
        let mut timeline = WorkoutTimeline::new();
        let mut route = RouteAccumulator::new(RouteConfig::default());
        timeline.start(0.0);
        for i in 0..=10 {
            let c = offset_m(&origin, i as f64 * 10.0, 0.0);
            route.accept(&LocationFix::new(i as f64 * 4.0, c.latitude, c.longitude, 4.0), &profile, true);
        }
        timeline.stop(40.0);

        let summary = WorkoutSummary::build(SummaryInputs {
            activity: ActivityKind::Running,
            timeline: &timeline,
            route: &route,
            max_speed: 2.6,
            body_mass_kg: 70.0,
            end: 40.0,
        });
        assert_eq!(summary.session_id, "session_0");
        assert_eq!(summary.route.len(), 11);
        assert_abs_diff_eq!(summary.total_distance, 100.0, epsilon = 0.1);
        assert_abs_diff_eq!(summary.average_speed, 2.5, epsilon = 0.01);
        assert_eq!(summary.splits.len(), 1);
        assert_eq!(summary.max_speed, 2.6);
    }
}
