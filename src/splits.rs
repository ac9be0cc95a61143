use serde::{Deserialize, Serialize};

use crate::metrics::pace_min_per_km;
use crate::route::RoutePoint;

pub const SPLIT_DISTANCE_M: f64 = 1000.0;

/// One completed (or trailing partial) kilometre.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Split {
    pub index: usize,
    pub distance_m: f64,
    pub duration_secs: f64,
    pub pace_min_per_km: f64,
    pub elevation_gain_m: f64,
}

/// Split the route into fixed-distance pieces.
///
/// Time only accrues between points of the same segment, so paused spans are
/// excluded. Boundary crossings are interpolated linearly inside a step. The
/// trailing partial split is included when it holds any distance.
pub fn compute_splits(points: &[RoutePoint], split_distance: f64) -> Vec<Split> {
    let mut splits = Vec::new();
    if split_distance <= 0.0 {
        return splits;
    }

    let mut split_start_distance = 0.0;
    let mut split_time = 0.0;
    let mut split_gain = 0.0;

    for pair in points.windows(2) {
        let (prev, curr) = (&pair[0], &pair[1]);
        if prev.segment != curr.segment {
            continue;
        }
        let dt = (curr.fix.timestamp - prev.fix.timestamp).max(0.0);
        let step = curr.cumulative_distance - prev.cumulative_distance;
        let climb = if curr.counted && curr.fix.has_valid_altitude() && prev.fix.has_valid_altitude() {
            (curr.fix.altitude - prev.fix.altitude).max(0.0)
        } else {
            0.0
        };

        let mut covered = prev.cumulative_distance;
        let mut remaining_time = dt;
        let mut remaining_climb = climb;
        while step > 0.0 && curr.cumulative_distance - split_start_distance >= split_distance {
            let boundary = split_start_distance + split_distance;
            let fraction = ((boundary - covered) / (curr.cumulative_distance - covered)).clamp(0.0, 1.0);
            let time_part = remaining_time * fraction;
            let climb_part = remaining_climb * fraction;
            split_time += time_part;
            split_gain += climb_part;
            splits.push(Split {
                index: splits.len(),
                distance_m: split_distance,
                duration_secs: split_time,
                pace_min_per_km: pace_for(split_distance, split_time),
                elevation_gain_m: split_gain,
            });
            remaining_time -= time_part;
            remaining_climb -= climb_part;
            covered = boundary;
            split_start_distance = boundary;
            split_time = 0.0;
            split_gain = 0.0;
        }
        split_time += remaining_time;
        split_gain += remaining_climb;
    }

    let tail = points
        .last()
        .map(|p| p.cumulative_distance - split_start_distance)
        .unwrap_or(0.0);
    if tail > 0.0 {
        splits.push(Split {
            index: splits.len(),
            distance_m: tail,
            duration_secs: split_time,
            pace_min_per_km: pace_for(tail, split_time),
            elevation_gain_m: split_gain,
        });
    }
    splits
}

fn pace_for(distance_m: f64, duration_secs: f64) -> f64 {
    if duration_secs <= 0.0 {
        return 0.0;
    }
    pace_min_per_km(distance_m / duration_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LocationFix;
    use approx::assert_abs_diff_eq;

    fn point(t: f64, cumulative: f64, segment: usize) -> RoutePoint {
        RoutePoint {
            fix: LocationFix::new(t, 0.0, 0.0, 5.0),
            cumulative_distance: cumulative,
            counted: true,
            segment,
        }
    }

    #[test]
    fn test_even_pace_two_and_a_half_km() {
        // 2500 m at 4 m/s
        let points: Vec<RoutePoint> = (0..=25).map(|i| point(i as f64 * 25.0, i as f64 * 100.0, 0)).collect();
        let splits = compute_splits(&points, SPLIT_DISTANCE_M);
        assert_eq!(splits.len(), 3);
        assert_abs_diff_eq!(splits[0].duration_secs, 250.0, epsilon = 1e-9);
        assert_abs_diff_eq!(splits[1].duration_secs, 250.0, epsilon = 1e-9);
        assert_abs_diff_eq!(splits[2].distance_m, 500.0, epsilon = 1e-9);
        assert_abs_diff_eq!(splits[2].duration_secs, 125.0, epsilon = 1e-9);
        assert_abs_diff_eq!(splits[0].pace_min_per_km, 1000.0 / 4.0 / 60.0, epsilon = 1e-9);
    }

    #[test]
    fn test_boundary_inside_step_is_interpolated() {
        let points = vec![point(0.0, 0.0, 0), point(100.0, 900.0, 0), point(150.0, 1100.0, 0)];
        let splits = compute_splits(&points, SPLIT_DISTANCE_M);
        assert_eq!(splits.len(), 2);
        // 100 of the last 200 m falls in split 0 → half of 50 s
        assert_abs_diff_eq!(splits[0].duration_secs, 125.0, epsilon = 1e-9);
        assert_abs_diff_eq!(splits[1].duration_secs, 25.0, epsilon = 1e-9);
    }

    #[test]
    fn test_pause_gap_excluded() {
        let points = vec![
            point(0.0, 0.0, 0),
            point(200.0, 500.0, 0),
            point(5000.0, 500.0, 1),
            point(5200.0, 1000.0, 1),
        ];
        let splits = compute_splits(&points, SPLIT_DISTANCE_M);
        assert_eq!(splits.len(), 1);
        assert_abs_diff_eq!(splits[0].duration_secs, 400.0, epsilon = 1e-9);
    }

    #[test]
    fn test_empty_route() {
        assert!(compute_splits(&[], SPLIT_DISTANCE_M).is_empty());
    }
}
