use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::config::{ActivityProfile, RouteConfig};
use crate::geodesy::distance_m;
use crate::types::{Coordinate, LocationFix};

/// A fix on the route plus the running distance after it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoutePoint {
    pub fix: LocationFix,
    pub cumulative_distance: f64,
    /// Whether this point was allowed to add distance (false while stationary).
    pub counted: bool,
    pub segment: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AcceptResult {
    pub distance_delta: f64,
    pub total_distance: f64,
    pub smoothed: bool,
}

/// Ordered route, cumulative distance and elevation for one session.
///
/// Distance is measured between "anchors": the (possibly smoothed) position of
/// the last point that counted. Points that do not count leave the anchor where
/// it is; the caller moves it with [`RouteAccumulator::rebase_anchor`] when a
/// stationary stretch ends, so nothing covered inside it is credited.
#[derive(Clone, Debug)]
pub struct RouteAccumulator {
    points: Vec<RoutePoint>,
    history: VecDeque<LocationFix>,
    total_distance: f64,
    elevation_gain: f64,
    elevation_loss: f64,
    distance_anchor: Option<Coordinate>,
    altitude_anchor: Option<f64>,
    segment: usize,
    segment_open: bool,
    config: RouteConfig,
}

impl RouteAccumulator {
    pub fn new(config: RouteConfig) -> Self {
        Self {
            points: Vec::new(),
            history: VecDeque::with_capacity(config.history_len),
            total_distance: 0.0,
            elevation_gain: 0.0,
            elevation_loss: 0.0,
            distance_anchor: None,
            altitude_anchor: None,
            segment: 0,
            segment_open: false,
            config,
        }
    }

    pub fn reset(&mut self) {
        self.points.clear();
        self.history.clear();
        self.total_distance = 0.0;
        self.elevation_gain = 0.0;
        self.elevation_loss = 0.0;
        self.distance_anchor = None;
        self.altitude_anchor = None;
        self.segment = 0;
        self.segment_open = false;
    }

    /// Break the route: the next point starts a new segment with no delta
    /// against anything before it.
    pub fn begin_segment(&mut self) {
        if self.segment_open {
            self.segment += 1;
        }
        self.segment_open = false;
        self.history.clear();
        self.distance_anchor = None;
        self.altitude_anchor = None;
    }

    /// Move the distance and altitude anchors to the last point of the open
    /// segment. Used when a stationary stretch ends.
    pub fn rebase_anchor(&mut self) {
        if !self.segment_open {
            return;
        }
        let Some(last) = self.points.last() else {
            return;
        };
        self.distance_anchor = Some(last.fix.coordinate());
        if last.fix.has_valid_altitude() {
            self.altitude_anchor = Some(last.fix.altitude);
        }
    }

    /// Last point of the current segment, if the segment has any.
    pub fn last_segment_fix(&self) -> Option<&LocationFix> {
        if !self.segment_open {
            return None;
        }
        self.points.last().map(|p| &p.fix)
    }

    /// Minimum-movement gate: far enough OR long enough since the last point.
    pub fn admits(&self, fix: &LocationFix, profile: &ActivityProfile) -> bool {
        match self.last_segment_fix() {
            None => true,
            Some(last) => {
                let moved = distance_m(&last.coordinate(), &fix.coordinate());
                let elapsed = fix.timestamp - last.timestamp;
                moved >= profile.min_distance || elapsed >= profile.min_interval
            }
        }
    }

    /// Fold a fix into the route. `None` when the movement gate holds it back.
    pub fn accept(
        &mut self,
        fix: &LocationFix,
        profile: &ActivityProfile,
        counts_distance: bool,
    ) -> Option<AcceptResult> {
        if !self.admits(fix, profile) {
            return None;
        }

        self.history.push_back(fix.clone());
        while self.history.len() > self.config.history_len {
            self.history.pop_front();
        }

        let smoothed = fix.horizontal_accuracy > self.config.smoothing_accuracy_threshold
            && self.history.len() > 1;
        let position = if smoothed {
            self.weighted_recent_position()
        } else {
            fix.coordinate()
        };

        let mut delta = 0.0;
        if counts_distance {
            if let Some(anchor) = self.distance_anchor {
                delta = distance_m(&anchor, &position);
            }
            self.distance_anchor = Some(position);

            if fix.has_valid_altitude() {
                if let Some(prev_alt) = self.altitude_anchor {
                    let climb = fix.altitude - prev_alt;
                    if climb > 0.0 {
                        self.elevation_gain += climb;
                    } else {
                        self.elevation_loss -= climb;
                    }
                }
                self.altitude_anchor = Some(fix.altitude);
            }
        } else if self.distance_anchor.is_none() {
            // First point of a segment sets the anchors even while stationary.
            self.distance_anchor = Some(position);
            if fix.has_valid_altitude() {
                self.altitude_anchor = Some(fix.altitude);
            }
        }

        self.total_distance += delta;
        self.segment_open = true;
        self.points.push(RoutePoint {
            fix: fix.clone(),
            cumulative_distance: self.total_distance,
            counted: counts_distance,
            segment: self.segment,
        });

        Some(AcceptResult {
            distance_delta: delta,
            total_distance: self.total_distance,
            smoothed,
        })
    }

    /// Recency-weighted mean of the newest history entries (newest weighs most).
    fn weighted_recent_position(&self) -> Coordinate {
        let n = self.config.smoothing_window.min(self.history.len());
        let mut lat = 0.0;
        let mut lon = 0.0;
        let mut total_weight = 0.0;
        for (i, fix) in self.history.iter().rev().take(n).enumerate() {
            let w = (n - i) as f64;
            lat += fix.latitude * w;
            lon += fix.longitude * w;
            total_weight += w;
        }
        Coordinate::new(lat / total_weight, lon / total_weight)
    }

    pub fn points(&self) -> &[RoutePoint] {
        &self.points
    }

    pub fn fixes(&self) -> Vec<LocationFix> {
        self.points.iter().map(|p| p.fix.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn total_distance(&self) -> f64 {
        self.total_distance
    }

    pub fn elevation_gain(&self) -> f64 {
        self.elevation_gain
    }

    pub fn elevation_loss(&self) -> f64 {
        self.elevation_loss
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}
