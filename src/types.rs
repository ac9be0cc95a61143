use serde::{Deserialize, Serialize};
use std::fmt;

/// Latitude/longitude pair in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// One raw position sample from the platform location provider.
///
/// Negative `reported_speed`, `speed_accuracy` or `vertical_accuracy` follow the
/// platform convention of "not available".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub timestamp: f64,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude: f64,
    pub horizontal_accuracy: f64,
    #[serde(default = "unavailable")]
    pub vertical_accuracy: f64,
    #[serde(default = "unavailable")]
    pub reported_speed: f64,
    #[serde(default = "unavailable")]
    pub speed_accuracy: f64,
}

fn unavailable() -> f64 {
    -1.0
}

impl LocationFix {
    /// Fix with position and horizontal accuracy only; altitude and speed unavailable.
    pub fn new(timestamp: f64, latitude: f64, longitude: f64, horizontal_accuracy: f64) -> Self {
        Self {
            timestamp,
            latitude,
            longitude,
            altitude: 0.0,
            horizontal_accuracy,
            vertical_accuracy: -1.0,
            reported_speed: -1.0,
            speed_accuracy: -1.0,
        }
    }

    pub fn with_altitude(mut self, altitude: f64, vertical_accuracy: f64) -> Self {
        self.altitude = altitude;
        self.vertical_accuracy = vertical_accuracy;
        self
    }

    pub fn with_speed(mut self, reported_speed: f64, speed_accuracy: f64) -> Self {
        self.reported_speed = reported_speed;
        self.speed_accuracy = speed_accuracy;
        self
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    pub fn has_valid_altitude(&self) -> bool {
        self.vertical_accuracy > 0.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Running,
    Walking,
    Cycling,
}

impl ActivityKind {
    /// Metabolic equivalent used for the calorie estimate.
    pub fn met(&self) -> f64 {
        match self {
            ActivityKind::Running => 9.8,
            ActivityKind::Walking => 3.5,
            ActivityKind::Cycling => 7.5,
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActivityKind::Running => "running",
            ActivityKind::Walking => "walking",
            ActivityKind::Cycling => "cycling",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for ActivityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "running" | "run" => Ok(ActivityKind::Running),
            "walking" | "walk" => Ok(ActivityKind::Walking),
            "cycling" | "bike" | "ride" => Ok(ActivityKind::Cycling),
            other => Err(format!("unknown activity '{}'", other)),
        }
    }
}
