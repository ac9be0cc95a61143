//! GPS workout tracking core.
//!
//! Raw location fixes flow through [`tracker::WorkoutTracker`]: validation,
//! scalar Kalman speed smoothing, stationary detection and route accumulation,
//! gated by the start/pause/resume/stop timeline. Platform location and
//! health-store APIs sit behind the traits in [`provider`].

pub mod config;
pub mod error;
pub mod filters;
pub mod geodesy;
pub mod metrics;
pub mod motion;
pub mod provider;
pub mod route;
pub mod splits;
pub mod summary;
pub mod timeline;
pub mod tracker;
pub mod types;


pub use config::{ActivityProfile, StationaryPolicy, TrackerConfig};
pub use error::{TrackerError, TrackerResult};
pub use metrics::MetricsSnapshot;
pub use motion::MotionState;
pub use provider::{HealthDataSink, LocationProvider, ProviderStatus};
pub use summary::WorkoutSummary;
pub use timeline::SessionState;
pub use tracker::{FixOutcome, SharedTracker, WorkoutTracker};
pub use types::{ActivityKind, LocationFix};
