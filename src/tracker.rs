//! Workout tracker: runs each raw fix through validation, speed estimation,
//! motion detection and route accumulation, gated by the session timeline.
//!
//! Pure computation. The caller supplies "now" with every call, so live
//! adapters and recorded replays drive it the same way.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::{ActivityProfile, StationaryPolicy, TrackerConfig};
use crate::error::{TrackerError, TrackerResult};
use crate::filters::speed_kalman::{implied_speed, select_measured_speed};
use crate::filters::{EstimatorState, FixValidator, RejectReason, SpeedEstimator, SpeedSource, Verdict};
use crate::metrics::{GpsHealth, MetricsInputs, MetricsReporter, MetricsSnapshot};
use crate::motion::{MotionState, MotionStateTracker, MotionTransition};
use crate::provider::ProviderStatus;
use crate::route::RouteAccumulator;
use crate::summary::{SummaryInputs, WorkoutSummary};
use crate::timeline::{SessionState, WorkoutTimeline};
use crate::types::{ActivityKind, LocationFix};

pub type MetricsListener = Box<dyn FnMut(&MetricsSnapshot) + Send>;

/// Why a fix was dropped without counting as a rejection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    NotTracking,
    OutOfOrder,
    Chatter,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AcceptedFix {
    pub distance_delta: f64,
    pub total_distance: f64,
    pub smoothed_speed: f64,
    pub motion: MotionState,
    pub transition: Option<MotionTransition>,
    pub speed_source: Option<SpeedSource>,
    pub counted: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FixOutcome {
    Accepted(AcceptedFix),
    Rejected(RejectReason),
    Ignored(IgnoreReason),
}

impl FixOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, FixOutcome::Accepted(_))
    }
}

pub struct WorkoutTracker {
    config: TrackerConfig,
    profile: ActivityProfile,
    validator: FixValidator,
    estimator: SpeedEstimator,
    motion: MotionStateTracker,
    route: RouteAccumulator,
    timeline: WorkoutTimeline,
    health: GpsHealth,
    reporter: MetricsReporter,
    listeners: Vec<MetricsListener>,
}

impl WorkoutTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            profile: config.profile(),
            validator: FixValidator::new(config.max_fix_age_secs),
            estimator: SpeedEstimator::new(&config.estimator),
            motion: MotionStateTracker::new(&config.motion),
            route: RouteAccumulator::new(config.route.clone()),
            timeline: WorkoutTimeline::new(),
            health: GpsHealth::new(config.gps_silence_secs),
            reporter: MetricsReporter::new(),
            listeners: Vec::new(),
            config,
        }
    }

    // ─── Control ─────────────────────────────────────────────────────────

    /// Swap activity thresholds. Route and distance are left as they are.
    pub fn set_activity(&mut self, kind: ActivityKind) {
        if kind == self.config.activity {
            return;
        }
        log::info!("[TRACKER] activity {} -> {}", self.config.activity, kind);
        self.config.activity = kind;
        self.profile = self.config.profile_for(kind);
    }

    pub fn start(&mut self, now: f64) -> bool {
        if !self.timeline.start(now) {
            log::debug!("[TRACKER] start ignored in {:?}", self.timeline.state());
            return false;
        }
        self.route.reset();
        self.estimator.reset();
        self.motion.reset();
        self.reporter.reset();
        log::info!(
            "[TRACKER] started {} ({})",
            self.timeline.session_id().unwrap_or("-"),
            self.config.activity
        );
        self.publish(now);
        true
    }

    pub fn pause(&mut self, now: f64) -> bool {
        if !self.timeline.pause(now) {
            log::debug!("[TRACKER] pause ignored in {:?}", self.timeline.state());
            return false;
        }
        log::info!("[TRACKER] paused at {:.1}s active", self.timeline.active_duration(now));
        self.publish(now);
        true
    }

    /// Resume after a real pause opens a new route segment, so nothing bridges
    /// the paused gap. A zero-length pause leaves the segment open.
    pub fn resume(&mut self, now: f64) -> bool {
        let paused_since = self.timeline.paused_since();
        if !self.timeline.resume(now) {
            log::debug!("[TRACKER] resume ignored in {:?}", self.timeline.state());
            return false;
        }
        let paused_for = paused_since.map(|since| now - since).unwrap_or(0.0);
        if paused_for > 0.0 {
            self.route.begin_segment();
            self.motion.clear_dwell();
        }
        log::info!("[TRACKER] resumed after {:.1}s", paused_for.max(0.0));
        self.publish(now);
        true
    }

    /// Finish the session. `None` when there was nothing to stop.
    pub fn stop(&mut self, now: f64) -> Option<WorkoutSummary> {
        if !self.timeline.stop(now) {
            log::debug!("[TRACKER] stop ignored in {:?}", self.timeline.state());
            return None;
        }
        let summary = WorkoutSummary::build(SummaryInputs {
            activity: self.config.activity,
            timeline: &self.timeline,
            route: &self.route,
            max_speed: self.reporter.max_speed(),
            body_mass_kg: self.config.body_mass_kg,
            end: now,
        });
        log::info!(
            "[TRACKER] stopped {}: {:.1} m in {:.1}s, {} points",
            summary.session_id,
            summary.total_distance,
            summary.active_duration,
            summary.route.len()
        );
        self.publish(now);
        Some(summary)
    }

    // ─── Provider ────────────────────────────────────────────────────────

    pub fn report_provider_status(&mut self, status: ProviderStatus, now: f64) {
        match &status {
            ProviderStatus::Available => log::info!("[GPS] provider available"),
            ProviderStatus::NoSignal => log::warn!("[GPS] no signal"),
            ProviderStatus::PermissionDenied => log::warn!("[GPS] location permission denied"),
            ProviderStatus::Failed(reason) => log::warn!("[GPS] provider failed: {}", reason),
        }
        self.health.set_status(status);
        self.publish(now);
    }

    /// Mark GPS as lost if no raw fix arrived within the silence window.
    pub fn check_signal(&mut self, now: f64) -> bool {
        if !self.health.check_silence(now) {
            return false;
        }
        log::warn!(
            "[GPS] no fix for {:.1}s",
            self.health.silence_duration(now).unwrap_or(0.0)
        );
        self.publish(now);
        true
    }

    // ─── Fix pipeline ────────────────────────────────────────────────────

    pub fn process_fix(&mut self, fix: &LocationFix, now: f64) -> FixOutcome {
        if self.health.observe(fix) {
            log::info!("[GPS] signal recovered");
        }

        if !self.timeline.is_tracking() {
            return self.ignore(IgnoreReason::NotTracking, fix, now);
        }

        if let Verdict::Rejected(reason) = self.validator.validate(fix, &self.profile, now) {
            return self.reject(reason, fix, now);
        }

        let previous = self.route.last_segment_fix().cloned();
        if let Some(prev) = &previous {
            if fix.timestamp <= prev.timestamp {
                return self.ignore(IgnoreReason::OutOfOrder, fix, now);
            }
        }

        if !self.route.admits(fix, &self.profile) {
            return self.ignore(IgnoreReason::Chatter, fix, now);
        }

        if let Some(implied) = implied_speed(fix, previous.as_ref()) {
            if implied > self.profile.max_speed {
                log::debug!("[FILTER] implied speed {:.2} m/s over {:.2}", implied, self.profile.max_speed);
                return self.reject(RejectReason::SpeedOutlier, fix, now);
            }
        }

        let measured = select_measured_speed(
            fix,
            previous.as_ref(),
            self.config.estimator.reported_speed_accuracy_threshold,
        );
        if let Some(m) = measured {
            let proposal = self.estimator.propose(m.value);
            if proposal.smoothed_speed() > self.profile.max_speed {
                log::debug!(
                    "[FILTER] smoothed speed {:.2} m/s over {:.2}",
                    proposal.smoothed_speed(),
                    self.profile.max_speed
                );
                return self.reject(RejectReason::SpeedOutlier, fix, now);
            }
            self.estimator.commit(proposal);
        }

        let smoothed_speed = self.estimator.smoothed_speed();
        let transition = self.motion.update(smoothed_speed, fix.timestamp);
        let freeze = self.config.motion.policy == StationaryPolicy::FreezeDistance;
        let counted = !self.motion.is_stationary() || !freeze;
        if freeze && matches!(transition, Some(MotionTransition::ResumedMoving { .. })) {
            // Displacement while frozen is never credited.
            self.route.rebase_anchor();
        }

        let Some(result) = self.route.accept(fix, &self.profile, counted) else {
            return self.ignore(IgnoreReason::Chatter, fix, now);
        };

        self.reporter.record_accepted();
        self.publish(now);

        FixOutcome::Accepted(AcceptedFix {
            distance_delta: result.distance_delta,
            total_distance: result.total_distance,
            smoothed_speed,
            motion: self.motion.state(),
            transition,
            speed_source: measured.map(|m| m.source),
            counted,
        })
    }

    fn reject(&mut self, reason: RejectReason, fix: &LocationFix, now: f64) -> FixOutcome {
        log::debug!(
            "[FILTER] rejected fix t={:.3} acc={:.1}: {:?}",
            fix.timestamp,
            fix.horizontal_accuracy,
            reason
        );
        self.reporter.record_rejected();
        self.publish(now);
        FixOutcome::Rejected(reason)
    }

    fn ignore(&mut self, reason: IgnoreReason, fix: &LocationFix, now: f64) -> FixOutcome {
        log::debug!("[FILTER] ignored fix t={:.3}: {:?}", fix.timestamp, reason);
        self.publish(now);
        FixOutcome::Ignored(reason)
    }

    fn publish(&mut self, now: f64) {
        let inputs = MetricsInputs {
            session_state: self.timeline.state(),
            motion_state: self.motion.state(),
            smoothed_speed: self.estimator.smoothed_speed(),
            total_distance: self.route.total_distance(),
            elevation_gain: self.route.elevation_gain(),
            elevation_loss: self.route.elevation_loss(),
            active_duration: self.timeline.active_duration(now),
            route_points: self.route.len(),
            health: &self.health,
            accuracy_threshold: self.profile.accuracy_threshold,
        };
        let snapshot = self.reporter.recompute(inputs);
        for listener in self.listeners.iter_mut() {
            listener(snapshot);
        }
    }

    // ─── Read side ───────────────────────────────────────────────────────

    pub fn add_listener(&mut self, listener: MetricsListener) {
        self.listeners.push(listener);
    }

    pub fn snapshot(&self) -> &MetricsSnapshot {
        self.reporter.snapshot()
    }

    pub fn route(&self) -> &RouteAccumulator {
        &self.route
    }

    pub fn estimator_state(&self) -> EstimatorState {
        self.estimator.state()
    }

    pub fn motion_state(&self) -> MotionState {
        self.motion.state()
    }

    pub fn session_state(&self) -> SessionState {
        self.timeline.state()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.timeline.session_id()
    }

    pub fn activity(&self) -> ActivityKind {
        self.config.activity
    }

    pub fn profile(&self) -> &ActivityProfile {
        &self.profile
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }
}

// ─── Shared handle ──────────────────────────────────────────────────────────

/// Cloneable handle for platforms that deliver fixes and UI actions on
/// different threads. Every call takes the lock, so deliveries never interleave.
#[derive(Clone)]
pub struct SharedTracker {
    inner: Arc<Mutex<WorkoutTracker>>,
}

impl SharedTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(WorkoutTracker::new(config))),
        }
    }

    fn lock(&self) -> TrackerResult<MutexGuard<'_, WorkoutTracker>> {
        self.inner
            .lock()
            .map_err(|e| TrackerError::Internal(format!("tracker lock poisoned: {}", e)))
    }

    pub fn process_fix(&self, fix: &LocationFix, now: f64) -> TrackerResult<FixOutcome> {
        Ok(self.lock()?.process_fix(fix, now))
    }

    pub fn start(&self, now: f64) -> TrackerResult<bool> {
        Ok(self.lock()?.start(now))
    }

    pub fn pause(&self, now: f64) -> TrackerResult<bool> {
        Ok(self.lock()?.pause(now))
    }

    pub fn resume(&self, now: f64) -> TrackerResult<bool> {
        Ok(self.lock()?.resume(now))
    }

    pub fn stop(&self, now: f64) -> TrackerResult<Option<WorkoutSummary>> {
        Ok(self.lock()?.stop(now))
    }

    pub fn snapshot(&self) -> TrackerResult<MetricsSnapshot> {
        Ok(self.lock()?.snapshot().clone())
    }

    /// Run `f` with exclusive access to the tracker.
    pub fn with<R>(&self, f: impl FnOnce(&mut WorkoutTracker) -> R) -> TrackerResult<R> {
        Ok(f(&mut *self.lock()?))
    }
}
