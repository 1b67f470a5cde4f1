//! Drowsiness state tracker
//!
//! Turns a noisy per-frame eye signal into a debounced status with
//! rate-limited alerting. Run-length counters debounce each eye category,
//! alarm statuses are sticky (configurable), and a transition-or-cooldown
//! gate decides when an alert fires.

use std::time::Duration;
use tracing::{debug, info};

use crate::analysis::AlertDecision;
use crate::config::{AbsencePolicy, ClassificationStrategy, TrackerConfig};
use crate::observation::{classify_blink_ratio, EyeObservation, EyeState};
use crate::state::{DriverStatus, RunKind, TrackerState};
use crate::DmsError;

/// Per-session drowsiness state machine
///
/// One tracker per camera/session; it is `Send` but holds `&mut` state, so
/// callers confine it to a single worker.
#[derive(Debug, Clone)]
pub struct DrowsinessTracker {
    config: TrackerConfig,
    cooldown: Duration,
    state: TrackerState,
}

impl DrowsinessTracker {
    /// Create a tracker, rejecting unusable thresholds
    pub fn new(config: TrackerConfig) -> Result<Self, DmsError> {
        config.validate()?;
        Ok(Self {
            cooldown: config.alert_cooldown(),
            config,
            state: TrackerState::default(),
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    /// Feed one frame's evidence
    ///
    /// `now` is the session clock reading for the frame and should not
    /// decrease; if it does, elapsed time is clamped to zero. Invalid EAR
    /// readings (NaN, infinite, outside [0, 1]) are handled as a frame
    /// without a face: counters reset and nothing fires.
    ///
    /// A `Category` observation under the EAR strategy counts half-closed
    /// and closed eyes as drowsy frames; an `Ear` observation under the
    /// ternary strategy is bucketed with the blink ratio bands.
    pub fn observe(&mut self, observation: EyeObservation, now: Duration) -> AlertDecision {
        let before = self.state.current_status;

        let decision = match (observation.sanitized(), self.config.strategy) {
            (EyeObservation::NoFace, _) => self.step_absent(),
            (EyeObservation::Category(eye), ClassificationStrategy::Ternary) => {
                self.step_ternary(eye, now)
            }
            (EyeObservation::Ear(ear), ClassificationStrategy::Ternary) => {
                let eye = classify_blink_ratio(ear, &self.config);
                self.step_ternary(eye, now)
            }
            (EyeObservation::Ear(ear), ClassificationStrategy::Ear) => {
                self.step_ear(ear < self.config.ear_threshold, now)
            }
            (EyeObservation::Category(eye), ClassificationStrategy::Ear) => {
                self.step_ear(eye != EyeState::Open, now)
            }
        };

        if decision.status != before {
            debug!("Driver status {} -> {}", before, decision.status);
        }
        self.state.previous_status = before;
        decision
    }

    /// Reset all state (new driver or new session)
    pub fn reset(&mut self) {
        self.state.reset();
    }

    fn step_absent(&mut self) -> AlertDecision {
        self.state.consecutive_absent_count = self.state.consecutive_absent_count.saturating_add(1);
        if self.config.absence_policy == AbsencePolicy::Reset {
            self.state.reset_counters();
        }
        self.state.current_status = DriverStatus::NoFace;
        AlertDecision::quiet(DriverStatus::NoFace)
    }

    fn step_ternary(&mut self, eye: EyeState, now: Duration) -> AlertDecision {
        let (kind, threshold, target) = match eye {
            EyeState::Closed => (RunKind::Closed, self.config.sleep_threshold, DriverStatus::Sleeping),
            EyeState::HalfClosed => (RunKind::Half, self.config.drowsy_threshold, DriverStatus::Drowsy),
            EyeState::Open => (RunKind::Open, self.config.active_threshold, DriverStatus::Active),
        };
        self.state.consecutive_absent_count = 0;
        let run = self.state.extend_run(kind);
        self.settle(target, run > threshold, now)
    }

    fn step_ear(&mut self, drowsy: bool, now: Duration) -> AlertDecision {
        self.state.consecutive_absent_count = 0;
        if drowsy {
            let run = self.state.extend_run(RunKind::Closed);
            self.settle(DriverStatus::Drowsy, run >= self.config.drowsy_frame_threshold, now)
        } else {
            let run = self.state.extend_run(RunKind::Open);
            self.settle(DriverStatus::Active, run > self.config.active_threshold, now)
        }
    }

    /// Apply a run's outcome to the status and run the alert gate
    fn settle(&mut self, target: DriverStatus, crossed: bool, now: Duration) -> AlertDecision {
        let previous = self.state.current_status;

        if crossed {
            self.state.current_status = target;
        } else if !self.config.sticky_status && previous != target {
            self.state.current_status = DriverStatus::Active;
        }

        let status = self.state.current_status;
        let should_fire =
            crossed && status.is_alarm() && (status != previous || self.cooldown_elapsed(now));

        if should_fire {
            self.state.last_alert_timestamp = Some(now);
            self.state.alerts_fired += 1;
            info!(
                "Drowsiness alert: {} (alert #{}, at {:.1}s)",
                status,
                self.state.alerts_fired,
                now.as_secs_f64()
            );
        }

        AlertDecision {
            status,
            display_priority: status.priority(),
            should_fire,
        }
    }

    fn cooldown_elapsed(&self, now: Duration) -> bool {
        match self.state.last_alert_timestamp {
            None => true,
            Some(last) => now.saturating_sub(last) > self.cooldown,
        }
    }
}

impl Default for DrowsinessTracker {
    fn default() -> Self {
        let config = TrackerConfig::default();
        Self {
            cooldown: config.alert_cooldown(),
            config,
            state: TrackerState::default(),
        }
    }
}
