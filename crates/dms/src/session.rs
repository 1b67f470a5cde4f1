//! One monitoring session: detector -> tracker -> incident reporter

use metrics::counter;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::analysis::AlertDecision;
use crate::observation::{observation_from_landmarks, EyeObservation};
use crate::report::{FaceDetector, IncidentReporter, Location};
use crate::tracker::DrowsinessTracker;
use crate::DmsError;

/// What happened to the incident for a frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "detail")]
pub enum ReportOutcome {
    /// Tracker did not fire
    NotFired,
    /// Incident recorded with this id
    Raised(String),
    /// Reporter failed; the decision still stands
    Failed(String),
}

/// Result of processing one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameOutcome {
    pub decision: AlertDecision,
    pub report: ReportOutcome,
}

/// Driver monitoring session
///
/// Owns the tracker for one camera. Detector errors are returned before the
/// tracker is touched; reporter errors are logged and never reach the
/// tracker.
pub struct DmsSession<D, R> {
    name: String,
    detector: D,
    reporter: R,
    tracker: DrowsinessTracker,
    location: Option<Location>,
    frames: u64,
    report_failures: u64,
}

impl<D, R> DmsSession<D, R>
where
    D: FaceDetector,
    R: IncidentReporter,
{
    /// Create a new session around an existing tracker
    pub fn new(name: impl Into<String>, tracker: DrowsinessTracker, detector: D, reporter: R) -> Self {
        let name = name.into();
        info!("Starting DMS session '{}'", name);
        Self {
            name,
            detector,
            reporter,
            tracker,
            location: None,
            frames: 0,
            report_failures: 0,
        }
    }

    /// Attach a fixed location to every raised incident
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tracker(&self) -> &DrowsinessTracker {
        &self.tracker
    }

    /// Frames processed so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Incidents the reporter failed to record
    pub fn report_failures(&self) -> u64 {
        self.report_failures
    }

    /// Analyze a single frame for driver state
    pub fn process_frame(&mut self, frame: &D::Frame, now: Duration) -> Result<FrameOutcome, DmsError> {
        let faces = self.detector.detect(frame)?;

        if faces.len() > 1 {
            debug!("{}: {} faces detected, tracking the first", self.name, faces.len());
        }

        let observation = match faces.first() {
            Some(face) => observation_from_landmarks(face, self.tracker.config()),
            None => EyeObservation::NoFace,
        };

        Ok(self.observe(observation, now))
    }

    /// Feed an already-classified observation, bypassing the detector
    pub fn observe(&mut self, observation: EyeObservation, now: Duration) -> FrameOutcome {
        self.frames += 1;
        counter!("dms_frames_total").increment(1);

        let decision = self.tracker.observe(observation, now);
        let report = if decision.should_fire {
            self.raise(&decision)
        } else {
            ReportOutcome::NotFired
        };

        FrameOutcome { decision, report }
    }

    /// Reset driver state (on driver change)
    pub fn reset(&mut self) {
        self.tracker.reset();
    }

    fn raise(&mut self, decision: &AlertDecision) -> ReportOutcome {
        counter!("dms_alerts_fired_total", "status" => decision.label()).increment(1);

        match self.reporter.raise_sos(self.location.as_ref()) {
            Ok(id) => {
                info!("{}: SOS raised for {} (record {})", self.name, decision.status, id);
                ReportOutcome::Raised(id)
            }
            Err(e) => {
                self.report_failures += 1;
                counter!("dms_report_failures_total").increment(1);
                warn!("{}: failed to raise SOS: {}", self.name, e);
                ReportOutcome::Failed(e.to_string())
            }
        }
    }
}
