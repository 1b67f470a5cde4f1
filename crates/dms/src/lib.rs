//! Driver Monitoring System (DMS)
//!
//! Per-frame drowsiness decision core:
//! - Landmark geometry (eye aspect ratio, blink-ratio buckets)
//! - Debounced driver status with sticky alarm states
//! - Rate-limited alert gating (fresh transition or expired cooldown)
//! - Session pipeline wiring a face detector and an incident reporter

pub mod analysis;
pub mod config;
pub mod observation;
pub mod report;
pub mod session;
pub mod state;
pub mod tracker;

pub use analysis::AlertDecision;
pub use config::{AbsencePolicy, ClassificationStrategy, TrackerConfig};
pub use observation::{EyeObservation, EyeState, FaceLandmarks, Point};
pub use report::{FaceDetector, IncidentReporter, Location, ReportError};
pub use session::{DmsSession, FrameOutcome, ReportOutcome};
pub use state::{DisplayPriority, DriverStatus, TrackerState};
pub use tracker::DrowsinessTracker;

use thiserror::Error;

/// DMS error types
#[derive(Error, Debug)]
pub enum DmsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Face detector failed: {0}")]
    Detector(String),

    #[error("Expected {expected} face landmarks, got {actual}")]
    KeypointsMissing { expected: usize, actual: usize },
}
