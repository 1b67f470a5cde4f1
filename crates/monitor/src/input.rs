//! Recorded detector output

use dms::{DmsError, EyeObservation, FaceDetector, FaceLandmarks, Point};
use serde::Deserialize;
use std::time::Duration;

/// One recorded frame
///
/// Either the raw landmarks the face detector produced (`faces`, empty for
/// no face) or an already-classified `observation`, which wins when both
/// are present.
#[derive(Debug, Clone, Deserialize)]
pub struct FrameRecord {
    /// Seconds since the session started
    pub t: f64,
    #[serde(default)]
    pub faces: Vec<Vec<[f32; 2]>>,
    #[serde(default)]
    pub observation: Option<EyeObservation>,
}

impl FrameRecord {
    /// Session clock reading; `None` for a negative or non-finite `t`
    pub fn timestamp(&self) -> Option<Duration> {
        if self.t.is_finite() && self.t >= 0.0 {
            Duration::try_from_secs_f64(self.t).ok()
        } else {
            None
        }
    }
}

/// Detector that replays the landmarks stored in each record
#[derive(Debug, Default)]
pub struct RecordedDetector;

impl FaceDetector for RecordedDetector {
    type Frame = FrameRecord;

    fn detect(&mut self, frame: &FrameRecord) -> Result<Vec<FaceLandmarks>, DmsError> {
        frame
            .faces
            .iter()
            .map(|face| FaceLandmarks::new(face.iter().copied().map(Point::from).collect()))
            .collect()
    }
}
