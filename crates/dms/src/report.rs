//! Collaborator interfaces: face detection and incident reporting

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::observation::FaceLandmarks;
use crate::DmsError;

/// Where the vehicle was when an alert was raised
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "unknown_address")]
    pub address: String,
}

fn unknown_address() -> String {
    "Unknown".to_string()
}

impl Location {
    pub fn new(latitude: f64, longitude: f64, address: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            address: address.into(),
        }
    }
}

/// Incident reporting failure
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Incident store unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to record incident: {0}")]
    Write(String),
}

/// Face/eye landmark source
///
/// Returns one entry per detected face; an empty vector means no face.
pub trait FaceDetector {
    type Frame;

    fn detect(&mut self, frame: &Self::Frame) -> Result<Vec<FaceLandmarks>, DmsError>;
}

/// Durable "raise SOS" sink
pub trait IncidentReporter {
    /// Record a new alert with status NEW; returns the record id
    fn raise_sos(&self, location: Option<&Location>) -> Result<String, ReportError>;
}

impl<R: IncidentReporter + ?Sized> IncidentReporter for Arc<R> {
    fn raise_sos(&self, location: Option<&Location>) -> Result<String, ReportError> {
        (**self).raise_sos(location)
    }
}

impl<R: IncidentReporter + ?Sized> IncidentReporter for &R {
    fn raise_sos(&self, location: Option<&Location>) -> Result<String, ReportError> {
        (**self).raise_sos(location)
    }
}
