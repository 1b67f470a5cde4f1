//! SOS record types

use chrono::{DateTime, Utc};
use dms::Location;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Text attached to every automatically raised SOS
pub const SOS_DETAILS: &str = "Driver detected sleeping/drowsy. Immediate attention required.";

/// Lifecycle of an SOS record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SosStatus {
    New,
    Actioned,
}

/// Stored SOS alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SosRecord {
    pub id: String,
    pub status: SosStatus,
    pub details: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actioned_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl SosRecord {
    /// Fresh NEW record stamped with the current time
    pub fn new(location: Option<&Location>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            status: SosStatus::New,
            details: SOS_DETAILS.to_string(),
            created_at: Utc::now(),
            actioned_at: None,
            location: location.cloned(),
        }
    }

    /// Mark as handled
    pub fn mark_actioned(&mut self) {
        self.status = SosStatus::Actioned;
        self.actioned_at = Some(Utc::now());
    }
}
