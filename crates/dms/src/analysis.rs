//! Per-frame tracker output

use serde::{Deserialize, Serialize};
use crate::state::{DisplayPriority, DriverStatus};

/// Decision produced for one observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AlertDecision {
    /// Debounced status after this frame
    pub status: DriverStatus,

    /// How the display layer should present the status
    pub display_priority: DisplayPriority,

    /// Raise an incident now
    pub should_fire: bool,
}

impl AlertDecision {
    /// Decision that never fires
    pub fn quiet(status: DriverStatus) -> Self {
        Self {
            status,
            display_priority: status.priority(),
            should_fire: false,
        }
    }

    pub fn label(&self) -> &'static str {
        self.status.label()
    }
}
