//! Driver state tracking

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Debounced driver status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriverStatus {
    /// No face in the frame
    NoFace,
    #[default]
    Active,
    Drowsy,
    Sleeping,
}

impl DriverStatus {
    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            Self::NoFace => "No face detected",
            Self::Active => "ACTIVE",
            Self::Drowsy => "DROWSY",
            Self::Sleeping => "SLEEPING",
        }
    }

    /// Whether this status can raise an alert
    pub fn is_alarm(&self) -> bool {
        matches!(self, Self::Drowsy | Self::Sleeping)
    }

    /// Display priority for this status
    pub fn priority(&self) -> DisplayPriority {
        match self {
            Self::NoFace | Self::Active => DisplayPriority::None,
            Self::Drowsy => DisplayPriority::Warn,
            Self::Sleeping => DisplayPriority::Critical,
        }
    }
}

impl fmt::Display for DriverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How loudly the display layer should present a status
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisplayPriority {
    #[default]
    None,
    Warn,
    Critical,
}

impl DisplayPriority {
    /// Overlay text color (RGB): green, red for drowsy, blue for sleeping
    pub fn color(&self) -> [u8; 3] {
        match self {
            Self::None => [0, 255, 0],
            Self::Warn => [255, 0, 0],
            Self::Critical => [0, 0, 255],
        }
    }
}

/// Which run counter is currently growing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Closed,
    Half,
    Open,
}

/// Per-session tracker state (mutated once per observation)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerState {
    /// Consecutive closed-eye frames (drowsy EAR frames under the EAR strategy)
    pub consecutive_closed_count: u32,

    /// Consecutive half-closed frames
    pub consecutive_half_count: u32,

    /// Consecutive open-eye frames
    pub consecutive_open_count: u32,

    /// Consecutive frames without a face
    pub consecutive_absent_count: u32,

    pub current_status: DriverStatus,

    /// Status at the end of the previous frame
    pub previous_status: DriverStatus,

    /// Session clock reading of the last fired alert
    pub last_alert_timestamp: Option<Duration>,

    /// Alerts fired this session
    pub alerts_fired: u64,
}

impl TrackerState {
    /// Zero all three run counters
    pub fn reset_counters(&mut self) {
        self.consecutive_closed_count = 0;
        self.consecutive_half_count = 0;
        self.consecutive_open_count = 0;
    }

    /// Extend one run and end the other two
    pub fn extend_run(&mut self, kind: RunKind) -> u32 {
        let (run, others) = match kind {
            RunKind::Closed => (
                &mut self.consecutive_closed_count,
                [&mut self.consecutive_half_count, &mut self.consecutive_open_count],
            ),
            RunKind::Half => (
                &mut self.consecutive_half_count,
                [&mut self.consecutive_closed_count, &mut self.consecutive_open_count],
            ),
            RunKind::Open => (
                &mut self.consecutive_open_count,
                [&mut self.consecutive_closed_count, &mut self.consecutive_half_count],
            ),
        };
        for other in others {
            *other = 0;
        }
        *run = run.saturating_add(1);
        *run
    }

    /// The live run, if any
    pub fn active_run(&self) -> Option<(RunKind, u32)> {
        [
            (RunKind::Closed, self.consecutive_closed_count),
            (RunKind::Half, self.consecutive_half_count),
            (RunKind::Open, self.consecutive_open_count),
        ]
        .into_iter()
        .find(|(_, count)| *count > 0)
    }

    /// EAR strategy drowsy frame counter
    pub fn drowsy_frame_count(&self) -> u32 {
        self.consecutive_closed_count
    }

    /// Reset state (on session restart)
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extend_run_is_exclusive() {
        let mut state = TrackerState::default();
        assert_eq!(state.extend_run(RunKind::Closed), 1);
        assert_eq!(state.extend_run(RunKind::Closed), 2);
        assert_eq!(state.active_run(), Some((RunKind::Closed, 2)));

        assert_eq!(state.extend_run(RunKind::Half), 1);
        assert_eq!(state.consecutive_closed_count, 0);
        assert_eq!(state.consecutive_open_count, 0);

        state.extend_run(RunKind::Open);
        assert_eq!(state.active_run(), Some((RunKind::Open, 1)));
        assert_eq!(state.consecutive_half_count, 0);
    }

    #[test]
    fn test_reset_counters_keeps_status() {
        let mut state = TrackerState {
            current_status: DriverStatus::Sleeping,
            ..Default::default()
        };
        state.extend_run(RunKind::Closed);
        state.reset_counters();
        assert_eq!(state.active_run(), None);
        assert_eq!(state.current_status, DriverStatus::Sleeping);
    }

    #[test]
    fn test_labels_and_priorities() {
        assert_eq!(DriverStatus::NoFace.to_string(), "No face detected");
        assert_eq!(DriverStatus::Sleeping.priority(), DisplayPriority::Critical);
        assert_eq!(DriverStatus::Drowsy.priority(), DisplayPriority::Warn);
        assert!(!DriverStatus::Active.is_alarm());
        assert!(DisplayPriority::Critical > DisplayPriority::Warn);
    }

    #[test]
    fn test_overlay_colors() {
        assert_eq!(DriverStatus::Active.priority().color(), [0, 255, 0]);
        assert_eq!(DriverStatus::Drowsy.priority().color(), [255, 0, 0]);
        assert_eq!(DriverStatus::Sleeping.priority().color(), [0, 0, 255]);
    }
}
