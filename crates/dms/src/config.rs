//! DMS configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::DmsError;

/// How raw eye evidence is turned into a status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationStrategy {
    /// Open / half-closed / closed buckets with one run counter each
    #[default]
    Ternary,
    /// Single eye-aspect-ratio counter, ACTIVE / DROWSY only
    Ear,
}

/// What a frame without a face does to the run counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsencePolicy {
    /// Zero every run counter
    #[default]
    Reset,
    /// Freeze the counters so an interrupted run resumes after the face returns
    PersistThroughAbsence,
}

/// Drowsiness tracker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Closed-eye frames that must be exceeded before SLEEPING
    pub sleep_threshold: u32,

    /// Half-closed frames that must be exceeded before DROWSY
    pub drowsy_threshold: u32,

    /// Open-eye frames that must be exceeded before ACTIVE is confirmed
    pub active_threshold: u32,

    /// EAR below this counts as a drowsy frame
    pub ear_threshold: f32,

    /// Drowsy EAR frames needed to raise DROWSY (EAR strategy)
    pub drowsy_frame_threshold: u32,

    /// Minimum time between repeated alerts for an unchanged status
    pub alert_cooldown_seconds: f64,

    pub strategy: ClassificationStrategy,

    /// Keep an alarm status until another category's run crosses its threshold
    pub sticky_status: bool,

    pub absence_policy: AbsencePolicy,

    /// Blink ratio above this is an open eye
    pub blink_open_ratio: f32,

    /// Blink ratio above this (and not open) is a half-closed eye
    pub blink_half_ratio: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            sleep_threshold: 30,
            drowsy_threshold: 30,
            active_threshold: 6,
            ear_threshold: 0.25,
            drowsy_frame_threshold: 8,
            alert_cooldown_seconds: 30.0,
            strategy: ClassificationStrategy::Ternary,
            sticky_status: true,
            absence_policy: AbsencePolicy::Reset,
            blink_open_ratio: 0.25,
            blink_half_ratio: 0.21,
        }
    }
}

impl TrackerConfig {
    /// Create strict config (lower thresholds)
    pub fn strict() -> Self {
        Self {
            sleep_threshold: 6,
            drowsy_threshold: 6,
            drowsy_frame_threshold: 6,
            alert_cooldown_seconds: 15.0,
            ..Default::default()
        }
    }

    /// Create lenient config (higher thresholds)
    pub fn lenient() -> Self {
        Self {
            sleep_threshold: 45,
            drowsy_threshold: 45,
            drowsy_frame_threshold: 20,
            alert_cooldown_seconds: 60.0,
            ..Default::default()
        }
    }

    /// Use the continuous EAR strategy
    pub fn with_strategy(mut self, strategy: ClassificationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Check that every threshold is usable
    pub fn validate(&self) -> Result<(), DmsError> {
        let frame_thresholds = [
            ("sleep_threshold", self.sleep_threshold),
            ("drowsy_threshold", self.drowsy_threshold),
            ("active_threshold", self.active_threshold),
            ("drowsy_frame_threshold", self.drowsy_frame_threshold),
        ];
        for (name, value) in frame_thresholds {
            if value == 0 {
                return Err(DmsError::Config(format!("{} must be at least 1", name)));
            }
        }

        if !(self.ear_threshold > 0.0 && self.ear_threshold < 1.0) {
            return Err(DmsError::Config(format!(
                "ear_threshold {} must lie in (0, 1)",
                self.ear_threshold
            )));
        }

        if !(self.blink_half_ratio > 0.0 && self.blink_half_ratio < self.blink_open_ratio) {
            return Err(DmsError::Config(format!(
                "blink ratios must satisfy 0 < half ({}) < open ({})",
                self.blink_half_ratio, self.blink_open_ratio
            )));
        }

        if !self.alert_cooldown_seconds.is_finite() || self.alert_cooldown_seconds < 0.0 {
            return Err(DmsError::Config(format!(
                "alert_cooldown_seconds {} must be finite and non-negative",
                self.alert_cooldown_seconds
            )));
        }

        Ok(())
    }

    /// Cooldown window as a duration, saturating at `Duration::MAX`
    pub fn alert_cooldown(&self) -> Duration {
        Duration::try_from_secs_f64(self.alert_cooldown_seconds).unwrap_or(Duration::MAX)
    }
}
