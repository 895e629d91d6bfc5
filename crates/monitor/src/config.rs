//! Monitor configuration

use serde::{Deserialize, Serialize};

use crate::MonitorError;

/// Detection thresholds, fixed at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// EAR below this counts as "eyes closing" for that tick.
    pub ear_threshold: f64,

    /// Consecutive low-EAR ticks required to declare drowsiness.
    pub drowsy_debounce_frames: u32,

    /// Consecutive no-face ticks required to declare absence.
    pub absence_debounce_frames: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            ear_threshold: 0.25,
            drowsy_debounce_frames: 20,
            absence_debounce_frames: 30,
        }
    }
}

impl MonitorConfig {
    /// Strict config: alerts fire sooner.
    pub fn strict() -> Self {
        Self {
            ear_threshold: 0.27,
            drowsy_debounce_frames: 12,
            absence_debounce_frames: 20,
        }
    }

    /// Lenient config: more sustained evidence required.
    pub fn lenient() -> Self {
        Self {
            ear_threshold: 0.22,
            drowsy_debounce_frames: 30,
            absence_debounce_frames: 45,
        }
    }

    /// Check that the thresholds are usable.
    pub fn validate(&self) -> Result<(), MonitorError> {
        if !(self.ear_threshold > 0.0 && self.ear_threshold < 1.0) {
            return Err(MonitorError::Config(format!(
                "ear_threshold {} must be within (0, 1)",
                self.ear_threshold
            )));
        }
        if self.drowsy_debounce_frames == 0 {
            return Err(MonitorError::Config(
                "drowsy_debounce_frames must be at least 1".to_string(),
            ));
        }
        if self.absence_debounce_frames == 0 {
            return Err(MonitorError::Config(
                "absence_debounce_frames must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
