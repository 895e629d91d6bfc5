//! Monitor state tracking

use serde::{Deserialize, Serialize};

/// Whether a driver is currently in front of the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Presence {
    /// A session starts with the driver assumed present.
    #[default]
    Present,
    Absent,
}

/// Eye-openness sub-state, meaningful only while present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Alertness {
    #[default]
    Awake,
    Drowsy,
}

/// Debounce state owned by the state machine, mutated only on tick.
///
/// `low_ear_streak` resets whenever the EAR clears the threshold or no
/// face is seen; `no_face_streak` resets whenever a face is seen. The
/// onset timestamps are set on entering the corresponding sub-state and
/// cleared on leaving it.
#[derive(Debug, Clone, Default)]
pub struct MonitorState {
    pub presence: Presence,

    /// Meaningful only while `presence == Present`.
    pub alertness: Alertness,

    /// Consecutive ticks with EAR below threshold while present.
    pub low_ear_streak: u32,

    /// Consecutive ticks without a detectable face.
    pub no_face_streak: u32,

    /// When the current drowsiness episode started (ms).
    pub drowsy_onset_ms: Option<u64>,

    /// When the current absence episode started (ms).
    pub absence_onset_ms: Option<u64>,
}

impl MonitorState {
    /// Reset to the session-start state (present, awake, clean streaks).
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
