//! Lifecycle events emitted by the state machine

use serde::{Deserialize, Serialize};

/// Rising and falling edges of the two hazard conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Sustained low EAR crossed the debounce threshold.
    DrowsinessOnset,

    /// A single good-EAR tick ended a drowsiness episode.
    DrowsinessCleared,

    /// Sustained face absence crossed the debounce threshold.
    AbsenceOnset,

    /// A face reappeared after a declared absence.
    PresenceRestored,
}

impl EventKind {
    /// Log record label for this event.
    pub fn label(&self) -> &'static str {
        match self {
            Self::DrowsinessOnset => "Drowsiness",
            Self::DrowsinessCleared => "Alert",
            Self::AbsenceOnset => "Driver Absence",
            Self::PresenceRestored => "Driver Presence",
        }
    }

    /// Human-readable detail line for this event.
    pub fn default_detail(&self) -> &'static str {
        match self {
            Self::DrowsinessOnset => "Driver is drowsy",
            Self::DrowsinessCleared => "Driver awake",
            Self::AbsenceOnset => "Driver not detected",
            Self::PresenceRestored => "Driver detected again",
        }
    }

    /// Whether this is a hazard onset (as opposed to a recovery edge).
    pub fn is_hazard_onset(&self) -> bool {
        matches!(self, Self::DrowsinessOnset | Self::AbsenceOnset)
    }
}

/// Immutable event value handed to sinks; safe to move across tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorEvent {
    pub kind: EventKind,

    /// Human-readable label for display and persistence.
    pub detail: String,

    /// Tick timestamp at which the edge occurred (ms).
    pub occurred_at_ms: u64,

    /// Episode length for recovery edges (`DrowsinessCleared`,
    /// `PresenceRestored`); absent on onsets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
}

impl MonitorEvent {
    pub fn new(kind: EventKind, occurred_at_ms: u64, duration_seconds: Option<f64>) -> Self {
        Self {
            kind,
            detail: kind.default_detail().to_string(),
            occurred_at_ms,
            duration_seconds,
        }
    }

    /// Onset edge: no duration.
    pub fn onset(kind: EventKind, occurred_at_ms: u64) -> Self {
        Self::new(kind, occurred_at_ms, None)
    }
}
