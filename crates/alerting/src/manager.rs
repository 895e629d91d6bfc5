//! Alert Manager Implementation

use monitor::{EventKind, MonitorEvent};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Minimum seconds between repeated announcements of the same hazard.
    pub repeat_cooldown_seconds: u64,
    /// Maximum hazard announcements per session before throttling.
    pub max_alerts_per_session: usize,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            repeat_cooldown_seconds: 30,
            max_alerts_per_session: 100,
        }
    }
}

/// What a UI/audio sink should do for an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertAction {
    /// Banner text; empty clears the banner.
    pub banner: &'static str,
    /// Panel background color.
    pub color: &'static str,
    /// Looping sound cue to start; `None` stops any playing cue.
    pub sound: Option<&'static str>,
    /// Whether the sink should demand a modal acknowledgment.
    pub modal: bool,
}

impl AlertAction {
    fn for_kind(kind: EventKind) -> Self {
        match kind {
            EventKind::DrowsinessOnset => Self {
                banner: "DRIVER DROWSY!",
                color: "#ff4d4d",
                sound: Some("sounds/alert_sound.wav"),
                modal: true,
            },
            EventKind::AbsenceOnset => Self {
                banner: "DRIVER NOT DETECTED!",
                color: "#ffcc00",
                sound: Some("sounds/alert_sound2.wav"),
                modal: true,
            },
            EventKind::DrowsinessCleared | EventKind::PresenceRestored => Self {
                banner: "",
                color: "#333333",
                sound: None,
                modal: false,
            },
        }
    }
}

/// State of one hazard kind
#[derive(Debug, Clone)]
pub struct AlertState {
    /// Last time this hazard was announced (ms).
    pub last_fired_ms: u64,
    /// Number of times announced this session.
    pub fire_count: usize,
    /// Whether the driver acknowledged the modal.
    pub acknowledged: bool,
}

/// Deduplicates and throttles hazard announcements.
///
/// Recovery edges always pass through: clearing a banner or stopping a
/// sound is never suppressed.
pub struct AlertManager {
    config: AlertConfig,
    states: HashMap<EventKind, AlertState>,
    session_count: usize,
}

impl AlertManager {
    pub fn new(config: AlertConfig) -> Self {
        info!("Creating alert manager with config: {:?}", config);
        Self {
            config,
            states: HashMap::new(),
            session_count: 0,
        }
    }

    /// Decide what the sinks should do for this event.
    ///
    /// Returns `None` when a hazard announcement is suppressed by
    /// cooldown or the session throttle.
    pub fn dispatch(&mut self, event: &MonitorEvent, now_ms: u64) -> Option<AlertAction> {
        if !event.kind.is_hazard_onset() {
            debug!(kind = ?event.kind, "recovery edge, clearing alert surfaces");
            return Some(AlertAction::for_kind(event.kind));
        }

        if self.session_count >= self.config.max_alerts_per_session {
            warn!(kind = ?event.kind, "alert throttled: session maximum reached");
            return None;
        }

        if let Some(state) = self.states.get(&event.kind) {
            let cooldown_ms = self.config.repeat_cooldown_seconds * 1_000;
            if now_ms.saturating_sub(state.last_fired_ms) < cooldown_ms {
                debug!(kind = ?event.kind, "alert suppressed: in cooldown period");
                return None;
            }
        }

        self.record_fire(event.kind, now_ms);
        Some(AlertAction::for_kind(event.kind))
    }

    fn record_fire(&mut self, kind: EventKind, now_ms: u64) {
        self.session_count += 1;
        let state = self.states.entry(kind).or_insert(AlertState {
            last_fired_ms: now_ms,
            fire_count: 0,
            acknowledged: false,
        });
        state.last_fired_ms = now_ms;
        state.fire_count += 1;
        state.acknowledged = false;
        info!(?kind, count = state.fire_count, "alert announced");
    }

    /// Mark a hazard's modal as acknowledged by the driver.
    pub fn acknowledge(&mut self, kind: EventKind) -> bool {
        if let Some(state) = self.states.get_mut(&kind) {
            state.acknowledged = true;
            info!(?kind, "alert acknowledged");
            true
        } else {
            false
        }
    }

    /// Hazards still waiting for acknowledgment.
    pub fn pending(&self) -> Vec<(EventKind, &AlertState)> {
        self.states
            .iter()
            .filter(|(_, state)| !state.acknowledged)
            .map(|(k, v)| (*k, v))
            .collect()
    }

    /// Total hazard announcements this session.
    pub fn session_count(&self) -> usize {
        self.session_count
    }

    /// Reset for a new session.
    pub fn clear(&mut self) {
        self.states.clear();
        self.session_count = 0;
    }
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::new(AlertConfig::default())
    }
}
