//! Debounce state machine
//!
//! Consumes one observation per tick and converts the noisy per-frame
//! signal into hysteresis-protected lifecycle events. Entering a hazard
//! state requires a full debounce streak; leaving drowsiness takes a
//! single good tick. At most one event is emitted per tick.

use ear::EyeLandmarks;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::event::{EventKind, MonitorEvent};
use crate::state::{Alertness, MonitorState, Presence};
use crate::MonitorError;

/// Per-tick input from the perception collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Observation {
    /// No face detected in the frame.
    FaceMissing,

    /// Face detected; raw eye contours from the landmark model.
    Landmarks {
        left: EyeLandmarks,
        right: EyeLandmarks,
    },

    /// Face detected; EAR already reduced upstream.
    PrecomputedEar(f64),
}

/// How the tick counts toward session statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TickDisposition {
    /// Face present, eyes open.
    Normal,

    /// Face present, EAR below threshold (streak building or drowsy).
    EyesClosed,

    /// No usable face signal this tick.
    FaceMissing,
}

/// Result of advancing the machine by one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub disposition: TickDisposition,

    /// Zero or one lifecycle event per tick.
    pub event: Option<MonitorEvent>,

    /// EAR value seen this tick, for display sinks.
    pub ear: Option<f64>,
}

/// Sequential reducer over [`MonitorState`].
///
/// Callers must serialize `advance` calls and supply a monotonically
/// non-decreasing `now_ms`; the machine never assumes uniform tick
/// spacing.
pub struct DebounceMachine {
    config: MonitorConfig,
    state: MonitorState,
    last_tick_ms: Option<u64>,
}

impl DebounceMachine {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            state: MonitorState::default(),
            last_tick_ms: None,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    /// Reset the debounce state (on driver change); the tick clock keeps
    /// its monotonicity requirement.
    pub fn reset_state(&mut self) {
        self.state.reset();
    }

    /// Advance by one tick.
    ///
    /// A timestamp regression is rejected before any state is touched.
    /// Bad eye geometry is processed as a missing face, failing toward
    /// the absence hazard rather than trusting a broken ratio.
    pub fn advance(
        &mut self,
        observation: &Observation,
        now_ms: u64,
    ) -> Result<TickReport, MonitorError> {
        if let Some(last_ms) = self.last_tick_ms {
            if now_ms < last_ms {
                return Err(MonitorError::NonMonotonicTick { last_ms, now_ms });
            }
        }
        self.last_tick_ms = Some(now_ms);

        let ear = match observation {
            Observation::FaceMissing => None,
            Observation::PrecomputedEar(value) => Some(*value),
            Observation::Landmarks { left, right } => match ear::mean_ear(left, right) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("discarding eye geometry for this tick: {e}");
                    None
                }
            },
        };

        let report = match ear {
            Some(value) => self.face_present_tick(value, now_ms),
            None => self.face_missing_tick(now_ms),
        };
        Ok(report)
    }

    fn face_present_tick(&mut self, ear: f64, now_ms: u64) -> TickReport {
        let mut event = None;

        if self.state.presence == Presence::Absent {
            self.state.presence = Presence::Present;
            self.state.alertness = Alertness::Awake;
            if let Some(onset_ms) = self.state.absence_onset_ms.take() {
                let duration = seconds_between(onset_ms, now_ms);
                info!(duration_seconds = duration, "driver detected again");
                event = Some(MonitorEvent::new(
                    EventKind::PresenceRestored,
                    now_ms,
                    Some(duration),
                ));
            }
        }
        self.state.no_face_streak = 0;

        let disposition = if ear < self.config.ear_threshold {
            self.state.low_ear_streak += 1;
            debug!(ear, streak = self.state.low_ear_streak, "low EAR tick");
            // One event per tick: a restoration on this same tick defers
            // the onset to the next qualifying tick (reachable only with
            // a one-frame debounce).
            if self.state.alertness == Alertness::Awake
                && self.state.low_ear_streak >= self.config.drowsy_debounce_frames
                && event.is_none()
            {
                self.state.alertness = Alertness::Drowsy;
                self.state.drowsy_onset_ms = Some(now_ms);
                warn!(ear, streak = self.state.low_ear_streak, "driver is drowsy");
                event = Some(MonitorEvent::onset(EventKind::DrowsinessOnset, now_ms));
            }
            TickDisposition::EyesClosed
        } else {
            self.state.low_ear_streak = 0;
            if self.state.alertness == Alertness::Drowsy {
                self.state.alertness = Alertness::Awake;
                let duration = self
                    .state
                    .drowsy_onset_ms
                    .take()
                    .map(|onset_ms| seconds_between(onset_ms, now_ms));
                info!(?duration, "driver awake");
                event = Some(MonitorEvent::new(
                    EventKind::DrowsinessCleared,
                    now_ms,
                    duration,
                ));
            }
            TickDisposition::Normal
        };

        TickReport {
            disposition,
            event,
            ear: Some(ear),
        }
    }

    fn face_missing_tick(&mut self, now_ms: u64) -> TickReport {
        let mut event = None;

        self.state.low_ear_streak = 0;
        self.state.no_face_streak += 1;

        if self.state.presence == Presence::Present
            && self.state.no_face_streak >= self.config.absence_debounce_frames
        {
            self.state.presence = Presence::Absent;
            // Re-entry starts from a clean sub-state; no DrowsinessCleared
            // is emitted for an episode interrupted by absence.
            self.state.alertness = Alertness::Awake;
            self.state.drowsy_onset_ms = None;
            self.state.absence_onset_ms = Some(now_ms);
            warn!(streak = self.state.no_face_streak, "driver not detected");
            event = Some(MonitorEvent::onset(EventKind::AbsenceOnset, now_ms));
        }

        TickReport {
            disposition: TickDisposition::FaceMissing,
            event,
            ear: None,
        }
    }
}

fn seconds_between(start_ms: u64, end_ms: u64) -> f64 {
    (end_ms - start_ms) as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK_MS: u64 = 40;

    fn machine() -> DebounceMachine {
        DebounceMachine::new(MonitorConfig::default())
    }

    /// Drive `count` ticks of the given observation, returning emitted events.
    fn drive(
        m: &mut DebounceMachine,
        obs: Observation,
        count: u32,
        start_ms: u64,
    ) -> Vec<MonitorEvent> {
        (0..count)
            .filter_map(|i| {
                m.advance(&obs, start_ms + u64::from(i) * TICK_MS)
                    .unwrap()
                    .event
            })
            .collect()
    }

    #[test]
    fn test_drowsiness_requires_full_debounce() {
        let mut m = machine();

        // 19 low-EAR ticks: one short of the threshold, nothing fires.
        let events = drive(&mut m, Observation::PrecomputedEar(0.10), 19, 0);
        assert!(events.is_empty());
        assert_eq!(m.state().low_ear_streak, 19);
        assert_eq!(m.state().alertness, Alertness::Awake);

        // One good tick resets the streak without any event.
        let report = m
            .advance(&Observation::PrecomputedEar(0.30), 19 * TICK_MS)
            .unwrap();
        assert_eq!(report.event, None);
        assert_eq!(report.disposition, TickDisposition::Normal);
        assert_eq!(m.state().low_ear_streak, 0);
    }

    #[test]
    fn test_drowsiness_onset_on_exact_frame() {
        let mut m = machine();

        let events = drive(&mut m, Observation::PrecomputedEar(0.10), 20, 0);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::DrowsinessOnset);
        assert_eq!(events[0].occurred_at_ms, 19 * TICK_MS);
        assert_eq!(events[0].duration_seconds, None);
        assert_eq!(m.state().alertness, Alertness::Drowsy);
        assert_eq!(m.state().drowsy_onset_ms, Some(19 * TICK_MS));

        // Staying drowsy emits nothing further.
        let events = drive(&mut m, Observation::PrecomputedEar(0.10), 10, 20 * TICK_MS);
        assert!(events.is_empty());
    }

    #[test]
    fn test_single_tick_recovery() {
        let mut m = machine();
        drive(&mut m, Observation::PrecomputedEar(0.10), 20, 0);
        let onset_ms = m.state().drowsy_onset_ms.unwrap();

        // 5 more drowsy ticks, then one good tick clears immediately.
        drive(&mut m, Observation::PrecomputedEar(0.10), 5, 20 * TICK_MS);
        let clear_ms = 25 * TICK_MS;
        let report = m
            .advance(&Observation::PrecomputedEar(0.30), clear_ms)
            .unwrap();

        let event = report.event.unwrap();
        assert_eq!(event.kind, EventKind::DrowsinessCleared);
        let expected = (clear_ms - onset_ms) as f64 / 1000.0;
        assert_eq!(event.duration_seconds, Some(expected));
        assert_eq!(m.state().alertness, Alertness::Awake);
        assert_eq!(m.state().drowsy_onset_ms, None);
    }

    #[test]
    fn test_absence_debounce_resets_on_reappearance() {
        let mut m = machine();

        // 29 missing ticks, one short of the 30-frame window.
        let events = drive(&mut m, Observation::FaceMissing, 29, 0);
        assert!(events.is_empty());
        assert_eq!(m.state().no_face_streak, 29);

        // Reappearance resets the streak; no AbsenceOnset ever fires.
        let report = m
            .advance(&Observation::PrecomputedEar(0.30), 29 * TICK_MS)
            .unwrap();
        assert_eq!(report.event, None);
        assert_eq!(m.state().no_face_streak, 0);
        assert_eq!(m.state().presence, Presence::Present);
    }

    #[test]
    fn test_absence_onset_on_exact_frame() {
        let mut m = machine();

        let events = drive(&mut m, Observation::FaceMissing, 30, 0);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::AbsenceOnset);
        assert_eq!(events[0].occurred_at_ms, 29 * TICK_MS);
        assert_eq!(m.state().presence, Presence::Absent);

        // Staying absent emits nothing further.
        let events = drive(&mut m, Observation::FaceMissing, 10, 30 * TICK_MS);
        assert!(events.is_empty());
    }

    #[test]
    fn test_presence_restored_duration() {
        let mut m = machine();
        drive(&mut m, Observation::FaceMissing, 30, 0);
        let onset_ms = m.state().absence_onset_ms.unwrap();

        drive(&mut m, Observation::FaceMissing, 20, 30 * TICK_MS);
        let restore_ms = 50 * TICK_MS;
        let report = m
            .advance(&Observation::PrecomputedEar(0.30), restore_ms)
            .unwrap();

        let event = report.event.unwrap();
        assert_eq!(event.kind, EventKind::PresenceRestored);
        let expected = (restore_ms - onset_ms) as f64 / 1000.0;
        assert_eq!(event.duration_seconds, Some(expected));
        assert_eq!(m.state().presence, Presence::Present);
        assert_eq!(m.state().absence_onset_ms, None);
    }

    #[test]
    fn test_absence_wipes_drowsy_substate() {
        let mut m = machine();
        drive(&mut m, Observation::PrecomputedEar(0.10), 20, 0);
        assert_eq!(m.state().alertness, Alertness::Drowsy);

        // Driver disappears while drowsy: the absence transition resets
        // the sub-state and only AbsenceOnset is emitted.
        let events = drive(&mut m, Observation::FaceMissing, 30, 20 * TICK_MS);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::AbsenceOnset);
        assert_eq!(m.state().alertness, Alertness::Awake);
        assert_eq!(m.state().drowsy_onset_ms, None);

        // Reappearing with open eyes restores presence, never emits a
        // stale DrowsinessCleared.
        let report = m
            .advance(&Observation::PrecomputedEar(0.30), 50 * TICK_MS)
            .unwrap();
        assert_eq!(report.event.unwrap().kind, EventKind::PresenceRestored);
    }

    #[test]
    fn test_bad_geometry_counts_as_missing_face() {
        let mut m = DebounceMachine::new(MonitorConfig {
            absence_debounce_frames: 2,
            ..Default::default()
        });

        // Horizontal span of zero: outer and inner corner coincide.
        let degenerate = EyeLandmarks([
            (2.0, 0.0),
            (1.0, 1.0),
            (3.0, 1.0),
            (2.0, 0.0),
            (3.0, -1.0),
            (1.0, -1.0),
        ]);
        let obs = Observation::Landmarks {
            left: degenerate,
            right: degenerate,
        };

        let report = m.advance(&obs, 0).unwrap();
        assert_eq!(report.disposition, TickDisposition::FaceMissing);
        assert_eq!(report.ear, None);

        let report = m.advance(&obs, TICK_MS).unwrap();
        assert_eq!(report.event.unwrap().kind, EventKind::AbsenceOnset);
    }

    #[test]
    fn test_landmark_observation_reduces_to_ear() {
        let mut m = machine();
        // Open symmetric eye with EAR 0.5.
        let eye = EyeLandmarks([
            (0.0, 0.0),
            (1.0, 1.0),
            (3.0, 1.0),
            (4.0, 0.0),
            (3.0, -1.0),
            (1.0, -1.0),
        ]);
        let report = m
            .advance(
                &Observation::Landmarks {
                    left: eye,
                    right: eye,
                },
                0,
            )
            .unwrap();
        assert_eq!(report.disposition, TickDisposition::Normal);
        assert_eq!(report.ear, Some(0.5));
    }

    #[test]
    fn test_non_monotonic_tick_rejected() {
        let mut m = machine();
        m.advance(&Observation::PrecomputedEar(0.30), 1000).unwrap();

        let err = m
            .advance(&Observation::PrecomputedEar(0.30), 999)
            .unwrap_err();
        assert!(matches!(
            err,
            MonitorError::NonMonotonicTick {
                last_ms: 1000,
                now_ms: 999
            }
        ));

        // Equal timestamps are allowed (ms resolution can tie at 25 Hz).
        assert!(m.advance(&Observation::PrecomputedEar(0.30), 1000).is_ok());
    }

    #[test]
    fn test_reset_state_on_driver_change() {
        let mut m = machine();
        drive(&mut m, Observation::PrecomputedEar(0.10), 10, 0);
        assert_eq!(m.state().low_ear_streak, 10);

        m.reset_state();
        assert_eq!(m.state().low_ear_streak, 0);
        assert_eq!(m.state().presence, Presence::Present);

        // The tick clock survives the reset.
        let err = m
            .advance(&Observation::PrecomputedEar(0.30), 100)
            .unwrap_err();
        assert!(matches!(err, MonitorError::NonMonotonicTick { .. }));
    }

    #[test]
    fn test_restoration_tick_defers_one_frame_onset() {
        // With a one-frame drowsy debounce a restoration and an onset
        // would coincide; the restoration wins the tick and the onset
        // fires on the next low tick.
        let mut m = DebounceMachine::new(MonitorConfig {
            drowsy_debounce_frames: 1,
            absence_debounce_frames: 2,
            ..Default::default()
        });

        drive(&mut m, Observation::FaceMissing, 2, 0);
        assert_eq!(m.state().presence, Presence::Absent);

        let report = m.advance(&Observation::PrecomputedEar(0.10), 100).unwrap();
        assert_eq!(report.event.unwrap().kind, EventKind::PresenceRestored);
        assert_eq!(m.state().alertness, Alertness::Awake);

        let report = m.advance(&Observation::PrecomputedEar(0.10), 140).unwrap();
        assert_eq!(report.event.unwrap().kind, EventKind::DrowsinessOnset);
        assert_eq!(m.state().alertness, Alertness::Drowsy);
    }
}
