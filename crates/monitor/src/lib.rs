//! Driver Alertness Monitoring Core
//!
//! Converts a noisy per-frame face/eye signal into debounced hazard
//! events and running session statistics:
//! - Debounced drowsiness detection (sustained low eye-aspect-ratio)
//! - Debounced absence detection (sustained missing face)
//! - Per-session frame and alert accounting
//!
//! The core is a strictly sequential reducer: one `tick` per frame,
//! no internal concurrency, no blocking. Camera acquisition, landmark
//! detection, persistence, and alert rendering live behind the
//! observation input and the emitted event values.

pub mod config;
pub mod event;
pub mod machine;
pub mod session;
pub mod state;

pub use config::MonitorConfig;
pub use event::{EventKind, MonitorEvent};
pub use machine::{DebounceMachine, Observation, TickDisposition, TickReport};
pub use session::{SessionAggregator, SessionError, SessionStats};
pub use state::{Alertness, MonitorState, Presence};

use thiserror::Error;

/// Core error types
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("tick timestamp {now_ms}ms precedes previous tick at {last_ms}ms")]
    NonMonotonicTick { last_ms: u64, now_ms: u64 },

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Facade owning the state machine and the session aggregator.
///
/// One `tick` call per frame advances the machine and feeds the
/// aggregator in a single serialized step; `end_session` freezes and
/// returns the session snapshot.
pub struct DriverMonitor {
    machine: DebounceMachine,
    session: SessionAggregator,
}

impl DriverMonitor {
    /// Create a monitor for a new session starting at `started_at_ms`.
    pub fn new(config: MonitorConfig, started_at_ms: u64) -> Result<Self, MonitorError> {
        config.validate()?;
        Ok(Self {
            machine: DebounceMachine::new(config),
            session: SessionAggregator::new(started_at_ms),
        })
    }

    /// Process one observation.
    pub fn tick(
        &mut self,
        observation: &Observation,
        now_ms: u64,
    ) -> Result<TickReport, MonitorError> {
        let report = self.machine.advance(observation, now_ms)?;
        self.session.on_tick(report.disposition)?;
        if let Some(event) = &report.event {
            self.session.on_event(event)?;
        }
        Ok(report)
    }

    /// End the session and return the frozen statistics.
    pub fn end_session(&mut self, now_ms: u64) -> Result<SessionStats, MonitorError> {
        Ok(self.session.close(now_ms)?)
    }

    /// Reset the debounce state (on driver change); session counters
    /// keep accumulating.
    pub fn reset_state(&mut self) {
        self.machine.reset_state();
    }

    pub fn state(&self) -> &MonitorState {
        self.machine.state()
    }

    pub fn session(&self) -> &SessionStats {
        self.session.stats()
    }

    pub fn config(&self) -> &MonitorConfig {
        self.machine.config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TICK_MS: u64 = 40;

    fn run(m: &mut DriverMonitor, obs: Observation, count: u32, start: u64) -> Vec<MonitorEvent> {
        (0..count)
            .filter_map(|i| {
                m.tick(&obs, start + u64::from(i) * TICK_MS)
                    .unwrap()
                    .event
            })
            .collect()
    }

    #[test]
    fn test_awake_then_drowsy_then_recovery() {
        let mut m = DriverMonitor::new(MonitorConfig::default(), 0).unwrap();

        // 40 open-eyed ticks: all normal, no alerts.
        let events = run(&mut m, Observation::PrecomputedEar(0.30), 40, 0);
        assert!(events.is_empty());
        assert_eq!(m.session().total_frames, 40);
        assert_eq!(m.session().normal_frames, 40);
        assert_eq!(m.session().drowsy_alerts, 0);

        // 20 low-EAR ticks: onset fires on the 20th, the run-up never
        // counts as normal.
        let events = run(&mut m, Observation::PrecomputedEar(0.10), 20, 40 * TICK_MS);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::DrowsinessOnset);
        assert_eq!(m.session().drowsy_alerts, 1);
        assert_eq!(m.session().total_frames, 60);
        assert_eq!(m.session().normal_frames, 40);

        // A single good tick clears immediately; the drowsiness episode
        // lasted exactly one tick interval.
        let report = m
            .tick(&Observation::PrecomputedEar(0.30), 60 * TICK_MS)
            .unwrap();
        let event = report.event.unwrap();
        assert_eq!(event.kind, EventKind::DrowsinessCleared);
        assert_eq!(event.duration_seconds, Some(TICK_MS as f64 / 1000.0));
        assert_eq!(m.session().normal_frames, 41);
    }

    #[test]
    fn test_absence_scenario() {
        let mut m = DriverMonitor::new(MonitorConfig::default(), 0).unwrap();

        let events = run(&mut m, Observation::FaceMissing, 30, 0);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::AbsenceOnset);
        assert_eq!(m.session().absent_alerts, 1);
        assert_eq!(m.session().total_frames, 30);
        assert_eq!(m.session().normal_frames, 0);
    }

    #[test]
    fn test_end_session_snapshot() {
        let mut m = DriverMonitor::new(MonitorConfig::default(), 0).unwrap();
        run(&mut m, Observation::PrecomputedEar(0.30), 10, 0);

        let stats = m.end_session(10 * TICK_MS).unwrap();
        assert_eq!(stats.total_frames, 10);
        assert_eq!(stats.normal_frames, 10);
        assert!((stats.accuracy() - 100.0).abs() < 1e-9);
        assert_eq!(stats.duration_seconds(), Some(0.4));

        // Second close is rejected; ticking a closed session is too.
        assert!(m.end_session(11 * TICK_MS).is_err());
        assert!(m
            .tick(&Observation::PrecomputedEar(0.30), 11 * TICK_MS)
            .is_err());
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = MonitorConfig {
            drowsy_debounce_frames: 0,
            ..Default::default()
        };
        assert!(DriverMonitor::new(config, 0).is_err());
    }

    fn arb_observation() -> impl Strategy<Value = Observation> {
        prop_oneof![
            2 => Just(Observation::FaceMissing),
            5 => (0.0f64..0.5).prop_map(Observation::PrecomputedEar),
        ]
    }

    proptest! {
        #[test]
        fn prop_counters_track_ticks(observations in prop::collection::vec(arb_observation(), 1..300)) {
            let mut m = DriverMonitor::new(
                MonitorConfig {
                    drowsy_debounce_frames: 3,
                    absence_debounce_frames: 4,
                    ..Default::default()
                },
                0,
            )
            .unwrap();

            for (i, obs) in observations.iter().enumerate() {
                let report = m.tick(obs, i as u64 * TICK_MS).unwrap();

                // Streak invariants hold after every tick.
                match obs {
                    Observation::FaceMissing => {
                        prop_assert_eq!(m.state().low_ear_streak, 0);
                    }
                    _ => {
                        prop_assert_eq!(m.state().no_face_streak, 0);
                    }
                }
                if m.state().alertness == Alertness::Drowsy {
                    prop_assert!(m.state().drowsy_onset_ms.is_some());
                }
                if m.state().presence == Presence::Absent {
                    prop_assert!(m.state().absence_onset_ms.is_some());
                    prop_assert_eq!(m.state().alertness, Alertness::Awake);
                }
                // Recovery edges always carry a duration.
                if let Some(event) = &report.event {
                    prop_assert_eq!(
                        event.duration_seconds.is_some(),
                        !event.kind.is_hazard_onset()
                    );
                }
            }

            let stats = m.session();
            prop_assert_eq!(stats.total_frames, observations.len() as u64);
            prop_assert!(stats.normal_frames <= stats.total_frames);
            prop_assert!(stats.accuracy() <= 100.0);
        }
    }
}
