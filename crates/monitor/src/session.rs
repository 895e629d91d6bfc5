//! Session aggregation
//!
//! Running frame and alert counters for one monitoring session, closed
//! once into an immutable snapshot.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::event::{EventKind, MonitorEvent};
use crate::machine::TickDisposition;

/// Session lifecycle errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session already closed")]
    Closed,
}

/// Counters for one monitoring session.
///
/// `normal_frames <= total_frames` holds by construction; all counters
/// are monotonically non-decreasing until close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub started_at_ms: u64,

    /// Unset until the session is closed.
    pub ended_at_ms: Option<u64>,

    pub total_frames: u64,
    pub normal_frames: u64,
    pub drowsy_alerts: u32,
    pub absent_alerts: u32,
}

impl SessionStats {
    fn new(started_at_ms: u64) -> Self {
        Self {
            started_at_ms,
            ended_at_ms: None,
            total_frames: 0,
            normal_frames: 0,
            drowsy_alerts: 0,
            absent_alerts: 0,
        }
    }

    /// Share of normal frames as a percentage; 0 for an empty session.
    pub fn accuracy(&self) -> f64 {
        if self.total_frames == 0 {
            return 0.0;
        }
        self.normal_frames as f64 / self.total_frames as f64 * 100.0
    }

    /// Wall-clock session length, available once closed.
    pub fn duration_seconds(&self) -> Option<f64> {
        self.ended_at_ms
            .map(|end_ms| (end_ms - self.started_at_ms) as f64 / 1000.0)
    }
}

/// Accumulates per-tick and per-event counts; inert after [`close`].
///
/// [`close`]: SessionAggregator::close
pub struct SessionAggregator {
    stats: SessionStats,
    closed: bool,
}

impl SessionAggregator {
    pub fn new(started_at_ms: u64) -> Self {
        Self {
            stats: SessionStats::new(started_at_ms),
            closed: false,
        }
    }

    /// Count one tick. Only present-and-eyes-open ticks count as normal.
    pub fn on_tick(&mut self, disposition: TickDisposition) -> Result<(), SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        self.stats.total_frames += 1;
        if disposition == TickDisposition::Normal {
            self.stats.normal_frames += 1;
        }
        Ok(())
    }

    /// Count hazard onsets; recovery edges leave the counters untouched.
    pub fn on_event(&mut self, event: &MonitorEvent) -> Result<(), SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        match event.kind {
            EventKind::DrowsinessOnset => self.stats.drowsy_alerts += 1,
            EventKind::AbsenceOnset => self.stats.absent_alerts += 1,
            EventKind::DrowsinessCleared | EventKind::PresenceRestored => {}
        }
        Ok(())
    }

    /// Freeze the counters and return the snapshot.
    ///
    /// A second close is rejected; the first snapshot stays authoritative.
    pub fn close(&mut self, now_ms: u64) -> Result<SessionStats, SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        self.closed = true;
        self.stats.ended_at_ms = Some(now_ms);
        info!(
            total_frames = self.stats.total_frames,
            normal_frames = self.stats.normal_frames,
            drowsy_alerts = self.stats.drowsy_alerts,
            absent_alerts = self.stats.absent_alerts,
            accuracy = self.stats.accuracy(),
            "session closed"
        );
        Ok(self.stats.clone())
    }

    /// Current counters; computable at any time, meaningful at close.
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
