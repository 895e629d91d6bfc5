//! Session loop
//!
//! Paces the tick cadence, drives the alertness core, and fans emitted
//! events out to the alert manager and the event-log repository.

use alerting::AlertManager;
use chrono::{DateTime, Utc};
use geolocate::LocationTag;
use monitor::{DriverMonitor, MonitorError, MonitorEvent, SessionStats};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use storage::{EventRecord, Repository, SessionRecord, StorageError};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::source::PerceptionSource;
use crate::RunnerConfig;

/// Host-side errors
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("monitor error: {0}")]
    Monitor(#[from] MonitorError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

/// Current wall-clock time in milliseconds since the epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// One monitoring session from start to summary.
pub struct SessionRunner {
    session_id: Uuid,
    tick_interval: Duration,
    monitor: DriverMonitor,
    alerts: AlertManager,
    repository: Arc<Repository>,
    /// Resolved once at startup; attached to every event record.
    location: Option<LocationTag>,
}

impl SessionRunner {
    pub fn new(
        config: &RunnerConfig,
        repository: Arc<Repository>,
        location: Option<LocationTag>,
    ) -> Result<Self, RunnerError> {
        let session_id = Uuid::new_v4();
        let started_at_ms = now_ms();
        info!(%session_id, started_at_ms, "starting monitoring session");

        Ok(Self {
            session_id,
            tick_interval: Duration::from_millis(config.tick_interval_ms),
            monitor: DriverMonitor::new(config.monitor.clone(), started_at_ms)?,
            alerts: AlertManager::new(config.alerts.clone()),
            repository,
            location,
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn monitor(&self) -> &DriverMonitor {
        &self.monitor
    }

    /// Drive ticks until the source is exhausted, then close the session
    /// and persist its record. Returns the frozen statistics.
    pub async fn run<S: PerceptionSource>(
        &mut self,
        source: &mut S,
    ) -> Result<SessionStats, RunnerError> {
        let mut ticker = tokio::time::interval(self.tick_interval);

        while let Some(observation) = source.next_observation() {
            ticker.tick().await;
            let now = now_ms();
            let report = self.monitor.tick(&observation, now)?;
            debug!(disposition = ?report.disposition, ear = ?report.ear, "tick");

            if let Some(event) = report.event {
                self.handle_event(&event, now)?;
            }
        }

        self.finish(now_ms())
    }

    fn handle_event(&mut self, event: &MonitorEvent, now_ms: u64) -> Result<(), RunnerError> {
        if let Some(action) = self.alerts.dispatch(event, now_ms) {
            info!(
                banner = action.banner,
                color = action.color,
                sound = ?action.sound,
                modal = action.modal,
                "alert action"
            );
        }

        let record = EventRecord {
            id: 0,
            timestamp_ms: event.occurred_at_ms,
            event_type: event.kind.label().to_string(),
            details: event.detail.clone(),
            duration_seconds: event.duration_seconds.unwrap_or(0.0),
            latitude: self.location.as_ref().map(|l| l.latitude),
            longitude: self.location.as_ref().map(|l| l.longitude),
            location: self.location.as_ref().map(|l| l.place.clone()),
        };
        self.repository.insert_event(record)?;
        Ok(())
    }

    fn finish(&mut self, now_ms: u64) -> Result<SessionStats, RunnerError> {
        let stats = self.monitor.end_session(now_ms)?;

        let record = SessionRecord {
            id: 0,
            started_at_ms: stats.started_at_ms,
            ended_at_ms: now_ms,
            duration_seconds: stats.duration_seconds().unwrap_or(0.0),
            total_frames: stats.total_frames,
            normal_frames: stats.normal_frames,
            drowsy_alerts: stats.drowsy_alerts,
            absent_alerts: stats.absent_alerts,
            accuracy: stats.accuracy(),
        };
        self.repository.insert_session(record)?;

        info!(session_id = %self.session_id, "session persisted");
        Ok(stats)
    }
}

/// Render the end-of-session summary block.
pub fn render_summary(stats: &SessionStats) -> String {
    let duration = stats.duration_seconds().unwrap_or(0.0);
    let minutes = (duration / 60.0) as u64;
    let seconds = (duration % 60.0) as u64;
    let end_time = stats
        .ended_at_ms
        .map(format_timestamp)
        .unwrap_or_else(|| "-".to_string());

    format!(
        "\n\
         ========= DRIVEGUARD SESSION SUMMARY =========\n\
         Start Time      : {}\n\
         End Time        : {}\n\
         Duration        : {} min {} sec\n\
         Total Frames    : {}\n\
         Normal Frames   : {}\n\
         Drowsy Alerts   : {}\n\
         Absent Alerts   : {}\n\
         System Accuracy : {:.2} %\n\
         ==============================================",
        format_timestamp(stats.started_at_ms),
        end_time,
        minutes,
        seconds,
        stats.total_frames,
        stats.normal_frames,
        stats.drowsy_alerts,
        stats.absent_alerts,
        stats.accuracy(),
    )
}

fn format_timestamp(ms: u64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms as i64)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ms.to_string())
}
