//! Repository Implementation

use crate::StorageError;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::{debug, info};

/// One logged lifecycle event.
///
/// The geolocation columns are opaque passthrough, attached by the host
/// from whatever the location collaborator resolved at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: i64,
    pub timestamp_ms: u64,
    /// Event type label ("Drowsiness", "Alert", "Driver Absence", ...).
    pub event_type: String,
    pub details: String,
    /// Episode length for recovery events; 0.0 for onsets.
    pub duration_seconds: f64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub location: Option<String>,
}

/// One completed monitoring session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: i64,
    pub started_at_ms: u64,
    pub ended_at_ms: u64,
    pub duration_seconds: f64,
    pub total_frames: u64,
    pub normal_frames: u64,
    pub drowsy_alerts: u32,
    pub absent_alerts: u32,
    /// Share of normal frames, percent.
    pub accuracy: f64,
}

/// In-memory repository with bounded retention.
pub struct Repository {
    /// Event log, oldest first.
    events: Mutex<VecDeque<EventRecord>>,
    /// Completed sessions.
    sessions: Mutex<Vec<SessionRecord>>,
    /// Max retained event records.
    max_event_records: usize,
    /// Max retained session records.
    max_session_records: usize,
    /// Next record ids.
    next_event_id: Mutex<i64>,
    next_session_id: Mutex<i64>,
}

impl Repository {
    pub fn new() -> Self {
        info!("Creating in-memory repository");
        Self {
            events: Mutex::new(VecDeque::with_capacity(1_000)),
            sessions: Mutex::new(Vec::with_capacity(64)),
            max_event_records: 50_000,
            max_session_records: 1_000,
            next_event_id: Mutex::new(1),
            next_session_id: Mutex::new(1),
        }
    }

    /// Append an event record, evicting the oldest past the retention cap.
    pub fn insert_event(&self, mut record: EventRecord) -> Result<i64, StorageError> {
        let mut events = self
            .events
            .lock()
            .map_err(|e| StorageError::Backend(format!("Lock error: {}", e)))?;

        let mut id = self
            .next_event_id
            .lock()
            .map_err(|e| StorageError::Backend(format!("Lock error: {}", e)))?;
        record.id = *id;
        *id += 1;

        while events.len() >= self.max_event_records {
            events.pop_front();
        }

        let returned_id = record.id;
        debug!(
            id = returned_id,
            event_type = %record.event_type,
            "Inserted event record"
        );
        events.push_back(record);
        Ok(returned_id)
    }

    /// Append a completed-session record.
    pub fn insert_session(&self, mut record: SessionRecord) -> Result<i64, StorageError> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Backend(format!("Lock error: {}", e)))?;

        let mut id = self
            .next_session_id
            .lock()
            .map_err(|e| StorageError::Backend(format!("Lock error: {}", e)))?;
        record.id = *id;
        *id += 1;

        if sessions.len() >= self.max_session_records {
            sessions.remove(0);
        }

        let returned_id = record.id;
        sessions.push(record);
        debug!("Inserted session record with ID {}", returned_id);
        Ok(returned_id)
    }

    /// Most recent events, newest first.
    pub fn recent_events(&self, limit: usize) -> Result<Vec<EventRecord>, StorageError> {
        let events = self
            .events
            .lock()
            .map_err(|e| StorageError::Backend(format!("Lock error: {}", e)))?;

        Ok(events.iter().rev().take(limit).cloned().collect())
    }

    /// Events at or after a timestamp, oldest first.
    pub fn events_since(&self, since_ms: u64) -> Result<Vec<EventRecord>, StorageError> {
        let events = self
            .events
            .lock()
            .map_err(|e| StorageError::Backend(format!("Lock error: {}", e)))?;

        Ok(events
            .iter()
            .filter(|r| r.timestamp_ms >= since_ms)
            .cloned()
            .collect())
    }

    /// Most recent events of one type, newest first.
    pub fn events_by_type(
        &self,
        event_type: &str,
        limit: usize,
    ) -> Result<Vec<EventRecord>, StorageError> {
        let events = self
            .events
            .lock()
            .map_err(|e| StorageError::Backend(format!("Lock error: {}", e)))?;

        Ok(events
            .iter()
            .rev()
            .filter(|r| r.event_type == event_type)
            .take(limit)
            .cloned()
            .collect())
    }

    /// Most recent sessions, newest first.
    pub fn sessions(&self, limit: usize) -> Result<Vec<SessionRecord>, StorageError> {
        let sessions = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Backend(format!("Lock error: {}", e)))?;

        Ok(sessions.iter().rev().take(limit).cloned().collect())
    }

    pub fn event_count(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Clear all data (for testing)
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.clear();
        }
    }
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}
