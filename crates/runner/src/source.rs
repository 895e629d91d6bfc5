//! Perception sources
//!
//! The narrow boundary to the perception collaborator: one observation
//! per tick, end of stream ends the session.

use monitor::Observation;
use std::collections::VecDeque;
use std::io::BufRead;
use tracing::{error, warn};

/// Supplies one observation per tick.
pub trait PerceptionSource {
    /// Next per-tick observation; `None` ends the session.
    fn next_observation(&mut self) -> Option<Observation>;
}

/// Canned observation sequence for tests and dry runs.
pub struct ScriptedSource {
    queue: VecDeque<Observation>,
}

impl ScriptedSource {
    pub fn new(observations: impl IntoIterator<Item = Observation>) -> Self {
        Self {
            queue: observations.into_iter().collect(),
        }
    }
}

impl PerceptionSource for ScriptedSource {
    fn next_observation(&mut self) -> Option<Observation> {
        self.queue.pop_front()
    }
}

/// JSON-lines observation stream, e.g. the perception process piping
/// into stdin. Malformed lines are skipped with a warning; a read
/// failure ends the session.
pub struct JsonLineSource<R> {
    lines: std::io::Lines<R>,
}

impl<R: BufRead> JsonLineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }
}

impl<R: BufRead> PerceptionSource for JsonLineSource<R> {
    fn next_observation(&mut self) -> Option<Observation> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => {
                    error!("observation stream read failed: {e}");
                    return None;
                }
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str(trimmed) {
                Ok(observation) => return Some(observation),
                Err(e) => {
                    warn!("skipping malformed observation line: {e}");
                }
            }
        }
    }
}
