//! Alerting System
//!
//! Turns lifecycle events into deduplicated, sink-facing alert actions
//! (banner text, panel color, sound cue, modal acknowledgment).

mod manager;

pub use manager::{AlertAction, AlertConfig, AlertManager, AlertState};
