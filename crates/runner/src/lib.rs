//! DriveGuard Session Host
//!
//! Drives the monitoring loop: one observation per tick from the
//! perception source, through the alertness core, with emitted events
//! handed to the alert manager and the event-log repository. Tick
//! pacing lives here; the core never assumes a cadence.

mod session;
mod source;

pub use session::{now_ms, render_summary, RunnerError, SessionRunner};
pub use source::{JsonLineSource, PerceptionSource, ScriptedSource};

use alerting::AlertConfig;
use geolocate::GeolocateConfig;
use monitor::MonitorConfig;
use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Host configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Tick pacing; ~25 Hz nominal.
    pub tick_interval_ms: u64,
    pub monitor: MonitorConfig,
    pub alerts: AlertConfig,
    pub geolocation: GeolocateConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 40,
            monitor: MonitorConfig::default(),
            alerts: AlertConfig::default(),
            geolocation: GeolocateConfig::default(),
        }
    }
}

impl RunnerConfig {
    /// Load from an optional `driveguard.toml` plus `DRIVEGUARD_*` env overrides.
    pub fn load() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("driveguard").required(false))
            .add_source(config::Environment::with_prefix("DRIVEGUARD").separator("__"))
            .build()?;
        settings.try_deserialize()
    }
}

/// Initialize logging
pub fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}
