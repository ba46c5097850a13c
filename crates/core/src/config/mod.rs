//! Congestion control configuration.
//!
//! Settings come from (lowest to highest precedence) built-in defaults, an
//! optional TOML file and command line arguments / environment variables.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::ahs::{AhsConfig, INITIAL_RTT_ESTIMATE, STATIC_WINDOW};
use crate::congestion_control::{CongestionControlAlgorithm, CongestionControlConfig};
use crate::errors::ConfigError;

#[derive(clap::Args, Debug, Default, Clone, Serialize, Deserialize)]
pub struct CongestionArgs {
    /// Congestion control algorithm for new connections.
    ///
    /// Available algorithms:
    /// - `ahs` (default): static window, assumes losses are not caused by congestion
    /// - `veno`: delay-based Reno refinement for wireless links
    /// - `reno`: classic loss-based AIMD
    #[arg(long, env = "AHS_CONGESTION_CONTROL")]
    #[serde(rename = "congestion-control", skip_serializing_if = "Option::is_none")]
    pub congestion_control: Option<String>,

    /// Window (segments) AHS pins connections to.
    ///
    /// Default: 65000
    #[arg(long, env = "AHS_STATIC_WINDOW")]
    #[serde(rename = "static-window", skip_serializing_if = "Option::is_none")]
    pub static_window: Option<u32>,

    /// RTT estimate (milliseconds) AHS assumes before the first sample.
    ///
    /// Default: 1000
    #[arg(long, env = "AHS_INITIAL_RTT_MS")]
    #[serde(rename = "initial-rtt-ms", skip_serializing_if = "Option::is_none")]
    pub initial_rtt_ms: Option<u64>,

    /// Path to a TOML file with congestion control settings.
    #[arg(long = "config", env = "AHS_CONFIG")]
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl CongestionArgs {
    /// Resolve the final settings. Arguments override the config file, which
    /// overrides the defaults.
    pub fn build(self) -> Result<CongestionSettings, ConfigError> {
        let mut settings = match &self.config_path {
            Some(path) => CongestionSettings::load(path)?,
            None => CongestionSettings::default(),
        };

        if let Some(congestion_control) = self.congestion_control {
            settings.congestion_control = congestion_control;
        }
        if let Some(window) = self.static_window {
            settings.static_window = window;
        }
        if let Some(rtt_ms) = self.initial_rtt_ms {
            settings.initial_rtt_ms = rtt_ms;
        }

        // Reject unknown names early rather than at connection time.
        settings.algorithm()?;
        Ok(settings)
    }
}

/// Resolved congestion control settings, as stored in a config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CongestionSettings {
    #[serde(default = "default_congestion_control", rename = "congestion-control")]
    pub congestion_control: String,

    #[serde(default = "default_static_window", rename = "static-window")]
    pub static_window: u32,

    #[serde(default = "default_initial_rtt_ms", rename = "initial-rtt-ms")]
    pub initial_rtt_ms: u64,
}

impl Default for CongestionSettings {
    fn default() -> Self {
        Self {
            congestion_control: default_congestion_control(),
            static_window: default_static_window(),
            initial_rtt_ms: default_initial_rtt_ms(),
        }
    }
}

impl CongestionSettings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let settings = toml::from_str(&contents)?;
        tracing::debug!(path = %path.display(), "loaded congestion control settings");
        Ok(settings)
    }

    pub fn algorithm(&self) -> Result<CongestionControlAlgorithm, ConfigError> {
        self.congestion_control.parse()
    }

    /// Build a `CongestionControlConfig` from these settings.
    pub fn build_congestion_config(&self) -> Result<CongestionControlConfig, ConfigError> {
        let algorithm = self.algorithm()?;
        let mut config = CongestionControlConfig::new(algorithm);

        if algorithm == CongestionControlAlgorithm::Ahs {
            config = CongestionControlConfig::from_ahs_config(AhsConfig {
                static_window: self.static_window,
                initial_rtt: Duration::from_millis(self.initial_rtt_ms),
            });
            tracing::debug!(
                static_window = self.static_window,
                initial_rtt_ms = self.initial_rtt_ms,
                "Using AHS static window"
            );
        }

        Ok(config)
    }
}

/// Default congestion control algorithm.
fn default_congestion_control() -> String {
    CongestionControlAlgorithm::Ahs.to_string()
}

fn default_static_window() -> u32 {
    STATIC_WINDOW
}

fn default_initial_rtt_ms() -> u64 {
    INITIAL_RTT_ESTIMATE.as_millis() as u64
}

pub fn set_logger(level: Option<tracing::level_filters::LevelFilter>) {
    #[cfg(feature = "trace")]
    {
        use std::sync::atomic::AtomicBool;

        static LOGGER_SET: AtomicBool = AtomicBool::new(false);
        if LOGGER_SET
            .compare_exchange(
                false,
                true,
                std::sync::atomic::Ordering::Release,
                std::sync::atomic::Ordering::SeqCst,
            )
            .is_err()
        {
            return;
        }

        if let Err(err) = crate::tracing::tracer::init_tracer(level) {
            eprintln!("failed tracing initialization: {err}");
        }
    }
    #[cfg(not(feature = "trace"))]
    {
        let _ = level;
    }
}
