//! Application configuration
//!
//! One TOML file covering every deployment knob, each section optional and
//! falling back to the defaults in `reeltally-core`. Missing file means a
//! default station, which is enough for bench testing against a simulator.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use reeltally_core::{
    ControllerConfig, ReportConfig, RetryConfig, ScannerConfig, SignalMap, StationConfig,
};

/// Complete configuration for the reeltally daemon
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub controller: ControllerConfig,
    pub scanner: ScannerConfig,
    pub signals: SignalMap,
    pub retry: RetryConfig,
    pub reports: ReportConfig,
    pub station: StationConfig,
}

impl AppConfig {
    /// Load from a TOML file
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing config file {}", path.display()))
    }
}
