//! Application settings
//!
//! Loaded from a TOML file. Every section and field is optional and falls
//! back to the defaults below.

use anyhow::{Context, Result};
use lightctl_control::discovery::DEFAULT_PEER_MARKER;
use lightctl_control::dmx::DmxNode;
use lightctl_control::{LightControlOptions, OscEndpointConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the settings file
pub const CONFIG_ENV: &str = "LIGHTCTL_CONFIG";

/// Shortest tick interval the update loop accepts
const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

fn default_tick_rate() -> f32 {
    60.0
}

/// DMX output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DmxSettings {
    /// Devices offered for connection
    pub nodes: Vec<DmxNode>,
    /// Maximum frames per second sent to a device
    pub refresh_rate_hz: u32,
    /// Device to connect to at startup
    pub device: Option<String>,
}

impl Default for DmxSettings {
    fn default() -> Self {
        Self {
            nodes: vec![DmxNode::ArtNet {
                name: "Art-Net broadcast".to_string(),
                target: "255.255.255.255:6454".to_string(),
                universe: 0,
            }],
            refresh_rate_hz: 30,
            device: None,
        }
    }
}

/// Service discovery settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoverySettings {
    /// Advertise the OSC listener over mDNS
    pub enabled: bool,
    /// Browse for controllers and adopt their port
    pub browse: bool,
    /// Substring a controller service name must contain
    pub peer_marker: String,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            browse: true,
            peer_marker: DEFAULT_PEER_MARKER.to_string(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default level filter, overridden by `RUST_LOG`
    pub level: String,
    pub console_output: bool,
    pub file_output: bool,
    pub log_dir: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console_output: true,
            file_output: false,
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl LogConfig {
    /// Parse the configured level, falling back to INFO
    pub fn parse_level(&self) -> tracing::Level {
        self.level.parse().unwrap_or(tracing::Level::INFO)
    }

    pub fn ensure_log_directory(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.log_dir)
    }

    pub fn current_log_path(&self) -> PathBuf {
        self.log_dir.join("light-control.log")
    }
}

/// Top-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Ticks per second of the update loop
    pub tick_rate_hz: f32,
    pub osc: OscEndpointConfig,
    pub dmx: DmxSettings,
    pub discovery: DiscoverySettings,
    pub log: LogConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tick_rate_hz: default_tick_rate(),
            osc: OscEndpointConfig::default(),
            dmx: DmxSettings::default(),
            discovery: DiscoverySettings::default(),
            log: LogConfig::default(),
        }
    }
}

impl Settings {
    /// Parse settings from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Invalid settings")
    }

    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {:?}", path))?;
        Self::from_toml(&text).with_context(|| format!("In settings file: {:?}", path))
    }

    /// Load from the first CLI argument or `LIGHTCTL_CONFIG`, defaults if
    /// neither is given
    pub fn load_from_env() -> Result<Self> {
        let path = std::env::args()
            .nth(1)
            .or_else(|| std::env::var(CONFIG_ENV).ok())
            .map(PathBuf::from);

        match path {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Core options derived from these settings
    pub fn control_options(&self) -> LightControlOptions {
        LightControlOptions {
            osc: self.osc.clone(),
            browse_peers: self.discovery.enabled && self.discovery.browse,
            peer_marker: self.discovery.peer_marker.clone(),
        }
    }

    /// Time between two ticks, never shorter than one millisecond
    pub fn tick_interval(&self) -> Duration {
        let hz = if self.tick_rate_hz.is_finite() && self.tick_rate_hz > 0.0 {
            self.tick_rate_hz
        } else {
            default_tick_rate()
        };
        Duration::from_secs_f32(1.0 / hz).max(MIN_TICK_INTERVAL)
    }
}
