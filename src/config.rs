use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{error, warn};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Built-in layout: a state table on the left, the event list on the right.
pub const DEFAULT_LAYOUT: &[i32] = &[0, 0, 2, 0, 2, 4, 2, 3, 0, 2];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub module: ModuleConfig,
    pub station: StationConfig,
    pub satellites: Vec<u32>,
    pub predict: PredictConfig,
    /// Flat grid list, five integers per view:
    /// (view_kind, left, right, top, bottom).
    #[serde(default = "default_layout")]
    pub layout: Vec<i32>,
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModuleConfig {
    pub name: String,
    /// Base tick period, e.g. "1s" or "500ms".
    #[serde(default = "default_timeout", deserialize_with = "de_duration")]
    pub timeout: Duration,
    #[serde(default = "default_throttle")]
    pub throttle: f64,
    #[serde(default = "default_time_format")]
    pub time_format: String,
    #[serde(default)]
    pub state_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StationConfig {
    pub name: Option<String>,
    pub coordinates: String,
    #[serde(default)]
    pub altitude_m: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredictConfig {
    pub tle_folder: PathBuf,
    /// AOS/LOS search horizon, e.g. "3days".
    #[serde(default = "default_lookahead", deserialize_with = "de_duration")]
    pub lookahead: Duration,
}

impl PredictConfig {
    pub fn horizon_days(&self) -> f64 {
        self.lookahead.as_secs_f64() / 86_400.0
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_addr")]
    pub addr: String,
    #[serde(default = "default_telemetry_namespace")]
    pub namespace: String,
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// The layout list, falling back to the built-in default when the
    /// configured one is not a positive multiple of five entries.
    pub fn validated_layout(&self) -> Vec<i32> {
        if self.layout.is_empty() || self.layout.len() % 5 != 0 {
            error!(
                "module layout is invalid ({} entries), using default",
                self.layout.len()
            );
            return DEFAULT_LAYOUT.to_vec();
        }
        self.layout.clone()
    }
}

/// Module display state, persisted across runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleState {
    #[default]
    Docked,
    Window,
    Fullscreen,
}

/// Dynamic state written at close and read back at the next start: display
/// state plus the effective catalog-key list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynState {
    pub state: ModuleState,
    pub satellites: Vec<u32>,
}

/// Read the persisted state; a missing or unreadable file just means a
/// fresh start.
pub fn load_state(path: &Path) -> Option<DynState> {
    let content = std::fs::read_to_string(path).ok()?;
    match serde_yaml::from_str(&content) {
        Ok(state) => Some(state),
        Err(e) => {
            warn!("ignoring malformed state file {}: {e}", path.display());
            None
        }
    }
}

pub fn save_state(path: &Path, state: &DynState) -> Result<(), ConfigError> {
    let content = serde_yaml::to_string(state)?;
    std::fs::write(path, content)?;
    Ok(())
}

fn de_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(s.trim()).map_err(serde::de::Error::custom)
}

fn default_layout() -> Vec<i32> {
    DEFAULT_LAYOUT.to_vec()
}

fn default_timeout() -> Duration {
    Duration::from_secs(1)
}

fn default_throttle() -> f64 {
    1.0
}

fn default_time_format() -> String {
    "%Y/%m/%d %H:%M:%S".to_string()
}

fn default_lookahead() -> Duration {
    Duration::from_secs(3 * 86_400)
}

fn default_telemetry_addr() -> String {
    "127.0.0.1:7770".to_string()
}

fn default_telemetry_namespace() -> String {
    "satwatch".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
module:
  name: leo-watch
station:
  name: home
  coordinates: "55.1, 12.5"
  altitude_m: 25
satellites: [25544, 33591]
predict:
  tle_folder: /var/lib/satwatch/tle
"#;

    #[test]
    fn minimal_config_fills_defaults() {
        let config: Config = serde_yaml::from_str(MINIMAL).unwrap();
        assert_eq!(config.module.name, "leo-watch");
        assert_eq!(config.module.timeout, Duration::from_secs(1));
        assert_eq!(config.module.throttle, 1.0);
        assert_eq!(config.predict.horizon_days(), 3.0);
        assert_eq!(config.satellites, vec![25544, 33591]);
        assert!(config.telemetry.is_none());
        assert_eq!(config.validated_layout(), DEFAULT_LAYOUT.to_vec());
    }

    #[test]
    fn durations_use_humantime() {
        let with_durations = MINIMAL.replace(
            "  name: leo-watch",
            "  name: leo-watch\n  timeout: 500ms\n  throttle: 10.0",
        );
        let config: Config = serde_yaml::from_str(&with_durations).unwrap();
        assert_eq!(config.module.timeout, Duration::from_millis(500));
        assert_eq!(config.module.throttle, 10.0);
    }

    #[test]
    fn bad_layout_falls_back_to_default() {
        let with_layout = format!("{MINIMAL}layout: [0, 0, 1, 0]\n");
        let config: Config = serde_yaml::from_str(&with_layout).unwrap();
        assert_eq!(config.validated_layout(), DEFAULT_LAYOUT.to_vec());

        let with_layout = format!("{MINIMAL}layout: [4, 0, 1, 0, 1]\n");
        let config: Config = serde_yaml::from_str(&with_layout).unwrap();
        assert_eq!(config.validated_layout(), vec![4, 0, 1, 0, 1]);
    }

    #[test]
    fn state_roundtrip() {
        let dir = std::env::temp_dir().join("satwatch-state-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("state.yaml");

        let state = DynState {
            state: ModuleState::Window,
            satellites: vec![25544],
        };
        save_state(&path, &state).unwrap();

        let loaded = load_state(&path).unwrap();
        assert_eq!(loaded.state, ModuleState::Window);
        assert_eq!(loaded.satellites, vec![25544]);

        assert!(load_state(&dir.join("missing.yaml")).is_none());
    }
}
