use crate::export::is_bare_file_name;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_log_file")]
    pub log_file: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_clear_screen")]
    pub clear_screen: bool,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExportConfig {
    #[serde(default = "default_export_file_name")]
    pub file_name: String,
    /// Proposed at the save prompt; an empty answer then means "use this".
    #[serde(default)]
    pub directory: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RenderConfig {
    #[serde(default = "default_width")]
    pub width: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            log_file: default_log_file(),
            log_level: default_log_level(),
            clear_screen: default_clear_screen(),
            export: ExportConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            file_name: default_export_file_name(),
            directory: None,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("could not parse YAML in {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("invalid configuration: {0}")]
    Validation(String),
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_display = path_ref.display().to_string();

        let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_display.clone(),
            source,
        })?;
        Self::from_yaml(&text, &path_display)
    }

    fn from_yaml(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let cfg: Config = serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=5000).contains(&self.settle_delay_ms) {
            return Err(ConfigError::Validation(
                "settle_delay_ms must be between 1 and 5000".to_string(),
            ));
        }
        if self.log_file.trim().is_empty() {
            return Err(ConfigError::Validation(
                "log_file must not be empty".to_string(),
            ));
        }
        if self.log_level.parse::<tracing::Level>().is_err() {
            return Err(ConfigError::Validation(format!(
                "log_level '{}' is not one of trace, debug, info, warn, error",
                self.log_level
            )));
        }
        if !(20..=200).contains(&self.render.width) {
            return Err(ConfigError::Validation(
                "render.width must be between 20 and 200".to_string(),
            ));
        }
        validate_export(&self.export)?;
        Ok(())
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn example_yaml() -> &'static str {
        include_str!("../config.yaml.example")
    }
}

fn validate_export(cfg: &ExportConfig) -> Result<(), ConfigError> {
    let name = cfg.file_name.trim();
    if name.is_empty() {
        return Err(ConfigError::Validation(
            "export.file_name must not be empty".to_string(),
        ));
    }
    if !is_bare_file_name(name) {
        return Err(ConfigError::Validation(format!(
            "export.file_name '{name}' must be a bare file name"
        )));
    }
    if cfg.directory.as_deref().is_some_and(|d| d.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "export.directory must not be blank when set".to_string(),
        ));
    }
    Ok(())
}

const fn default_settle_delay_ms() -> u64 {
    100
}

fn default_log_file() -> String {
    "system_monitor_logs.log".to_string()
}

fn default_log_level() -> String {
    "debug".to_string()
}

const fn default_clear_screen() -> bool {
    true
}

fn default_export_file_name() -> String {
    "system-info".to_string()
}

const fn default_width() -> usize {
    50
}
