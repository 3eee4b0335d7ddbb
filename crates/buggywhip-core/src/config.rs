//! Configuration resolution for buggywhip.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/buggywhip/settings.json)
//! 3. Project config (.buggywhip/settings.json)
//! 4. Environment variables
//! 5. CLI arguments (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Complete buggywhip configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub shell: ShellConfig,
    #[serde(default)]
    pub list: ListConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shell: ShellConfig::default(),
            list: ListConfig::default(),
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// Debuggee shell configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Shell executable; it receives the script pipe as its only argument.
    pub executable: PathBuf,
    /// Capacity of the per-session line queue.
    pub feed_queue_capacity: usize,
    /// Capacity (in chunks) of each output sink channel.
    pub output_buffer_chunks: usize,
    /// How long to wait for the shell to open its script pipe.
    pub pipe_open_timeout_ms: u64,
    /// Kill the shell if it has not exited this long after its input closed.
    /// `None` waits indefinitely.
    pub terminate_timeout_secs: Option<u64>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("/bin/sh"),
            feed_queue_capacity: 1024,
            output_buffer_chunks: 1024,
            pipe_open_timeout_ms: 10_000,
            terminate_timeout_secs: None,
        }
    }
}

impl ShellConfig {
    pub const fn pipe_open_timeout(&self) -> Duration {
        Duration::from_millis(self.pipe_open_timeout_ms)
    }

    pub fn terminate_timeout(&self) -> Option<Duration> {
        self.terminate_timeout_secs.map(Duration::from_secs)
    }
}

/// Source listing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListConfig {
    /// Lines printed per `list` command.
    pub count: usize,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self { count: 10 }
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config(project_dir: Option<&Path>) -> Result<Config> {
    let global = global_config_path();
    let project = project_dir.map(|dir| dir.join(".buggywhip").join("settings.json"));

    let mut config = load_layers(global.iter().chain(project.iter()))?;
    apply_env_overrides(&mut config);

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .map(|p| p.join("buggywhip").join("settings.json"))
    }
    #[cfg(not(target_os = "linux"))]
    {
        dirs::config_dir().map(|p| p.join("buggywhip").join("settings.json"))
    }
}

/// Merge the settings files in `paths`, later files winning key by key.
///
/// Missing files are skipped. Only the keys a file actually contains
/// override earlier layers; `null` clears an optional setting.
fn load_layers<'a, I>(paths: I) -> Result<Config>
where
    I: IntoIterator<Item = &'a PathBuf>,
{
    let mut merged = Value::Object(Map::new());
    for path in paths {
        if path.exists() {
            merge_values(&mut merged, load_config_file(path)?);
        }
    }
    serde_json::from_value(merged)
        .map_err(|e| Error::Config(format!("Invalid configuration: {e}")))
}

fn load_config_file(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    let value: Value = serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })?;
    if !value.is_object() {
        return Err(Error::Config(format!(
            "Config file {} must contain a JSON object",
            path.display()
        )));
    }
    Ok(value)
}

fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                merge_values(base.entry(key).or_insert(Value::Null), value);
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(val) = std::env::var("BUGGYWHIP_SHELL") {
        config.shell.executable = PathBuf::from(val);
    }
    if let Ok(val) = std::env::var("BUGGYWHIP_FEED_CAPACITY")
        && let Ok(n) = val.parse()
    {
        config.shell.feed_queue_capacity = n;
    }
    if let Ok(val) = std::env::var("BUGGYWHIP_LIST_COUNT")
        && let Ok(n) = val.parse()
    {
        config.list.count = n;
    }
    if let Ok(val) = std::env::var("BUGGYWHIP_LOG_LEVEL") {
        config.log_level = val;
    }
}
