use crate::server::connection::DEFAULT_RECV_BUFFER_SIZE;
use crate::server::{timer, ServerSettings, TimestampSettings};
use anyhow::{bail, Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub timer: TimerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Bytes requested per socket receive.
    pub recv_buffer_size: usize,
    /// Accept-loop and idle-worker polling period; bounds shutdown latency.
    pub poll_interval_ms: u64,
    /// Time connections get to wind down before being force-closed.
    pub shutdown_grace_ms: u64,
    /// Interpret `AESDCHAR_IOCSEEKTO:X,Y` lines as seek requests.
    pub seek_commands: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Number of entries the ring holds before overwriting the oldest.
    pub capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    pub enabled: bool,
    pub interval_sec: u64,
    /// chrono strftime pattern; a newline is appended to each record.
    pub format: String,
}

// ── Defaults ─────────────────────────────────────────────────────────

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address:      "0.0.0.0".into(),
            port:              9000,
            recv_buffer_size:  DEFAULT_RECV_BUFFER_SIZE,
            poll_interval_ms:  100,
            shutdown_grace_ms: 2000,
            seek_commands:     true,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { capacity: 10 }
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            enabled:      true,
            interval_sec: timer::DEFAULT_INTERVAL.as_secs(),
            format:       timer::DEFAULT_FORMAT.into(),
        }
    }
}

// ── Load / Save ───────────────────────────────────────────────────────

impl Config {
    /// Loads the per-user config file, falling back to defaults when there
    /// is no config directory.
    pub fn load() -> Self {
        Self::config_path().map(|p| Self::load_or_init(&p)).unwrap_or_default()
    }

    /// A missing file is created with the defaults. A file that exists but
    /// does not parse is left alone and the defaults are used for this run.
    pub fn load_or_init(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text).unwrap_or_else(|e| {
                warn!("ignoring {}: {}", path.display(), e);
                Config::default()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if let Err(e) = write_defaults(path) {
                    debug!("could not write default config to {}: {:#}", path.display(), e);
                }
                Config::default()
            }
            Err(e) => {
                warn!("cannot read {}: {}", path.display(), e);
                Config::default()
            }
        }
    }

    /// Loads an explicitly named file. Unlike [`Config::load`], failure is
    /// an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ringlogd").join("ringlogd.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.log.capacity == 0 {
            bail!("log.capacity must be at least 1");
        }
        if self.server.recv_buffer_size == 0 {
            bail!("server.recv_buffer_size must be at least 1");
        }
        if self.server.poll_interval_ms == 0 {
            bail!("server.poll_interval_ms must be at least 1");
        }
        if self.timer.enabled {
            if self.timer.interval_sec == 0 {
                bail!("timer.interval_sec must be at least 1 when the timer is enabled");
            }
            if !timer::is_valid_format(&self.timer.format) {
                bail!("timer.format {:?} is not a valid strftime pattern", self.timer.format);
            }
        }
        Ok(())
    }

    pub fn listen_address(&self) -> (String, u16) {
        (self.server.bind_address.clone(), self.server.port)
    }

    pub fn server_settings(&self) -> ServerSettings {
        let timestamps = self.timer.enabled.then(|| TimestampSettings {
            interval: Duration::from_secs(self.timer.interval_sec),
            format:   self.timer.format.clone(),
        });
        ServerSettings {
            poll_interval:    Duration::from_millis(self.server.poll_interval_ms),
            shutdown_grace:   Duration::from_millis(self.server.shutdown_grace_ms),
            recv_buffer_size: self.server.recv_buffer_size,
            seek_commands:    self.server.seek_commands,
            timestamps,
        }
    }
}

fn write_defaults(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let body = toml::to_string_pretty(&Config::default())?;
    fs::write(path, format!("# ringlogd configuration, CLI flags take precedence\n\n{}", body))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let cfg = Config::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.log.capacity, 10);
        assert_eq!(cfg.timer.interval_sec, 10);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let cfg = Config::from_toml_str("[log]\ncapacity = 3\n\n[server]\nport = 9100\n").unwrap();
        assert_eq!(cfg.log.capacity, 3);
        assert_eq!(cfg.server.port, 9100);
        assert_eq!(cfg.server.bind_address, "0.0.0.0");
        assert!(cfg.timer.enabled);
    }

    #[test]
    fn default_round_trips_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        assert_eq!(Config::from_toml_str(&text).unwrap(), Config::default());
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut cfg = Config::default();
        cfg.log.capacity = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.timer.interval_sec = 0;
        assert!(cfg.validate().is_err());
        cfg.timer.enabled = false;
        assert!(cfg.validate().is_ok());

        let mut cfg = Config::default();
        cfg.timer.format = "%Q".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn disabled_timer_has_no_timestamp_settings() {
        let mut cfg = Config::default();
        assert!(cfg.server_settings().timestamps.is_some());
        cfg.timer.enabled = false;
        let settings = cfg.server_settings();
        assert!(settings.timestamps.is_none());
        assert_eq!(settings.poll_interval, Duration::from_millis(100));
    }

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("ringlogd-cfg-{}-{}", name, std::process::id()))
            .join("ringlogd.toml")
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let path = scratch_path("missing");
        let _ = fs::remove_dir_all(path.parent().unwrap());

        assert_eq!(Config::load_or_init(&path), Config::default());
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# ringlogd configuration"));
        assert_eq!(Config::from_toml_str(&written).unwrap(), Config::default());
        fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn broken_file_is_kept_and_defaults_used() {
        let path = scratch_path("broken");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "[log]\ncapacity = \"ten\"\n").unwrap();

        assert_eq!(Config::load_or_init(&path), Config::default());
        assert_eq!(fs::read_to_string(&path).unwrap(), "[log]\ncapacity = \"ten\"\n");
        fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn existing_file_is_loaded() {
        let path = scratch_path("existing");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "[log]\ncapacity = 7\n").unwrap();

        assert_eq!(Config::load_or_init(&path).log.capacity, 7);
        fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn unknown_types_are_errors() {
        assert!(Config::from_toml_str("[log]\ncapacity = \"ten\"\n").is_err());
    }
}
