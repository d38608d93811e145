//! Configuration for the application injector.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $INJECTOR_CONFIG (explicit override)
//!   2. ./injector.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Schedule units are multiplied by this to get simulation ticks.
pub const DEFAULT_TICKS_PER_TIME_UNIT: u64 = 100_000;

/// Name line that terminates the launch schedule.
pub const DEFAULT_SENTINEL: &str = "deadc0de";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InjectorConfig {
    pub paths: PathsConfig,
    pub timing: TimingConfig,
    pub boot: BootConfig,
    pub schedule: ScheduleConfig,
    pub network: NetworkConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Global launch schedule.
    pub schedule_file: PathBuf,
    /// Directory holding one sub-directory per application.
    pub applications_dir: PathBuf,
    /// File name of the repository inside each application directory.
    pub repository_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Ticks per schedule time unit.
    pub ticks_per_time_unit: u64,
    /// Stop the run after this many ticks. 0 = run until the schedule is
    /// exhausted and the link is quiet.
    pub max_ticks: u64,
}

/// Start time of a schedule entry, in ticks.
pub fn start_tick(start_time: u32, ticks_per_time_unit: u64) -> u64 {
    u64::from(start_time).saturating_mul(ticks_per_time_unit)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BootConfig {
    /// Full task id of the boot task (management app, task 0).
    pub task_id: u32,
    pub master_id: u32,
    /// PE that receives the boot task.
    pub target_pe: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub sentinel: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address the admission requests go to.
    pub manager_address: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Where to write the JSON run report. Empty = stdout.
    pub path: Option<PathBuf>,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            schedule_file: PathBuf::from("appstart.txt"),
            applications_dir: PathBuf::from("../applications"),
            repository_file: "repository.txt".to_string(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            ticks_per_time_unit: DEFAULT_TICKS_PER_TIME_UNIT,
            max_ticks: 0,
        }
    }
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            task_id: 0,
            master_id: 0,
            target_pe: 0,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            sentinel: DEFAULT_SENTINEL.to_string(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            manager_address: crate::wire::MANAGER_PE_ADDR,
        }
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl InjectorConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::file_path())
    }

    /// Load from an explicit path, falling back to defaults if it is absent.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))?
        } else {
            InjectorConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("INJECTOR_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("injector.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&InjectorConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply INJECTOR_* env var overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply `INJECTOR_<SECTION>__<KEY>` overrides from `lookup`. Values
    /// that fail to parse leave the setting unchanged.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("INJECTOR_PATHS__SCHEDULE_FILE") {
            self.paths.schedule_file = PathBuf::from(v);
        }
        if let Some(v) = lookup("INJECTOR_PATHS__APPLICATIONS_DIR") {
            self.paths.applications_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("INJECTOR_PATHS__REPOSITORY_FILE") {
            self.paths.repository_file = v;
        }
        if let Some(n) = lookup("INJECTOR_TIMING__TICKS_PER_TIME_UNIT").and_then(|v| v.parse().ok()) {
            self.timing.ticks_per_time_unit = n;
        }
        if let Some(n) = lookup("INJECTOR_TIMING__MAX_TICKS").and_then(|v| v.parse().ok()) {
            self.timing.max_ticks = n;
        }
        if let Some(n) = lookup("INJECTOR_BOOT__TASK_ID").and_then(|v| parse_word(&v)) {
            self.boot.task_id = n;
        }
        if let Some(n) = lookup("INJECTOR_BOOT__MASTER_ID").and_then(|v| parse_word(&v)) {
            self.boot.master_id = n;
        }
        if let Some(n) = lookup("INJECTOR_BOOT__TARGET_PE").and_then(|v| parse_word(&v)) {
            self.boot.target_pe = n;
        }
        if let Some(v) = lookup("INJECTOR_SCHEDULE__SENTINEL") {
            self.schedule.sentinel = v;
        }
        if let Some(n) = lookup("INJECTOR_NETWORK__MANAGER_ADDRESS").and_then(|v| parse_word(&v)) {
            self.network.manager_address = n;
        }
        if let Some(v) = lookup("INJECTOR_REPORT__PATH") {
            self.report.path = (!v.is_empty()).then(|| PathBuf::from(v));
        }
    }
}

/// Decimal, or hex with a `0x` prefix.
fn parse_word(value: &str) -> Option<u32> {
    match value.strip_prefix("0x") {
        Some(digits) => u32::from_str_radix(digits, 16).ok(),
        None => value.parse().ok(),
    }
}
