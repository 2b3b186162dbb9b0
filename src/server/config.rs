// Serialization for the flat on-disk settings record
use serde::{Deserialize, Serialize};

// Filesystem operations for the config file and data folders
use std::fs;
use std::path::{Path, PathBuf};

use crate::server::adaptive::INTERVAL_EPSILON;
use crate::server::host::HostError;

/// All the settings the janitor persists, as one flat JSON object.
///
/// Field names are written in PascalCase so the file stays hand-editable in
/// the shape admins already know. Missing or mistyped fields fall back to
/// their defaults one by one (`serde(default)`), so a partially edited file
/// still loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct JanitorConfig {
    /// Whether the periodic despawn sweep runs at all
    pub auto_clean_enabled: bool,
    /// Seconds between automatic sweeps
    pub auto_clean_interval: f32,
    /// Whether the interval tracks player count (requires auto clean)
    pub adaptive_auto_clean_enabled: bool,
    /// Master switch for the connection and spawn gates
    pub anti_grief_enabled: bool,
    /// Advisory object-count ceiling, reported in status
    pub object_threshold: i32,
    /// Advisory memory ceiling in bytes, reported in status
    pub memory_threshold: i64,
    /// Name of the last interval preset an admin picked
    pub last_used_preset: String,
    /// Rate limiter: max actions per window
    pub max_actions_per_second: u32,
    /// Rate limiter: window duration in seconds
    pub rate_window_seconds: f32,
    /// Whether gate denials are appended to the daily denial log
    pub enable_file_logging: bool,
    /// Whether the spawn gate blocks at all (the connection gate is
    /// controlled by `anti_grief_enabled` alone)
    pub enable_spawn_blocking: bool,
    /// When true, gate-internal errors deny instead of allowing through
    pub gate_fail_closed: bool,
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            auto_clean_enabled: false,
            auto_clean_interval: 300.0,
            adaptive_auto_clean_enabled: false,
            anti_grief_enabled: false,
            object_threshold: 100,
            memory_threshold: 1024,
            last_used_preset: "Default".to_string(),
            max_actions_per_second: 6,
            rate_window_seconds: 1.0,
            enable_file_logging: true,
            enable_spawn_blocking: true,
            gate_fail_closed: false,
        }
    }
}

impl JanitorConfig {
    /// Load the config from `path`.
    ///
    /// Missing file: defaults are written to disk and returned. Malformed
    /// file: the error is logged and in-memory defaults are returned without
    /// touching the file, so a hand-edit gone wrong is never destroyed.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            let config = Self::default();
            match config.save(path) {
                Ok(()) => log::info!("Created default janitor config at {}", path.display()),
                Err(e) => log::error!("Failed to write default config: {}", e),
            }
            return config;
        }

        match fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str::<Self>(&text) {
                Ok(config) => {
                    log::info!("Janitor config loaded successfully");
                    config
                }
                Err(e) => {
                    log::error!("Failed to parse config, using defaults: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                log::error!("Failed to read config, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Write the config to `path` as pretty-printed JSON, creating the
    /// parent directory when needed.
    pub fn save(&self, path: &Path) -> Result<(), HostError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// The six manual interval presets admins can pick from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanInterval {
    FiveMinutes,
    TenMinutes,
    FifteenMinutes,
    TwentyMinutes,
    TwentyFiveMinutes,
    ThirtyMinutes,
}

impl CleanInterval {
    pub const ALL: [CleanInterval; 6] = [
        CleanInterval::FiveMinutes,
        CleanInterval::TenMinutes,
        CleanInterval::FifteenMinutes,
        CleanInterval::TwentyMinutes,
        CleanInterval::TwentyFiveMinutes,
        CleanInterval::ThirtyMinutes,
    ];

    pub fn seconds(self) -> f32 {
        match self {
            CleanInterval::FiveMinutes => 300.0,
            CleanInterval::TenMinutes => 600.0,
            CleanInterval::FifteenMinutes => 900.0,
            CleanInterval::TwentyMinutes => 1200.0,
            CleanInterval::TwentyFiveMinutes => 1500.0,
            CleanInterval::ThirtyMinutes => 1800.0,
        }
    }

    pub fn minutes(self) -> f32 {
        self.seconds() / 60.0
    }

    pub fn label(self) -> &'static str {
        match self {
            CleanInterval::FiveMinutes => "5 minutes",
            CleanInterval::TenMinutes => "10 minutes",
            CleanInterval::FifteenMinutes => "15 minutes",
            CleanInterval::TwentyMinutes => "20 minutes",
            CleanInterval::TwentyFiveMinutes => "25 minutes",
            CleanInterval::ThirtyMinutes => "30 minutes",
        }
    }

    /// Map a configured interval back to its preset, tolerating the same
    /// epsilon as reconciliation. Unmatched values (e.g. an adaptive
    /// interval mid-flight) fall back to the five-minute preset.
    pub fn from_seconds(secs: f32) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|preset| (preset.seconds() - secs).abs() < INTERVAL_EPSILON)
            .unwrap_or(CleanInterval::FiveMinutes)
    }
}

/// Filesystem layout under the host's data directory:
/// `<base>/Config/Config.json` and `<base>/Logs/`.
#[derive(Debug, Clone)]
pub struct JanitorPaths {
    base: PathBuf,
}

impl JanitorPaths {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn config_dir(&self) -> PathBuf {
        self.base.join("Config")
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir().join("Config.json")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.base.join("Logs")
    }

    /// Create the data folders, logging (not propagating) failures.
    pub fn init_folders(&self) {
        for dir in [self.config_dir(), self.log_dir()] {
            if let Err(e) = fs::create_dir_all(&dir) {
                log::error!("Failed to create folder {}: {}", dir.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_base(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("session_janitor_{}_{}", tag, std::process::id()))
    }

    #[test]
    fn missing_file_writes_defaults() {
        let base = temp_base("missing");
        let _ = fs::remove_dir_all(&base);
        let paths = JanitorPaths::new(&base);

        let config = JanitorConfig::load(&paths.config_file());

        assert_eq!(config, JanitorConfig::default());
        assert!(paths.config_file().exists());
        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let base = temp_base("malformed");
        let _ = fs::remove_dir_all(&base);
        let paths = JanitorPaths::new(&base);
        paths.init_folders();
        fs::write(paths.config_file(), "{ not json at all").unwrap();

        let config = JanitorConfig::load(&paths.config_file());

        assert_eq!(config, JanitorConfig::default());
        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn round_trip_preserves_every_field() {
        let base = temp_base("roundtrip");
        let _ = fs::remove_dir_all(&base);
        let paths = JanitorPaths::new(&base);

        let config = JanitorConfig {
            auto_clean_enabled: true,
            auto_clean_interval: 900.0,
            adaptive_auto_clean_enabled: true,
            anti_grief_enabled: true,
            object_threshold: 250,
            memory_threshold: 4096,
            last_used_preset: "15 minutes".to_string(),
            max_actions_per_second: 12,
            rate_window_seconds: 2.5,
            enable_file_logging: false,
            enable_spawn_blocking: false,
            gate_fail_closed: true,
        };
        config.save(&paths.config_file()).unwrap();

        assert_eq!(JanitorConfig::load(&paths.config_file()), config);
        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn on_disk_names_stay_pascal_case() {
        let value = serde_json::to_value(JanitorConfig::default()).unwrap();
        for key in [
            "AutoCleanEnabled",
            "AutoCleanInterval",
            "AdaptiveAutoCleanEnabled",
            "AntiGriefEnabled",
            "ObjectThreshold",
            "MemoryThreshold",
            "LastUsedPreset",
            "MaxActionsPerSecond",
            "RateWindowSeconds",
            "EnableFileLogging",
            "EnableSpawnBlocking",
            "GateFailClosed",
        ] {
            assert!(value.get(key).is_some(), "missing field {}", key);
        }
    }

    #[test]
    fn partially_edited_file_keeps_per_field_defaults() {
        let base = temp_base("partial");
        let _ = fs::remove_dir_all(&base);
        let paths = JanitorPaths::new(&base);
        paths.init_folders();
        fs::write(
            paths.config_file(),
            r#"{ "AutoCleanEnabled": true, "MaxActionsPerSecond": 3 }"#,
        )
        .unwrap();

        let config = JanitorConfig::load(&paths.config_file());

        assert!(config.auto_clean_enabled);
        assert_eq!(config.max_actions_per_second, 3);
        assert_eq!(config.auto_clean_interval, 300.0);
        assert!(config.enable_file_logging);
        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn preset_lookup_uses_epsilon_and_falls_back() {
        assert_eq!(CleanInterval::from_seconds(600.0), CleanInterval::TenMinutes);
        assert_eq!(
            CleanInterval::from_seconds(600.05),
            CleanInterval::TenMinutes
        );
        // An adaptive value between presets falls back to five minutes.
        assert_eq!(CleanInterval::from_seconds(777.0), CleanInterval::FiveMinutes);
    }

    #[test]
    fn preset_seconds_match_labels() {
        for preset in CleanInterval::ALL {
            assert_eq!(CleanInterval::from_seconds(preset.seconds()), preset);
        }
        assert_eq!(CleanInterval::ThirtyMinutes.minutes(), 30.0);
        assert_eq!(CleanInterval::FiveMinutes.label(), "5 minutes");
    }
}
