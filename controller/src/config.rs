//! Blink timing configuration and its persistent store.
//!
//! Only the two user-tunable thresholds (minimum closure and inter-blink
//! gap) plus the user id survive a restart.  The remaining timing values are
//! fixed properties of the device and live in [`TimingConstants`].

use std::cell::RefCell;
use std::fs;
use std::io;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::clock::Millis;

/// Accepted range for the minimum closure duration.
pub const BLINK_DURATION_RANGE: RangeInclusive<u32> = 100..=5000;

/// Accepted range for the inter-blink gap.
pub const BLINK_GAP_RANGE: RangeInclusive<u32> = 200..=10_000;

pub const DEFAULT_BLINK_DURATION_MS: u32 = 400;
pub const DEFAULT_BLINK_GAP_MS: u32 = 1200;

const KEY_BLINK_DURATION: &str = "blink_duration";
const KEY_BLINK_GAP: &str = "blink_gap";
const KEY_USER_ID: &str = "user_id";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to access config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid value {value:?} for {key}")]
    Parse { key: String, value: String },
    #[error("{key} = {value} outside {min}..={max}")]
    OutOfRange {
        key: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },
    #[error("config store unavailable: {0}")]
    Unavailable(String),
}

/// User-tunable blink thresholds.
///
/// Written only by the command path, read by the classifier on every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkConfig {
    blink_duration_ms: u32,
    blink_gap_ms: u32,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            blink_duration_ms: DEFAULT_BLINK_DURATION_MS,
            blink_gap_ms: DEFAULT_BLINK_GAP_MS,
        }
    }
}

impl BlinkConfig {
    /// Build a config, validating both values.
    pub fn new(blink_duration_ms: u32, blink_gap_ms: u32) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.set_blink_duration(blink_duration_ms)?;
        config.set_blink_gap(blink_gap_ms)?;
        Ok(config)
    }

    /// Minimum closure for the first two blinks of a streak.
    pub fn blink_duration_ms(&self) -> u32 {
        self.blink_duration_ms
    }

    /// Maximum spacing between blinks of one streak.
    pub fn blink_gap_ms(&self) -> u32 {
        self.blink_gap_ms
    }

    pub fn set_blink_duration(&mut self, ms: u32) -> Result<(), ConfigError> {
        check_range(KEY_BLINK_DURATION, ms, &BLINK_DURATION_RANGE)?;
        self.blink_duration_ms = ms;
        Ok(())
    }

    pub fn set_blink_gap(&mut self, ms: u32) -> Result<(), ConfigError> {
        check_range(KEY_BLINK_GAP, ms, &BLINK_GAP_RANGE)?;
        self.blink_gap_ms = ms;
        Ok(())
    }
}

fn check_range(key: &'static str, value: u32, range: &RangeInclusive<u32>) -> Result<(), ConfigError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            key,
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

/// Fixed timing properties of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConstants {
    /// Raw sensor changes younger than this are ignored.
    pub debounce_ms: Millis,
    /// Minimum closure for the third and later blinks of a streak.
    pub emergency_blink_interval_ms: Millis,
    /// Extra idle time past the gap before a streak is forgotten.
    pub streak_reset_guard_ms: Millis,
    /// Popup auto-cancel delay.
    pub popup_timeout_ms: Millis,
    /// Half period of the emergency LED/buzzer pattern.
    pub alert_half_period_ms: Millis,
}

impl Default for TimingConstants {
    fn default() -> Self {
        Self {
            debounce_ms: 50,
            emergency_blink_interval_ms: 250,
            streak_reset_guard_ms: 300,
            popup_timeout_ms: 5000,
            alert_half_period_ms: 500,
        }
    }
}

/// Everything that is persisted across restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceSettings {
    pub blink: BlinkConfig,
    pub user_id: u32,
}

/// Persistent storage for [`DeviceSettings`].
pub trait ConfigStore {
    fn load(&mut self) -> Result<DeviceSettings, ConfigError>;
    fn save(&mut self, settings: &DeviceSettings) -> Result<(), ConfigError>;
}

/// `key=value` property file store.
#[derive(Debug, Clone)]
pub struct PropFileStore {
    path: PathBuf,
}

impl PropFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `$XDG_CONFIG_HOME/sparc/controller.conf`, falling back to `~/.config`.
    pub fn default_path() -> PathBuf {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
            .unwrap_or_else(|| PathBuf::from("/etc"));
        base.join("sparc").join("controller.conf")
    }
}

impl ConfigStore for PropFileStore {
    fn load(&mut self) -> Result<DeviceSettings, ConfigError> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = ?self.path, "no config file, using defaults");
                return Ok(DeviceSettings::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let settings = settings_from_str(&data)?;
        info!(
            path = ?self.path,
            blink_duration_ms = settings.blink.blink_duration_ms(),
            blink_gap_ms = settings.blink.blink_gap_ms(),
            user_id = settings.user_id,
            "loaded config"
        );
        Ok(settings)
    }

    fn save(&mut self, settings: &DeviceSettings) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&self.path, settings_to_string(settings)).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = ?self.path, "config saved");
        Ok(())
    }
}

/// In-memory store; clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Rc<RefCell<Option<DeviceSettings>>>,
    fail_saves: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: DeviceSettings) -> Self {
        let store = Self::default();
        *store.slot.borrow_mut() = Some(settings);
        store
    }

    /// A store whose `save` always fails.
    pub fn failing() -> Self {
        Self {
            slot: Rc::default(),
            fail_saves: true,
        }
    }

    /// Last saved (or seeded) settings.
    pub fn saved(&self) -> Option<DeviceSettings> {
        *self.slot.borrow()
    }
}

impl ConfigStore for MemoryStore {
    fn load(&mut self) -> Result<DeviceSettings, ConfigError> {
        Ok(self.slot.borrow().unwrap_or_default())
    }

    fn save(&mut self, settings: &DeviceSettings) -> Result<(), ConfigError> {
        if self.fail_saves {
            return Err(ConfigError::Unavailable("memory store is read-only".into()));
        }
        *self.slot.borrow_mut() = Some(*settings);
        Ok(())
    }
}

/// Parse property file content.  Unknown keys are ignored; a persisted value
/// outside its accepted range falls back to the default for that key.
pub fn settings_from_str(data: &str) -> Result<DeviceSettings, ConfigError> {
    let mut settings = DeviceSettings::default();
    for (key, value) in parse_propfile(data) {
        match key {
            KEY_BLINK_DURATION => {
                let ms = parse_u32(key, value)?;
                if let Err(e) = settings.blink.set_blink_duration(ms) {
                    warn!("ignoring persisted value: {}", e);
                }
            }
            KEY_BLINK_GAP => {
                let ms = parse_u32(key, value)?;
                if let Err(e) = settings.blink.set_blink_gap(ms) {
                    warn!("ignoring persisted value: {}", e);
                }
            }
            KEY_USER_ID => settings.user_id = parse_u32(key, value)?,
            other => debug!(key = other, "unknown config key"),
        }
    }
    Ok(settings)
}

pub fn settings_to_string(settings: &DeviceSettings) -> String {
    format!(
        "# sparc-controller settings\n{}={}\n{}={}\n{}={}\n",
        KEY_BLINK_DURATION,
        settings.blink.blink_duration_ms(),
        KEY_BLINK_GAP,
        settings.blink.blink_gap_ms(),
        KEY_USER_ID,
        settings.user_id,
    )
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::Parse {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Split `key=value` lines.  `#` starts a comment; blank lines and lines
/// without `=` are skipped.
fn parse_propfile(data: &str) -> Vec<(&str, &str)> {
    let mut pairs = Vec::new();
    for line in data.lines() {
        let line = match line.find('#') {
            Some(idx) => &line[..idx],
            None => line,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line.split_once('=') {
            Some((key, value)) => pairs.push((key.trim(), value.trim())),
            None => warn!(line, "key without value"),
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blink_config_defaults() {
        let config = BlinkConfig::default();
        assert_eq!(config.blink_duration_ms(), 400);
        assert_eq!(config.blink_gap_ms(), 1200);
    }

    #[test]
    fn test_blink_duration_range_enforced() {
        let mut config = BlinkConfig::default();
        assert!(config.set_blink_duration(50).is_err());
        assert_eq!(config.blink_duration_ms(), 400, "rejected value must not stick");
        assert!(config.set_blink_duration(5001).is_err());
        assert!(config.set_blink_duration(100).is_ok());
        assert!(config.set_blink_duration(5000).is_ok());
        assert_eq!(config.blink_duration_ms(), 5000);
    }

    #[test]
    fn test_blink_gap_range_enforced() {
        let mut config = BlinkConfig::default();
        assert!(config.set_blink_gap(199).is_err());
        assert!(config.set_blink_gap(10_001).is_err());
        assert_eq!(config.blink_gap_ms(), 1200);
        assert!(config.set_blink_gap(200).is_ok());
        assert!(config.set_blink_gap(10_000).is_ok());
    }

    #[test]
    fn test_out_of_range_error_message() {
        let err = BlinkConfig::new(50, 1200).unwrap_err();
        assert_eq!(err.to_string(), "blink_duration = 50 outside 100..=5000");
    }

    #[test]
    fn test_timing_constants_defaults() {
        let t = TimingConstants::default();
        assert_eq!(t.debounce_ms, 50);
        assert_eq!(t.emergency_blink_interval_ms, 250);
        assert_eq!(t.streak_reset_guard_ms, 300);
        assert_eq!(t.popup_timeout_ms, 5000);
        assert_eq!(t.alert_half_period_ms, 500);
    }

    #[test]
    fn test_settings_from_str_with_comments() {
        let data = "# saved\nblink_duration = 600 # tuned\n\nblink_gap=1500\nuser_id=42\nextra=1\n";
        let settings = settings_from_str(data).unwrap();
        assert_eq!(settings.blink.blink_duration_ms(), 600);
        assert_eq!(settings.blink.blink_gap_ms(), 1500);
        assert_eq!(settings.user_id, 42);
    }

    #[test]
    fn test_settings_out_of_range_falls_back() {
        let settings = settings_from_str("blink_duration=20\nblink_gap=900\n").unwrap();
        assert_eq!(settings.blink.blink_duration_ms(), DEFAULT_BLINK_DURATION_MS);
        assert_eq!(settings.blink.blink_gap_ms(), 900);
    }

    #[test]
    fn test_settings_non_numeric_is_error() {
        let err = settings_from_str("blink_gap=soon\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { ref key, .. } if key == "blink_gap"));
    }

    #[test]
    fn test_propfile_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = PropFileStore::new(dir.path().join("nested").join("blink.conf"));

        let loaded = store.load().unwrap();
        assert_eq!(loaded, DeviceSettings::default(), "missing file loads defaults");

        let settings = DeviceSettings {
            blink: BlinkConfig::new(700, 2500).unwrap(),
            user_id: 7,
        };
        store.save(&settings).unwrap();
        assert_eq!(store.load().unwrap(), settings);
    }

    #[test]
    fn test_memory_store_shares_slot() {
        let store = MemoryStore::new();
        let mut handle = store.clone();
        let settings = DeviceSettings {
            blink: BlinkConfig::new(500, 1200).unwrap(),
            user_id: 3,
        };
        handle.save(&settings).unwrap();
        assert_eq!(store.saved(), Some(settings));
        assert!(MemoryStore::failing().save(&settings).is_err());
    }
}
