//! Settings domain types and validation.
//!
//! Tunables for drift correction, heartbeat cadence, ducking and the room
//! channel. All fields are optional so a settings file only needs to name
//! what it changes; `effective_*` accessors fill in the defaults.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Drift (seconds) above which a Follower hard-seeks to the Master.
pub const DEFAULT_SYNC_THRESHOLD_SECS: f64 = 0.8;

/// Milliseconds between Master heartbeats.
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 1200;

/// Volume multiplier applied while the local user is speaking.
pub const DEFAULT_DUCKING_FACTOR: f32 = 0.20;

/// How long speech is held after energy drops below threshold.
pub const DEFAULT_RELEASE_WINDOW_MS: u64 = 1500;

/// RMS energy above which a microphone frame counts as speech.
pub const DEFAULT_SPEECH_ENERGY_THRESHOLD: f32 = 0.02;

/// Base playback volume for a fresh session.
pub const DEFAULT_VOLUME: f32 = 0.8;

/// Per-room broadcast buffer. Slow receivers skip what overflows.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Largest per-room buffer accepted. Broadcast buffers are allocated up front.
pub const MAX_CHANNEL_CAPACITY: usize = 65_536;

/// Room joined when none is given.
pub const DEFAULT_ROOM_ID: &str = "SYNC-STREAM-CINEMA";

/// Prefix of environment variables that override settings.
pub const ENV_PREFIX: &str = "SYNCSTREAM_";

/// Synchronization settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncSettings {
    /// Drift threshold in seconds (strictly greater triggers catch-up).
    pub sync_threshold_secs: Option<f64>,

    /// Master heartbeat cadence in milliseconds.
    pub heartbeat_interval_ms: Option<u64>,

    /// Ducked volume multiplier (0.0–1.0).
    pub ducking_factor: Option<f32>,

    /// Speech hold time after the last loud frame, in milliseconds.
    pub release_window_ms: Option<u64>,

    /// RMS energy threshold for speech detection.
    pub speech_energy_threshold: Option<f32>,

    /// Initial base volume (0.0–1.0).
    pub default_volume: Option<f32>,

    /// Broadcast buffer per room.
    pub channel_capacity: Option<usize>,

    /// Room joined when none is given.
    pub default_room_id: Option<String>,
}

impl SyncSettings {
    /// Create settings with every field populated.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            sync_threshold_secs: Some(DEFAULT_SYNC_THRESHOLD_SECS),
            heartbeat_interval_ms: Some(DEFAULT_HEARTBEAT_INTERVAL_MS),
            ducking_factor: Some(DEFAULT_DUCKING_FACTOR),
            release_window_ms: Some(DEFAULT_RELEASE_WINDOW_MS),
            speech_energy_threshold: Some(DEFAULT_SPEECH_ENERGY_THRESHOLD),
            default_volume: Some(DEFAULT_VOLUME),
            channel_capacity: Some(DEFAULT_CHANNEL_CAPACITY),
            default_room_id: Some(DEFAULT_ROOM_ID.to_string()),
        }
    }

    /// Load settings from a JSON file and validate them.
    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let raw = std::fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&raw)?;
        validate_settings(&settings)?;
        tracing::debug!(path = %path.display(), "Loaded sync settings");
        Ok(settings)
    }

    #[must_use]
    pub fn effective_sync_threshold(&self) -> f64 {
        self.sync_threshold_secs
            .unwrap_or(DEFAULT_SYNC_THRESHOLD_SECS)
    }

    #[must_use]
    pub fn effective_heartbeat_interval(&self) -> Duration {
        Duration::from_millis(
            self.heartbeat_interval_ms
                .unwrap_or(DEFAULT_HEARTBEAT_INTERVAL_MS),
        )
    }

    #[must_use]
    pub fn effective_ducking_factor(&self) -> f32 {
        self.ducking_factor.unwrap_or(DEFAULT_DUCKING_FACTOR)
    }

    #[must_use]
    pub fn effective_release_window(&self) -> Duration {
        Duration::from_millis(self.release_window_ms.unwrap_or(DEFAULT_RELEASE_WINDOW_MS))
    }

    #[must_use]
    pub fn effective_speech_energy_threshold(&self) -> f32 {
        self.speech_energy_threshold
            .unwrap_or(DEFAULT_SPEECH_ENERGY_THRESHOLD)
    }

    #[must_use]
    pub fn effective_default_volume(&self) -> f32 {
        self.default_volume.unwrap_or(DEFAULT_VOLUME)
    }

    #[must_use]
    pub fn effective_channel_capacity(&self) -> usize {
        self.channel_capacity.unwrap_or(DEFAULT_CHANNEL_CAPACITY)
    }

    #[must_use]
    pub fn effective_room_id(&self) -> &str {
        self.default_room_id.as_deref().unwrap_or(DEFAULT_ROOM_ID)
    }

    /// Merge another settings into this one, only updating fields that are Some.
    pub fn merge(&mut self, other: &SettingsUpdate) {
        if let Some(threshold) = other.sync_threshold_secs {
            self.sync_threshold_secs = threshold;
        }
        if let Some(interval) = other.heartbeat_interval_ms {
            self.heartbeat_interval_ms = interval;
        }
        if let Some(factor) = other.ducking_factor {
            self.ducking_factor = factor;
        }
        if let Some(window) = other.release_window_ms {
            self.release_window_ms = window;
        }
        if let Some(energy) = other.speech_energy_threshold {
            self.speech_energy_threshold = energy;
        }
        if let Some(volume) = other.default_volume {
            self.default_volume = volume;
        }
        if let Some(capacity) = other.channel_capacity {
            self.channel_capacity = capacity;
        }
        if let Some(ref room_id) = other.default_room_id {
            self.default_room_id.clone_from(room_id);
        }
    }
}

/// Partial settings update.
///
/// Each field is `Option<Option<T>>`:
/// - `None` = don't change this field
/// - `Some(None)` = reset field to its default
/// - `Some(Some(value))` = set field to value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub sync_threshold_secs: Option<Option<f64>>,
    pub heartbeat_interval_ms: Option<Option<u64>>,
    pub ducking_factor: Option<Option<f32>>,
    pub release_window_ms: Option<Option<u64>>,
    pub speech_energy_threshold: Option<Option<f32>>,
    pub default_volume: Option<Option<f32>>,
    pub channel_capacity: Option<Option<usize>>,
    pub default_room_id: Option<Option<String>>,
}

impl SettingsUpdate {
    /// Build an update from `SYNCSTREAM_*` variables.
    ///
    /// Takes the variables as an iterator so callers decide where they come
    /// from (`std::env::vars()` in the binary, literals in tests). Unknown
    /// keys are ignored.
    pub fn from_env_vars<I, K, V>(vars: I) -> Result<Self, SettingsError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut update = Self::default();
        for (key, value) in vars {
            let Some(name) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value = value.as_ref().trim();
            match name {
                "SYNC_THRESHOLD" => update.sync_threshold_secs = Some(Some(parse_env(name, value)?)),
                "HEARTBEAT_MS" => update.heartbeat_interval_ms = Some(Some(parse_env(name, value)?)),
                "DUCKING_FACTOR" => update.ducking_factor = Some(Some(parse_env(name, value)?)),
                "RELEASE_WINDOW_MS" => update.release_window_ms = Some(Some(parse_env(name, value)?)),
                "SPEECH_THRESHOLD" => {
                    update.speech_energy_threshold = Some(Some(parse_env(name, value)?));
                }
                "VOLUME" => update.default_volume = Some(Some(parse_env(name, value)?)),
                "CHANNEL_CAPACITY" => update.channel_capacity = Some(Some(parse_env(name, value)?)),
                "ROOM" => update.default_room_id = Some(Some(value.to_string())),
                _ => tracing::debug!(key = key.as_ref(), "Ignoring unknown settings variable"),
            }
        }
        Ok(update)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, SettingsError> {
    value.parse().map_err(|_| SettingsError::InvalidEnvValue {
        key: format!("{ENV_PREFIX}{name}"),
        value: value.to_string(),
    })
}

/// Settings validation error.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Sync threshold must be a positive number of seconds, got {0}")]
    InvalidThreshold(f64),

    #[error("Heartbeat interval must be between 100 and 60000 ms, got {0}")]
    InvalidHeartbeat(u64),

    #[error("Ducking factor must be between 0.0 and 1.0, got {0}")]
    InvalidDuckingFactor(f32),

    #[error("Release window must be at most 10000 ms, got {0}")]
    InvalidReleaseWindow(u64),

    #[error("Speech energy threshold must be between 0.0 and 1.0, got {0}")]
    InvalidEnergyThreshold(f32),

    #[error("Volume must be between 0.0 and 1.0, got {0}")]
    InvalidVolume(f32),

    #[error("Channel capacity must be between 1 and 65536, got {0}")]
    InvalidCapacity(usize),

    #[error("Room id cannot be empty")]
    EmptyRoomId,

    #[error("Invalid value for {key}: '{value}'")]
    InvalidEnvValue { key: String, value: String },

    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse settings file: {0}")]
    Parse(#[from] serde_json::Error),
}

fn is_unit_interval(value: f32) -> bool {
    (0.0..=1.0).contains(&value)
}

/// Validate settings values.
pub fn validate_settings(settings: &SyncSettings) -> Result<(), SettingsError> {
    if let Some(threshold) = settings.sync_threshold_secs {
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(SettingsError::InvalidThreshold(threshold));
        }
    }

    if let Some(interval) = settings.heartbeat_interval_ms {
        if !(100..=60_000).contains(&interval) {
            return Err(SettingsError::InvalidHeartbeat(interval));
        }
    }

    if let Some(factor) = settings.ducking_factor {
        if !is_unit_interval(factor) {
            return Err(SettingsError::InvalidDuckingFactor(factor));
        }
    }

    if let Some(window) = settings.release_window_ms {
        if window > 10_000 {
            return Err(SettingsError::InvalidReleaseWindow(window));
        }
    }

    if let Some(energy) = settings.speech_energy_threshold {
        if !is_unit_interval(energy) {
            return Err(SettingsError::InvalidEnergyThreshold(energy));
        }
    }

    if let Some(volume) = settings.default_volume {
        if !is_unit_interval(volume) {
            return Err(SettingsError::InvalidVolume(volume));
        }
    }

    if let Some(capacity) = settings.channel_capacity {
        if !(1..=MAX_CHANNEL_CAPACITY).contains(&capacity) {
            return Err(SettingsError::InvalidCapacity(capacity));
        }
    }

    if settings
        .default_room_id
        .as_ref()
        .is_some_and(|id| id.trim().is_empty())
    {
        return Err(SettingsError::EmptyRoomId);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = SyncSettings::with_defaults();
        assert_eq!(settings.sync_threshold_secs, Some(0.8));
        assert_eq!(settings.heartbeat_interval_ms, Some(1200));
        assert_eq!(settings.ducking_factor, Some(0.20));
        assert_eq!(settings.release_window_ms, Some(1500));
        assert_eq!(settings.effective_room_id(), DEFAULT_ROOM_ID);
    }

    #[test]
    fn test_validate_settings_valid() {
        assert!(validate_settings(&SyncSettings::with_defaults()).is_ok());
        assert!(validate_settings(&SyncSettings::default()).is_ok());
    }

    #[test]
    fn test_validate_threshold() {
        let settings = SyncSettings {
            sync_threshold_secs: Some(0.0),
            ..Default::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::InvalidThreshold(_))
        ));
    }

    #[test]
    fn test_validate_heartbeat_too_fast() {
        let settings = SyncSettings {
            heartbeat_interval_ms: Some(10),
            ..Default::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::InvalidHeartbeat(10))
        ));
    }

    #[test]
    fn test_validate_ducking_factor_out_of_range() {
        let settings = SyncSettings {
            ducking_factor: Some(1.5),
            ..Default::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::InvalidDuckingFactor(_))
        ));
    }

    #[test]
    fn test_validate_empty_room() {
        let settings = SyncSettings {
            default_room_id: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::EmptyRoomId)
        ));
    }

    #[test]
    fn test_validate_zero_capacity() {
        let settings = SyncSettings {
            channel_capacity: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::InvalidCapacity(0))
        ));
    }

    #[test]
    fn test_validate_oversized_capacity_from_env() {
        let update =
            SettingsUpdate::from_env_vars([("SYNCSTREAM_CHANNEL_CAPACITY", "18446744073709551615")])
                .unwrap();
        let mut settings = SyncSettings::with_defaults();
        settings.merge(&update);

        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::InvalidCapacity(usize::MAX))
        ));

        settings.channel_capacity = Some(MAX_CHANNEL_CAPACITY);
        assert!(validate_settings(&settings).is_ok());
        settings.channel_capacity = Some(MAX_CHANNEL_CAPACITY + 1);
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::InvalidCapacity(65_537))
        ));
    }

    #[test]
    fn test_merge_settings() {
        let mut settings = SyncSettings::with_defaults();
        let update = SettingsUpdate {
            sync_threshold_secs: Some(Some(0.5)),
            ducking_factor: Some(None),
            ..Default::default()
        };
        settings.merge(&update);

        assert_eq!(settings.sync_threshold_secs, Some(0.5));
        assert_eq!(settings.ducking_factor, None);
        assert!((settings.effective_ducking_factor() - DEFAULT_DUCKING_FACTOR).abs() < f32::EPSILON);
        assert_eq!(settings.heartbeat_interval_ms, Some(1200));
    }

    #[test]
    fn test_effective_defaults_on_empty_settings() {
        let settings = SyncSettings::default();
        assert_eq!(settings.effective_heartbeat_interval(), Duration::from_millis(1200));
        assert_eq!(settings.effective_release_window(), Duration::from_millis(1500));
        assert_eq!(settings.effective_channel_capacity(), 64);
    }

    #[test]
    fn test_env_overrides() {
        let update = SettingsUpdate::from_env_vars([
            ("SYNCSTREAM_SYNC_THRESHOLD", "1.25"),
            ("SYNCSTREAM_ROOM", "movie-night"),
            ("PATH", "/usr/bin"),
        ])
        .unwrap();

        let mut settings = SyncSettings::with_defaults();
        settings.merge(&update);
        assert_eq!(settings.sync_threshold_secs, Some(1.25));
        assert_eq!(settings.effective_room_id(), "movie-night");
    }

    #[test]
    fn test_env_bad_value() {
        let err = SettingsUpdate::from_env_vars([("SYNCSTREAM_HEARTBEAT_MS", "soon")]).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidEnvValue { ref key, .. } if key == "SYNCSTREAM_HEARTBEAT_MS"));
    }
}
