//! Application-level configuration loading: backend endpoint, local data directory and
//! game tunables.

use std::{
    env, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    dao::backend::{config::BackendConfig, retry::RetryPolicy},
    state::GameSettings,
};

/// Default location on disk where the client looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "CHORD_TRAINER_CONFIG_PATH";
/// Environment variable that overrides the backend base URL.
const API_URL_ENV: &str = "CHORD_TRAINER_API_URL";

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the REST backend, including the `/api` prefix.
    pub api_base_url: String,
    /// Directory holding the device store.
    pub data_dir: PathBuf,
    /// Per-request timeout.
    pub request_timeout_ms: u64,
    /// Backoff applied to rate-limited sequence submissions.
    pub retry: RetryConfig,
    /// Quiet period before a full sequence is submitted.
    pub auto_submit_delay_ms: u64,
    /// Gap between consecutive clips.
    pub playback_gap_ms: u64,
    /// Default backend instrument ids.
    pub instruments: InstrumentIds,
    /// External player command line, e.g. `mpv --no-video`. Playback is skipped when unset.
    pub audio_command: Option<String>,
}

/// JSON shape of the retry schedule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// First backoff delay.
    pub initial_delay_ms: u64,
    /// Upper bound of the doubled delay.
    pub max_delay_ms: u64,
}

/// Instrument ids used until the player picks one.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InstrumentIds {
    /// Guitar samples.
    pub guitar: String,
    /// Piano samples.
    pub piano: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000/api".into(),
            data_dir: PathBuf::from(".chord-trainer"),
            request_timeout_ms: 10_000,
            retry: RetryConfig::default(),
            auto_submit_delay_ms: 1_000,
            playback_gap_ms: 1_000,
            instruments: InstrumentIds::default(),
            audio_command: None,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1_000,
            max_delay_ms: 8_000,
        }
    }
}

impl Default for InstrumentIds {
    fn default() -> Self {
        Self {
            guitar: "guitar".into(),
            piano: "piano".into(),
        }
    }
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults, then apply
    /// the environment override of the backend URL.
    pub fn load() -> Self {
        let mut config = Self::load_from(&resolve_config_path());
        if let Some(url) = env::var(API_URL_ENV).ok().filter(|url| !url.trim().is_empty()) {
            info!(api_base_url = %url, "backend URL overridden from environment");
            config.api_base_url = url;
        }
        config
    }

    /// Load the configuration stored at `path`.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<Self>(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        api_base_url = %config.api_base_url,
                        "loaded config"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Connection settings for [`crate::dao::backend::ApiClient`].
    pub fn backend(&self) -> BackendConfig {
        BackendConfig::new(self.api_base_url.clone())
            .with_timeout(Duration::from_millis(self.request_timeout_ms))
            .with_retry(RetryPolicy {
                max_retries: self.retry.max_retries,
                initial_delay: Duration::from_millis(self.retry.initial_delay_ms),
                max_delay: Duration::from_millis(self.retry.max_delay_ms),
            })
    }

    /// Tunables of the game screens.
    pub fn game_settings(&self) -> GameSettings {
        GameSettings {
            auto_submit_delay: Duration::from_millis(self.auto_submit_delay_ms),
            default_guitar_id: self.instruments.guitar.clone(),
            default_piano_id: self.instruments.piano.clone(),
        }
    }

    /// Gap inserted between consecutive clips.
    pub fn playback_gap(&self) -> Duration {
        Duration::from_millis(self.playback_gap_ms)
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("absent.json"));
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn partial_file_is_merged_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.json");
        fs::write(
            &path,
            r#"{"api_base_url": "https://chords.example/api", "retry": {"max_retries": 5}}"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path);
        assert_eq!(config.api_base_url, "https://chords.example/api");
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.max_delay_ms, 8_000);
        assert_eq!(config.auto_submit_delay_ms, 1_000);

        let backend = config.backend();
        assert_eq!(backend.retry.max_retries, 5);
        assert_eq!(backend.timeout, Duration::from_secs(10));
    }

    #[test]
    fn invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.json");
        fs::write(&path, "{not json").unwrap();
        assert_eq!(AppConfig::load_from(&path), AppConfig::default());
    }

    #[test]
    fn settings_follow_config() {
        let config = AppConfig {
            auto_submit_delay_ms: 250,
            instruments: InstrumentIds {
                guitar: "g-1".into(),
                piano: "p-1".into(),
            },
            ..AppConfig::default()
        };
        let settings = config.game_settings();
        assert_eq!(settings.auto_submit_delay, Duration::from_millis(250));
        assert_eq!(settings.default_piano_id, "p-1");
    }
}
