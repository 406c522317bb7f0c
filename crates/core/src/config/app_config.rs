use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::constants::{APP_DIR_NAME, AUTO_LANGUAGE, CREDENTIAL_ENV};

const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode config: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Persisted user defaults. Unknown fields are ignored and missing ones
/// take their default, so older and newer files both load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub hf_token: Option<String>,
    /// Language code, or `"auto"` to detect.
    pub language: String,
    pub num_speakers: Option<u32>,
    /// `txt`, `srt` or `json`.
    pub output_format: String,
    pub output_dir: Option<PathBuf>,
    /// External diarization program and its leading arguments.
    pub diarization_command: Option<Vec<String>>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            hf_token: None,
            language: AUTO_LANGUAGE.to_string(),
            num_speakers: None,
            output_format: "txt".to_string(),
            output_dir: None,
            diarization_command: None,
        }
    }
}

impl AppConfig {
    /// `<config dir>/diarscribe/config.json`
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|d| d.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load from the default location; a missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("No config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(ConfigError::Encode)?;
        fs::write(path, json).map_err(write_err)?;
        log::debug!("Saved config to {}", path.display());
        Ok(())
    }

    pub fn has_credential(&self) -> bool {
        non_blank(self.hf_token.as_deref()).is_some()
    }

    /// Credential for the diarizer: the explicit value, then the
    /// `HF_TOKEN` environment variable, then the stored one.
    pub fn resolve_credential(&self, cli: Option<&str>) -> Option<String> {
        let env = std::env::var(CREDENTIAL_ENV).ok();
        self.resolve_credential_with(cli, env.as_deref())
    }

    fn resolve_credential_with(&self, cli: Option<&str>, env: Option<&str>) -> Option<String> {
        non_blank(cli)
            .or_else(|| non_blank(env))
            .or_else(|| non_blank(self.hf_token.as_deref()))
            .map(str::to_string)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.language, "auto");
        assert_eq!(config.output_format, "txt");
        assert!(config.num_speakers.is_none());
        assert!(!config.has_credential());
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = AppConfig::load_from(&tmp.path().join("absent.json")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_save_then_load_preserves_fields() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("config.json");
        let config = AppConfig {
            hf_token: Some("hf_abc".to_string()),
            language: "ko".to_string(),
            num_speakers: Some(3),
            output_format: "srt".to_string(),
            output_dir: Some(PathBuf::from("/tmp/out")),
            diarization_command: Some(vec!["python3".to_string(), "diarize.py".to_string()]),
        };

        config.save_to(&path).unwrap();

        assert_eq!(AppConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_fills_defaults_and_ignores_unknown_fields() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(
            &path,
            r#"{"language": "en", "high_accuracy": true, "last_output_dir": "x"}"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();

        assert_eq!(config.language, "en");
        assert_eq!(config.output_format, "txt");
        assert!(config.hf_token.is_none());
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(&path, "{not json").unwrap();

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[rstest]
    #[case::cli_wins(Some("cli"), Some("env"), Some("stored"), Some("cli"))]
    #[case::env_next(None, Some("env"), Some("stored"), Some("env"))]
    #[case::stored_last(None, None, Some("stored"), Some("stored"))]
    #[case::blank_cli_skipped(Some("  "), None, Some("stored"), Some("stored"))]
    #[case::blank_stored(None, None, Some(" "), None)]
    #[case::nothing(None, None, None, None)]
    fn test_resolve_credential_order(
        #[case] cli: Option<&str>,
        #[case] env: Option<&str>,
        #[case] stored: Option<&str>,
        #[case] expected: Option<&str>,
    ) {
        let config = AppConfig {
            hf_token: stored.map(str::to_string),
            ..AppConfig::default()
        };
        assert_eq!(
            config.resolve_credential_with(cli, env).as_deref(),
            expected
        );
    }

    #[test]
    fn test_config_path_is_under_app_dir() {
        if let Ok(path) = AppConfig::config_path() {
            assert!(path.ends_with(Path::new(APP_DIR_NAME).join(CONFIG_FILE_NAME)));
        }
    }
}
