//! Runtime settings for the `high-five` binary.
//!
//! Sources, lowest precedence first: built-in defaults, an optional `high-five.toml` in the
//! working directory, then `HIGH_FIVE_*` environment variables with `__` between sections
//! (for example `HIGH_FIVE_STORE__BACKEND=sqlite`). A `.env` file is read into the environment
//! before anything else.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

const FILE_NAME: &str = "high-five";
const ENV_PREFIX: &str = "HIGH_FIVE";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    /// Only read by the sqlite backend
    pub url: String,
    /// How often live queries re-read a shared database; `0` turns polling off
    pub poll_interval_ms: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            url: "sqlite:high_five.db".into(),
            poll_interval_ms: 2_000,
        }
    }
}

impl StoreSettings {
    pub fn poll_interval(&self) -> Option<Duration> {
        (self.poll_interval_ms > 0).then(|| Duration::from_millis(self.poll_interval_ms))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdentitySettings {
    pub enabled: bool,
    pub persist_path: Option<PathBuf>,
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            persist_path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BoardSettings {
    pub name: String,
    pub moderation: bool,
    pub code_attempts: u32,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            name: "High Five Board".into(),
            moderation: false,
            code_attempts: 8,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub store: StoreSettings,
    pub identity: IdentitySettings,
    pub board: BoardSettings,
}

impl Settings {
    /// Loads `.env`, `high-five.toml` and the process environment.
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = dotenvy::dotenv() {
            log::debug!("Loaded environment from {}", path.display());
        }
        Self::build(
            Config::builder().add_source(File::with_name(FILE_NAME).required(false)),
            None,
        )
    }

    /// Parses settings from a TOML document, with the given variables standing in for the
    /// process environment.
    pub fn from_toml(toml: &str, env: HashMap<String, String>) -> Result<Self, SettingsError> {
        Self::build(
            Config::builder().add_source(File::from_str(toml, FileFormat::Toml)),
            Some(env),
        )
    }

    fn build(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, SettingsError> {
        let settings: Settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.board.name.trim().is_empty() {
            return Err(SettingsError::Invalid {
                key: "board.name",
                reason: "must not be blank".into(),
            });
        }
        if self.store.backend == StoreBackend::Sqlite && self.store.url.trim().is_empty() {
            return Err(SettingsError::Invalid {
                key: "store.url",
                reason: "required by the sqlite backend".into(),
            });
        }
        if self.board.code_attempts == 0 {
            return Err(SettingsError::Invalid {
                key: "board.code_attempts",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_to_empty_document() {
        let settings = Settings::from_toml("", HashMap::new()).unwrap();
        assert_eq!(settings.store.backend, StoreBackend::Memory);
        assert_eq!(settings.store.poll_interval(), Some(Duration::from_secs(2)));
        assert!(settings.identity.enabled);
        assert_eq!(settings.board.name, "High Five Board");
        assert_eq!(settings.board.code_attempts, 8);
    }

    #[test]
    fn test_file_values_override_defaults() {
        let toml = r#"
            [store]
            backend = "sqlite"
            url = "sqlite::memory:"
            poll_interval_ms = 0

            [board]
            name = "Team Standup"
            moderation = true
        "#;
        let settings = Settings::from_toml(toml, HashMap::new()).unwrap();
        assert_eq!(settings.store.backend, StoreBackend::Sqlite);
        assert_eq!(settings.store.url, "sqlite::memory:");
        assert_eq!(settings.store.poll_interval(), None);
        assert_eq!(settings.board.name, "Team Standup");
        assert!(settings.board.moderation);
    }

    #[test]
    fn test_environment_overrides_file() {
        let env = HashMap::from([
            ("HIGH_FIVE_BOARD__MODERATION".to_string(), "true".to_string()),
            ("HIGH_FIVE_IDENTITY__ENABLED".to_string(), "false".to_string()),
        ]);
        let settings = Settings::from_toml("[board]\nmoderation = false\n", env).unwrap();
        assert!(settings.board.moderation);
        assert!(!settings.identity.enabled);
    }

    #[test]
    fn test_blank_board_name_is_rejected() {
        let err = Settings::from_toml("[board]\nname = \"  \"\n", HashMap::new()).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { key: "board.name", .. }));
    }

    #[test]
    fn test_unknown_backend_is_a_load_error() {
        let err = Settings::from_toml("[store]\nbackend = \"postgres\"\n", HashMap::new()).unwrap_err();
        assert!(matches!(err, SettingsError::Load(_)));
    }
}
