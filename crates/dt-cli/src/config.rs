//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use dt_core::{ConstraintSettings, StorageFormat, Target};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    /// Serialization of stored timers.
    pub storage_format: StorageFormat,
    /// Clock used to measure time spent against limits.
    pub timer_target: Target,
    /// Report min-time limits to the client.
    pub consider_min_time: bool,
    /// Extend max-time limits with the candidate's extra time.
    pub apply_extra_time: bool,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("storage_format", &self.storage_format.as_str())
            .field("timer_target", &self.timer_target.as_str())
            .field("consider_min_time", &self.consider_min_time)
            .field("apply_extra_time", &self.apply_extra_time)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("dt.db"),
            storage_format: StorageFormat::default(),
            timer_target: Target::default(),
            consider_min_time: true,
            apply_extra_time: true,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        Self::figment(config_path).extract()
    }

    fn figment(config_path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (DT_*)
        figment.merge(Env::prefixed("DT_"))
    }

    /// Settings used to build time constraints.
    pub const fn constraint_settings(&self) -> ConstraintSettings {
        ConstraintSettings {
            consider_min_time: self.consider_min_time,
            apply_extra_time: self.apply_extra_time,
            timer_target: self.timer_target,
        }
    }

    /// Lock file serializing requests against the database.
    pub fn lock_path(&self) -> PathBuf {
        self.database_path.with_extension("lock")
    }
}

/// Returns the platform-specific config directory for dt.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("dt"))
}

/// Returns the platform-specific data directory for dt.
///
/// On Linux: `~/.local/share/dt`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("dt"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_data_path_ends_with_dt() {
        let path = dirs_data_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "dt");
    }

    #[test]
    fn test_default_config_uses_data_dir_for_db() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap();
        assert_eq!(config.database_path, data_dir.join("dt.db"));
        assert_eq!(config.storage_format, StorageFormat::Json);
        assert_eq!(config.timer_target, Target::Server);
    }

    #[test]
    fn test_config_file_overrides_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("dt.toml");
        std::fs::write(
            &path,
            "database_path = \"/srv/dt/timers.db\"\nstorage_format = \"packed\"\ntimer_target = \"client\"\nconsider_min_time = false\n",
        )
        .unwrap();

        let config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(&path))
            .extract()
            .unwrap();
        assert_eq!(config.database_path, PathBuf::from("/srv/dt/timers.db"));
        assert_eq!(config.storage_format, StorageFormat::Packed);
        assert_eq!(
            config.constraint_settings(),
            ConstraintSettings {
                consider_min_time: false,
                apply_extra_time: true,
                timer_target: Target::Client,
            }
        );
    }

    #[test]
    fn test_lock_path_sits_next_to_database() {
        let config = Config {
            database_path: PathBuf::from("/srv/dt/timers.db"),
            ..Config::default()
        };
        assert_eq!(config.lock_path(), PathBuf::from("/srv/dt/timers.lock"));
    }
}
