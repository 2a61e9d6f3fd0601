//! User configuration at `<config dir>/icsport/config.toml`.
//!
//! Values can be overridden with `ICSPORT_*` environment variables
//! (e.g. `ICSPORT_CALENDAR_ID=work@example.com`).

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::delivery::{DEFAULT_MAX_SEQUENCE_RETRIES, DeliveryOptions};
use crate::error::{IcsPortError, IcsPortResult};

const APP_DIR: &str = "icsport";
const DEFAULT_CALENDAR_ID: &str = "primary";

fn default_calendar_id() -> String {
    DEFAULT_CALENDAR_ID.to_string()
}

fn default_max_sequence_retries() -> u32 {
    DEFAULT_MAX_SEQUENCE_RETRIES
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Google account whose session is used for delivery
    #[serde(default)]
    pub account: Option<String>,

    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,

    #[serde(default)]
    pub check_duplicates: bool,

    #[serde(default)]
    pub continue_on_error: bool,

    #[serde(default = "default_max_sequence_retries")]
    pub max_sequence_retries: u32,

    #[serde(default)]
    pub aliases_path: Option<PathBuf>,

    #[serde(default)]
    pub names_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            account: None,
            calendar_id: default_calendar_id(),
            check_duplicates: false,
            continue_on_error: false,
            max_sequence_retries: default_max_sequence_retries(),
            aliases_path: None,
            names_path: None,
        }
    }
}

impl Settings {
    pub fn config_dir() -> IcsPortResult<PathBuf> {
        Ok(dirs::config_dir()
            .ok_or_else(|| IcsPortError::Config("Could not determine config directory".into()))?
            .join(APP_DIR))
    }

    pub fn config_path() -> IcsPortResult<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load settings, writing a commented default file on first use.
    pub fn load() -> IcsPortResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> IcsPortResult<Self> {
        Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(Environment::with_prefix("ICSPORT").try_parsing(true))
            .build()
            .map_err(|e| IcsPortError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| IcsPortError::Config(e.to_string()))
    }

    pub fn aliases_path(&self) -> IcsPortResult<PathBuf> {
        match &self.aliases_path {
            Some(path) => Ok(expand(path)),
            None => Ok(Self::config_dir()?.join("aliases.json")),
        }
    }

    pub fn names_path(&self) -> IcsPortResult<PathBuf> {
        match &self.names_path {
            Some(path) => Ok(expand(path)),
            None => Ok(Self::config_dir()?.join("names.json")),
        }
    }

    pub fn delivery_options(&self) -> DeliveryOptions {
        DeliveryOptions {
            check_duplicates: self.check_duplicates,
            continue_on_error: self.continue_on_error,
            max_sequence_retries: self.max_sequence_retries,
        }
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> IcsPortResult<()> {
        let contents = format!(
            "\
# icsport configuration

# Google account used for imports:
# account = \"me@gmail.com\"

# Calendar that receives imported events:
# calendar_id = \"{}\"

# Look every event up by iCalUID before creating it:
# check_duplicates = false

# Keep going when an event fails to import:
# continue_on_error = false

# Attempts when the remote reports a sequence conflict:
# max_sequence_retries = {}

# Identity tables filled by `icsport prepare`:
# aliases_path = \"~/.config/icsport/aliases.json\"
# names_path = \"~/.config/icsport/names.json\"
",
            DEFAULT_CALENDAR_ID, DEFAULT_MAX_SEQUENCE_RETRIES
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                IcsPortError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| IcsPortError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}

fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("icsport/config.toml");
        Settings::create_default_config(&path).unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.calendar_id, "primary");
        assert_eq!(settings.max_sequence_retries, 3);
        assert!(!settings.check_duplicates);
        assert_eq!(settings.delivery_options(), DeliveryOptions::default());
    }

    #[test]
    fn test_values_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "account = \"me@example.com\"\n\
             calendar_id = \"team@group.calendar.google.com\"\n\
             continue_on_error = true\n\
             max_sequence_retries = 5\n\
             names_path = \"/tmp/names.json\"\n",
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.account.as_deref(), Some("me@example.com"));
        assert_eq!(settings.calendar_id, "team@group.calendar.google.com");
        assert!(settings.delivery_options().continue_on_error);
        assert_eq!(settings.delivery_options().max_sequence_retries, 5);
        assert_eq!(settings.names_path().unwrap(), PathBuf::from("/tmp/names.json"));
    }

    #[test]
    fn test_tilde_is_expanded() {
        let settings = Settings {
            aliases_path: Some(PathBuf::from("~/aliases.json")),
            ..Default::default()
        };
        let path = settings.aliases_path().unwrap();
        assert!(!path.to_string_lossy().starts_with('~'));
        assert!(path.ends_with("aliases.json"));
    }

    #[test]
    fn test_invalid_value_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "max_sequence_retries = \"lots\"\n").unwrap();

        assert!(matches!(Settings::load_from(&path), Err(IcsPortError::Config(_))));
    }
}
