use crate::logging;
use crate::settings::{Keymap, Settings};
use eyre::Result;
use serde::de::DeserializeOwned;
use std::{fs, path::PathBuf};

pub const CONFIG_FILE_NAME: &str = "configuration.json";
pub const STATE_FILE_NAME: &str = "states.db";

#[derive(Debug, Clone)]
pub struct Config {
    pub settings: Settings,
    pub keymap: Keymap,
    filepath: PathBuf,
}

impl Config {
    /// Load the configuration from the app data directory, writing the
    /// defaults there on first run.
    pub fn new() -> Result<Self> {
        let prefix = get_app_data_prefix()?;
        let filepath = prefix.join(CONFIG_FILE_NAME);

        if filepath.exists() {
            return Self::load_from(filepath);
        }

        let config = Self {
            settings: Settings::default(),
            keymap: Keymap::default(),
            filepath,
        };
        config.save()?;
        Ok(config)
    }

    /// Read the configuration from the app data directory without creating
    /// anything when it is missing.
    pub fn read_existing() -> Result<Self> {
        let prefix = get_app_data_prefix()?;
        Self::load_from(prefix.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from a custom path. Missing or malformed sections
    /// fall back to their defaults.
    pub fn load_from(filepath: PathBuf) -> Result<Self> {
        let mut settings = Settings::default();
        let mut keymap = Keymap::default();

        if filepath.exists() {
            let config_str = fs::read_to_string(&filepath)?;
            match serde_json::from_str::<serde_json::Value>(&config_str) {
                Ok(user_config) => {
                    if let Some(value) = section(&user_config, "Setting") {
                        settings = value;
                    }
                    if let Some(value) = section(&user_config, "Keymap") {
                        keymap = value;
                    }
                }
                Err(err) => logging::warn(format!(
                    "ignoring malformed configuration {}: {}",
                    filepath.display(),
                    err
                )),
            }
        }

        Ok(Self {
            settings,
            keymap,
            filepath,
        })
    }

    /// Default settings bound to `filepath`, used when loading fails.
    pub fn with_defaults(filepath: PathBuf) -> Self {
        Self {
            settings: Settings::default(),
            keymap: Keymap::default(),
            filepath,
        }
    }

    pub fn filepath(&self) -> &PathBuf {
        &self.filepath
    }

    /// Save current configuration to file
    pub fn save(&self) -> Result<()> {
        let config_json = serde_json::json!({
            "Setting": self.settings,
            "Keymap": self.keymap,
        });
        let config_str = serde_json::to_string_pretty(&config_json)?;

        if let Some(parent) = self.filepath.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.filepath, config_str)?;
        Ok(())
    }
}

fn section<T: DeserializeOwned>(config: &serde_json::Value, name: &str) -> Option<T> {
    let value = config.get(name)?;
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            logging::warn(format!("ignoring invalid \"{}\" section: {}", name, err));
            None
        }
    }
}

pub fn get_app_data_prefix() -> Result<PathBuf> {
    if let Some(config_home) = std::env::var_os("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(config_home).join("nread"));
    } else if let Some(home) = std::env::var_os("HOME") {
        let path = PathBuf::from(home.clone()).join(".config").join("nread");
        if path.exists() {
            return Ok(path);
        } else {
            return Ok(PathBuf::from(home).join(".nread"));
        }
    } else if let Some(user_profile) = std::env::var_os("USERPROFILE") {
        return Ok(PathBuf::from(user_profile).join(".nread"));
    }

    Err(eyre::eyre!(
        "Could not determine application data directory"
    ))
}
