use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::completion::Provider;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProfileConfig {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub samples: Option<u32>,
    pub max_tokens: Option<u32>,
    pub timeout: Option<u64>,
    pub base_url: Option<String>,
    pub output: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    profiles: Option<HashMap<String, ProfileConfig>>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot resolve config path: set LITQ_CONFIG or HOME/XDG_CONFIG_HOME.")]
    NoConfigPath,

    #[error("Failed to read config file '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Config file '{}' does not contain a [profiles] section.", .path.display())]
    MissingProfiles { path: PathBuf },

    #[error("Profile '{name}' not found in config file '{}'.", .path.display())]
    ProfileNotFound { name: String, path: PathBuf },

    #[error("Invalid profile {field} '{value}'. Supported values: {supported}.")]
    InvalidValue {
        field: &'static str,
        value: String,
        supported: String,
    },
}

pub fn load_profile(name: &str) -> Result<ProfileConfig, ConfigError> {
    let path = config_path()?;
    load_profile_from(&path, name)
}

/// Parses the config file and, when `profile` is given, checks that it
/// exists and holds valid values. Returns the file path.
pub fn validate_config(profile: Option<&str>) -> Result<PathBuf, ConfigError> {
    let path = config_path()?;
    match profile {
        Some(name) => {
            let profile = load_profile_from(&path, name)?;
            profile.validate()?;
        }
        None => {
            let profiles = read_profiles(&path)?;
            for profile in profiles.values() {
                profile.validate()?;
            }
        }
    }
    Ok(path)
}

impl ProfileConfig {
    pub fn provider(&self) -> Result<Option<Provider>, ConfigError> {
        self.provider
            .as_deref()
            .map(|value| {
                Provider::parse(value).ok_or_else(|| ConfigError::InvalidValue {
                    field: "provider",
                    value: value.to_string(),
                    supported: Provider::supported(),
                })
            })
            .transpose()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.provider()?;
        if let Some(output) = &self.output {
            if !matches!(output.as_str(), "text" | "json") {
                return Err(ConfigError::InvalidValue {
                    field: "output",
                    value: output.clone(),
                    supported: "text, json".to_string(),
                });
            }
        }
        Ok(())
    }
}

fn read_profiles(path: &Path) -> Result<HashMap<String, ProfileConfig>, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let config: ConfigFile = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    config.profiles.ok_or_else(|| ConfigError::MissingProfiles {
        path: path.to_path_buf(),
    })
}

fn load_profile_from(path: &Path, name: &str) -> Result<ProfileConfig, ConfigError> {
    let mut profiles = read_profiles(path)?;
    profiles
        .remove(name)
        .ok_or_else(|| ConfigError::ProfileNotFound {
            name: name.to_string(),
            path: path.to_path_buf(),
        })
}

fn config_path() -> Result<PathBuf, ConfigError> {
    if let Some(path) = non_empty_var("LITQ_CONFIG") {
        return Ok(PathBuf::from(path));
    }

    if let Some(xdg) = non_empty_var("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(xdg).join("litquery").join("config.toml"));
    }

    let home = non_empty_var("HOME").ok_or(ConfigError::NoConfigPath)?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("litquery")
        .join("config.toml"))
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
