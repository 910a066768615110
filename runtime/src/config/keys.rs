//! API key store at `~/.urlsift/config.json`, with environment overrides.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Credentials for the sources that need them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeys {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virustotal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urlscan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alienvault: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct KeyFile {
    #[serde(default)]
    api_keys: ApiKeys,
}

impl ApiKeys {
    /// Key for a source by its name. Blank keys count as missing.
    pub fn get(&self, source: &str) -> Option<&str> {
        let key = match source {
            "virustotal" => self.virustotal.as_deref(),
            "urlscan" => self.urlscan.as_deref(),
            "otx" | "alienvault" => self.alienvault.as_deref(),
            "github" => self.github.as_deref(),
            _ => None,
        };
        key.filter(|k| !k.trim().is_empty())
    }

    /// Default key store location.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".urlsift").join("config.json"))
            .ok_or(ConfigError::NoHomeDir)
    }

    /// Load keys from `path`. A missing file yields empty keys.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = match std::fs::read_to_string(path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::KeyStore {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let file: KeyFile =
            serde_json::from_str(&data).map_err(|source| ConfigError::KeyStoreFormat {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(file.api_keys)
    }

    /// Persist keys to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::KeyStore {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let file = KeyFile {
            api_keys: self.clone(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(|source| {
            ConfigError::KeyStoreFormat {
                path: path.to_path_buf(),
                source,
            }
        })?;
        std::fs::write(path, json + "\n").map_err(io_err)
    }

    /// Write an empty key file unless one already exists. Returns whether it was created.
    pub fn init_file(path: &Path) -> Result<bool, ConfigError> {
        if path.exists() {
            return Ok(false);
        }
        let empty = ApiKeys {
            virustotal: Some(String::new()),
            urlscan: Some(String::new()),
            alienvault: Some(String::new()),
            github: Some(String::new()),
        };
        empty.save(path)?;
        Ok(true)
    }

    /// Apply `URLSIFT_<NAME>_KEY` overrides through the given lookup.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let slots = [
            ("URLSIFT_VIRUSTOTAL_KEY", &mut self.virustotal),
            ("URLSIFT_URLSCAN_KEY", &mut self.urlscan),
            ("URLSIFT_ALIENVAULT_KEY", &mut self.alienvault),
            ("URLSIFT_GITHUB_KEY", &mut self.github),
        ];
        for (var, slot) in slots {
            if let Some(value) = lookup(var).filter(|v| !v.trim().is_empty()) {
                *slot = Some(value);
            }
        }
        self
    }

    /// Load the default store and apply process environment overrides.
    pub fn resolve() -> Result<Self, ConfigError> {
        let path = Self::default_path()?;
        Ok(Self::load(&path)?.with_env_overrides(|var| std::env::var(var).ok()))
    }
}
