use crate::error::{FriendsError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_FILENAME: &str = "./friends.md";

/// Environment variable overriding the friends file location
pub const FILE_ENV: &str = "FRIENDS_FILE";

/// Config key information
#[derive(Debug, Clone)]
pub struct KeyInfo {
    pub key: &'static str,
    pub description: &'static str,
}

/// Keys accepted by `friends config`
pub static CONFIG_KEYS: &[KeyInfo] = &[
    KeyInfo {
        key: "filename",
        description: "Friends file used when --filename is not given",
    },
    KeyInfo {
        key: "color",
        description: "Colorize output (true/false)",
    },
];

// -----------------------------------------------------------------------------
// Global config
// -----------------------------------------------------------------------------

fn global_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("friends")
}

pub fn global_config_file() -> PathBuf {
    global_config_dir().join("config.yaml")
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<bool>,
}

impl GlobalConfig {
    /// Load the global config, falling back to defaults if it is missing or unreadable
    pub fn load() -> Self {
        let path = global_config_file();
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Ignoring {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content).map_err(|e| FriendsError::Config(e.to_string()))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = serde_yaml::to_string(self).map_err(|e| FriendsError::Config(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        match key {
            "filename" => Ok(self.filename.clone()),
            "color" => Ok(self.color.map(|c| c.to_string())),
            _ => Err(unknown_key(key)),
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "filename" => self.filename = Some(value.trim().to_string()),
            "color" => {
                let enabled = value
                    .trim()
                    .parse::<bool>()
                    .map_err(|_| FriendsError::Config(format!("color must be true or false, got \"{}\"", value)))?;
                self.color = Some(enabled);
            }
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }

    pub fn color_enabled(&self) -> bool {
        self.color.unwrap_or(true)
    }
}

fn unknown_key(key: &str) -> FriendsError {
    let known: Vec<&str> = CONFIG_KEYS.iter().map(|k| k.key).collect();
    FriendsError::Config(format!("unknown key \"{}\" (known keys: {})", key, known.join(", ")))
}

// -----------------------------------------------------------------------------
// Friends file resolution
// -----------------------------------------------------------------------------

/// Pick the friends file: flag, then environment, then global config, then default
pub fn resolve_filename(flag: Option<&str>, env: Option<&str>, config: &GlobalConfig) -> PathBuf {
    let chosen = flag
        .or(env)
        .or(config.filename.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_FILENAME);
    expand_tilde(chosen)
}

/// Find the friends file for this invocation
pub fn friends_file(flag: Option<&str>, config: &GlobalConfig) -> PathBuf {
    let env = std::env::var(FILE_ENV).ok();
    resolve_filename(flag, env.as_deref(), config)
}

fn expand_tilde(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_resolution_order() {
        let config = GlobalConfig {
            filename: Some("/from/config.md".to_string()),
            color: None,
        };

        assert_eq!(
            resolve_filename(Some("flag.md"), Some("env.md"), &config),
            PathBuf::from("flag.md")
        );
        assert_eq!(resolve_filename(None, Some("env.md"), &config), PathBuf::from("env.md"));
        assert_eq!(resolve_filename(None, None, &config), PathBuf::from("/from/config.md"));
        assert_eq!(
            resolve_filename(None, Some("  "), &GlobalConfig::default()),
            PathBuf::from(DEFAULT_FILENAME)
        );
    }

    #[test]
    fn test_tilde_expansion() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/friends.md"), home.join("friends.md"));
        }
        assert_eq!(expand_tilde("friends.md"), PathBuf::from("friends.md"));
    }

    #[test]
    fn test_set_get_and_persist() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        assert_eq!(GlobalConfig::load_from(&path).unwrap(), GlobalConfig::default());

        let mut config = GlobalConfig::default();
        config.set("filename", " ~/notes/friends.md ").unwrap();
        config.set("color", "false").unwrap();
        config.save_to(&path).unwrap();

        let reloaded = GlobalConfig::load_from(&path).unwrap();
        assert_eq!(reloaded.get("filename").unwrap().as_deref(), Some("~/notes/friends.md"));
        assert_eq!(reloaded.get("color").unwrap().as_deref(), Some("false"));
        assert!(!reloaded.color_enabled());
    }

    #[test]
    fn test_rejects_bad_keys_and_values() {
        let mut config = GlobalConfig::default();
        assert!(matches!(config.set("colour", "true"), Err(FriendsError::Config(_))));
        assert!(matches!(config.set("color", "maybe"), Err(FriendsError::Config(_))));
        assert!(config.get("nope").is_err());
        assert!(config.color_enabled());
    }
}
