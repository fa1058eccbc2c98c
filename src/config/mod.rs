//! Configuration for chanarchive.
//!
//! Read from `~/.config/chanarchive/config.toml` unless a path is given.
//! If the default file doesn't exist, a commented template is created.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Display name of the channel to archive, exactly as in the dialog list.
    pub channel_name: Option<String>,
    pub api: ApiConfig,
    pub archive: ArchiveConfig,
    pub render: RenderConfig,
}

/// Connection to the messaging bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_id: Option<i64>,
    pub api_hash: Option<String>,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// Messages or dialogs requested per page (default: 100)
    pub page_size: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080/".to_string(),
            api_id: None,
            api_hash: None,
            timeout_secs: 30,
            page_size: 100,
        }
    }
}

/// How a document reaches disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Append to `<id>.md`, creating it if needed.
    #[default]
    Append,
    /// Write `<id>.md.tmp` and rename it over `<id>.md`.
    Replace,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub output_dir: PathBuf,
    /// Directory under `output_dir` that holds the documents
    pub posts_dir: String,
    /// Maximum number of history entries to walk (default: 1000)
    pub limit: usize,
    /// Start after this post id; 0 starts at the beginning
    pub start_after: i64,
    /// Pause between posts in milliseconds (default: 500)
    pub pacing_ms: u64,
    /// Pause before retrying after a transient failure (default: 10)
    pub backoff_secs: u64,
    /// Consecutive failures tolerated on one post (default: 5)
    pub max_retries: u32,
    pub write_mode: WriteMode,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            posts_dir: "posts".to_string(),
            limit: 1000,
            start_after: 0,
            pacing_ms: 500,
            backoff_secs: 10,
            max_retries: 5,
            write_mode: WriteMode::Append,
        }
    }
}

impl ArchiveConfig {
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }

    pub fn posts_path(&self) -> PathBuf {
        self.output_dir.join(&self.posts_dir)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.output_dir.join("archive.db")
    }
}

/// Labels and placeholders used in rendered documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub post_label: String,
    pub comments_heading: String,
    pub empty_text: String,
    pub custom_reaction: String,
    pub link_base: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            post_label: "Пост от".to_string(),
            comments_heading: "Комментарии".to_string(),
            empty_text: "{no text}".to_string(),
            custom_reaction: "(CustomEmoji)".to_string(),
            link_base: "https://t.me".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the default location.
    ///
    /// A missing default file is created from a template and defaults are
    /// returned. A missing explicit path is an error. Missing fields use
    /// default values.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default_path = Self::default_config_path()?;
                if !default_path.exists() {
                    Self::create_default_config(&default_path)?;
                    tracing::info!("Wrote config template to {}", default_path.display());
                    return Ok(Self::default());
                }
                default_path
            }
        };

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path,
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/chanarchive/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("chanarchive").join("config.toml"))
    }

    pub fn require_channel(&self) -> Result<&str, ConfigError> {
        self.channel_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or(ConfigError::Missing("channel_name"))
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    fn default_config_content() -> String {
        r##"# chanarchive configuration

# Channel to archive, exactly as it appears in your dialog list
# channel_name = "My Channel"

[api]
# Messaging bridge that holds the authenticated session
base_url = "http://127.0.0.1:8080/"
# api_id = 12345
# api_hash = "0123456789abcdef"
timeout_secs = 30
page_size = 100

[archive]
output_dir = "."
posts_dir = "posts"

# Number of history entries to walk
limit = 1000

# Resume after this post id (0 = from the beginning)
start_after = 0

# Pause between posts, in milliseconds
pacing_ms = 500

# Pause before retrying a post after a transient error, in seconds
backoff_secs = 10
max_retries = 5

# "append" adds to existing documents, "replace" swaps them atomically
write_mode = "append"

[render]
post_label = "Пост от"
comments_heading = "Комментарии"
empty_text = "{no text}"
custom_reaction = "(CustomEmoji)"
link_base = "https://t.me"
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Missing required setting `{0}`")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_deserializes() {
        let content = Config::default_config_content();
        let config: Config = toml::from_str(&content).expect("Default config should be valid TOML");

        assert_eq!(config.channel_name, None);
        assert_eq!(config.archive.limit, 1000);
        assert_eq!(config.archive.write_mode, WriteMode::Append);
        assert_eq!(config.render.empty_text, "{no text}");
    }

    #[test]
    fn test_partial_config() {
        let content = r##"
channel_name = "Rust News"

[archive]
pacing_ms = 0
write_mode = "replace"
"##;
        let config: Config = toml::from_str(content).expect("Partial config should work");

        assert_eq!(config.require_channel().unwrap(), "Rust News");
        assert_eq!(config.archive.pacing(), Duration::ZERO);
        assert_eq!(config.archive.write_mode, WriteMode::Replace);
        // Defaults
        assert_eq!(config.archive.backoff(), Duration::from_secs(10));
        assert_eq!(config.api.page_size, 100);
    }

    #[test]
    fn test_missing_channel() {
        let config: Config = toml::from_str("").expect("Empty config should work");
        assert!(matches!(
            config.require_channel(),
            Err(ConfigError::Missing("channel_name"))
        ));
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "channel_name = \"News\"\n[archive]\nlimit = 5\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.channel_name.as_deref(), Some("News"));
        assert_eq!(config.archive.limit, 5);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load(Some(&dir.path().join("absent.toml")));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_archive_paths() {
        let config = ArchiveConfig {
            output_dir: PathBuf::from("/srv/archive"),
            ..ArchiveConfig::default()
        };
        assert_eq!(config.posts_path(), PathBuf::from("/srv/archive/posts"));
        assert_eq!(config.ledger_path(), PathBuf::from("/srv/archive/archive.db"));
    }
}
