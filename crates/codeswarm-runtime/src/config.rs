use std::path::{Path, PathBuf};
use std::time::Duration;

use codeswarm_core::{DEFAULT_IGNORE_PATTERNS, IgnoreFilter, SwarmLayout};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Flat runtime configuration, loaded from `codeswarm.toml` at the project
/// root. Every field has a default so a missing file just means defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Filesystem anchor for the swarm
    #[serde(default = "default_project_path")]
    pub project_path: PathBuf,

    /// Roots handed to source discovery, relative to the project
    #[serde(default = "default_discovery_paths")]
    pub discovery_paths: Vec<String>,

    /// Language allow-list for discovery; none means all
    #[serde(default)]
    pub discovery_languages: Option<Vec<String>>,

    /// Swarm data directory under the project root
    #[serde(default = "default_swarm_root")]
    pub swarm_root: String,

    /// Used as graph_id for every persisted event
    #[serde(default = "default_swarm_id")]
    pub swarm_id: String,

    /// Simultaneous agent turns
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Cascade cap per (agent, correlation)
    #[serde(default = "default_max_trigger_depth")]
    pub max_trigger_depth: u32,

    /// Minimum spacing between triggers of one agent
    #[serde(default = "default_trigger_cooldown_ms")]
    pub trigger_cooldown_ms: u64,

    #[serde(default = "default_ignore_patterns")]
    pub workspace_ignore_patterns: Vec<String>,

    #[serde(default = "default_true")]
    pub workspace_ignore_dotfiles: bool,
}

fn default_project_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_discovery_paths() -> Vec<String> {
    vec!["src/".to_string()]
}

fn default_swarm_root() -> String {
    ".remora".to_string()
}

fn default_swarm_id() -> String {
    "swarm".to_string()
}

fn default_max_concurrency() -> usize {
    4
}

fn default_max_trigger_depth() -> u32 {
    5
}

fn default_trigger_cooldown_ms() -> u64 {
    1000
}

fn default_ignore_patterns() -> Vec<String> {
    DEFAULT_IGNORE_PATTERNS
        .iter()
        .map(|p| p.to_string())
        .collect()
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_path: default_project_path(),
            discovery_paths: default_discovery_paths(),
            discovery_languages: None,
            swarm_root: default_swarm_root(),
            swarm_id: default_swarm_id(),
            max_concurrency: default_max_concurrency(),
            max_trigger_depth: default_max_trigger_depth(),
            trigger_cooldown_ms: default_trigger_cooldown_ms(),
            workspace_ignore_patterns: default_ignore_patterns(),
            workspace_ignore_dotfiles: default_true(),
        }
    }
}

impl Config {
    pub const FILE_NAME: &'static str = "codeswarm.toml";

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::find_config_file())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Search the working directory and its ancestors for `codeswarm.toml`;
    /// a `.git` directory bounds the walk.
    pub fn find_config_file() -> PathBuf {
        let current = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

        for directory in current.ancestors() {
            let candidate = directory.join(Self::FILE_NAME);
            if candidate.exists() {
                return candidate;
            }
            if directory.join(".git").exists() {
                break;
            }
        }

        current.join(Self::FILE_NAME)
    }

    pub fn layout(&self) -> SwarmLayout {
        SwarmLayout::at(&self.project_path, &self.swarm_root)
    }

    pub fn ignore_filter(&self) -> IgnoreFilter {
        IgnoreFilter::new(
            self.workspace_ignore_patterns.clone(),
            self.workspace_ignore_dotfiles,
        )
    }

    pub fn trigger_cooldown(&self) -> Duration {
        Duration::from_millis(self.trigger_cooldown_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.swarm_root, ".remora");
        assert_eq!(config.swarm_id, "swarm");
        assert_eq!(config.max_concurrency, 4);
        assert_eq!(config.max_trigger_depth, 5);
        assert_eq!(config.trigger_cooldown_ms, 1000);
        assert!(config.workspace_ignore_dotfiles);
    }

    #[test]
    fn test_load_nonexistent_returns_default() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load_from(&temp_dir.path().join("nonexistent.toml"))?;
        assert_eq!(config.swarm_id, "swarm");
        Ok(())
    }

    #[test]
    fn test_save_and_load_round_trip() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(Config::FILE_NAME);

        let mut config = Config::default();
        config.swarm_id = "night-shift".to_string();
        config.max_trigger_depth = 3;
        config.discovery_languages = Some(vec!["python".to_string()]);
        config.save_to(&config_path)?;

        let loaded = Config::load_from(&config_path)?;
        assert_eq!(loaded.swarm_id, "night-shift");
        assert_eq!(loaded.max_trigger_depth, 3);
        assert_eq!(loaded.discovery_languages, Some(vec!["python".to_string()]));
        Ok(())
    }

    #[test]
    fn test_partial_file_fills_defaults() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(Config::FILE_NAME);
        std::fs::write(&config_path, "max_concurrency = 8\n").unwrap();

        let loaded = Config::load_from(&config_path)?;
        assert_eq!(loaded.max_concurrency, 8);
        assert_eq!(loaded.swarm_root, ".remora");
        Ok(())
    }

    #[test]
    fn test_layout_is_anchored_at_project() {
        let mut config = Config::default();
        config.project_path = PathBuf::from("/project");
        assert_eq!(
            config.layout().events_db(),
            PathBuf::from("/project/.remora/events/events.db")
        );
    }
}
