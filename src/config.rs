use std::path::{Path, PathBuf};

use config::{Case, Config, ConfigError, File};
use serde::{Deserialize, Serialize};

use crate::path::{resolve_relative, sanitize_branch_name};

/// Configuration for worktree placement, post-create setup, and AI integration.
///
/// The `worktree-dir` template is relative to the repository root and supports:
/// - `{repo}` - Repository name
/// - `{branch}` - Branch name (slashes replaced with dashes)
///
/// # Examples
///
/// ```toml
/// # Default - a sibling directory holding every worktree of the repo
/// worktree-dir = "../{repo}.worktrees/{branch}"
///
/// # Organized in a .worktrees subdirectory
/// worktree-dir = ".worktrees/{branch}"
///
/// # Run after a worktree is created (failure is reported as a warning)
/// post-create = "npm install"
///
/// # Disable GitHub PR/CI enrichment
/// github = false
///
/// # AI CLI used to draft commit messages
/// [ai]
/// command = "claude"
/// args = ["-p"]
/// ```
///
/// Config file location:
/// - Linux: `~/.config/arbor/config.toml`
/// - macOS: `~/Library/Application Support/arbor/config.toml`
/// - Windows: `%APPDATA%\arbor\config.toml`
///
/// Environment variables: `ARBOR_WORKTREE_DIR`, `ARBOR_POST_CREATE`, `ARBOR_GITHUB`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArborConfig {
    #[serde(rename = "worktree-dir")]
    pub worktree_dir: String,

    #[serde(
        rename = "post-create",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub post_create: Option<String>,

    #[serde(default = "default_github")]
    pub github: bool,

    #[serde(default)]
    pub ai: AiConfig,
}

/// Configuration for the AI CLI
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiConfig {
    /// Command to invoke (e.g., "llm", "claude")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Arguments passed before the prompt
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

pub const DEFAULT_WORKTREE_DIR: &str = "../{repo}.worktrees/{branch}";

fn default_github() -> bool {
    true
}

impl Default for ArborConfig {
    fn default() -> Self {
        Self {
            worktree_dir: DEFAULT_WORKTREE_DIR.to_string(),
            post_create: None,
            github: true,
            ai: AiConfig::default(),
        }
    }
}

/// A loaded configuration plus where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedConfig {
    pub config: ArborConfig,
    pub path: Option<PathBuf>,
    /// True once a config file has been written (by the init flow or by hand).
    pub initialized: bool,
}

impl ArborConfig {
    /// Load configuration from the user config file and environment variables.
    ///
    /// Configuration is loaded in the following order (later sources override earlier ones):
    /// 1. Default values
    /// 2. Config file (~/.config/arbor/config.toml on Linux)
    /// 3. Environment variables (ARBOR_*)
    pub fn load() -> Result<LoadedConfig, ConfigError> {
        Self::load_from(config_path().as_deref())
    }

    /// Load configuration using an explicit config file location.
    pub fn load_from(path: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
        let defaults = Self::default();

        let mut builder = Config::builder()
            .set_default("worktree-dir", defaults.worktree_dir)?
            .set_default("github", defaults.github)?;

        let initialized = path.is_some_and(Path::exists);
        if let Some(path) = path
            && initialized
        {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("ARBOR")
                .prefix_separator("_")
                .separator("__")
                .convert_case(Case::Kebab),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        validate_worktree_dir(&config.worktree_dir)?;
        log::debug!("Loaded config (initialized={initialized}): {config:?}");
        Ok(LoadedConfig {
            config,
            path: path.map(Path::to_path_buf),
            initialized,
        })
    }

    /// Write this configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        validate_worktree_dir(&self.worktree_dir)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        log::debug!("Wrote config to {}", path.display());
        Ok(())
    }

    /// Format a worktree path using this configuration's template.
    ///
    /// ```
    /// use arbor::config::ArborConfig;
    ///
    /// let config = ArborConfig::default();
    /// let path = config.format_path("myproject", "feature/foo");
    /// assert_eq!(path, "../myproject.worktrees/feature-foo");
    /// ```
    pub fn format_path(&self, repo: &str, branch: &str) -> String {
        self.worktree_dir
            .replace("{repo}", repo)
            .replace("{branch}", &sanitize_branch_name(branch))
    }

    /// Absolute location for a new worktree of `branch` in the repo at `repo_root`.
    pub fn worktree_path_for(&self, repo_root: &Path, branch: &str) -> PathBuf {
        let repo = repo_root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "repo".to_string());
        resolve_relative(repo_root, &self.format_path(&repo, branch))
    }
}

/// Default location of the user config file.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("arbor").join("config.toml"))
}

pub fn validate_worktree_dir(template: &str) -> Result<(), ConfigError> {
    if template.trim().is_empty() {
        return Err(ConfigError::Message(
            "worktree-dir cannot be empty".to_string(),
        ));
    }

    if Path::new(template).is_absolute() {
        return Err(ConfigError::Message(
            "worktree-dir must be relative, not absolute".to_string(),
        ));
    }

    Ok(())
}
