//! Configuration for scene parsing and project scanning.
//!
//! Load order: `docgen.toml` in the project root → environment variables → defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

const CONFIG_FILE: &str = "docgen.toml";

/// Top-level docgen configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocgenConfig {
    pub scene: SceneConfig,
    pub project: ProjectConfig,
}

/// Scene parsing configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Regular expression matched against the full node name.
    /// Matching node declarations are left out of the scene tree.
    /// Empty by default, which excludes nothing but unnamed nodes.
    pub ignore: String,
}

/// Project scanning configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Skip hidden files and directories (`.godot/`, `.import/`, ...).
    pub skip_hidden: bool,
    /// Honour `.gitignore` files while walking the project.
    pub git_ignore: bool,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            skip_hidden: true,
            git_ignore: true,
        }
    }
}

impl DocgenConfig {
    /// Load config from `docgen.toml` in the project root, with env var overrides.
    /// Falls back to defaults if no config file exists.
    pub fn load(project_root: &Path) -> Result<Self> {
        let config_path = project_root.join(CONFIG_FILE);

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("failed to read {}", config_path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("failed to parse {}", config_path.display()))?
        } else {
            Self::default()
        };

        config.apply_overrides(|var| std::env::var(var).ok());
        config.validate()?;

        Ok(config)
    }

    /// Apply environment-style overrides from `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(ignore) = lookup("DOCGEN_IGNORE") {
            self.scene.ignore = ignore;
        }
        if let Some(v) = lookup("DOCGEN_SKIP_HIDDEN")
            && let Ok(b) = v.parse()
        {
            self.project.skip_hidden = b;
        }
    }

    /// Reject settings that would only fail later, mid-scan.
    pub fn validate(&self) -> Result<()> {
        regex::Regex::new(&self.scene.ignore)
            .with_context(|| format!("invalid scene.ignore pattern {:?}", self.scene.ignore))?;
        Ok(())
    }
}
