//! Discover and parse the scenes of a Godot project.

use crate::scene::{self, Scene};
use anyhow::{Context, Result};
use docgen_core::config::DocgenConfig;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

const SCENE_EXTENSION: &str = "tscn";
const CLASS_DOC_EXTENSION: &str = "xml";
const IGNORE_FILE: &str = ".docgenignore";

/// Scenes and class docs found under a project root.
#[derive(Debug, Default)]
pub struct Project {
    pub root: PathBuf,
    /// Parsed scenes keyed by `/`-separated path relative to `root`.
    pub scenes: BTreeMap<String, Scene>,
    /// Relative paths of exported `.xml` class docs.
    pub class_docs: BTreeSet<String>,
    /// Scenes that failed to parse, with the error message.
    pub failures: BTreeMap<String, String>,
}

impl Project {
    /// Walk `root` and parse every scene file with the configured ignore pattern.
    ///
    /// A scene that fails to parse is recorded in `failures`; the scan continues.
    pub fn scan(root: &Path, config: &DocgenConfig) -> Result<Self> {
        let root = root
            .canonicalize()
            .with_context(|| format!("project root {} does not exist", root.display()))?;
        if !root.is_dir() {
            anyhow::bail!("project root {} is not a directory", root.display());
        }
        let ignore = scene::ignore_pattern(&config.scene.ignore)
            .with_context(|| format!("invalid scene.ignore pattern {:?}", config.scene.ignore))?;

        let walker = ignore::WalkBuilder::new(&root)
            .hidden(config.project.skip_hidden)
            .git_ignore(config.project.git_ignore)
            .require_git(false)
            .add_custom_ignore_filename(IGNORE_FILE)
            .build();

        let mut project = Self {
            root: root.clone(),
            ..Self::default()
        };

        for entry in walker.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            let rel = relative_key(&root, path);
            match ext {
                SCENE_EXTENSION => {
                    let mut scene = Scene::with_ignore(ignore.clone());
                    match scene.parse_file(path) {
                        Ok(()) => {
                            project.scenes.insert(rel, scene);
                        }
                        Err(e) => {
                            tracing::warn!("skipping scene {rel}: {e}");
                            project.failures.insert(rel, e.to_string());
                        }
                    }
                }
                CLASS_DOC_EXTENSION => {
                    project.class_docs.insert(rel);
                }
                _ => {}
            }
        }

        tracing::info!(
            "scanned {}: {} scenes, {} class docs, {} failures",
            root.display(),
            project.scenes.len(),
            project.class_docs.len(),
            project.failures.len()
        );
        Ok(project)
    }

    pub fn scene(&self, rel_path: &str) -> Option<&Scene> {
        self.scenes.get(rel_path)
    }
}

/// `/`-joined path of `path` relative to `root`, independent of platform separators.
fn relative_key(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
