//! Build a scene tree from a Godot `.tscn` file.
//!
//! Parsing is two passes. The scan records script resources and flat node
//! declarations with their parent and script references still unresolved,
//! since a node may name a parent declared anywhere in the file. Linking then
//! resolves those references and assembles the owned tree.
//!
//! Nodes are keyed by their path from the root (`.` for the root itself,
//! `HUD/Health` for a grandchild), which is exactly what a child's `parent`
//! attribute holds. Names only need to be unique among siblings.

use crate::attr;
use docgen_core::tree::{self, Node};
use regex::Regex;
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Errors from building a scene tree.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("failed to read scene {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid ignore pattern: {0}")]
    InvalidIgnorePattern(#[from] regex::Error),
    #[error("scene has already been parsed")]
    AlreadyParsed,
    #[error("scene has no root node")]
    NoRoot,
    #[error("scene has more than one root node: {first:?} and {second:?}")]
    MultipleRoots { first: String, second: String },
    #[error("node path {0:?} is declared more than once")]
    DuplicateNode(String),
}

/// Compile an ignore pattern so that it must match a whole node name.
pub fn ignore_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    // Unbalanced groups like `a)|(b` only compile once wrapped
    Regex::new(pattern)?;
    Regex::new(&format!("^(?:{pattern})$"))
}

/// A parsed Godot scene.
#[derive(Debug, Clone)]
pub struct Scene {
    tree: Option<Node>,
    ignore: Regex,
}

impl Default for Scene {
    fn default() -> Self {
        Self::with_ignore(ignore_pattern("").expect("empty pattern compiles"))
    }
}

/// A node declaration whose parent and script are still names/ids.
#[derive(Debug)]
struct PendingNode {
    name: String,
    node_type: Option<String>,
    /// Raw `parent` attribute: `.` or a `/`-separated path from the root.
    parent_path: Option<String>,
    script_id: Option<String>,
}

impl PendingNode {
    fn key(&self) -> String {
        match self.parent_path.as_deref() {
            None => ".".to_string(),
            Some(".") => self.name.clone(),
            Some(path) => format!("{path}/{}", self.name),
        }
    }
}

impl Scene {
    /// Create an empty scene that skips nodes whose full name matches `ignore`.
    pub fn new(ignore: &str) -> Result<Self, SceneError> {
        Ok(Self::with_ignore(ignore_pattern(ignore)?))
    }

    /// Create an empty scene from an already anchored ignore pattern.
    pub fn with_ignore(ignore: Regex) -> Self {
        Self { tree: None, ignore }
    }

    /// The root of the scene tree, once parsed.
    pub fn root(&self) -> Option<&Node> {
        self.tree.as_ref()
    }

    pub fn is_parsed(&self) -> bool {
        self.tree.is_some()
    }

    /// Number of nodes reachable from the root.
    pub fn node_count(&self) -> usize {
        self.tree.as_ref().map_or(0, Node::node_count)
    }

    pub fn find(&self, name: &str) -> Option<&Node> {
        self.tree.as_ref()?.find(name)
    }

    /// Read and parse a `.tscn` file.
    pub fn parse_file(&mut self, path: impl AsRef<Path>) -> Result<(), SceneError> {
        let path = path.as_ref();
        if self.is_parsed() {
            return Err(SceneError::AlreadyParsed);
        }
        let source = std::fs::read_to_string(path).map_err(|source| SceneError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse_str(&source)
    }

    /// Parse scene text already in memory.
    pub fn parse_str(&mut self, source: &str) -> Result<(), SceneError> {
        if self.is_parsed() {
            return Err(SceneError::AlreadyParsed);
        }
        let (scripts, pending) = self.scan(source);
        self.tree = Some(link(&scripts, pending)?);
        Ok(())
    }

    /// Write the scene outline. Writes nothing for an unparsed scene.
    pub fn print_tree<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        match &self.tree {
            Some(root) => tree::print_tree(out, root, 0),
            None => Ok(()),
        }
    }

    pub fn print_tree_stdout(&self) -> io::Result<()> {
        match &self.tree {
            Some(root) => tree::print_tree_stdout(root),
            None => Ok(()),
        }
    }

    pub fn render_tree(&self) -> String {
        self.tree.as_ref().map(tree::render_tree).unwrap_or_default()
    }

    fn scan(&self, source: &str) -> (HashMap<String, String>, Vec<PendingNode>) {
        let mut scripts = HashMap::new();
        let mut nodes: Vec<PendingNode> = Vec::new();
        let mut parsing_node_properties = false;

        for line in source.lines() {
            if parsing_node_properties {
                let line = line.trim();
                if line.is_empty() {
                    parsing_node_properties = false;
                } else if let Some(id) = attr::script_resource_id(line)
                    && let Some(node) = nodes.last_mut()
                {
                    node.script_id = Some(id.to_string());
                }
                // Anything else is property or inline source text
                continue;
            }

            let Some(header) = line.trim_end().strip_prefix('[') else {
                continue;
            };
            let header = header.strip_suffix(']').unwrap_or(header);

            let kind = header.split_whitespace().next().unwrap_or("");
            if kind == "ext_resource" {
                if attr::extract(header, "type") != Some("Script") {
                    continue;
                }
                match (attr::extract(header, "id"), attr::extract(header, "path")) {
                    (Some(id), Some(path)) => {
                        scripts.insert(id.to_string(), path.to_string());
                    }
                    _ => tracing::debug!("script resource without id or path: {header}"),
                }
            } else if kind == "node" {
                let Some(name) = attr::extract(header, "name") else {
                    tracing::debug!("node declaration without a name: {header}");
                    continue;
                };
                if self.ignore.is_match(name) {
                    tracing::debug!("ignoring node {name}");
                    continue;
                }
                nodes.push(PendingNode {
                    name: name.to_string(),
                    node_type: attr::extract(header, "type").map(String::from),
                    parent_path: attr::extract(header, "parent").map(String::from),
                    script_id: None,
                });
                parsing_node_properties = true;
            }
        }

        (scripts, nodes)
    }
}

/// Resolve deferred references and assemble the owned tree.
fn link(scripts: &HashMap<String, String>, pending: Vec<PendingNode>) -> Result<Node, SceneError> {
    let (root, parent_of) = resolve_parents(&pending)?;

    let mut children_of: Vec<Vec<usize>> = vec![Vec::new(); pending.len()];
    for (i, parent) in parent_of.iter().enumerate() {
        if let Some(p) = *parent {
            children_of[p].push(i);
        }
    }

    let root_name = pending[root].name.clone();
    let mut slots: Vec<Option<Node>> = pending
        .into_iter()
        .map(|p| {
            let script = p.script_id.and_then(|id| {
                let path = scripts.get(&id).cloned();
                if path.is_none() {
                    tracing::warn!("node {} references unknown script resource {id}", p.name);
                }
                path
            });
            let parent = p.parent_path.map(|path| match path.as_str() {
                "." => root_name.clone(),
                path => attr::parent_name(path).to_string(),
            });
            Some(Node {
                name: p.name,
                node_type: p.node_type,
                script,
                parent,
                children: Vec::new(),
            })
        })
        .collect();

    Ok(assemble(root, &mut slots, &children_of))
}

/// Find the single root and map every node to its parent's index.
///
/// A parent's key is always a strict prefix of its child's key, so the
/// resulting parent links cannot form a cycle.
fn resolve_parents(pending: &[PendingNode]) -> Result<(usize, Vec<Option<usize>>), SceneError> {
    let mut index: HashMap<String, usize> = HashMap::with_capacity(pending.len());
    for (i, node) in pending.iter().enumerate() {
        let key = node.key();
        if index.contains_key(&key) {
            return Err(SceneError::DuplicateNode(key));
        }
        index.insert(key, i);
    }

    let mut roots = pending
        .iter()
        .enumerate()
        .filter(|(_, n)| n.parent_path.is_none());
    let root = match (roots.next(), roots.next()) {
        (None, _) => return Err(SceneError::NoRoot),
        (Some((i, _)), None) => i,
        (Some((_, first)), Some((_, second))) => {
            return Err(SceneError::MultipleRoots {
                first: first.name.clone(),
                second: second.name.clone(),
            });
        }
    };

    let parent_of: Vec<Option<usize>> = pending
        .iter()
        .map(|node| {
            let path = node.parent_path.as_deref()?;
            let resolved = index.get(path).copied();
            if resolved.is_none() {
                tracing::warn!(
                    "dropping node {}: parent {path} is not in the scene",
                    node.name
                );
            }
            resolved
        })
        .collect();

    Ok((root, parent_of))
}

fn assemble(idx: usize, slots: &mut [Option<Node>], children_of: &[Vec<usize>]) -> Node {
    let mut node = slots[idx]
        .take()
        .expect("every node has at most one parent and the root has none");
    node.children = children_of[idx]
        .iter()
        .map(|&child| assemble(child, slots, children_of))
        .collect();
    node
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Scene {
        let mut scene = Scene::default();
        scene.parse_str(source).unwrap();
        scene
    }

    #[test]
    fn test_minimal_scene() {
        let scene = parse("[node name=\"Root\" type=\"Node2D\"]\n\n[node name=\"Child\" type=\"Sprite2D\" parent=\".\"]\n");
        let root = scene.root().unwrap();
        assert_eq!(root.name, "Root");
        assert_eq!(root.node_type.as_deref(), Some("Node2D"));
        assert_eq!(root.parent, None);
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].name, "Child");
        assert_eq!(root.children[0].parent.as_deref(), Some("Root"));
        assert_eq!(scene.render_tree(), "|Root\n|  -Child\n");
    }

    #[test]
    fn test_parent_declared_after_child() {
        let scene = parse(
            "[node name=\"Root\" type=\"Node\"]\n\n\
             [node name=\"Leaf\" type=\"Node\" parent=\"Branch\"]\n\n\
             [node name=\"Branch\" type=\"Node\" parent=\".\"]\n",
        );
        let branch = scene.find("Branch").unwrap();
        assert_eq!(branch.children[0].name, "Leaf");
        assert_eq!(scene.node_count(), 3);
    }

    #[test]
    fn test_nested_parent_path_uses_last_segment() {
        let scene = parse(
            "[node name=\"Root\" type=\"Node\"]\n\n\
             [node name=\"A\" type=\"Node\" parent=\".\"]\n\n\
             [node name=\"B\" type=\"Node\" parent=\"A\"]\n\n\
             [node name=\"C\" type=\"Node\" parent=\"A/B\"]\n",
        );
        assert_eq!(scene.find("C").unwrap().parent.as_deref(), Some("B"));
        assert_eq!(scene.render_tree(), "|Root\n|  -A\n|  -  -B\n|  -  -  -C\n");
    }

    #[test]
    fn test_second_parse_is_rejected() {
        let mut scene = parse("[node name=\"Root\" type=\"Node\"]\n");
        let err = scene.parse_str("[node name=\"Other\" type=\"Node\"]\n").unwrap_err();
        assert!(matches!(err, SceneError::AlreadyParsed));
        assert_eq!(scene.root().unwrap().name, "Root");
    }

    #[test]
    fn test_no_root() {
        let mut scene = Scene::default();
        let err = scene.parse_str("[gd_scene format=3]\n").unwrap_err();
        assert!(matches!(err, SceneError::NoRoot));
        assert!(!scene.is_parsed());
    }

    #[test]
    fn test_multiple_roots() {
        let mut scene = Scene::default();
        let err = scene
            .parse_str("[node name=\"A\" type=\"Node\"]\n\n[node name=\"B\" type=\"Node\"]\n")
            .unwrap_err();
        match err {
            SceneError::MultipleRoots { first, second } => {
                assert_eq!(first, "A");
                assert_eq!(second, "B");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_path() {
        let mut scene = Scene::default();
        let err = scene
            .parse_str(
                "[node name=\"Root\" type=\"Node\"]\n\n\
                 [node name=\"X\" type=\"Node\" parent=\".\"]\n\n\
                 [node name=\"X\" type=\"Node\" parent=\".\"]\n",
            )
            .unwrap_err();
        assert!(matches!(err, SceneError::DuplicateNode(name) if name == "X"));
    }

    #[test]
    fn test_same_name_under_different_parents() {
        let scene = parse(
            "[node name=\"Root\" type=\"Node\"]\n\n\
             [node name=\"A\" type=\"Node\" parent=\".\"]\n\n\
             [node name=\"Sprite\" type=\"Sprite2D\" parent=\"A\"]\n\n\
             [node name=\"B\" type=\"Node\" parent=\".\"]\n\n\
             [node name=\"Sprite\" type=\"Sprite2D\" parent=\"B\"]\n",
        );
        assert_eq!(scene.node_count(), 5);
        assert_eq!(
            scene.render_tree(),
            "|Root\n|  -A\n|  -  -Sprite\n|  -B\n|  -  -Sprite\n"
        );
        let b = scene.find("B").unwrap();
        assert_eq!(b.children[0].parent.as_deref(), Some("B"));
    }

    #[test]
    fn test_mutual_parents_are_dropped_not_looped() {
        let scene = parse(
            "[node name=\"Root\" type=\"Node\"]\n\n\
             [node name=\"A\" type=\"Node\" parent=\"B\"]\n\n\
             [node name=\"B\" type=\"Node\" parent=\"A\"]\n\n\
             [node name=\"S\" type=\"Node\" parent=\"S\"]\n",
        );
        assert_eq!(scene.node_count(), 1);
    }

    #[test]
    fn test_similar_headers_are_not_declarations() {
        let scene = parse(
            "[ext_resource_extra type=\"Script\" path=\"res://x.gd\" id=\"1\"]\n\
             [node_path name=\"Bogus\"]\n\
             [nodes name=\"Other\"]\n\
             [node name=\"Root\" type=\"Node\"]\n\
             script = ExtResource(\"1\")\n",
        );
        let root = scene.root().unwrap();
        assert_eq!(root.name, "Root");
        assert_eq!(root.script, None);
        assert_eq!(scene.node_count(), 1);
    }

    #[test]
    fn test_unknown_parent_is_dropped() {
        let scene = parse(
            "[node name=\"Root\" type=\"Node\"]\n\n\
             [node name=\"Lost\" type=\"Node\" parent=\"Nowhere\"]\n\n\
             [node name=\"Kept\" type=\"Node\" parent=\".\"]\n",
        );
        assert_eq!(scene.node_count(), 2);
        assert!(scene.find("Lost").is_none());
    }

    #[test]
    fn test_invalid_ignore_pattern() {
        assert!(matches!(
            Scene::new("(unclosed"),
            Err(SceneError::InvalidIgnorePattern(_))
        ));
        // Balanced only after anchoring; must still be rejected
        assert!(matches!(
            Scene::new("a)|(b"),
            Err(SceneError::InvalidIgnorePattern(_))
        ));
    }

    #[test]
    fn test_ignore_is_full_match() {
        let mut scene = Scene::new("Debug").unwrap();
        scene
            .parse_str(
                "[node name=\"Root\" type=\"Node\"]\n\n\
                 [node name=\"Debug\" type=\"Label\" parent=\".\"]\n\n\
                 [node name=\"DebugPanel\" type=\"Panel\" parent=\".\"]\n",
            )
            .unwrap();
        assert!(scene.find("Debug").is_none());
        assert!(scene.find("DebugPanel").is_some());
    }

    #[test]
    fn test_unparsed_scene_prints_nothing() {
        let scene = Scene::default();
        let mut buf = Vec::new();
        scene.print_tree(&mut buf).unwrap();
        assert!(buf.is_empty());
        assert_eq!(scene.node_count(), 0);
    }
}
