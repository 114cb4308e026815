//! Scene tree model and outline rendering.
//!
//! A [`Node`] owns its children directly, so a scene tree is a single owned
//! value rooted at the scene's root node. The outline format produced by
//! [`print_tree`] renders as a line block when embedded in reStructuredText:
//!
//! ```text
//! |Root
//! |  -Player
//! |  -  -Sprite
//! ```

use serde::{Deserialize, Serialize};
use std::io::{self, Write};

/// Prefix Godot uses for project-relative resource paths.
pub const RES_PREFIX: &str = "res://";

const INDENT: &str = "  -";

/// One entry in a scene tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    /// Declared node class. Instanced sub-scenes carry no `type`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    /// Path of the attached script resource, as written in the scene file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    /// Name of the parent node; `None` for the root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            node_type: None,
            script: None,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Attached script path relative to the project root (`res://` removed).
    pub fn script_file(&self) -> Option<&str> {
        self.script
            .as_deref()
            .map(|s| s.strip_prefix(RES_PREFIX).unwrap_or(s))
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Count this node and every node below it.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Node::node_count).sum::<usize>()
    }

    /// Find a node by name in this subtree (pre-order, first match).
    pub fn find(&self, name: &str) -> Option<&Node> {
        self.walk().map(|(_, node)| node).find(|node| node.name == name)
    }

    /// Lazy depth-first pre-order traversal yielding `(depth, node)`,
    /// with this node at depth 0.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: vec![(0, self)],
        }
    }
}

/// Pre-order iterator over a subtree. See [`Node::walk`].
pub struct Walk<'a> {
    stack: Vec<(usize, &'a Node)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (usize, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, node) = self.stack.pop()?;
        // Reversed so the first child is popped next.
        self.stack
            .extend(node.children.iter().rev().map(|child| (depth + 1, child)));
        Some((depth, node))
    }
}

/// Write the outline of `node` and its descendants, starting at `depth`.
///
/// Each line is `|`, then `depth` repetitions of `"  -"`, then the node name.
pub fn print_tree<W: Write + ?Sized>(out: &mut W, node: &Node, depth: usize) -> io::Result<()> {
    for (offset, n) in node.walk() {
        writeln!(out, "|{}{}", INDENT.repeat(depth + offset), n.name)?;
    }
    Ok(())
}

/// Write the outline of `node` to standard output.
pub fn print_tree_stdout(node: &Node) -> io::Result<()> {
    let stdout = io::stdout();
    let mut lock = stdout.lock();
    print_tree(&mut lock, node, 0)
}

/// Render the outline of `node` as a string.
pub fn render_tree(node: &Node) -> String {
    let mut buf = Vec::new();
    print_tree(&mut buf, node, 0).expect("writing to a Vec cannot fail");
    String::from_utf8_lossy(&buf).into_owned()
}
