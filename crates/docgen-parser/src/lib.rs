//! Godot scene parsing for godot-docgen.
//!
//! Reads `.tscn` scene files line by line, rebuilds each scene's node tree
//! with attached scripts resolved, and scans whole projects for scenes and
//! exported class docs.

pub mod attr;
pub mod project;
pub mod scene;

pub use project::Project;
pub use scene::{Scene, SceneError};
