//! Core types for godot-docgen.
//!
//! Provides the scene tree data model ([`tree::Node`]), the outline printer used
//! to embed scene trees in generated docs, and project configuration.

pub mod config;
pub mod tree;
