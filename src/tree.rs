//! Settings tree
//!
//! Owns the root node and resolves slash-delimited paths. A [`Tree`] is a
//! cheap handle: clones share the same store, and handles move freely
//! between threads.
//!
//! ## Paths
//!
//! - The root is `/`; its name is the empty string.
//! - Absolute paths start and end with `/`: `/sensor/bias/`.
//! - Relative paths end with `/` but do not start with one: `bias/`.
//! - Segments are non-empty and contain no `/`.
//!
//! Malformed paths are contract violations (paths come from code, not user
//! data) and go to the tree's fatal handler.

use std::sync::Arc;

use crate::error::{ExitFatalHandler, SharedFatalHandler};
use crate::node::Node;

/// The hierarchical settings store.
#[derive(Clone)]
pub struct Tree {
    root: Node,
}

impl Tree {
    /// Create an empty tree with the default fatal-error strategy, which
    /// logs the violation and terminates the process.
    pub fn new() -> Tree {
        Tree::with_handler(Arc::new(ExitFatalHandler))
    }

    /// Create an empty tree with an explicit fatal-error strategy. Tests
    /// install [`PanicFatalHandler`](crate::error::PanicFatalHandler) here to
    /// turn usage violations into catchable panics.
    pub fn with_handler(handler: SharedFatalHandler) -> Tree {
        Tree {
            root: Node::new_root(handler),
        }
    }

    /// The root node.
    pub fn root(&self) -> Node {
        self.root.clone()
    }

    /// Get or create the node at an absolute `path`, creating intermediate
    /// nodes as needed. `/` resolves to the root.
    pub fn node(&self, path: &str) -> Node {
        let segments = match parse_absolute_path(path) {
            Ok(segments) => segments,
            Err(problem) => self.root.fatal(&format!("node(): {problem}")),
        };

        let mut current = self.root.clone();
        for segment in segments {
            current = current.add_child(segment);
        }
        current
    }

    /// Look up the node at an absolute `path` without creating anything.
    pub fn existing_node(&self, path: &str) -> Option<Node> {
        let segments = match parse_absolute_path(path) {
            Ok(segments) => segments,
            Err(problem) => self.root.fatal(&format!("existing_node(): {problem}")),
        };

        let mut current = self.root.clone();
        for segment in segments {
            current = current.child(segment)?;
        }
        Some(current)
    }

    /// Whether a node exists at the absolute `path`.
    pub fn exists(&self, path: &str) -> bool {
        self.existing_node(path).is_some()
    }
}

impl Default for Tree {
    fn default() -> Self {
        Tree::new()
    }
}

// =============================================================================
// Path grammar
// =============================================================================

/// Split an absolute path into its segments. `/` yields no segments.
pub(crate) fn parse_absolute_path(path: &str) -> Result<Vec<&str>, String> {
    if !path.starts_with('/') {
        return Err(format!("absolute path '{path}' must start with '/'"));
    }
    if !path.ends_with('/') {
        return Err(format!("absolute path '{path}' must end with '/'"));
    }
    if path == "/" {
        return Ok(Vec::new());
    }

    split_segments(&path[1..path.len() - 1], path)
}

/// Split a relative path into its segments. At least one segment is
/// required.
pub(crate) fn parse_relative_path(path: &str) -> Result<Vec<&str>, String> {
    if path.starts_with('/') {
        return Err(format!("relative path '{path}' must not start with '/'"));
    }
    if !path.ends_with('/') {
        return Err(format!("relative path '{path}' must end with '/'"));
    }

    split_segments(&path[..path.len() - 1], path)
}

fn split_segments<'a>(interior: &'a str, full_path: &str) -> Result<Vec<&'a str>, String> {
    let segments: Vec<&str> = interior.split('/').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(format!("path '{full_path}' contains an empty segment"));
    }
    Ok(segments)
}

/// Node names are path segments: non-empty, no `/`.
pub(crate) fn validate_node_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err(String::from("node name must not be empty"));
    }
    if name.contains('/') {
        return Err(format!("node name '{name}' must not contain '/'"));
    }
    Ok(())
}
