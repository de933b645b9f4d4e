//! Tree Tests
//!
//! Tests for path resolution, node lookup, and the path grammar.

use std::sync::Arc;

use sshs::{AttributeFlags, PanicFatalHandler, Tree};

fn test_tree() -> Tree {
    Tree::with_handler(Arc::new(PanicFatalHandler))
}

// =============================================================================
// Resolution Tests
// =============================================================================

#[test]
fn test_root_path_resolves_to_root() {
    let tree = test_tree();
    assert_eq!(tree.node("/"), tree.root());
    assert_eq!(tree.existing_node("/").unwrap(), tree.root());
}

#[test]
fn test_node_creates_whole_chain() {
    let tree = test_tree();

    let fine = tree.node("/sensor/bias/fine/");

    assert_eq!(fine.path(), "/sensor/bias/fine/");
    assert!(tree.exists("/sensor/"));
    assert!(tree.exists("/sensor/bias/"));
    assert!(tree.exists("/sensor/bias/fine/"));
}

#[test]
fn test_node_is_get_or_create() {
    let tree = test_tree();

    let first = tree.node("/sensor/");
    first.create_int("x", 1, 0, 10, AttributeFlags::NORMAL, "marker");

    let second = tree.node("/sensor/");
    assert_eq!(first, second);
    assert_eq!(second.get_int("x"), 1);
}

#[test]
fn test_existing_node_never_creates() {
    let tree = test_tree();

    assert!(tree.existing_node("/phantom/").is_none());
    assert!(!tree.exists("/phantom/"));

    tree.node("/real/");
    assert!(tree.existing_node("/real/").is_some());
    // The failed lookup above left nothing behind.
    assert!(!tree.exists("/phantom/"));
}

#[test]
fn test_tree_clones_share_the_store() {
    let tree = test_tree();
    let alias = tree.clone();

    tree.node("/shared/").create_int("x", 5, 0, 10, AttributeFlags::NORMAL, "shared");

    assert_eq!(alias.node("/shared/").get_int("x"), 5);
    assert_eq!(alias.root(), tree.root());
}

#[test]
fn test_tree_moves_between_threads() {
    let tree = test_tree();
    tree.node("/worker/").create_int("x", 1, 0, 10, AttributeFlags::NORMAL, "state");

    let handle = {
        let tree = tree.clone();
        std::thread::spawn(move || tree.node("/worker/").get_int("x"))
    };

    assert_eq!(handle.join().unwrap(), 1);
}

// =============================================================================
// Path Grammar Tests
// =============================================================================

#[test]
#[should_panic(expected = "must start with '/'")]
fn test_path_without_leading_slash_is_fatal() {
    let tree = test_tree();
    let _ = tree.node("sensor/");
}

#[test]
#[should_panic(expected = "must end with '/'")]
fn test_path_without_trailing_slash_is_fatal() {
    let tree = test_tree();
    let _ = tree.node("/sensor");
}

#[test]
#[should_panic(expected = "empty segment")]
fn test_path_with_empty_segment_is_fatal() {
    let tree = test_tree();
    let _ = tree.node("/sensor//bias/");
}

#[test]
#[should_panic(expected = "must start with '/'")]
fn test_empty_path_is_fatal() {
    let tree = test_tree();
    let _ = tree.node("");
}

#[test]
#[should_panic(expected = "must start with '/'")]
fn test_existing_node_checks_the_grammar_too() {
    let tree = test_tree();
    let _ = tree.existing_node("sensor/");
}
