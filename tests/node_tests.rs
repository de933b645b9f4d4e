//! Node Tests
//!
//! Tests for tree structure, node listeners, listener identity, removal
//! semantics, and same-thread reentrancy.

use std::sync::Arc;

use parking_lot::Mutex;
use sshs::{
    AttributeEvent, AttributeFlags, AttributeValue, ListenerData, Node, NodeEvent,
    PanicFatalHandler, Tree,
};

type NodeLog = Arc<Mutex<Vec<(NodeEvent, String)>>>;
type AttributeLog = Arc<Mutex<Vec<(AttributeEvent, String, AttributeValue)>>>;

fn test_tree() -> Tree {
    Tree::with_handler(Arc::new(PanicFatalHandler))
}

fn record_node_event(_node: &Node, data: &ListenerData, event: NodeEvent, change_name: &str) {
    let log = data
        .downcast_ref::<Mutex<Vec<(NodeEvent, String)>>>()
        .expect("listener data should be a node event log");
    log.lock().push((event, change_name.to_owned()));
}

fn record_attribute_event(
    _node: &Node,
    data: &ListenerData,
    event: AttributeEvent,
    key: &str,
    value: &AttributeValue,
) {
    let log = data
        .downcast_ref::<Mutex<Vec<(AttributeEvent, String, AttributeValue)>>>()
        .expect("listener data should be an attribute event log");
    log.lock().push((event, key.to_owned(), value.clone()));
}

fn watch_children(node: &Node) -> NodeLog {
    let log: NodeLog = Arc::new(Mutex::new(Vec::new()));
    let data: ListenerData = log.clone();
    node.add_node_listener(data, record_node_event);
    log
}

fn watch_attributes(node: &Node) -> AttributeLog {
    let log: AttributeLog = Arc::new(Mutex::new(Vec::new()));
    let data: ListenerData = log.clone();
    node.add_attribute_listener(data, record_attribute_event);
    log
}

// =============================================================================
// Structure Tests
// =============================================================================

#[test]
fn test_root_name_and_path() {
    let tree = test_tree();
    let root = tree.root();

    assert_eq!(root.name(), "");
    assert_eq!(root.path(), "/");
    assert!(root.parent().is_none());
}

#[test]
fn test_child_paths_are_built_from_parent() {
    let tree = test_tree();
    let root = tree.root();

    let sensor = root.add_child("sensor");
    let bias = sensor.add_child("bias");

    assert_eq!(sensor.name(), "sensor");
    assert_eq!(sensor.path(), "/sensor/");
    assert_eq!(bias.path(), "/sensor/bias/");
    assert_eq!(bias.parent().unwrap(), sensor);
}

#[test]
fn test_add_child_is_get_or_create() {
    let tree = test_tree();
    let root = tree.root();
    let log = watch_children(&root);

    let first = root.add_child("sensor");
    let second = root.add_child("sensor");

    // Same node, and only the creation announced.
    assert_eq!(first, second);
    let events = log.lock();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0], (NodeEvent::ChildAdded, String::from("sensor")));
}

#[test]
fn test_handles_share_one_node() {
    let tree = test_tree();
    let root = tree.root();

    let via_add = root.add_child("shared");
    via_add.create_int("x", 1, 0, 10, AttributeFlags::NORMAL, "shared state");

    let via_lookup = root.child("shared").expect("child should exist");
    assert_eq!(via_lookup.get_int("x"), 1);

    via_lookup.put_int("x", 2).unwrap();
    assert_eq!(via_add.get_int("x"), 2);
}

#[test]
fn test_children_are_sorted_by_name() {
    let tree = test_tree();
    let root = tree.root();
    root.add_child("zebra");
    root.add_child("alpha");
    root.add_child("mid");

    let names: Vec<String> = root
        .children()
        .iter()
        .map(|child| child.name().to_owned())
        .collect();
    assert_eq!(names, vec!["alpha", "mid", "zebra"]);
    assert_eq!(root.child_names(), vec!["alpha", "mid", "zebra"]);
}

#[test]
fn test_child_lookup_without_creation() {
    let tree = test_tree();
    let root = tree.root();

    assert!(root.child("ghost").is_none());
    assert!(root.children().is_empty());
}

#[test]
fn test_relative_node_creates_interior_nodes() {
    let tree = test_tree();
    let sensor = tree.node("/sensor/");

    let deep = sensor.relative_node("bias/coarse/");

    assert_eq!(deep.path(), "/sensor/bias/coarse/");
    assert!(sensor.existing_relative_node("bias/").is_some());
    assert!(sensor.existing_relative_node("bias/fine/").is_none());
}

#[test]
#[should_panic(expected = "must not start with '/'")]
fn test_relative_node_rejects_absolute_path() {
    let tree = test_tree();
    let sensor = tree.node("/sensor/");
    let _ = sensor.relative_node("/bias/");
}

#[test]
#[should_panic(expected = "must not contain '/'")]
fn test_add_child_rejects_slash_in_name() {
    let tree = test_tree();
    tree.root().add_child("a/b");
}

#[test]
#[should_panic(expected = "must not be empty")]
fn test_add_child_rejects_empty_name() {
    let tree = test_tree();
    tree.root().add_child("");
}

// =============================================================================
// Listener Identity Tests
// =============================================================================

#[test]
fn test_duplicate_listener_registration_is_ignored() {
    let tree = test_tree();
    let root = tree.root();

    let log: NodeLog = Arc::new(Mutex::new(Vec::new()));
    let data: ListenerData = log.clone();
    root.add_node_listener(data.clone(), record_node_event);
    root.add_node_listener(data, record_node_event);

    root.add_child("once");
    assert_eq!(log.lock().len(), 1);
}

#[test]
fn test_same_callback_different_data_is_two_listeners() {
    let tree = test_tree();
    let root = tree.root();

    let first: NodeLog = Arc::new(Mutex::new(Vec::new()));
    let second: NodeLog = Arc::new(Mutex::new(Vec::new()));
    root.add_node_listener(first.clone(), record_node_event);
    root.add_node_listener(second.clone(), record_node_event);

    root.add_child("fanout");

    assert_eq!(first.lock().len(), 1);
    assert_eq!(second.lock().len(), 1);
}

#[test]
fn test_removed_listener_no_longer_fires() {
    let tree = test_tree();
    let root = tree.root();

    let log: NodeLog = Arc::new(Mutex::new(Vec::new()));
    let data: ListenerData = log.clone();
    root.add_node_listener(data.clone(), record_node_event);

    root.add_child("heard");
    root.remove_node_listener(data, record_node_event);
    root.add_child("unheard");

    let events = log.lock();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].1, "heard");
}

#[test]
fn test_remove_all_node_listeners() {
    let tree = test_tree();
    let root = tree.root();
    let log = watch_children(&root);

    root.remove_all_node_listeners();
    root.add_child("silent");

    assert!(log.lock().is_empty());
}

// =============================================================================
// Reentrancy Tests
// =============================================================================

#[test]
fn test_listener_may_write_back_into_the_node() {
    fn mirror_level(
        node: &Node,
        _data: &ListenerData,
        event: AttributeEvent,
        key: &str,
        _value: &AttributeValue,
    ) {
        // Same thread, same node, lock already held: must not deadlock.
        if event == AttributeEvent::Modified && key == "level" {
            let doubled = node.get_int("level") * 2;
            node.put_int("mirror", doubled).unwrap();
        }
    }

    let tree = test_tree();
    let node = tree.node("/mirror/");
    node.create_int("level", 0, 0, 100, AttributeFlags::NORMAL, "source");
    node.create_int("mirror", 0, 0, 200, AttributeFlags::NORMAL, "derived");
    node.add_attribute_listener(Arc::new(()), mirror_level);

    node.put_int("level", 21).unwrap();

    assert_eq!(node.get_int("level"), 21);
    assert_eq!(node.get_int("mirror"), 42);
}

#[test]
fn test_listener_may_register_listeners() {
    fn register_on_first_event(node: &Node, data: &ListenerData, event: NodeEvent, _name: &str) {
        if event == NodeEvent::ChildAdded {
            // Snapshot dispatch keeps this mutation safe mid-notification.
            node.add_node_listener(data.clone(), record_node_event);
        }
    }

    let tree = test_tree();
    let root = tree.root();
    let log: NodeLog = Arc::new(Mutex::new(Vec::new()));
    root.add_node_listener(log.clone(), register_on_first_event);

    root.add_child("first");
    // The recorder registered during dispatch sees only later events.
    root.add_child("second");

    let events = log.lock();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0], (NodeEvent::ChildAdded, String::from("second")));
}

#[test]
fn test_transaction_allows_nested_operations() {
    let tree = test_tree();
    let node = tree.node("/tx/");
    node.create_int("a", 0, 0, 10, AttributeFlags::NORMAL, "first");
    node.create_int("b", 0, 0, 10, AttributeFlags::NORMAL, "second");

    let tx = node.transaction();
    node.put_int("a", 1).unwrap();
    node.put_int("b", 2).unwrap();
    assert_eq!(node.get_int("a"), 1);
    drop(tx);

    assert_eq!(node.get_int("b"), 2);
}

// =============================================================================
// Subtree Clearing Tests
// =============================================================================

#[test]
fn test_clear_sub_tree_removes_attributes_keeps_nodes() {
    let tree = test_tree();
    let sensor = tree.node("/sensor/");
    let bias = tree.node("/sensor/bias/");
    sensor.create_int("threshold", 5, 0, 10, AttributeFlags::NORMAL, "level");
    bias.create_int("coarse", 2, 0, 7, AttributeFlags::NORMAL, "bias");

    sensor.clear_sub_tree(true);

    assert!(sensor.attribute_keys().is_empty());
    assert!(bias.attribute_keys().is_empty());
    // Structure survives; only attribute data is gone.
    assert!(tree.exists("/sensor/bias/"));
}

#[test]
fn test_clear_sub_tree_can_spare_the_start_node() {
    let tree = test_tree();
    let sensor = tree.node("/sensor/");
    let bias = tree.node("/sensor/bias/");
    sensor.create_int("threshold", 5, 0, 10, AttributeFlags::NORMAL, "level");
    bias.create_int("coarse", 2, 0, 7, AttributeFlags::NORMAL, "bias");

    sensor.clear_sub_tree(false);

    assert_eq!(sensor.attribute_keys(), vec!["threshold"]);
    assert!(bias.attribute_keys().is_empty());
}

#[test]
fn test_clear_sub_tree_drops_attribute_listeners() {
    let tree = test_tree();
    let sensor = tree.node("/sensor/");
    sensor.create_int("threshold", 5, 0, 10, AttributeFlags::NORMAL, "level");
    let log = watch_attributes(&sensor);

    sensor.clear_sub_tree(true);
    // The removed event still reached the listener before it was dropped.
    assert_eq!(log.lock().len(), 1);

    sensor.create_int("threshold", 5, 0, 10, AttributeFlags::NORMAL, "level");
    assert_eq!(log.lock().len(), 1);
}

// =============================================================================
// Node Removal Tests
// =============================================================================

#[test]
fn test_remove_node_announces_everything_in_order() {
    let tree = test_tree();
    let root = tree.root();
    let sensor = tree.node("/sensor/");
    let bias = tree.node("/sensor/bias/");

    sensor.create_int("threshold", 5, 0, 10, AttributeFlags::NORMAL, "level");
    sensor.create_bool("enabled", true, AttributeFlags::NORMAL, "power");
    bias.create_int("coarse", 2, 0, 7, AttributeFlags::NORMAL, "bias");

    let root_log = watch_children(&root);
    let sensor_log = watch_children(&sensor);
    let sensor_attr_log = watch_attributes(&sensor);
    let bias_attr_log = watch_attributes(&bias);

    sensor.remove_node();

    // Attributes first, top-down: the start node, then its children.
    let sensor_attrs = sensor_attr_log.lock();
    assert_eq!(sensor_attrs.len(), 2);
    assert!(sensor_attrs
        .iter()
        .all(|(event, _, _)| *event == AttributeEvent::Removed));
    let bias_attrs = bias_attr_log.lock();
    assert_eq!(bias_attrs.len(), 1);
    assert_eq!(bias_attrs[0].1, "coarse");

    // Then the structure, bottom-up: bias announced on sensor, sensor on root.
    let sensor_events = sensor_log.lock();
    assert_eq!(sensor_events.len(), 1);
    assert_eq!(sensor_events[0], (NodeEvent::ChildRemoved, String::from("bias")));
    let root_events = root_log.lock();
    assert_eq!(root_events.len(), 1);
    assert_eq!(root_events[0], (NodeEvent::ChildRemoved, String::from("sensor")));

    assert!(!tree.exists("/sensor/"));
}

#[test]
#[should_panic(expected = "used after removal")]
fn test_removed_node_handle_is_poisoned() {
    let tree = test_tree();
    let sensor = tree.node("/sensor/");
    sensor.remove_node();
    let _ = sensor.attribute_keys();
}

#[test]
#[should_panic(expected = "used after removal")]
fn test_removed_descendant_handle_is_poisoned() {
    let tree = test_tree();
    let sensor = tree.node("/sensor/");
    let bias = tree.node("/sensor/bias/");
    sensor.remove_node();
    let _ = bias.child_names();
}

#[test]
fn test_remove_node_on_root_clears_but_keeps_root() {
    let tree = test_tree();
    let root = tree.root();
    root.create_int("x", 1, 0, 10, AttributeFlags::NORMAL, "root attribute");
    tree.node("/below/");

    root.remove_node();

    // The root survives, emptied, and stays usable.
    assert!(root.attribute_keys().is_empty());
    assert!(root.children().is_empty());
    root.create_int("again", 2, 0, 10, AttributeFlags::NORMAL, "recreated");
    assert_eq!(root.get_int("again"), 2);
}

#[test]
fn test_fresh_node_with_removed_name_is_a_new_node() {
    let tree = test_tree();
    let first = tree.node("/sensor/");
    first.create_int("x", 1, 0, 10, AttributeFlags::NORMAL, "marker");
    first.remove_node();

    let second = tree.node("/sensor/");
    assert_ne!(first, second);
    assert!(!second.attribute_exists("x", sshs::AttributeType::Int));
}
