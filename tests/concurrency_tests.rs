//! Concurrency Tests
//!
//! Exercises the two-lock design from multiple threads: structural
//! get-or-create races, attribute writes under contention, and
//! transaction exclusion.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use sshs::{
    AttributeEvent, AttributeFlags, AttributeValue, ListenerData, Node, NodeEvent,
    PanicFatalHandler, Tree,
};

fn test_tree() -> Tree {
    Tree::with_handler(Arc::new(PanicFatalHandler))
}

fn count_child_added(_node: &Node, data: &ListenerData, event: NodeEvent, _name: &str) {
    if event == NodeEvent::ChildAdded {
        let counter = data
            .downcast_ref::<AtomicUsize>()
            .expect("listener data should be a counter");
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

fn record_modified(
    _node: &Node,
    data: &ListenerData,
    event: AttributeEvent,
    _key: &str,
    value: &AttributeValue,
) {
    if event == AttributeEvent::Modified {
        let log = data
            .downcast_ref::<Mutex<Vec<AttributeValue>>>()
            .expect("listener data should be a value log");
        log.lock().unwrap().push(value.clone());
    }
}

// =============================================================================
// Structural Race Tests
// =============================================================================

#[test]
fn test_concurrent_add_child_creates_one_node() {
    let tree = test_tree();
    let counter: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
    tree.root().add_node_listener(counter.clone(), count_child_added);

    crossbeam::thread::scope(|scope| {
        for _ in 0..8 {
            let tree = tree.clone();
            scope.spawn(move |_| {
                for _ in 0..100 {
                    tree.root().add_child("shared");
                }
            });
        }
    })
    .unwrap();

    assert_eq!(tree.root().child_names(), vec!["shared"]);
    // Every handle points at the same node, so creation fired exactly once.
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_concurrent_path_resolution_converges() {
    let tree = test_tree();

    crossbeam::thread::scope(|scope| {
        for _ in 0..4 {
            let tree = tree.clone();
            scope.spawn(move |_| {
                for i in 0..50 {
                    let node = tree.node("/devices/camera/bias/");
                    node.add_child(if i % 2 == 0 { "coarse" } else { "fine" });
                }
            });
        }
    })
    .unwrap();

    let bias = tree.existing_node("/devices/camera/bias/").expect("bias should exist");
    assert_eq!(bias.child_names(), vec!["coarse", "fine"]);
}

// =============================================================================
// Attribute Contention Tests
// =============================================================================

#[test]
fn test_concurrent_puts_keep_value_in_range() {
    let tree = test_tree();
    let node = tree.node("/counter/");
    node.create_long("value", 0, 0, 10_000, AttributeFlags::NORMAL, "contended value");

    crossbeam::thread::scope(|scope| {
        for worker in 0..8 {
            let node = node.clone();
            scope.spawn(move |_| {
                for i in 0..200 {
                    node.put_long("value", (worker * 1000 + i) % 10_000)
                        .unwrap();
                }
            });
        }
    })
    .unwrap();

    let final_value = node.get_long("value");
    assert!((0..10_000).contains(&final_value));
}

#[test]
fn test_listeners_fire_under_contention() {
    let tree = test_tree();
    let node = tree.node("/counter/");
    node.create_int("value", 0, 0, 1_000_000, AttributeFlags::NORMAL, "contended value");

    let log: Arc<Mutex<Vec<AttributeValue>>> = Arc::new(Mutex::new(Vec::new()));
    node.add_attribute_listener(log.clone(), record_modified);

    crossbeam::thread::scope(|scope| {
        for worker in 0..4i32 {
            let node = node.clone();
            scope.spawn(move |_| {
                for i in 0..100 {
                    // Distinct values per worker, so every put is a change.
                    node.put_int("value", worker * 1_000 + i + 1).unwrap();
                }
            });
        }
    })
    .unwrap();

    // Dispatch runs under the node lock, so every successful change
    // produced exactly one notification.
    assert_eq!(log.lock().unwrap().len(), 400);
}

// =============================================================================
// Transaction Tests
// =============================================================================

#[test]
fn test_transaction_excludes_other_writers() {
    let tree = test_tree();
    let node = tree.node("/atomic/");
    node.create_int("x", 0, 0, 100, AttributeFlags::NORMAL, "pair member");
    node.create_int("y", 0, 0, 100, AttributeFlags::NORMAL, "pair member");

    // Take the transaction before spawning, so the observer cannot run
    // between the two writes.
    let txn = node.transaction();
    node.put_int("x", 1).unwrap();

    crossbeam::thread::scope(|scope| {
        let observer = {
            let node = node.clone();
            scope.spawn(move |_| {
                let _txn = node.transaction();
                (node.get_int("x"), node.get_int("y"))
            })
        };

        node.put_int("y", 1).unwrap();
        drop(txn);

        let (x, y) = observer.join().unwrap();
        assert_eq!((x, y), (1, 1));
    })
    .unwrap();
}

#[test]
fn test_transaction_is_reentrant_on_the_owning_thread() {
    let tree = test_tree();
    let node = tree.node("/atomic/");
    node.create_int("x", 0, 0, 100, AttributeFlags::NORMAL, "pair member");

    let _outer = node.transaction();
    let _inner = node.transaction();
    node.put_int("x", 5).unwrap();
    assert_eq!(node.get_int("x"), 5);
}

#[test]
fn test_reads_wait_for_in_flight_dispatch() {
    let tree = test_tree();
    let node = tree.node("/sync/");
    node.create_int("value", 0, 0, 100, AttributeFlags::NORMAL, "observed value");

    let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    node.add_attribute_listener(log.clone(), log_dispatch_window);

    crossbeam::thread::scope(|scope| {
        let reader = {
            let node = node.clone();
            let log = log.clone();
            scope.spawn(move |_| {
                // Wait until the listener is running, then read. The read
                // blocks on the node lock until dispatch finishes.
                loop {
                    if log.lock().unwrap().first() == Some(&"begin") {
                        break;
                    }
                    std::thread::yield_now();
                }
                let value = node.get_int("value");
                log.lock().unwrap().push("read");
                value
            })
        };

        node.put_int("value", 7).unwrap();
        assert_eq!(reader.join().unwrap(), 7);
    })
    .unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["begin", "end", "read"]);
}

fn log_dispatch_window(
    _node: &Node,
    data: &ListenerData,
    event: AttributeEvent,
    _key: &str,
    _value: &AttributeValue,
) {
    if event == AttributeEvent::Modified {
        let log = data
            .downcast_ref::<Mutex<Vec<&'static str>>>()
            .expect("listener data should be a log");
        log.lock().unwrap().push("begin");
        std::thread::sleep(std::time::Duration::from_millis(50));
        log.lock().unwrap().push("end");
    }
}
