//! Tree nodes
//!
//! A node owns an attribute table, a map of child nodes, and two listener
//! lists. [`Node`] values are cheap handles: clones refer to the same node,
//! and equality compares identity.
//!
//! ## Locking
//!
//! Every node carries two locks:
//!
//! ```text
//!                 Node
//!                   |
//!          +--------+--------+
//!          |                 |
//!     children            state
//!     (RwLock)       (ReentrantMutex)
//!     child map      attributes + listeners
//! ```
//!
//! - The **traversal lock** (`children`) guards the shape of the child map.
//!   Lookups take it shared; child creation and removal take it exclusive.
//! - The **node lock** (`state`) guards attributes and listeners. It is
//!   reentrant, so a listener may call straight back into the node that
//!   notified it.
//!
//! Listeners run synchronously on the mutating thread while the node lock is
//! held, and therefore observe the store exactly as the mutation left it.
//! Structural-removal events additionally run under the traversal lock: a
//! listener handling a removal must not navigate the children of the node it
//! was notified on.
//!
//! ## Removal
//!
//! Removing a node clears its whole subtree's attributes first (removed
//! events per attribute, top-down), then dismantles the structure bottom-up
//! (child-removed events per parent), and finally unlinks the node from its
//! parent. Handles to removed nodes stay memory-safe but are poisoned: any
//! further use is reported to the tree's fatal handler.

mod attributes;
mod listener;

pub use listener::{
    AttributeEvent, AttributeListenerFn, ListenerData, NodeEvent, NodeListenerFn,
};

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{ReentrantMutex, ReentrantMutexGuard, RwLock};

use crate::attribute::AttributeTable;
use crate::error::SharedFatalHandler;
use crate::tree;
use listener::{AttributeListener, NodeListener};

/// Interior state guarded by the node lock.
pub(crate) struct NodeState {
    pub(crate) attributes: AttributeTable,
    pub(crate) node_listeners: Vec<NodeListener>,
    pub(crate) attribute_listeners: Vec<AttributeListener>,
}

impl NodeState {
    fn new() -> Self {
        NodeState {
            attributes: AttributeTable::default(),
            node_listeners: Vec::new(),
            attribute_listeners: Vec::new(),
        }
    }
}

pub(crate) struct NodeInner {
    name: String,
    path: String,
    parent: Weak<NodeInner>,
    fatal: SharedFatalHandler,
    /// Set once the node is unlinked from the tree; any later use of a handle
    /// is a contract violation.
    removed: AtomicBool,
    /// Traversal lock.
    children: RwLock<HashMap<String, Node>>,
    /// Node lock.
    state: ReentrantMutex<RefCell<NodeState>>,
}

/// Handle to one node of a settings tree.
#[derive(Clone)]
pub struct Node {
    inner: Arc<NodeInner>,
}

// =============================================================================
// Construction and identity
// =============================================================================

impl Node {
    pub(crate) fn new_root(fatal: SharedFatalHandler) -> Node {
        Node {
            inner: Arc::new(NodeInner {
                name: String::new(),
                path: String::from("/"),
                parent: Weak::new(),
                fatal,
                removed: AtomicBool::new(false),
                children: RwLock::new(HashMap::new()),
                state: ReentrantMutex::new(RefCell::new(NodeState::new())),
            }),
        }
    }

    fn new_child(parent: &Node, name: &str) -> Node {
        Node {
            inner: Arc::new(NodeInner {
                name: name.to_owned(),
                path: format!("{}{}/", parent.inner.path, name),
                parent: Arc::downgrade(&parent.inner),
                fatal: Arc::clone(&parent.inner.fatal),
                removed: AtomicBool::new(false),
                children: RwLock::new(HashMap::new()),
                state: ReentrantMutex::new(RefCell::new(NodeState::new())),
            }),
        }
    }

    /// The node's own name. The root's name is the empty string.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The absolute path of this node, always ending in `/`.
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// The parent node, or `None` on the root.
    pub fn parent(&self) -> Option<Node> {
        self.inner.parent.upgrade().map(|inner| Node { inner })
    }

    pub(crate) fn fatal(&self, message: &str) -> ! {
        self.inner.fatal.fatal(message)
    }

    /// Usage check at every entry point: removed nodes must not be touched.
    pub(crate) fn ensure_alive(&self) {
        if self.inner.removed.load(Ordering::Acquire) {
            self.fatal(&format!(
                "node '{}' used after removal from the tree",
                self.inner.path
            ));
        }
    }

    pub(crate) fn lock_state(&self) -> ReentrantMutexGuard<'_, RefCell<NodeState>> {
        self.inner.state.lock()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("path", &self.inner.path)
            .field("removed", &self.inner.removed.load(Ordering::Acquire))
            .finish()
    }
}

// =============================================================================
// Structure
// =============================================================================

impl Node {
    /// Get or create the direct child `name`.
    ///
    /// Creation fires a child-added event on this node; looking up an
    /// existing child fires nothing. Names must be non-empty and must not
    /// contain `/`; violations go to the fatal handler.
    pub fn add_child(&self, name: &str) -> Node {
        self.ensure_alive();

        if let Err(problem) = tree::validate_node_name(name) {
            self.fatal(&format!("add_child(): {problem}"));
        }

        let created = {
            let mut children = self.inner.children.write();
            if let Some(existing) = children.get(name) {
                return existing.clone();
            }
            let child = Node::new_child(self, name);
            children.insert(name.to_owned(), child.clone());
            child
        };

        // Traversal lock released; announce under the node lock only.
        self.dispatch_node_event(NodeEvent::ChildAdded, name);

        created
    }

    /// Look up the direct child `name` without creating it.
    pub fn child(&self, name: &str) -> Option<Node> {
        self.ensure_alive();
        self.inner.children.read().get(name).cloned()
    }

    /// All direct children, sorted by name.
    pub fn children(&self) -> Vec<Node> {
        self.ensure_alive();
        let mut children: Vec<Node> = self.inner.children.read().values().cloned().collect();
        children.sort_by(|a, b| a.name().cmp(b.name()));
        children
    }

    /// The names of all direct children, sorted.
    pub fn child_names(&self) -> Vec<String> {
        self.ensure_alive();
        let mut names: Vec<String> = self.inner.children.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Get or create the node at `path` relative to this one, creating
    /// intermediate nodes as needed.
    ///
    /// Relative paths must not start with `/` and must end with `/`;
    /// malformed paths go to the fatal handler.
    pub fn relative_node(&self, path: &str) -> Node {
        self.ensure_alive();
        let segments = match tree::parse_relative_path(path) {
            Ok(segments) => segments,
            Err(problem) => self.fatal(&format!("relative_node(): {problem}")),
        };

        let mut current = self.clone();
        for segment in segments {
            current = current.add_child(segment);
        }
        current
    }

    /// Look up the node at a relative `path` without creating anything.
    pub fn existing_relative_node(&self, path: &str) -> Option<Node> {
        self.ensure_alive();
        let segments = match tree::parse_relative_path(path) {
            Ok(segments) => segments,
            Err(problem) => self.fatal(&format!("existing_relative_node(): {problem}")),
        };

        let mut current = self.clone();
        for segment in segments {
            current = current.child(segment)?;
        }
        Some(current)
    }
}

// =============================================================================
// Listeners
// =============================================================================

impl Node {
    /// Register a node listener. The `(callback, data)` pair is the listener
    /// identity: registering the same pair twice is a no-op.
    pub fn add_node_listener(&self, data: ListenerData, callback: NodeListenerFn) {
        self.ensure_alive();
        let guard = self.lock_state();
        let mut state = guard.borrow_mut();
        if !state
            .node_listeners
            .iter()
            .any(|listener| listener.matches(callback, &data))
        {
            state.node_listeners.push(NodeListener { callback, data });
        }
    }

    /// Deregister a node listener previously registered with the same
    /// `(callback, data)` pair.
    pub fn remove_node_listener(&self, data: ListenerData, callback: NodeListenerFn) {
        self.ensure_alive();
        let guard = self.lock_state();
        guard
            .borrow_mut()
            .node_listeners
            .retain(|listener| !listener.matches(callback, &data));
    }

    pub fn remove_all_node_listeners(&self) {
        self.ensure_alive();
        let guard = self.lock_state();
        guard.borrow_mut().node_listeners.clear();
    }

    /// Register an attribute listener. Same identity rule as node listeners.
    pub fn add_attribute_listener(&self, data: ListenerData, callback: AttributeListenerFn) {
        self.ensure_alive();
        let guard = self.lock_state();
        let mut state = guard.borrow_mut();
        if !state
            .attribute_listeners
            .iter()
            .any(|listener| listener.matches(callback, &data))
        {
            state
                .attribute_listeners
                .push(AttributeListener { callback, data });
        }
    }

    pub fn remove_attribute_listener(&self, data: ListenerData, callback: AttributeListenerFn) {
        self.ensure_alive();
        let guard = self.lock_state();
        guard
            .borrow_mut()
            .attribute_listeners
            .retain(|listener| !listener.matches(callback, &data));
    }

    pub fn remove_all_attribute_listeners(&self) {
        self.ensure_alive();
        let guard = self.lock_state();
        guard.borrow_mut().attribute_listeners.clear();
    }

    /// Run node listeners under the node lock, in registration order. The
    /// list is snapshotted first so callbacks may (de)register listeners.
    pub(crate) fn dispatch_node_event(&self, event: NodeEvent, change_name: &str) {
        let guard = self.lock_state();
        let listeners = guard.borrow().node_listeners.clone();
        for listener in &listeners {
            (listener.callback)(self, &listener.data, event, change_name);
        }
    }

    /// Run attribute listeners under the node lock, in registration order.
    pub(crate) fn dispatch_attribute_event(
        &self,
        event: AttributeEvent,
        key: &str,
        value: &crate::value::AttributeValue,
    ) {
        let guard = self.lock_state();
        let listeners = guard.borrow().attribute_listeners.clone();
        for listener in &listeners {
            (listener.callback)(self, &listener.data, event, key, value);
        }
    }
}

// =============================================================================
// Transactions
// =============================================================================

/// RAII guard holding one node's lock across several operations.
///
/// While the guard lives, no other thread can read or write this node's
/// attributes; the holding thread itself stays free to operate on the node,
/// since the lock is reentrant.
pub struct NodeTransaction<'a> {
    _guard: ReentrantMutexGuard<'a, RefCell<NodeState>>,
}

impl Node {
    /// Take this node's lock and hold it until the returned guard drops,
    /// making a multi-attribute update atomic for observers.
    pub fn transaction(&self) -> NodeTransaction<'_> {
        self.ensure_alive();
        NodeTransaction {
            _guard: self.lock_state(),
        }
    }
}

// =============================================================================
// Removal
// =============================================================================

impl Node {
    /// Remove every attribute and attribute listener of this subtree, firing
    /// removed events per attribute (to the listeners, before they go). With
    /// `include_self` false, this node's own attributes and attribute
    /// listeners survive and only the descendants are cleared. The nodes
    /// themselves and their node listeners stay in place.
    pub fn clear_sub_tree(&self, include_self: bool) {
        self.ensure_alive();

        if include_self {
            self.remove_all_attributes();
            self.remove_all_attribute_listeners();
        }

        for child in self.children() {
            child.clear_sub_tree(true);
        }
    }

    /// Remove this node and its whole subtree from the tree.
    ///
    /// Order of announcements: removed events for every attribute in the
    /// subtree (top-down), then child-removed events as the structure is
    /// dismantled bottom-up, then a final child-removed event on the parent
    /// for this node itself. Listeners across the subtree are dropped along
    /// the way, after the events they are owed. Existing handles to removed
    /// nodes are poisoned.
    ///
    /// On the root node this clears everything beneath it (attributes,
    /// children, listeners) but leaves the root itself alive.
    pub fn remove_node(&self) {
        self.ensure_alive();

        self.clear_sub_tree(true);
        self.remove_sub_tree_structure();

        if let Some(parent) = self.parent() {
            parent.remove_child_entry(self.name());
        }
    }

    /// Depth-first dismantling: children of children go first, so every
    /// child-removed event concerns a node that is already a leaf. Each
    /// node's own node listeners are dropped after its children are
    /// announced.
    fn remove_sub_tree_structure(&self) {
        for child in self.children() {
            child.remove_sub_tree_structure();
        }
        self.remove_all_children();
        self.remove_all_node_listeners();
    }

    /// Drop every direct child, firing a child-removed event for each.
    ///
    /// Holds the traversal lock exclusively together with the node lock, so
    /// no lookup can hand out a child handle mid-removal.
    fn remove_all_children(&self) {
        let mut children = self.inner.children.write();
        let _guard = self.lock_state();

        let mut names: Vec<String> = children.keys().cloned().collect();
        names.sort();

        for name in names {
            if let Some(child) = children.remove(&name) {
                self.dispatch_node_event(NodeEvent::ChildRemoved, &name);
                child.poison();
            }
        }
    }

    /// Unlink one direct child by name, firing a child-removed event if it
    /// was present.
    fn remove_child_entry(&self, name: &str) {
        let removed = {
            let mut children = self.inner.children.write();
            children.remove(name)
        };

        if let Some(child) = removed {
            self.dispatch_node_event(NodeEvent::ChildRemoved, name);
            child.poison();
        }
    }

    /// Mark an unlinked node: any later use of a handle to it is a contract
    /// violation. The removal cascade has already emptied its listener lists
    /// and attributes by the time this runs.
    fn poison(&self) {
        self.inner.removed.store(true, Ordering::Release);
    }
}
