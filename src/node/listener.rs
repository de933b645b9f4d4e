//! Listener protocol
//!
//! Registration records and event kinds for node-structure and
//! attribute-change notifications. Dispatch is synchronous: callbacks run on
//! the thread that performed the mutation, while that node's lock is held,
//! so a listener observes the store exactly as the mutation left it.

use std::any::Any;
use std::sync::Arc;

use crate::node::Node;
use crate::value::AttributeValue;

/// Opaque per-listener state passed back into the callback.
///
/// Listener identity for deregistration and duplicate suppression is the
/// `(callback, data)` pair, with `data` compared by pointer.
pub type ListenerData = Arc<dyn Any + Send + Sync>;

/// Structural changes delivered to node listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeEvent {
    /// A child node was created under the listening node.
    ChildAdded,
    /// A child node was removed from under the listening node.
    ChildRemoved,
}

/// Attribute changes delivered to attribute listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeEvent {
    /// The attribute was created; the payload is its default value.
    Added,
    /// The attribute took a different value; the payload is the new value.
    Modified,
    /// The attribute was removed; the payload is its last value.
    Removed,
}

/// Callback signature for node listeners. `change_name` is the name of the
/// child that was added or removed.
pub type NodeListenerFn = fn(node: &Node, data: &ListenerData, event: NodeEvent, change_name: &str);

/// Callback signature for attribute listeners.
pub type AttributeListenerFn =
    fn(node: &Node, data: &ListenerData, event: AttributeEvent, key: &str, value: &AttributeValue);

#[derive(Clone)]
pub(crate) struct NodeListener {
    pub(crate) callback: NodeListenerFn,
    pub(crate) data: ListenerData,
}

impl NodeListener {
    pub(crate) fn matches(&self, callback: NodeListenerFn, data: &ListenerData) -> bool {
        self.callback == callback && Arc::ptr_eq(&self.data, data)
    }
}

#[derive(Clone)]
pub(crate) struct AttributeListener {
    pub(crate) callback: AttributeListenerFn,
    pub(crate) data: ListenerData,
}

impl AttributeListener {
    pub(crate) fn matches(&self, callback: AttributeListenerFn, data: &ListenerData) -> bool {
        self.callback == callback && Arc::ptr_eq(&self.data, data)
    }
}
