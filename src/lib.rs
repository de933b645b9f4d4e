//! # sshs
//!
//! A thread-safe, hierarchical settings store with:
//! - Named nodes forming a tree rooted at `/`
//! - Typed, range-checked attributes on every node (8 value types)
//! - Synchronous change notification for structure and attributes
//! - A fixed XML exchange format for persistence and remote tooling
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Tree                                 │
//! │            (root handle + fatal-error strategy)              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ path resolution
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Node                                  │
//! │   children (RwLock)      state (ReentrantMutex)              │
//! │   child map              attributes + listeners              │
//! └──────────┬──────────────────────────┬───────────────────────┘
//!            │                          │
//!            ▼                          ▼
//!    ┌──────────────┐          ┌──────────────────┐
//!    │  child Node  │          │  AttributeTable  │
//!    │   (subtree)  │          │  typed + ranged  │
//!    └──────────────┘          └──────────────────┘
//! ```
//!
//! Mutations fire their listeners synchronously, on the mutating thread,
//! while the node's lock is still held; a listener therefore observes the
//! store exactly as the mutation left it. The lock is reentrant, so
//! listeners may call straight back into the node that notified them.
//!
//! Recoverable conditions (range rejections, permission rejections, bad XML)
//! come back as [`SshsError`]. Contract violations (reading attributes that
//! were never created, malformed paths, touching removed nodes) go to the
//! tree's [`FatalHandler`] instead, which by default terminates the process.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod node;
pub mod tree;
pub mod value;

mod attribute;
mod xml;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ExitFatalHandler, FatalHandler, PanicFatalHandler, Result, SshsError};
pub use node::{
    AttributeEvent, AttributeListenerFn, ListenerData, Node, NodeEvent, NodeListenerFn,
    NodeTransaction,
};
pub use tree::Tree;
pub use value::{AttributeFlags, AttributeRanges, AttributeType, AttributeValue};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of sshs
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
