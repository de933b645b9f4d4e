//! Error types for sshs
//!
//! Two deliberately distinct tiers:
//!
//! - **Recoverable conditions** are reported through [`SshsError`]: the store
//!   is left unmodified and the caller decides whether to skip, log, or
//!   propagate. The XML importer, for example, skips individual bad
//!   attributes this way.
//! - **Usage/contract violations** (creating an attribute with an impossible
//!   range, reading an attribute that was never created, touching a removed
//!   node) never surface as a `Result`. They are routed to the tree's
//!   [`FatalHandler`], because attribute schemas are defined by the embedding
//!   code at startup: such a failure is a bug in that code, not a runtime
//!   condition.

use std::sync::Arc;

use thiserror::Error;

use crate::value::{AttributeRanges, AttributeType};

/// Result type alias using SshsError
pub type Result<T> = std::result::Result<T, SshsError>;

/// Unified error type for recoverable sshs conditions
#[derive(Debug, Error)]
pub enum SshsError {
    // -------------------------------------------------------------------------
    // Attribute-level conditions
    // -------------------------------------------------------------------------
    #[error("attribute '{key}' of type '{attr_type}' not present")]
    AttributeNotFound { key: String, attr_type: AttributeType },

    #[error("attribute '{key}' of type '{attr_type}' is read-only")]
    ReadOnly { key: String, attr_type: AttributeType },

    #[error("attribute '{key}' of type '{attr_type}' is not read-only")]
    NotReadOnly { key: String, attr_type: AttributeType },

    #[error("value '{value}' for attribute '{key}' of type '{attr_type}' is outside range {ranges}")]
    OutOfRange {
        key: String,
        attr_type: AttributeType,
        value: String,
        ranges: AttributeRanges,
    },

    // -------------------------------------------------------------------------
    // Tree-level conditions
    // -------------------------------------------------------------------------
    #[error("node '{path}' not present")]
    NodeNotFound { path: String },

    // -------------------------------------------------------------------------
    // String/XML conversion conditions
    // -------------------------------------------------------------------------
    #[error("unknown attribute type '{0}'")]
    UnknownType(String),

    #[error("cannot parse '{value}' as a value of type '{attr_type}'")]
    InvalidValue { attr_type: AttributeType, value: String },

    #[error("XML parse error: {0}")]
    XmlParse(String),

    #[error("invalid sshs XML document: {0}")]
    XmlDocument(String),

    // -------------------------------------------------------------------------
    // I/O
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SshsError {
    /// Whether this is one of the value-level conditions the XML importer
    /// skips silently (the attribute simply keeps its stored value).
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            SshsError::ReadOnly { .. } | SshsError::NotReadOnly { .. } | SshsError::OutOfRange { .. }
        )
    }
}

// =============================================================================
// Fatal-error strategy
// =============================================================================

/// Shared handle to the fatal-error strategy of a tree.
pub type SharedFatalHandler = Arc<dyn FatalHandler>;

/// Strategy object invoked on usage/contract violations.
///
/// Installed once per [`Tree`](crate::Tree) and inherited by every node under
/// it. The handler must diverge: the store's internal invariants assume the
/// violating call never continues.
pub trait FatalHandler: Send + Sync {
    /// Report a contract violation and never return.
    fn fatal(&self, message: &str) -> !;
}

/// Default strategy: log the violation and terminate the process.
#[derive(Debug, Default)]
pub struct ExitFatalHandler;

impl FatalHandler for ExitFatalHandler {
    fn fatal(&self, message: &str) -> ! {
        tracing::error!("fatal usage error: {message}");
        std::process::exit(1);
    }
}

/// Test strategy: panic, so violations become catchable assertions instead of
/// killing the test process.
#[derive(Debug, Default)]
pub struct PanicFatalHandler;

impl FatalHandler for PanicFatalHandler {
    fn fatal(&self, message: &str) -> ! {
        panic!("sshs usage error: {message}");
    }
}
