//! XML exchange format
//!
//! Settings travel between processes and to disk as a small fixed-schema
//! XML document:
//!
//! ```text
//! <sshs version="1.0">
//!     <node name="sensor" path="/sensor/">
//!         <attr key="threshold" type="int">50</attr>
//!         <node name="bias" path="/sensor/bias/">
//!             ...
//!         </node>
//!     </node>
//! </sshs>
//! ```
//!
//! Export always emits the starting node, even when empty, and prunes child
//! subtrees that contribute nothing. Import is forgiving at the attribute
//! level: a document that parses gets applied attribute by attribute, and
//! individual misfits (unknown types, malformed values, range or permission
//! rejections) are skipped without failing the rest.

mod document;
mod parser;
mod writer;

use std::io::{Read, Write};

use crate::error::{Result, SshsError};
use crate::node::Node;
use crate::tree::validate_node_name;
use crate::value::AttributeFlags;
use document::XmlElement;

/// Document root element name.
const ROOT_ELEMENT: &str = "sshs";
/// Format version emitted on export and required on import.
const FORMAT_VERSION: &str = "1.0";
/// Element name for tree nodes.
const NODE_ELEMENT: &str = "node";
/// Element name for attributes.
const ATTR_ELEMENT: &str = "attr";

// =============================================================================
// Export
// =============================================================================

pub(crate) fn export_node<W: Write>(node: &Node, writer: &mut W, recursive: bool) -> Result<()> {
    let mut root = XmlElement::new(ROOT_ELEMENT).with_attr("version", FORMAT_VERSION);
    root.children.push(build_node_element(node, recursive));

    writer::write_document(writer, &root)?;
    writer.flush()?;
    Ok(())
}

fn build_node_element(node: &Node, recursive: bool) -> XmlElement {
    let mut element = XmlElement::new(NODE_ELEMENT)
        .with_attr("name", node.name())
        .with_attr("path", node.path());

    for (key, attribute) in node.attributes_snapshot() {
        if attribute.flags().contains(AttributeFlags::NO_EXPORT) {
            continue;
        }
        let mut attr_element = XmlElement::new(ATTR_ELEMENT)
            .with_attr("key", &key)
            .with_attr("type", attribute.attr_type().as_str());
        attr_element.text = attribute.value().to_string();
        element.children.push(attr_element);
    }

    if recursive {
        for child in node.children() {
            let child_element = build_node_element(&child, recursive);
            // A subtree with nothing to export does not appear at all.
            if !child_element.children.is_empty() {
                element.children.push(child_element);
            }
        }
    }

    element
}

// =============================================================================
// Import
// =============================================================================

pub(crate) fn import_node<R: Read>(
    node: &Node,
    reader: &mut R,
    recursive: bool,
    strict: bool,
) -> Result<()> {
    let mut raw = String::new();
    reader.read_to_string(&mut raw)?;

    let root = parser::parse_document(&raw)?;

    if root.name != ROOT_ELEMENT || root.attr("version") != Some(FORMAT_VERSION) {
        return Err(SshsError::XmlDocument(format!(
            "expected root element '{ROOT_ELEMENT}' with version '{FORMAT_VERSION}'"
        )));
    }

    let top_nodes: Vec<&XmlElement> = root.elements(NODE_ELEMENT).collect();
    if top_nodes.len() != 1 {
        return Err(SshsError::XmlDocument(format!(
            "expected exactly one top-level '{NODE_ELEMENT}' element, found {}",
            top_nodes.len()
        )));
    }
    let top = top_nodes[0];

    if strict {
        let document_name = top.attr("name").unwrap_or_default();
        if document_name != node.name() {
            return Err(SshsError::XmlDocument(format!(
                "document node name '{document_name}' does not match node '{}'",
                node.name()
            )));
        }
    }

    consume_node_element(node, top, recursive);
    Ok(())
}

/// Apply one document node to `node`: its attributes first, then (when
/// recursing) its child nodes, created on demand.
fn consume_node_element(node: &Node, content: &XmlElement, recursive: bool) {
    for attr_element in content.elements(ATTR_ELEMENT) {
        let (Some(key), Some(type_str)) = (attr_element.attr("key"), attr_element.attr("type"))
        else {
            tracing::warn!(path = node.path(), "skipping attr element without key and type");
            continue;
        };

        if let Err(error) = node.put_attribute_from_strings(key, type_str, &attr_element.text) {
            if error.is_constraint_violation() {
                // The attribute keeps its stored value; not an import failure.
                tracing::trace!(path = node.path(), key, %error, "import left attribute alone");
            } else {
                tracing::warn!(path = node.path(), key, %error, "skipping attribute");
            }
        }
    }

    if !recursive {
        return;
    }

    for child_element in content.elements(NODE_ELEMENT) {
        let Some(child_name) = child_element.attr("name") else {
            tracing::warn!(path = node.path(), "skipping node element without a name");
            continue;
        };
        // Documents are untrusted input: a name no node may carry is skipped
        // here instead of reaching the fatal-tier check in add_child().
        if validate_node_name(child_name).is_err() {
            tracing::warn!(
                path = node.path(),
                child_name,
                "skipping node element with an invalid name"
            );
            continue;
        }

        let child = node.add_child(child_name);
        consume_node_element(&child, child_element, recursive);
    }
}
