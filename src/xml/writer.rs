//! Fixed-schema XML rendering
//!
//! Pretty-prints an element tree in the exact shape remote tooling diffs
//! against: four spaces of indentation per depth level (capped), elements
//! with character data inlined on one line, childless elements self-closed,
//! and a trailing newline after every close.

use std::io::{self, Write};

use super::document::XmlElement;

/// Spaces per indentation level.
const INDENT_SPACES: usize = 4;

/// Depth levels beyond this stop indenting further, keeping pathological
/// trees from producing kilometric lines of padding.
const INDENT_MAX_LEVEL: usize = 20;

pub(crate) fn write_document<W: Write>(writer: &mut W, root: &XmlElement) -> io::Result<()> {
    write_element(writer, root, 0)
}

fn write_element<W: Write>(writer: &mut W, element: &XmlElement, level: usize) -> io::Result<()> {
    let pad = indent(level);

    write!(writer, "{pad}<{}", element.name)?;
    for (name, value) in &element.attributes {
        write!(writer, " {name}=\"{}\"", escape_attribute(value))?;
    }

    if element.children.is_empty() && element.text.is_empty() {
        writeln!(writer, "/>")?;
    } else if element.children.is_empty() {
        writeln!(writer, ">{}</{}>", escape_text(&element.text), element.name)?;
    } else {
        writeln!(writer, ">")?;
        for child in &element.children {
            write_element(writer, child, level + 1)?;
        }
        writeln!(writer, "{pad}</{}>", element.name)?;
    }

    Ok(())
}

fn indent(level: usize) -> String {
    " ".repeat(level.min(INDENT_MAX_LEVEL) * INDENT_SPACES)
}

/// Escape character data: the ampersand first, then the angle brackets.
fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Attribute values additionally escape the double quote that delimits them.
fn escape_attribute(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}
