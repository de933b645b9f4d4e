//! Minimal XML parser
//!
//! Hand-rolled recursive descent over the byte stream, in the same spirit as
//! a wire-format decoder: enough XML for the fixed sshs schema, nothing
//! more. Supported are elements, attributes (single- or double-quoted),
//! character data, the five standard entities plus numeric character
//! references, comments, processing instructions, the XML declaration, and a
//! DOCTYPE without an internal subset. Namespaces and CDATA sections are
//! not.
//!
//! Every failure is positioned: errors carry the byte offset where parsing
//! stopped.

use crate::error::{Result, SshsError};

use super::document::XmlElement;

/// Element nesting beyond this depth is rejected rather than recursed into.
const MAX_DEPTH: usize = 64;

/// Parse a complete document, returning its single document element.
pub(crate) fn parse_document(input: &str) -> Result<XmlElement> {
    let mut parser = Parser {
        input: input.as_bytes(),
        pos: 0,
    };

    parser.skip_misc()?;
    let root = parser.parse_element(0)?;
    parser.skip_misc()?;

    if parser.pos < parser.input.len() {
        return Err(parser.error("trailing content after the document element"));
    }

    Ok(root)
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, message: &str) -> SshsError {
        SshsError::XmlParse(format!("{message} at byte {}", self.pos))
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn at(&self, token: &str) -> bool {
        self.input[self.pos..].starts_with(token.as_bytes())
    }

    fn bump(&mut self, n: usize) {
        self.pos += n;
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.pos += 1;
        }
    }

    /// Skip whitespace, the XML declaration, processing instructions,
    /// comments, and a DOCTYPE, in any order.
    fn skip_misc(&mut self) -> Result<()> {
        loop {
            self.skip_whitespace();
            if self.at("<!--") {
                self.skip_past("-->")?;
            } else if self.at("<?") {
                self.skip_past("?>")?;
            } else if self.at("<!DOCTYPE") {
                self.skip_past(">")?;
            } else {
                return Ok(());
            }
        }
    }

    fn skip_past(&mut self, terminator: &str) -> Result<()> {
        let needle = terminator.as_bytes();
        match self.input[self.pos..]
            .windows(needle.len())
            .position(|window| window == needle)
        {
            Some(offset) => {
                self.pos += offset + needle.len();
                Ok(())
            }
            None => Err(self.error(&format!("unterminated section, expected '{terminator}'"))),
        }
    }

    fn parse_element(&mut self, depth: usize) -> Result<XmlElement> {
        if depth > MAX_DEPTH {
            return Err(self.error("element nesting too deep"));
        }
        if self.peek() != Some(b'<') {
            return Err(self.error("expected '<'"));
        }
        self.bump(1);

        let name = self.parse_name()?;
        let mut element = XmlElement::new(name);

        // Attributes until the tag closes, one way or the other.
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(b'/') => {
                    self.bump(1);
                    if self.peek() != Some(b'>') {
                        return Err(self.error("expected '>' after '/'"));
                    }
                    self.bump(1);
                    return Ok(element);
                }
                Some(b'>') => {
                    self.bump(1);
                    break;
                }
                Some(_) => {
                    let attr_name = self.parse_name()?;
                    self.skip_whitespace();
                    if self.peek() != Some(b'=') {
                        return Err(self.error("expected '=' after attribute name"));
                    }
                    self.bump(1);
                    self.skip_whitespace();
                    let value = self.parse_quoted()?;
                    element.attributes.push((attr_name.to_owned(), value));
                }
                None => return Err(self.error("unexpected end of input inside a tag")),
            }
        }

        // Content until the matching close tag.
        loop {
            if self.at("</") {
                self.bump(2);
                let close_name = self.parse_name()?;
                if close_name != element.name {
                    return Err(self.error(&format!(
                        "close tag '</{close_name}>' does not match '<{}>'",
                        element.name
                    )));
                }
                self.skip_whitespace();
                if self.peek() != Some(b'>') {
                    return Err(self.error("expected '>' in close tag"));
                }
                self.bump(1);
                return Ok(element);
            } else if self.at("<!--") {
                self.skip_past("-->")?;
            } else if self.at("<?") {
                self.skip_past("?>")?;
            } else if self.peek() == Some(b'<') {
                let child = self.parse_element(depth + 1)?;
                element.children.push(child);
            } else if self.peek().is_none() {
                return Err(self.error(&format!(
                    "unexpected end of input inside '<{}>'",
                    element.name
                )));
            } else {
                let text = self.parse_text()?;
                element.text.push_str(&text);
            }
        }
    }

    /// A name runs until whitespace or tag punctuation. The input came from
    /// a `&str`, and the delimiters are all ASCII, so the slice is always a
    /// character boundary.
    fn parse_name(&mut self) -> Result<&'a str> {
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if matches!(byte, b' ' | b'\t' | b'\r' | b'\n' | b'=' | b'<' | b'>' | b'/') {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("expected a name"));
        }
        std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| self.error("name is not valid UTF-8"))
    }

    fn parse_quoted(&mut self) -> Result<String> {
        let quote = match self.peek() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => return Err(self.error("expected a quoted attribute value")),
        };
        self.bump(1);

        let start = self.pos;
        while let Some(byte) = self.peek() {
            if byte == quote {
                let raw = &self.input[start..self.pos];
                self.bump(1);
                return self.decode_entities(raw);
            }
            self.pos += 1;
        }
        Err(self.error("unterminated attribute value"))
    }

    fn parse_text(&mut self) -> Result<String> {
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if byte == b'<' {
                break;
            }
            self.pos += 1;
        }
        let raw = &self.input[start..self.pos];
        self.decode_entities(raw)
    }

    /// Resolve `&amp;` and friends plus `&#ddd;` / `&#xhh;` references.
    fn decode_entities(&self, raw: &[u8]) -> Result<String> {
        let text =
            std::str::from_utf8(raw).map_err(|_| self.error("text is not valid UTF-8"))?;
        if !text.contains('&') {
            return Ok(text.to_owned());
        }

        let mut decoded = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(amp) = rest.find('&') {
            decoded.push_str(&rest[..amp]);
            let reference = &rest[amp..];
            let Some(semi) = reference.find(';') else {
                return Err(self.error("unterminated entity reference"));
            };

            let entity = &reference[1..semi];
            match entity {
                "amp" => decoded.push('&'),
                "lt" => decoded.push('<'),
                "gt" => decoded.push('>'),
                "quot" => decoded.push('"'),
                "apos" => decoded.push('\''),
                _ => {
                    let code = if let Some(hex) = entity
                        .strip_prefix("#x")
                        .or_else(|| entity.strip_prefix("#X"))
                    {
                        u32::from_str_radix(hex, 16).ok()
                    } else if let Some(dec) = entity.strip_prefix('#') {
                        dec.parse::<u32>().ok()
                    } else {
                        None
                    };
                    match code.and_then(char::from_u32) {
                        Some(character) => decoded.push(character),
                        None => {
                            return Err(self.error(&format!("unknown entity '&{entity};'")));
                        }
                    }
                }
            }

            rest = &reference[semi + 1..];
        }
        decoded.push_str(rest);

        Ok(decoded)
    }
}

// =============================================================================
// Tests
// =============================================================================
