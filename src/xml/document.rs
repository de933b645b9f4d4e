//! In-memory XML element model shared by the writer and the parser.

/// One XML element: name, attributes in document order, child elements, and
/// concatenated character data.
///
/// The sshs schema never mixes children and meaningful text in one element,
/// so text is kept as a single string; whitespace between child elements
/// accumulates there and is simply never read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct XmlElement {
    pub(crate) name: String,
    pub(crate) attributes: Vec<(String, String)>,
    pub(crate) children: Vec<XmlElement>,
    pub(crate) text: String,
}

impl XmlElement {
    pub(crate) fn new(name: impl Into<String>) -> XmlElement {
        XmlElement {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            text: String::new(),
        }
    }

    /// Builder-style attribute append, used by the exporter.
    pub(crate) fn with_attr(mut self, name: &str, value: &str) -> XmlElement {
        self.attributes.push((name.to_owned(), value.to_owned()));
        self
    }

    /// First value of the attribute `name`, if present.
    pub(crate) fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(attr_name, _)| attr_name == name)
            .map(|(_, value)| value.as_str())
    }

    /// Child elements called `name`, in document order.
    pub(crate) fn elements<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |child| child.name == name)
    }
}
