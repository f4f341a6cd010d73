//! Minimal element tree over `xml-rs` events.
//!
//! Catalog and manifest documents are small enough to hold in memory, and the
//! parser needs path lookups (`channel/products/product`) rather than a
//! streaming view.

use std::io::Cursor;

use xml::reader::{EventReader, XmlEvent};

/// An XML element with its attributes, child elements and text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlElement>,
    text: String,
}

impl XmlElement {
    /// Parse a complete document and return its root element.
    pub fn parse(bytes: &[u8]) -> Result<Self, String> {
        let reader = EventReader::new(Cursor::new(bytes));
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root = None;

        for event in reader {
            match event.map_err(|e| e.to_string())? {
                XmlEvent::StartElement {
                    name, attributes, ..
                } => {
                    stack.push(XmlElement {
                        name: name.local_name,
                        attributes: attributes
                            .into_iter()
                            .map(|a| (a.name.local_name, a.value))
                            .collect(),
                        ..Default::default()
                    });
                }
                XmlEvent::EndElement { .. } => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| "unbalanced end tag".to_string())?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => root = Some(element),
                    }
                }
                XmlEvent::Characters(text) | XmlEvent::CData(text) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&text);
                    }
                }
                _ => {}
            }
        }

        root.ok_or_else(|| "document has no root element".to_string())
    }

    /// Local name of the element.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value of attribute `name`.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Text content, trimmed.
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    /// Direct child elements in document order.
    pub fn children(&self) -> &[XmlElement] {
        &self.children
    }

    /// All elements reached by following the `/`-separated child path.
    pub fn find_all(&self, path: &str) -> Vec<&XmlElement> {
        let mut current = vec![self];
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = current
                .into_iter()
                .flat_map(|e| e.children.iter().filter(|c| c.name == segment))
                .collect();
        }
        current
    }

    /// First element reached by following the child path.
    pub fn find(&self, path: &str) -> Option<&XmlElement> {
        self.find_all(path).into_iter().next()
    }
}
