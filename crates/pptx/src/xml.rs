//! Owned XML element tree over quick-xml.
//!
//! Slide parts are edited structurally (shapes copied, attributes
//! rewritten, paragraphs replaced), so they are held as a small owned tree
//! instead of being streamed. Element and attribute names keep their
//! prefixes exactly as written, so a part round-trips unchanged.

use deck_core::{Error, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

/// A node in an element's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// An XML element with its attributes and children, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    /// Qualified name as written, e.g. `p:sp`.
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(XmlNode::Text(text.into()));
        self
    }

    /// Name without its namespace prefix.
    pub fn local_name(&self) -> &str {
        local_name_str(&self.name)
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    pub fn remove_attr(&mut self, key: &str) -> Option<String> {
        let pos = self.attributes.iter().position(|(k, _)| k == key)?;
        Some(self.attributes.remove(pos).1)
    }

    /// The prefix this element declares for a namespace URI, if any.
    pub fn namespace_prefix(&self, uri: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(_, v)| v == uri)
            .and_then(|(k, _)| k.strip_prefix("xmlns:"))
    }

    /// Child elements in order.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|n| match n {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(|n| match n {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    /// First child element with the given local name.
    pub fn child(&self, local: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.local_name() == local)
    }

    pub fn child_mut(&mut self, local: &str) -> Option<&mut XmlElement> {
        self.elements_mut().find(|e| e.local_name() == local)
    }

    /// Descend through first matches of each local name in `path`.
    pub fn find(&self, path: &[&str]) -> Option<&XmlElement> {
        path.iter().try_fold(self, |el, name| el.child(name))
    }

    pub fn find_mut(&mut self, path: &[&str]) -> Option<&mut XmlElement> {
        let mut el = self;
        for name in path {
            el = el.child_mut(name)?;
        }
        Some(el)
    }

    /// First descendant (depth-first, excluding self) with the local name.
    pub fn descendant(&self, local: &str) -> Option<&XmlElement> {
        for child in self.elements() {
            if child.local_name() == local {
                return Some(child);
            }
            if let Some(found) = child.descendant(local) {
                return Some(found);
            }
        }
        None
    }

    /// Visit this element and every descendant element, depth-first.
    pub fn walk<F: FnMut(&XmlElement)>(&self, f: &mut F) {
        f(self);
        for child in self.elements() {
            child.walk(f);
        }
    }

    pub fn walk_mut<F: FnMut(&mut XmlElement)>(&mut self, f: &mut F) {
        f(self);
        for child in self.elements_mut() {
            child.walk_mut(f);
        }
    }

    /// Concatenated text content of this element and its descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                XmlNode::Text(t) => out.push_str(t),
                XmlNode::Element(e) => e.collect_text(out),
            }
        }
    }

    pub fn push(&mut self, child: XmlElement) {
        self.children.push(XmlNode::Element(child));
    }

    /// Remove every child element with the given local name.
    pub fn remove_children(&mut self, local: &str) {
        self.children.retain(|n| match n {
            XmlNode::Element(e) => e.local_name() != local,
            XmlNode::Text(_) => true,
        });
    }

    /// Parse a document and return its root element.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(bytes);
        reader.trim_text(false);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => {
                    stack.push(element_from_start(e)?);
                }
                Ok(Event::Empty(ref e)) => {
                    let el = element_from_start(e)?;
                    attach(&mut stack, &mut root, el);
                }
                Ok(Event::End(_)) => {
                    let el = stack
                        .pop()
                        .ok_or_else(|| Error::XmlError("Unbalanced end tag".to_string()))?;
                    attach(&mut stack, &mut root, el);
                }
                Ok(Event::Text(ref e)) => {
                    if let Some(parent) = stack.last_mut() {
                        let text = e
                            .unescape()
                            .map_err(|e| Error::XmlError(format!("Bad text content: {}", e)))?;
                        push_text(parent, &text);
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some(parent) = stack.last_mut() {
                        let raw = e.into_inner();
                        push_text(parent, &String::from_utf8_lossy(&raw));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::XmlError(format!(
                        "Error at position {}: {}",
                        reader.buffer_position(),
                        e
                    )));
                }
                // Declarations, comments and processing instructions are dropped
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(Error::XmlError("Unclosed element at end of document".to_string()));
        }
        root.ok_or_else(|| Error::XmlError("Document has no root element".to_string()))
    }

    /// Serialize as a standalone document with an XML declaration.
    pub fn to_xml_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
            .map_err(xml_write_error)?;
        writer
            .get_mut()
            .extend_from_slice(b"\r\n");
        write_element(&mut writer, self)?;
        Ok(writer.into_inner())
    }
}

fn element_from_start(e: &BytesStart) -> Result<XmlElement> {
    let mut el = XmlElement::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
    for attr in e.attributes() {
        let attr = attr.map_err(|e| Error::XmlError(format!("Bad attribute: {}", e)))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| Error::XmlError(format!("Bad attribute value: {}", e)))?
            .into_owned();
        el.attributes.push((key, value));
    }
    Ok(el)
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, el: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(el)),
        None => {
            if root.is_none() {
                *root = Some(el);
            }
        }
    }
}

fn push_text(parent: &mut XmlElement, text: &str) {
    if let Some(XmlNode::Text(prev)) = parent.children.last_mut() {
        prev.push_str(text);
    } else {
        parent.children.push(XmlNode::Text(text.to_string()));
    }
}

fn write_element(writer: &mut Writer<Vec<u8>>, el: &XmlElement) -> Result<()> {
    let mut start = BytesStart::new(el.name.as_str());
    for (k, v) in &el.attributes {
        start.push_attribute((k.as_str(), v.as_str()));
    }

    if el.children.is_empty() {
        return writer
            .write_event(Event::Empty(start))
            .map_err(xml_write_error);
    }

    writer.write_event(Event::Start(start)).map_err(xml_write_error)?;
    for node in &el.children {
        match node {
            XmlNode::Element(child) => write_element(writer, child)?,
            XmlNode::Text(text) => writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(xml_write_error)?,
        }
    }
    writer
        .write_event(Event::End(BytesEnd::new(el.name.as_str())))
        .map_err(xml_write_error)
}

fn xml_write_error(e: impl std::fmt::Display) -> Error {
    Error::XmlError(format!("Failed to write XML: {}", e))
}

/// Extract the local name from a potentially namespaced XML element name.
pub fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

fn local_name_str(name: &str) -> &str {
    match name.split_once(':') {
        Some((_, local)) => local,
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:sp><p:txBody><a:p><a:r><a:t>Fish &amp; Chips </a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#;

    #[test]
    fn test_local_name() {
        assert_eq!(local_name(b"p:sp"), b"sp");
        assert_eq!(local_name(b"a:t"), b"t");
        assert_eq!(local_name(b"sp"), b"sp");
        assert_eq!(XmlElement::new("r:embed").local_name(), "embed");
    }

    #[test]
    fn test_parse_and_navigate() {
        let root = XmlElement::parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(root.name, "p:sld");
        let sp = root.find(&["cSld", "spTree", "sp"]).unwrap();
        assert_eq!(sp.text(), "Fish & Chips ");
        assert_eq!(
            root.namespace_prefix("http://schemas.openxmlformats.org/officeDocument/2006/relationships"),
            Some("r")
        );
        assert!(root.descendant("t").is_some());
        assert!(root.descendant("pic").is_none());
    }

    #[test]
    fn test_write_round_trip_escapes() {
        let root = XmlElement::parse(SAMPLE.as_bytes()).unwrap();
        let bytes = root.to_xml_bytes().unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>"));
        assert!(text.contains("Fish &amp; Chips "));
        assert_eq!(XmlElement::parse(&bytes).unwrap(), root);
    }

    #[test]
    fn test_attribute_editing() {
        let mut el = XmlElement::new("a:blip").with_attr("r:embed", "rId2");
        el.set_attr("r:embed", "rId7");
        el.set_attr("cstate", "print");
        assert_eq!(el.attr("r:embed"), Some("rId7"));
        assert_eq!(el.remove_attr("cstate"), Some("print".to_string()));
        assert_eq!(el.attributes.len(), 1);
    }

    #[test]
    fn test_walk_mut_visits_all() {
        let mut root = XmlElement::parse(SAMPLE.as_bytes()).unwrap();
        let mut count = 0;
        root.walk_mut(&mut |_| count += 1);
        // sld, cSld, spTree, sp, txBody, p, r, t
        assert_eq!(count, 8);
    }

    #[test]
    fn test_parse_errors() {
        assert!(XmlElement::parse(b"<a><b></a>").is_err());
        assert!(XmlElement::parse(b"").is_err());
        assert!(XmlElement::parse(b"<a>").is_err());
    }
}
