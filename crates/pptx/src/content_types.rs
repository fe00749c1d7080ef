//! The `[Content_Types].xml` registry.

use crate::constants::{content_type, namespace};
use crate::packuri::PackUri;
use crate::xml::local_name;
use deck_core::{Error, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::BTreeMap;

/// Maps part names to content types through extension defaults and
/// per-part overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTypes {
    /// Lower-cased extension to content type.
    defaults: BTreeMap<String, String>,
    overrides: BTreeMap<PackUri, String>,
}

impl ContentTypes {
    pub fn new() -> Self {
        let mut types = Self::default();
        types.add_default("rels", content_type::OPC_RELATIONSHIPS);
        types.add_default("xml", content_type::XML);
        types
    }

    /// Content type of a part: its override, else the default for its
    /// extension.
    pub fn get(&self, partname: &PackUri) -> Option<&str> {
        self.overrides
            .get(partname)
            .or_else(|| self.defaults.get(&partname.ext().to_ascii_lowercase()))
            .map(String::as_str)
    }

    pub fn add_default(&mut self, ext: &str, content_type: &str) {
        self.defaults
            .insert(ext.to_ascii_lowercase(), content_type.to_string());
    }

    pub fn has_default(&self, ext: &str) -> bool {
        self.defaults.contains_key(&ext.to_ascii_lowercase())
    }

    pub fn add_override(&mut self, partname: &PackUri, content_type: &str) {
        self.overrides.insert(partname.clone(), content_type.to_string());
    }

    pub fn remove_override(&mut self, partname: &PackUri) {
        self.overrides.remove(partname);
    }

    /// Register a part's content type the way PowerPoint does: XML parts get
    /// an override, binary parts an extension default when none exists.
    pub fn register(&mut self, partname: &PackUri, content_type: &str) {
        if self.get(partname) == Some(content_type) {
            return;
        }
        let ext = partname.ext();
        if !content_type.ends_with("xml") && !ext.is_empty() && !self.has_default(ext) {
            self.add_default(ext, content_type);
        } else {
            self.add_override(partname, content_type);
        }
    }

    /// Parse `[Content_Types].xml`.
    pub fn from_xml(content: &str) -> Result<Self> {
        let mut types = Self::default();
        let mut reader = Reader::from_str(content);
        reader.trim_text(true);

        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    let name = e.name();
                    let kind = local_name(name.as_ref());
                    if kind != b"Default" && kind != b"Override" {
                        continue;
                    }

                    let mut key = String::new();
                    let mut value = String::new();
                    for attr in e.attributes().flatten() {
                        let text = String::from_utf8_lossy(&attr.value).to_string();
                        match attr.key.as_ref() {
                            b"Extension" | b"PartName" => key = text,
                            b"ContentType" => value = text,
                            _ => {}
                        }
                    }

                    if kind == b"Default" {
                        types.add_default(&key, &value);
                    } else {
                        let partname = PackUri::new(key)?;
                        types.add_override(&partname, &value);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::XmlError(format!(
                        "Error parsing content types: {}",
                        e
                    )));
                }
                _ => {}
            }
        }

        Ok(types)
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(512 + self.overrides.len() * 160);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push_str("\r\n");
        xml.push_str(&format!(r#"<Types xmlns="{}">"#, namespace::OPC_CONTENT_TYPES));
        for (ext, ct) in &self.defaults {
            xml.push_str(&format!(
                r#"<Default Extension="{}" ContentType="{}"/>"#,
                ext, ct
            ));
        }
        for (partname, ct) in &self.overrides {
            xml.push_str(&format!(
                r#"<Override PartName="{}" ContentType="{}"/>"#,
                partname, ct
            ));
        }
        xml.push_str("</Types>");
        xml
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(s: &str) -> PackUri {
        PackUri::new(s).unwrap()
    }

    #[test]
    fn test_override_beats_default() {
        let mut types = ContentTypes::new();
        let slide = uri("/ppt/slides/slide1.xml");
        assert_eq!(types.get(&slide), Some(content_type::XML));
        types.add_override(&slide, content_type::PML_SLIDE);
        assert_eq!(types.get(&slide), Some(content_type::PML_SLIDE));
    }

    #[test]
    fn test_register_binary_uses_default() {
        let mut types = ContentTypes::new();
        types.register(&uri("/ppt/media/image1.PNG"), content_type::PNG);
        assert!(types.has_default("png"));
        assert_eq!(types.get(&uri("/ppt/media/image7.png")), Some(content_type::PNG));

        // A second binary type for the same extension falls back to an override
        types.register(&uri("/ppt/media/image8.png"), "image/x-png");
        assert_eq!(types.get(&uri("/ppt/media/image8.png")), Some("image/x-png"));
        assert_eq!(types.get(&uri("/ppt/media/image7.png")), Some(content_type::PNG));
    }

    #[test]
    fn test_xml_round_trip() {
        let mut types = ContentTypes::new();
        types.add_default("jpeg", content_type::JPEG);
        types.add_override(&uri("/ppt/presentation.xml"), content_type::PML_PRESENTATION_MAIN);
        let parsed = ContentTypes::from_xml(&types.to_xml()).unwrap();
        assert_eq!(parsed, types);
    }
}
