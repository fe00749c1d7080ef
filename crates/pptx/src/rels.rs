//! Relationships between parts.

use crate::constants::{namespace, TARGET_MODE_EXTERNAL};
use crate::packuri::PackUri;
use crate::xml::{local_name, XmlElement};
use deck_core::{Error, Result};
use quick_xml::events::Event;
use quick_xml::Reader;

/// A single relationship from a source part to a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Relationship ID (e.g. `rId1`).
    pub r_id: String,
    /// Relationship type URI.
    pub reltype: String,
    /// Target reference: relative part reference, or a URL if external.
    pub target_ref: String,
    pub is_external: bool,
}

impl Relationship {
    /// Absolute part name of an internal target, resolved against the source
    /// part's directory.
    pub fn target_partname(&self, base_uri: &str) -> Result<PackUri> {
        if self.is_external {
            return Err(Error::Structural(format!(
                "Relationship {} is external and has no target part",
                self.r_id
            )));
        }
        PackUri::from_rel_ref(base_uri, &self.target_ref)
    }
}

/// The relationships of one source part, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relationships {
    rels: Vec<Relationship>,
}

impl Relationships {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, r_id: &str) -> Option<&Relationship> {
        self.rels.iter().find(|r| r.r_id == r_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.rels.iter()
    }

    pub fn len(&self) -> usize {
        self.rels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rels.is_empty()
    }

    /// Relationships of the given type, in order.
    pub fn of_type<'a>(&'a self, reltype: &'a str) -> impl Iterator<Item = &'a Relationship> + 'a {
        self.rels.iter().filter(move |r| r.reltype == reltype)
    }

    /// Add a relationship under a fresh id and return the id.
    pub fn add(&mut self, reltype: &str, target_ref: &str, is_external: bool) -> String {
        let r_id = self.next_r_id();
        self.insert(Relationship {
            r_id: r_id.clone(),
            reltype: reltype.to_string(),
            target_ref: target_ref.to_string(),
            is_external,
        });
        r_id
    }

    /// Add a relationship with a known id, replacing any with the same id.
    pub fn insert(&mut self, rel: Relationship) {
        self.rels.retain(|r| r.r_id != rel.r_id);
        self.rels.push(rel);
    }

    /// Reuse an identical internal relationship, or add a new one.
    pub fn get_or_add(&mut self, reltype: &str, target_ref: &str) -> String {
        self.find_existing(reltype, target_ref, false)
            .unwrap_or_else(|| self.add(reltype, target_ref, false))
    }

    /// Reuse an identical external relationship, or add a new one.
    pub fn get_or_add_ext(&mut self, reltype: &str, target_url: &str) -> String {
        self.find_existing(reltype, target_url, true)
            .unwrap_or_else(|| self.add(reltype, target_url, true))
    }

    fn find_existing(&self, reltype: &str, target_ref: &str, is_external: bool) -> Option<String> {
        self.rels
            .iter()
            .find(|r| r.reltype == reltype && r.target_ref == target_ref && r.is_external == is_external)
            .map(|r| r.r_id.clone())
    }

    pub fn remove(&mut self, r_id: &str) -> Option<Relationship> {
        let pos = self.rels.iter().position(|r| r.r_id == r_id)?;
        Some(self.rels.remove(pos))
    }

    /// The first `rIdN` not yet in use, filling gaps.
    fn next_r_id(&self) -> String {
        let mut used: Vec<u32> = self
            .rels
            .iter()
            .filter_map(|r| r.r_id.strip_prefix("rId")?.parse().ok())
            .collect();
        used.sort_unstable();

        let mut next = 1u32;
        for num in used {
            match num.cmp(&next) {
                std::cmp::Ordering::Equal => next += 1,
                std::cmp::Ordering::Greater => break,
                std::cmp::Ordering::Less => {}
            }
        }
        format!("rId{}", next)
    }

    /// Parse a `.rels` part.
    pub fn from_xml(content: &str) -> Result<Self> {
        let mut rels = Self::new();
        let mut reader = Reader::from_str(content);
        reader.trim_text(true);

        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                    if local_name(e.name().as_ref()) == b"Relationship" =>
                {
                    let mut rel = Relationship {
                        r_id: String::new(),
                        reltype: String::new(),
                        target_ref: String::new(),
                        is_external: false,
                    };

                    for attr in e.attributes().flatten() {
                        let value = attr
                            .unescape_value()
                            .map(|v| v.into_owned())
                            .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
                        match attr.key.as_ref() {
                            b"Id" => rel.r_id = value,
                            b"Type" => rel.reltype = value,
                            b"Target" => rel.target_ref = value,
                            b"TargetMode" => rel.is_external = value == TARGET_MODE_EXTERNAL,
                            _ => {}
                        }
                    }

                    if rel.r_id.is_empty() {
                        log::warn!("Skipping relationship without an Id");
                        continue;
                    }
                    rels.insert(rel);
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::XmlError(format!(
                        "Error parsing relationships: {}",
                        e
                    )));
                }
                _ => {}
            }
        }

        Ok(rels)
    }

    /// Serialize as a `.rels` part.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(256 + self.rels.len() * 160);

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push_str("\r\n");
        xml.push_str(&format!(r#"<Relationships xmlns="{}">"#, namespace::OPC_RELATIONSHIPS));

        for rel in &self.rels {
            let target_mode = if rel.is_external {
                format!(r#" TargetMode="{}""#, TARGET_MODE_EXTERNAL)
            } else {
                String::new()
            };
            xml.push_str(&format!(
                r#"<Relationship Id="{}" Type="{}" Target="{}"{}/>"#,
                escape_xml(&rel.r_id),
                escape_xml(&rel.reltype),
                escape_xml(&rel.target_ref),
                target_mode
            ));
        }

        xml.push_str("</Relationships>");
        xml
    }
}

/// What to do with a relationship reference found in part content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelRewrite {
    Keep,
    Replace(String),
    Remove,
}

/// Relationship ids referenced from XML content, in document order.
///
/// An attribute is a reference when its prefix is bound to the
/// officeDocument relationships namespace, on the element or any ancestor.
pub fn rel_refs(root: &XmlElement) -> Vec<String> {
    let mut ids = Vec::new();
    collect_rel_refs(root, &[], &mut ids);
    ids
}

/// Like [`rel_refs`] for an element detached from its document.
pub fn rel_refs_scoped(el: &XmlElement, scope: &[String]) -> Vec<String> {
    let mut ids = Vec::new();
    collect_rel_refs(el, scope, &mut ids);
    ids
}

fn collect_rel_refs(el: &XmlElement, inherited: &[String], ids: &mut Vec<String>) {
    let prefixes = rel_prefixes(el, inherited);
    for (key, value) in &el.attributes {
        // Action links carry an empty r:id
        if is_rel_attr(key, &prefixes) && !value.is_empty() {
            ids.push(value.clone());
        }
    }
    for child in el.elements() {
        collect_rel_refs(child, &prefixes, ids);
    }
}

/// Rewrite every relationship reference in `root` through `f`, which
/// receives the attribute value.
pub fn rewrite_rel_refs<F>(root: &mut XmlElement, f: &mut F)
where
    F: FnMut(&str) -> RelRewrite,
{
    rewrite_inner(root, &[], f);
}

/// Like [`rewrite_rel_refs`] for an element detached from its document,
/// with `scope` holding the relationship prefixes bound by its ancestors.
pub fn rewrite_rel_refs_scoped<F>(el: &mut XmlElement, scope: &[String], f: &mut F)
where
    F: FnMut(&str) -> RelRewrite,
{
    rewrite_inner(el, scope, f);
}

/// Relationship namespace prefixes declared on a document's root element.
pub fn rel_scope(root: &XmlElement) -> Vec<String> {
    rel_prefixes(root, &[])
}

fn rewrite_inner<F>(el: &mut XmlElement, inherited: &[String], f: &mut F)
where
    F: FnMut(&str) -> RelRewrite,
{
    let prefixes = rel_prefixes(el, inherited);
    let mut removed = Vec::new();
    for (key, value) in el.attributes.iter_mut() {
        if !is_rel_attr(key, &prefixes) || value.is_empty() {
            continue;
        }
        match f(value) {
            RelRewrite::Keep => {}
            RelRewrite::Replace(new_id) => *value = new_id,
            RelRewrite::Remove => removed.push(key.clone()),
        }
    }
    for key in removed {
        el.remove_attr(&key);
    }
    for child in el.elements_mut() {
        rewrite_inner(child, &prefixes, f);
    }
}

fn rel_prefixes(el: &XmlElement, inherited: &[String]) -> Vec<String> {
    let mut prefixes = inherited.to_vec();
    for (key, value) in &el.attributes {
        if let Some(prefix) = key.strip_prefix("xmlns:") {
            if value == namespace::OFC_RELATIONSHIPS {
                prefixes.push(prefix.to_string());
            } else {
                prefixes.retain(|p| p != prefix);
            }
        }
    }
    prefixes
}

fn is_rel_attr(key: &str, prefixes: &[String]) -> bool {
    match key.split_once(':') {
        Some((prefix, _)) => prefix != "xmlns" && prefixes.iter().any(|p| p == prefix),
        None => false,
    }
}

/// Escape XML special characters for attribute values.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::rel_type;

    #[test]
    fn test_next_r_id_fills_gaps() {
        let mut rels = Relationships::new();
        assert_eq!(rels.add(rel_type::IMAGE, "../media/image1.png", false), "rId1");
        assert_eq!(rels.add(rel_type::IMAGE, "../media/image2.png", false), "rId2");
        assert_eq!(rels.add(rel_type::IMAGE, "../media/image3.png", false), "rId3");
        rels.remove("rId2");
        assert_eq!(rels.add(rel_type::CHART, "../charts/chart1.xml", false), "rId2");
        assert_eq!(rels.add(rel_type::CHART, "../charts/chart2.xml", false), "rId4");
    }

    #[test]
    fn test_get_or_add_reuses() {
        let mut rels = Relationships::new();
        let a = rels.get_or_add(rel_type::IMAGE, "../media/image1.png");
        let b = rels.get_or_add(rel_type::IMAGE, "../media/image1.png");
        let c = rels.get_or_add_ext(rel_type::IMAGE, "../media/image1.png");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(rels.len(), 2);
    }

    #[test]
    fn test_xml_round_trip() {
        let mut rels = Relationships::new();
        rels.add(rel_type::SLIDE_LAYOUT, "../slideLayouts/slideLayout1.xml", false);
        rels.add(rel_type::HYPERLINK, "https://example.com/?a=1&b=2", true);

        let parsed = Relationships::from_xml(&rels.to_xml()).unwrap();
        assert_eq!(parsed, rels);
        let link = parsed.get("rId2").unwrap();
        assert!(link.is_external);
        assert_eq!(link.target_ref, "https://example.com/?a=1&b=2");
    }

    #[test]
    fn test_target_partname() {
        let rels = Relationships::from_xml(
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
                <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/image1.png"/>
            </Relationships>"#,
        )
        .unwrap();
        let rel = rels.get("rId2").unwrap();
        assert_eq!(
            rel.target_partname("/ppt/slides").unwrap().as_str(),
            "/ppt/media/image1.png"
        );
    }

    const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

    #[test]
    fn test_rel_refs_scoped_prefixes() {
        let frame = XmlElement::new("p:graphicFrame").with_child(
            XmlElement::new("c:chart")
                .with_attr("xmlns:c", "http://schemas.openxmlformats.org/drawingml/2006/chart")
                .with_attr("xmlns:rel", REL_NS)
                .with_attr("rel:id", "rId5"),
        );
        let root = XmlElement::new("p:sld")
            .with_attr("xmlns:r", REL_NS)
            .with_child(XmlElement::new("a:blip").with_attr("r:embed", "rId2"))
            .with_child(XmlElement::new("a:other").with_attr("x:embed", "rId9"))
            .with_child(frame);
        assert_eq!(rel_refs(&root), vec!["rId2".to_string(), "rId5".to_string()]);
    }

    #[test]
    fn test_rewrite_rel_refs() {
        let mut root = XmlElement::new("p:sld")
            .with_attr("xmlns:r", REL_NS)
            .with_child(XmlElement::new("a:blip").with_attr("r:embed", "rId2"))
            .with_child(XmlElement::new("a:hlinkClick").with_attr("r:id", "rId3"));
        rewrite_rel_refs(&mut root, &mut |id| match id {
            "rId2" => RelRewrite::Replace("rId7".to_string()),
            _ => RelRewrite::Remove,
        });
        assert_eq!(rel_refs(&root), vec!["rId7".to_string()]);
        assert_eq!(root.child("hlinkClick").unwrap().attributes.len(), 0);
    }

    #[test]
    fn test_empty_rel_id_is_not_a_reference() {
        let mut root = XmlElement::new("p:sld").with_attr("xmlns:r", REL_NS).with_child(
            XmlElement::new("a:hlinkClick")
                .with_attr("r:id", "")
                .with_attr("action", "ppaction://hlinkshowjump?jump=endshow"),
        );
        assert!(rel_refs(&root).is_empty());

        rewrite_rel_refs(&mut root, &mut |_| RelRewrite::Remove);
        assert_eq!(root.child("hlinkClick").unwrap().attributes.len(), 2);
    }
}
