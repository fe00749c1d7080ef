//! The package graph: parts, relationships and content types, loaded from
//! and written to a ZIP archive.

use crate::constants::{content_type, namespace, rel_type};
use crate::content_types::ContentTypes;
use crate::packuri::{PackUri, CONTENT_TYPES_URI, PACKAGE_URI};
use crate::rels::{rel_refs, Relationship, Relationships};
use crate::xml::XmlElement;
use deck_core::{Error, Result, SlideSize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::io::{Cursor, Read, Seek, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Lowest id PowerPoint accepts in `p:sldIdLst`.
const MIN_SLIDE_ID: u32 = 256;

/// One named resource in a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub partname: PackUri,
    pub content_type: String,
    pub blob: Vec<u8>,
    pub rels: Relationships,
}

impl Part {
    pub fn new(partname: PackUri, content_type: impl Into<String>, blob: Vec<u8>) -> Self {
        Self {
            partname,
            content_type: content_type.into(),
            blob,
            rels: Relationships::new(),
        }
    }

    /// Whether the payload is XML and can be viewed as a tree.
    pub fn is_xml(&self) -> bool {
        self.content_type.ends_with("xml")
    }

    /// Parse the payload as an element tree.
    pub fn xml(&self) -> Result<XmlElement> {
        XmlElement::parse(&self.blob)
            .map_err(|e| Error::XmlError(format!("{}: {}", self.partname, e)))
    }

    /// Replace the payload with a serialized element tree.
    pub fn set_xml(&mut self, root: &XmlElement) -> Result<()> {
        self.blob = root.to_xml_bytes()?;
        Ok(())
    }

    /// Resolve one of this part's relationships to its target part name.
    pub fn related(&self, r_id: &str) -> Result<(&Relationship, Option<PackUri>)> {
        let rel = self.rels.get(r_id).ok_or_else(|| {
            Error::Structural(format!("{} has no relationship {}", self.partname, r_id))
        })?;
        if rel.is_external {
            return Ok((rel, None));
        }
        let target = rel.target_partname(self.partname.base_uri())?;
        Ok((rel, Some(target)))
    }

    /// Target of the first internal relationship of the given type.
    pub fn related_of_type(&self, reltype: &str) -> Option<PackUri> {
        self.rels
            .of_type(reltype)
            .find(|r| !r.is_external)
            .and_then(|r| r.target_partname(self.partname.base_uri()).ok())
    }
}

/// An in-memory document package.
#[derive(Debug, Clone, Default)]
pub struct Package {
    parts: BTreeMap<PackUri, Part>,
    content_types: ContentTypes,
    /// Package-level relationships (`/_rels/.rels`).
    rels: Relationships,
}

impl Package {
    /// Load a package from the bytes of a ZIP archive.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes))
    }

    /// Load a package from a reader.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let mut content_types: Option<ContentTypes> = None;
        let mut blobs: Vec<(PackUri, Vec<u8>)> = Vec::new();
        let mut rels_parts: Vec<(PackUri, Vec<u8>)> = Vec::new();

        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| Error::ZipError(format!("Failed to read entry {}: {}", i, e)))?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)
                .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", name, e)))?;

            let partname = PackUri::from_member_name(&name)?;
            if partname.as_str() == CONTENT_TYPES_URI {
                content_types = Some(ContentTypes::from_xml(&String::from_utf8_lossy(&data))?);
            } else if partname.rels_source().is_some() {
                rels_parts.push((partname, data));
            } else {
                blobs.push((partname, data));
            }
        }

        let mut content_types = content_types
            .ok_or_else(|| Error::InvalidPackage("Missing [Content_Types].xml".to_string()))?;

        let mut package = Package::default();
        for (partname, blob) in blobs {
            let ct = match content_types.get(&partname) {
                Some(ct) => ct.to_string(),
                None => {
                    log::warn!("No content type for {}, treating as binary", partname);
                    content_types.add_override(&partname, "application/octet-stream");
                    "application/octet-stream".to_string()
                }
            };
            package
                .parts
                .insert(partname.clone(), Part::new(partname, ct, blob));
        }

        for (rels_uri, data) in rels_parts {
            let rels = Relationships::from_xml(&String::from_utf8_lossy(&data))?;
            let Some(source) = rels_uri.rels_source() else {
                continue;
            };
            if source.as_str() == PACKAGE_URI {
                package.rels = rels;
            } else if let Some(part) = package.parts.get_mut(&source) {
                part.rels = rels;
            } else {
                log::warn!("Ignoring relationships of missing part {}", source);
            }
        }

        package.content_types = content_types;
        log::debug!("Loaded package with {} parts", package.parts.len());
        Ok(package)
    }

    /// Validate the package and serialize it as a ZIP archive.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.validate()?;

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        let write_entry = |zip: &mut ZipWriter<Cursor<Vec<u8>>>, name: &str, data: &[u8]| {
            zip.start_file(name, options)
                .map_err(|e| Error::ZipError(format!("Failed to start '{}': {}", name, e)))?;
            zip.write_all(data)?;
            Ok::<(), Error>(())
        };

        write_entry(&mut zip, "[Content_Types].xml", self.content_types.to_xml().as_bytes())?;
        write_entry(&mut zip, "_rels/.rels", self.rels.to_xml().as_bytes())?;

        for part in self.parts.values() {
            write_entry(&mut zip, part.partname.membername(), &part.blob)?;
            if !part.rels.is_empty() {
                let rels_uri = part.partname.rels_uri();
                write_entry(&mut zip, rels_uri.membername(), part.rels.to_xml().as_bytes())?;
            }
        }

        let cursor = zip
            .finish()
            .map_err(|e| Error::ZipError(format!("Failed to finish ZIP: {}", e)))?;
        Ok(cursor.into_inner())
    }

    /// Check the whole relationship graph.
    ///
    /// Fails when an internal relationship targets a missing part, a part
    /// has no registered content type, or XML content references a
    /// relationship id its part does not declare.
    pub fn validate(&self) -> Result<()> {
        for rel in self.rels.iter().filter(|r| !r.is_external) {
            let target = rel.target_partname("/")?;
            if !self.parts.contains_key(&target) {
                return Err(Error::PackageIntegrity(format!(
                    "package relationship {} targets missing part {}",
                    rel.r_id, target
                )));
            }
        }

        for part in self.parts.values() {
            if self.content_types.get(&part.partname).is_none() {
                return Err(Error::PackageIntegrity(format!(
                    "{} has no content type",
                    part.partname
                )));
            }

            for rel in part.rels.iter().filter(|r| !r.is_external) {
                let target = rel.target_partname(part.partname.base_uri())?;
                if !self.parts.contains_key(&target) {
                    return Err(Error::PackageIntegrity(format!(
                        "{} relationship {} targets missing part {}",
                        part.partname, rel.r_id, target
                    )));
                }
            }

            if part.is_xml() {
                let root = part.xml()?;
                for r_id in rel_refs(&root) {
                    if part.rels.get(&r_id).is_none() {
                        return Err(Error::PackageIntegrity(format!(
                            "{} references undeclared relationship {}",
                            part.partname, r_id
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    pub fn part(&self, partname: &PackUri) -> Option<&Part> {
        self.parts.get(partname)
    }

    pub fn part_mut(&mut self, partname: &PackUri) -> Option<&mut Part> {
        self.parts.get_mut(partname)
    }

    /// Look up a part, failing with `PartNotFound`.
    pub fn require(&self, partname: &PackUri) -> Result<&Part> {
        self.parts
            .get(partname)
            .ok_or_else(|| Error::PartNotFound(partname.to_string()))
    }

    pub fn require_mut(&mut self, partname: &PackUri) -> Result<&mut Part> {
        self.parts
            .get_mut(partname)
            .ok_or_else(|| Error::PartNotFound(partname.to_string()))
    }

    pub fn contains(&self, partname: &PackUri) -> bool {
        self.parts.contains_key(partname)
    }

    pub fn parts(&self) -> impl Iterator<Item = &Part> {
        self.parts.values()
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    pub fn content_types(&self) -> &ContentTypes {
        &self.content_types
    }

    pub fn rels(&self) -> &Relationships {
        &self.rels
    }

    /// Add a new part and register its content type. Existing parts are
    /// never replaced.
    pub fn insert_part(&mut self, part: Part) -> Result<()> {
        if self.parts.contains_key(&part.partname) {
            return Err(Error::InvalidPackage(format!(
                "Part {} already exists",
                part.partname
            )));
        }
        self.content_types.register(&part.partname, &part.content_type);
        self.parts.insert(part.partname.clone(), part);
        Ok(())
    }

    fn remove_part(&mut self, partname: &PackUri) -> Option<Part> {
        self.content_types.remove_override(partname);
        self.parts.remove(partname)
    }

    /// First unused part name for a template such as `/ppt/slides/slide{}.xml`.
    pub fn next_partname(&self, template: &str) -> Result<PackUri> {
        let mut n = 1u32;
        loop {
            let candidate = PackUri::new(template.replace("{}", &n.to_string()))?;
            if !self.parts.contains_key(&candidate) {
                return Ok(candidate);
            }
            n += 1;
        }
    }

    /// The main presentation part.
    pub fn main_document_uri(&self) -> Result<PackUri> {
        self.rels
            .of_type(rel_type::OFFICE_DOCUMENT)
            .find(|r| !r.is_external)
            .ok_or_else(|| Error::InvalidPackage("No officeDocument relationship".to_string()))?
            .target_partname("/")
    }

    /// Slide part names in presentation order.
    pub fn slide_uris(&self) -> Result<Vec<PackUri>> {
        let pres_uri = self.main_document_uri()?;
        let pres = self.require(&pres_uri)?;
        let root = pres.xml()?;
        let r_prefix = root
            .namespace_prefix(namespace::OFC_RELATIONSHIPS)
            .unwrap_or("r")
            .to_string();

        let mut slides = Vec::new();
        if let Some(list) = root.child("sldIdLst") {
            for entry in list.elements().filter(|e| e.local_name() == "sldId") {
                let Some(r_id) = entry.attr(&format!("{}:id", r_prefix)) else {
                    log::warn!("Slide id entry without relationship id");
                    continue;
                };
                match pres.related(r_id) {
                    Ok((_, Some(target))) if self.contains(&target) => slides.push(target),
                    _ => log::warn!("Slide list entry {} does not resolve to a slide", r_id),
                }
            }
        }
        Ok(slides)
    }

    /// Slide dimensions from `p:sldSz`, or the 4:3 default.
    pub fn slide_size(&self) -> SlideSize {
        let size = self
            .main_document_uri()
            .ok()
            .and_then(|uri| self.part(&uri))
            .and_then(|part| part.xml().ok())
            .and_then(|root| {
                let sz = root.child("sldSz")?;
                Some(SlideSize {
                    width: sz.attr("cx")?.parse().ok()?,
                    height: sz.attr("cy")?.parse().ok()?,
                })
            });
        size.unwrap_or_default()
    }

    /// Slide layouts with their names, in part-name order.
    pub fn layouts(&self) -> Vec<(PackUri, String)> {
        let mut layouts: Vec<(PackUri, String)> = self
            .parts
            .values()
            .filter(|p| p.content_type == content_type::PML_SLIDE_LAYOUT)
            .map(|p| {
                let name = p
                    .xml()
                    .ok()
                    .and_then(|root| root.child("cSld")?.attr("name").map(str::to_string))
                    .unwrap_or_default();
                (p.partname.clone(), name)
            })
            .collect();
        layouts.sort_by_key(|(uri, _)| (uri.idx().unwrap_or(u32::MAX), uri.clone()));
        layouts
    }

    /// Name of the layout a slide is based on.
    pub fn layout_name_of(&self, slide: &PackUri) -> Option<String> {
        let layout = self.part(slide)?.related_of_type(rel_type::SLIDE_LAYOUT)?;
        self.part(&layout)?
            .xml()
            .ok()?
            .child("cSld")?
            .attr("name")
            .map(str::to_string)
    }

    /// The notes master, if the presentation has one.
    pub fn notes_master_uri(&self) -> Option<PackUri> {
        let pres_uri = self.main_document_uri().ok()?;
        self.part(&pres_uri)?
            .related_of_type(rel_type::NOTES_MASTER)
    }

    /// Append an existing slide part to the presentation's slide list.
    pub fn append_slide(&mut self, slide: &PackUri) -> Result<()> {
        let pres_uri = self.main_document_uri()?;
        let pres = self.require_mut(&pres_uri)?;
        let target_ref = slide.relative_ref(pres_uri.base_uri());
        let r_id = pres.rels.get_or_add(rel_type::SLIDE, &target_ref);

        let mut root = pres.xml()?;
        let p_prefix = root
            .name
            .split_once(':')
            .map(|(p, _)| format!("{}:", p))
            .unwrap_or_default();
        let r_prefix = match root.namespace_prefix(namespace::OFC_RELATIONSHIPS) {
            Some(prefix) => prefix.to_string(),
            None => {
                root.set_attr("xmlns:r", namespace::OFC_RELATIONSHIPS);
                "r".to_string()
            }
        };

        if root.child("sldIdLst").is_none() {
            let pos = sld_id_lst_position(&root);
            root.children.insert(
                pos,
                crate::xml::XmlNode::Element(XmlElement::new(format!("{}sldIdLst", p_prefix))),
            );
        }

        let list = root
            .child_mut("sldIdLst")
            .ok_or_else(|| Error::InvalidPackage("Could not create slide list".to_string()))?;
        let next_id = list
            .elements()
            .filter_map(|e| e.attr("id")?.parse::<u32>().ok())
            .max()
            .map(|max| max + 1)
            .unwrap_or(MIN_SLIDE_ID)
            .max(MIN_SLIDE_ID);
        list.push(
            XmlElement::new(format!("{}sldId", p_prefix))
                .with_attr("id", next_id.to_string())
                .with_attr(format!("{}:id", r_prefix), r_id),
        );

        pres.set_xml(&root)
    }

    /// Take a slide out of the slide list and drop the parts only it
    /// used. Returns the number of parts removed.
    pub fn remove_slide(&mut self, slide: &PackUri) -> Result<usize> {
        let pres_uri = self.main_document_uri()?;
        let pres = self.require_mut(&pres_uri)?;
        let r_ids: Vec<String> = pres
            .rels
            .of_type(rel_type::SLIDE)
            .filter(|r| r.target_partname(pres_uri.base_uri()).ok().as_ref() == Some(slide))
            .map(|r| r.r_id.clone())
            .collect();
        if r_ids.is_empty() {
            return Err(Error::PartNotFound(format!("{} is not in the slide list", slide)));
        }
        for r_id in &r_ids {
            pres.rels.remove(r_id);
        }

        let mut root = pres.xml()?;
        let r_prefix = root
            .namespace_prefix(namespace::OFC_RELATIONSHIPS)
            .unwrap_or("r")
            .to_string();
        let id_attr = format!("{}:id", r_prefix);
        if let Some(list) = root.child_mut("sldIdLst") {
            list.children.retain(|node| match node {
                crate::xml::XmlNode::Element(e) => !e.attr(&id_attr).is_some_and(|id| r_ids.iter().any(|r| r == id)),
                crate::xml::XmlNode::Text(_) => true,
            });
        }
        pres.set_xml(&root)?;

        let removed = self.prune_unreachable();
        log::debug!("Removed {} and {} parts", slide, removed);
        Ok(removed)
    }

    /// A copy of `template` with every slide removed, keeping masters,
    /// layouts and theme. Parts only reachable through the removed slides
    /// are dropped as well.
    pub fn without_slides(template: &Package) -> Result<Package> {
        let mut package = template.clone();
        let pres_uri = package.main_document_uri()?;
        let pres = package.require_mut(&pres_uri)?;

        let slide_ids: Vec<String> = pres
            .rels
            .of_type(rel_type::SLIDE)
            .map(|r| r.r_id.clone())
            .collect();
        for r_id in &slide_ids {
            pres.rels.remove(r_id);
        }

        let mut root = pres.xml()?;
        if let Some(list) = root.child_mut("sldIdLst") {
            list.children.clear();
        }
        pres.set_xml(&root)?;

        let removed = package.prune_unreachable();
        log::debug!(
            "Removed {} slides and {} unreachable parts from template",
            slide_ids.len(),
            removed
        );
        Ok(package)
    }

    /// Drop every part not reachable from the package relationships.
    /// Returns the number of parts removed.
    pub fn prune_unreachable(&mut self) -> usize {
        let mut reachable: BTreeSet<PackUri> = BTreeSet::new();
        let mut queue: VecDeque<PackUri> = self
            .rels
            .iter()
            .filter(|r| !r.is_external)
            .filter_map(|r| r.target_partname("/").ok())
            .collect();

        while let Some(uri) = queue.pop_front() {
            if !reachable.insert(uri.clone()) {
                continue;
            }
            if let Some(part) = self.parts.get(&uri) {
                for rel in part.rels.iter().filter(|r| !r.is_external) {
                    if let Ok(target) = rel.target_partname(uri.base_uri()) {
                        queue.push_back(target);
                    }
                }
            }
        }

        let unreachable: Vec<PackUri> = self
            .parts
            .keys()
            .filter(|uri| !reachable.contains(*uri))
            .cloned()
            .collect();
        for uri in &unreachable {
            self.remove_part(uri);
        }
        unreachable.len()
    }
}

/// Where `p:sldIdLst` goes among the children of `p:presentation`: after
/// the master id lists, before everything else.
fn sld_id_lst_position(root: &XmlElement) -> usize {
    const BEFORE: &[&str] = &["sldMasterIdLst", "notesMasterIdLst", "handoutMasterIdLst"];
    root.children
        .iter()
        .rposition(|node| match node {
            crate::xml::XmlNode::Element(e) => BEFORE.contains(&e.local_name()),
            crate::xml::XmlNode::Text(_) => false,
        })
        .map(|pos| pos + 1)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{self, FixtureShape};

    #[test]
    fn test_load_fixture() {
        let bytes = fixture::deck(&[
            vec![FixtureShape::title("Hello")],
            vec![FixtureShape::title("World")],
        ]);
        let package = Package::from_bytes(&bytes).unwrap();
        let slides = package.slide_uris().unwrap();
        assert_eq!(slides.len(), 2);
        assert_eq!(slides[0].as_str(), "/ppt/slides/slide1.xml");
        assert_eq!(package.slide_size(), SlideSize::default());
        assert_eq!(package.layouts().len(), 2);
        assert_eq!(
            package.layout_name_of(&slides[0]).as_deref(),
            Some("Title and Content")
        );
        package.validate().unwrap();
    }

    #[test]
    fn test_write_round_trip() {
        let bytes = fixture::deck(&[vec![FixtureShape::title("Hello")]]);
        let package = Package::from_bytes(&bytes).unwrap();
        let again = Package::from_bytes(&package.to_bytes().unwrap()).unwrap();
        assert_eq!(again.part_count(), package.part_count());
        assert_eq!(again.slide_uris().unwrap(), package.slide_uris().unwrap());
    }

    #[test]
    fn test_missing_content_types_is_invalid() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("ppt/presentation.xml", FileOptions::default())
            .unwrap();
        zip.write_all(b"<p:presentation/>").unwrap();
        let bytes = zip.finish().unwrap().into_inner();
        assert!(matches!(
            Package::from_bytes(&bytes),
            Err(Error::InvalidPackage(_))
        ));
        assert!(matches!(
            Package::from_bytes(b"not a zip"),
            Err(Error::ZipError(_))
        ));
    }

    #[test]
    fn test_validate_rejects_dangling_relationship() {
        let bytes = fixture::deck(&[vec![FixtureShape::title("Hello")]]);
        let mut package = Package::from_bytes(&bytes).unwrap();
        let slide = package.slide_uris().unwrap()[0].clone();
        package
            .require_mut(&slide)
            .unwrap()
            .rels
            .add(rel_type::IMAGE, "../media/missing.png", false);
        assert!(matches!(
            package.to_bytes(),
            Err(Error::PackageIntegrity(_))
        ));
    }

    #[test]
    fn test_validate_rejects_undeclared_reference() {
        let bytes = fixture::deck(&[vec![FixtureShape::picture("rId9", "image1.png")]]);
        let mut package = Package::from_bytes(&bytes).unwrap();
        package.validate().unwrap();
        let slide = package.slide_uris().unwrap()[0].clone();
        package.require_mut(&slide).unwrap().rels.remove("rId9");
        assert!(matches!(
            package.validate(),
            Err(Error::PackageIntegrity(_))
        ));
    }

    #[test]
    fn test_validate_accepts_action_link() {
        let bytes = fixture::deck(&[vec![FixtureShape::action_link(
            "End",
            "ppaction://hlinkshowjump?jump=endshow",
        )]]);
        let package = Package::from_bytes(&bytes).unwrap();
        package.validate().unwrap();
        package.to_bytes().unwrap();
    }

    #[test]
    fn test_without_slides_keeps_layouts() {
        let bytes = fixture::deck(&[
            vec![FixtureShape::title("One"), FixtureShape::picture("rId9", "image1.png")],
            vec![FixtureShape::title("Two")],
        ]);
        let template = Package::from_bytes(&bytes).unwrap();
        let empty = Package::without_slides(&template).unwrap();

        assert!(empty.slide_uris().unwrap().is_empty());
        assert_eq!(empty.layouts().len(), 2);
        assert!(!empty.contains(&PackUri::new("/ppt/slides/slide1.xml").unwrap()));
        assert!(!empty.contains(&PackUri::new("/ppt/media/image1.png").unwrap()));
        // The template itself is untouched
        assert_eq!(template.slide_uris().unwrap().len(), 2);
        empty.validate().unwrap();
    }

    #[test]
    fn test_append_slide_assigns_ids() {
        let bytes = fixture::deck(&[vec![FixtureShape::title("One")]]);
        let mut package = Package::without_slides(&Package::from_bytes(&bytes).unwrap()).unwrap();

        for _ in 0..2 {
            let uri = package.next_partname("/ppt/slides/slide{}.xml").unwrap();
            let mut part = Part::new(
                uri.clone(),
                content_type::PML_SLIDE,
                fixture::slide_xml(&[]).into_bytes(),
            );
            part.rels
                .add(rel_type::SLIDE_LAYOUT, "../slideLayouts/slideLayout1.xml", false);
            package.insert_part(part).unwrap();
            package.append_slide(&uri).unwrap();
        }

        let slides = package.slide_uris().unwrap();
        assert_eq!(slides.len(), 2);
        let pres = package
            .part(&package.main_document_uri().unwrap())
            .unwrap()
            .xml()
            .unwrap();
        let ids: Vec<&str> = pres
            .child("sldIdLst")
            .unwrap()
            .elements()
            .filter_map(|e| e.attr("id"))
            .collect();
        assert_eq!(ids, vec!["256", "257"]);
        package.validate().unwrap();
    }

    #[test]
    fn test_remove_slide_drops_its_parts() {
        let bytes = fixture::deck(&[
            vec![FixtureShape::title("Keep")],
            vec![FixtureShape::picture("rId5", "image1.png")],
        ]);
        let mut package = Package::from_bytes(&bytes).unwrap();
        let slides = package.slide_uris().unwrap();

        let removed = package.remove_slide(&slides[1]).unwrap();
        // The slide and its image
        assert_eq!(removed, 2);
        assert_eq!(package.slide_uris().unwrap(), vec![slides[0].clone()]);
        assert!(!package.contains(&PackUri::new("/ppt/media/image1.png").unwrap()));
        package.validate().unwrap();

        assert!(matches!(
            package.remove_slide(&slides[1]),
            Err(Error::PartNotFound(_))
        ));
    }

    #[test]
    fn test_insert_part_never_replaces() {
        let bytes = fixture::deck(&[vec![FixtureShape::title("One")]]);
        let mut package = Package::from_bytes(&bytes).unwrap();
        let existing = package.slide_uris().unwrap()[0].clone();
        let result = package.insert_part(Part::new(existing, content_type::PML_SLIDE, vec![]));
        assert!(result.is_err());
    }
}
