//! Copying a slide, with everything it depends on, between packages.
//!
//! Shapes are copied one at a time. Each shape's relationship references
//! are resolved and verified against the source before anything is
//! written to the destination, so a shape with a broken dependency is
//! dropped on its own and the rest of the slide still arrives intact.

use crate::constants::{content_type, rel_type};
use crate::package::{Package, Part};
use crate::packuri::PackUri;
use crate::parser::{is_shape_element, slide_content};
use crate::rels::{
    rel_refs_scoped, rel_scope, rewrite_rel_refs, rewrite_rel_refs_scoped, RelRewrite,
    Relationship, Relationships,
};
use crate::xml::{XmlElement, XmlNode};
use deck_core::{Error, Result, ShapeKind, SlideContent};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

/// Downloads externally linked resources so they can be embedded.
pub trait ResourceFetcher: Send + Sync {
    /// Fetch the bytes at `url`. Failures should be `Error::ResourceFetch`.
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Options for [`clone_slide`].
#[derive(Clone, Default)]
pub struct CloneOptions {
    /// Embeds externally linked pictures when set.
    pub fetcher: Option<Arc<dyn ResourceFetcher>>,
}

impl CloneOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn ResourceFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }
}

impl fmt::Debug for CloneOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloneOptions")
            .field("fetcher", &self.fetcher.is_some())
            .finish()
    }
}

/// What happened to one shape during a clone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum ShapeOutcome {
    Copied,
    /// Present in the destination, but missing a link or resource.
    Degraded(String),
    /// Left out of the destination.
    Skipped(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShapeReport {
    /// Position of the shape in the source slide's shape tree.
    pub index: usize,
    pub name: String,
    pub kind: ShapeKind,
    pub outcome: ShapeOutcome,
}

/// A slide created by [`clone_slide`].
#[derive(Debug, Clone)]
pub struct ClonedSlide {
    pub uri: PackUri,
    /// Destination layout the slide was bound to.
    pub layout: PackUri,
    pub outcomes: Vec<ShapeReport>,
    pub warnings: Vec<String>,
}

impl ClonedSlide {
    /// Whether any shape was skipped or degraded.
    pub fn is_degraded(&self) -> bool {
        self.outcomes
            .iter()
            .any(|r| !matches!(r.outcome, ShapeOutcome::Copied))
    }
}

/// Copy `src_slide` from `src` into `dest` and append it to the
/// destination's slide list.
///
/// Broken shapes are skipped and reported; only package-level problems
/// (an unreadable source slide, a destination without layouts) fail the
/// whole clone. No existing destination part is modified except the
/// presentation's slide list.
pub fn clone_slide(
    src: &Package,
    src_slide: &PackUri,
    dest: &mut Package,
    options: &CloneOptions,
) -> Result<ClonedSlide> {
    let src_part = src.require(src_slide)?;
    let src_root = src_part.xml()?;
    let model = slide_content(&src_root, src.slide_size());

    let (layout, layout_warning) = bind_layout(src, src_slide, dest)?;
    let dest_uri = dest.next_partname("/ppt/slides/slide{}.xml")?;
    log::debug!("Cloning {} to {}", src_slide, dest_uri);

    let mut cloner = Cloner {
        src,
        src_part,
        dest,
        dest_uri: dest_uri.clone(),
        rels: Relationships::new(),
        copied: HashMap::new(),
        reserved: BTreeSet::from([dest_uri.clone()]),
        fetcher: options.fetcher.as_deref(),
        warnings: Vec::new(),
    };
    cloner.warnings.extend(layout_warning);
    cloner.rels.add(
        rel_type::SLIDE_LAYOUT,
        &layout.relative_ref(dest_uri.base_uri()),
        false,
    );

    let scope = rel_scope(&src_root);
    let mut root = src_root;
    let outcomes = cloner.clone_shapes(&mut root, &scope, &model);

    if outcomes.iter().any(|r| matches!(r.outcome, ShapeOutcome::Skipped(_)))
        && root.child("timing").is_some()
    {
        root.remove_children("timing");
        cloner.warn("animations dropped because shapes were skipped".to_string());
    }

    if let Some(c_sld) = root.child_mut("cSld") {
        cloner.clone_children(c_sld, &scope, &["spTree"]);
    }
    cloner.clone_children(&mut root, &scope, &["cSld"]);
    cloner.clone_notes();

    cloner.finish(root, layout, outcomes)
}

/// Pick the destination layout for a cloned slide: same name as the
/// source slide's layout, else the first one.
fn bind_layout(
    src: &Package,
    src_slide: &PackUri,
    dest: &Package,
) -> Result<(PackUri, Option<String>)> {
    let layouts = dest.layouts();
    let wanted = src.layout_name_of(src_slide);

    if let Some(name) = &wanted {
        if let Some((uri, _)) = layouts.iter().find(|(_, n)| n == name) {
            return Ok((uri.clone(), None));
        }
    }

    let (uri, name) = layouts.into_iter().next().ok_or_else(|| {
        Error::PackageIntegrity("destination package has no slide layouts".to_string())
    })?;
    let warning = wanted.map(|w| {
        let msg = format!("layout '{}' not found in destination, using '{}'", w, name);
        log::warn!("{}", msg);
        msg
    });
    Ok((uri, warning))
}

/// Source-side resolution of one relationship reference.
enum Resolved {
    External(Relationship),
    Structural(String),
    Internal(String, PackUri),
}

struct Cloner<'a> {
    src: &'a Package,
    src_part: &'a Part,
    dest: &'a mut Package,
    dest_uri: PackUri,
    /// Relationships of the new slide.
    rels: Relationships,
    /// Source part to destination part, for parts copied by this clone.
    copied: HashMap<PackUri, PackUri>,
    /// Destination names handed out but not yet inserted.
    reserved: BTreeSet<PackUri>,
    fetcher: Option<&'a dyn ResourceFetcher>,
    warnings: Vec<String>,
}

impl<'a> Cloner<'a> {
    fn warn(&mut self, msg: String) {
        log::warn!("{}: {}", self.dest_uri, msg);
        self.warnings.push(msg);
    }

    fn clone_shapes(
        &mut self,
        root: &mut XmlElement,
        scope: &[String],
        model: &SlideContent,
    ) -> Vec<ShapeReport> {
        let mut reports = Vec::new();
        let Some(tree) = root.find_mut(&["cSld", "spTree"]) else {
            return reports;
        };

        let mut index = 0;
        for node in std::mem::take(&mut tree.children) {
            let mut el = match node {
                XmlNode::Element(el) if is_shape_element(&el) => el,
                other => {
                    tree.children.push(other);
                    continue;
                }
            };

            let shape = model.shapes.get(index);
            let name = shape.map(|s| s.name.clone()).unwrap_or_default();
            let kind = shape.map(|s| s.kind).unwrap_or(ShapeKind::Other);

            let outcome = match self.clone_unit(&mut el, scope, kind == ShapeKind::Picture) {
                Ok(outcome) => {
                    tree.children.push(XmlNode::Element(el));
                    outcome
                }
                Err(e) => {
                    self.warn(format!("shape '{}' skipped: {}", name, e));
                    ShapeOutcome::Skipped(e.to_string())
                }
            };
            log::debug!("Shape {} '{}' ({:?}): {:?}", index, name, kind, outcome);

            reports.push(ShapeReport {
                index,
                name,
                kind,
                outcome,
            });
            index += 1;
        }
        reports
    }

    /// Remap every child of `parent` other than `skip`, dropping children
    /// whose references cannot be carried over.
    fn clone_children(&mut self, parent: &mut XmlElement, scope: &[String], skip: &[&str]) {
        for node in std::mem::take(&mut parent.children) {
            match node {
                XmlNode::Element(mut el) if !skip.contains(&el.local_name()) => {
                    let is_background = el.local_name() == "bg";
                    match self.clone_unit(&mut el, scope, is_background) {
                        Ok(_) => parent.children.push(XmlNode::Element(el)),
                        Err(e) => self.warn(format!("<{}> dropped: {}", el.name, e)),
                    }
                }
                other => parent.children.push(other),
            }
        }
    }

    /// Carry one element's relationship references over to the new slide.
    ///
    /// Fails without touching the destination if any reference cannot be
    /// resolved in the source.
    fn clone_unit(
        &mut self,
        el: &mut XmlElement,
        scope: &[String],
        embeds_pictures: bool,
    ) -> Result<ShapeOutcome> {
        let mut refs = rel_refs_scoped(el, scope);
        if refs.is_empty() {
            return Ok(ShapeOutcome::Copied);
        }
        let mut seen = BTreeSet::new();
        refs.retain(|r| seen.insert(r.clone()));

        let mut resolved = Vec::with_capacity(refs.len());
        for r_id in refs {
            let res = self.resolve(&r_id)?;
            resolved.push((r_id, res));
        }

        let mut outcome = ShapeOutcome::Copied;
        let mut rewrites: HashMap<String, RelRewrite> = HashMap::new();
        let mut embedded: Vec<String> = Vec::new();

        for (r_id, res) in resolved {
            let rewrite = match res {
                Resolved::External(rel) => {
                    let fetched = match self.fetcher {
                        Some(fetcher) if embeds_pictures && rel.reltype == rel_type::IMAGE => {
                            Some(fetcher.fetch(&rel.target_ref))
                        }
                        _ => None,
                    };
                    match fetched {
                        Some(Ok(bytes)) => {
                            let new_id = self.embed_image(&rel.target_ref, bytes)?;
                            embedded.push(new_id.clone());
                            RelRewrite::Replace(new_id)
                        }
                        Some(Err(e)) => {
                            self.warn(format!("kept external link {}: {}", rel.target_ref, e));
                            outcome = ShapeOutcome::Degraded(e.to_string());
                            RelRewrite::Replace(
                                self.rels.get_or_add_ext(&rel.reltype, &rel.target_ref),
                            )
                        }
                        None => RelRewrite::Replace(
                            self.rels.get_or_add_ext(&rel.reltype, &rel.target_ref),
                        ),
                    }
                }
                Resolved::Structural(reltype) => {
                    let kind = reltype.rsplit('/').next().unwrap_or_default().to_string();
                    self.warn(format!("dropped reference {} to a {} part", r_id, kind));
                    outcome = ShapeOutcome::Degraded(format!("reference to {} dropped", kind));
                    RelRewrite::Remove
                }
                Resolved::Internal(reltype, target) => {
                    let dest_target = self.copy_part(&target)?;
                    let target_ref = dest_target.relative_ref(self.dest_uri.base_uri());
                    RelRewrite::Replace(self.rels.get_or_add(&reltype, &target_ref))
                }
            };
            rewrites.insert(r_id, rewrite);
        }

        rewrite_rel_refs_scoped(el, scope, &mut |r_id| {
            rewrites.get(r_id).cloned().unwrap_or(RelRewrite::Keep)
        });
        if !embedded.is_empty() {
            el.walk_mut(&mut |e| relink_as_embedded(e, &embedded));
        }
        Ok(outcome)
    }

    fn resolve(&self, r_id: &str) -> Result<Resolved> {
        let rel = self.src_part.rels.get(r_id).ok_or_else(|| {
            Error::Structural(format!(
                "{} does not declare relationship {}",
                self.src_part.partname, r_id
            ))
        })?;
        if rel.is_external {
            return Ok(Resolved::External(rel.clone()));
        }
        if rel_type::is_structural(&rel.reltype) {
            return Ok(Resolved::Structural(rel.reltype.clone()));
        }
        let target = rel.target_partname(self.src_part.partname.base_uri())?;
        self.verify_closure(&target, &mut BTreeSet::new())?;
        Ok(Resolved::Internal(rel.reltype.clone(), target))
    }

    /// Check that `target` and every part it transitively depends on exist
    /// in the source.
    fn verify_closure(&self, target: &PackUri, visited: &mut BTreeSet<PackUri>) -> Result<()> {
        if self.copied.contains_key(target) || !visited.insert(target.clone()) {
            return Ok(());
        }
        let part = self.src.part(target).ok_or_else(|| {
            Error::Structural(format!("{} is missing from the source package", target))
        })?;
        for rel in part
            .rels
            .iter()
            .filter(|r| !r.is_external && !rel_type::is_structural(&r.reltype))
        {
            self.verify_closure(&rel.target_partname(target.base_uri())?, visited)?;
        }
        Ok(())
    }

    /// Copy a source part and its own dependencies, once per clone.
    fn copy_part(&mut self, target: &PackUri) -> Result<PackUri> {
        if let Some(done) = self.copied.get(target) {
            return Ok(done.clone());
        }
        let src = self.src;
        let part = src
            .part(target)
            .ok_or_else(|| Error::Structural(format!("{} is missing", target)))?;

        let dest_name = self.allocate(&tuple_template(target))?;
        self.copied.insert(target.clone(), dest_name.clone());
        log::debug!("Copying part {} to {}", target, dest_name);

        let mut rels = Relationships::new();
        let mut dropped: Vec<String> = Vec::new();
        for rel in part.rels.iter() {
            if rel.is_external {
                rels.insert(rel.clone());
            } else if rel_type::is_structural(&rel.reltype) {
                dropped.push(rel.r_id.clone());
            } else {
                let child = self.copy_part(&rel.target_partname(target.base_uri())?)?;
                rels.insert(Relationship {
                    target_ref: child.relative_ref(dest_name.base_uri()),
                    ..rel.clone()
                });
            }
        }

        let blob = if !dropped.is_empty() && part.is_xml() {
            self.warn(format!(
                "dropped {} structural reference(s) from {}",
                dropped.len(),
                target
            ));
            let mut root = part.xml()?;
            rewrite_rel_refs(&mut root, &mut |r_id| {
                if dropped.iter().any(|d| d == r_id) {
                    RelRewrite::Remove
                } else {
                    RelRewrite::Keep
                }
            });
            root.to_xml_bytes()?
        } else {
            part.blob.clone()
        };

        self.insert(Part {
            partname: dest_name.clone(),
            content_type: part.content_type.clone(),
            blob,
            rels,
        })?;
        Ok(dest_name)
    }

    /// Store fetched image bytes as a new media part related to the slide.
    fn embed_image(&mut self, url: &str, bytes: Vec<u8>) -> Result<String> {
        let ext = image_ext(url, &bytes);
        let ct = content_type::for_image_ext(ext).unwrap_or(content_type::PNG);
        let uri = self.allocate(&format!("/ppt/media/image{{}}.{}", ext))?;
        log::debug!("Embedding {} as {}", url, uri);
        self.insert(Part::new(uri.clone(), ct, bytes))?;
        let target_ref = uri.relative_ref(self.dest_uri.base_uri());
        Ok(self.rels.get_or_add(rel_type::IMAGE, &target_ref))
    }

    fn clone_notes(&mut self) {
        let Some(src_notes) = self.src_part.related_of_type(rel_type::NOTES_SLIDE) else {
            return;
        };
        let Some(master) = self.dest.notes_master_uri() else {
            self.warn("notes dropped: destination has no notes master".to_string());
            return;
        };
        match self.copy_notes(&src_notes, &master) {
            Ok(notes) => {
                let target_ref = notes.relative_ref(self.dest_uri.base_uri());
                self.rels.add(rel_type::NOTES_SLIDE, &target_ref, false);
            }
            Err(e) => self.warn(format!("notes dropped: {}", e)),
        }
    }

    fn copy_notes(&mut self, src_notes: &PackUri, master: &PackUri) -> Result<PackUri> {
        let src = self.src;
        let part = src.require(src_notes)?;
        let dest_name = self.allocate("/ppt/notesSlides/notesSlide{}.xml")?;
        let base = dest_name.base_uri().to_string();

        let mut rels = Relationships::new();
        let mut dropped: Vec<String> = Vec::new();
        for rel in part.rels.iter() {
            let target_ref = if rel.is_external {
                rel.target_ref.clone()
            } else if rel.reltype == rel_type::NOTES_MASTER {
                master.relative_ref(&base)
            } else if rel.reltype == rel_type::SLIDE {
                self.dest_uri.relative_ref(&base)
            } else if rel_type::is_structural(&rel.reltype) {
                dropped.push(rel.r_id.clone());
                continue;
            } else {
                let target = rel.target_partname(src_notes.base_uri())?;
                self.verify_closure(&target, &mut BTreeSet::new())?;
                self.copy_part(&target)?.relative_ref(&base)
            };
            rels.insert(Relationship {
                target_ref,
                ..rel.clone()
            });
        }

        let mut root = part.xml()?;
        if !dropped.is_empty() {
            rewrite_rel_refs(&mut root, &mut |r_id| {
                if dropped.iter().any(|d| d == r_id) {
                    RelRewrite::Remove
                } else {
                    RelRewrite::Keep
                }
            });
        }

        let mut notes = Part::new(
            dest_name.clone(),
            content_type::PML_NOTES_SLIDE,
            root.to_xml_bytes()?,
        );
        notes.rels = rels;
        self.insert(notes)?;
        Ok(dest_name)
    }

    /// First free name for a tuple part template, counting names handed
    /// out by this clone but not yet inserted.
    fn allocate(&mut self, template: &str) -> Result<PackUri> {
        let mut n = 1u32;
        loop {
            let candidate = PackUri::new(template.replace("{}", &n.to_string()))?;
            if !self.dest.contains(&candidate) && !self.reserved.contains(&candidate) {
                self.reserved.insert(candidate.clone());
                return Ok(candidate);
            }
            n += 1;
        }
    }

    fn insert(&mut self, part: Part) -> Result<()> {
        self.reserved.remove(&part.partname);
        self.dest.insert_part(part)
    }

    fn finish(
        mut self,
        root: XmlElement,
        layout: PackUri,
        outcomes: Vec<ShapeReport>,
    ) -> Result<ClonedSlide> {
        let mut part = Part::new(
            self.dest_uri.clone(),
            content_type::PML_SLIDE,
            root.to_xml_bytes()?,
        );
        part.rels = std::mem::take(&mut self.rels);
        self.insert(part)?;
        self.dest.append_slide(&self.dest_uri)?;

        Ok(ClonedSlide {
            uri: self.dest_uri,
            layout,
            outcomes,
            warnings: self.warnings,
        })
    }
}

/// `/ppt/media/image3.png` becomes `/ppt/media/image{}.png`.
fn tuple_template(uri: &PackUri) -> String {
    let filename = uri.filename();
    let (stem, ext) = match filename.rsplit_once('.') {
        Some((stem, ext)) => (stem, format!(".{}", ext)),
        None => (filename, String::new()),
    };
    let stem = stem.trim_end_matches(|c: char| c.is_ascii_digit());
    let base = uri.base_uri().trim_end_matches('/');
    format!("{}/{}{{}}{}", base, stem, ext)
}

/// Image file extension from the bytes' signature, else from the URL.
fn image_ext<'u>(url: &'u str, bytes: &[u8]) -> &'u str {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        return "png";
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return "jpeg";
    }
    if bytes.starts_with(b"GIF8") {
        return "gif";
    }
    let path = url.split(&['?', '#'][..]).next().unwrap_or(url);
    path.rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| content_type::for_image_ext(ext).is_some())
        .unwrap_or("png")
}

/// Turn a blip's `r:link` into `r:embed` once its target has been embedded.
fn relink_as_embedded(el: &mut XmlElement, embedded: &[String]) {
    if el.local_name() != "blip" {
        return;
    }
    for (key, value) in el.attributes.iter_mut() {
        if let Some(prefix) = key.strip_suffix(":link") {
            if embedded.iter().any(|id| id == value) {
                *key = format!("{}:embed", prefix);
            }
        }
    }
}
