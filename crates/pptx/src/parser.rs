//! Slide XML to shape model.

use crate::constants::{namespace, rel_type};
use crate::package::Package;
use crate::packuri::PackUri;
use crate::xml::XmlElement;
use deck_core::{
    Background, ColorRef, Emu, Geometry, Insets, Paragraph, PlaceholderRole, Result, Run,
    RunFormat, Shape, ShapeKind, SlideContent, SlideSize, TextBody,
};

/// Children of `p:spTree` that describe the tree itself rather than a shape.
const TREE_PROPERTIES: &[&str] = &["nvGrpSpPr", "grpSpPr", "extLst"];

/// Parser from slide parts to [`SlideContent`].
pub struct PptxParser;

impl PptxParser {
    /// Create a new PPTX parser.
    pub fn new() -> Self {
        Self
    }

    /// Parse every slide of a package, in presentation order.
    pub fn parse(&self, package: &Package) -> Result<Vec<SlideContent>> {
        let slides = package.slide_uris()?;
        log::debug!("Parsing {} slides", slides.len());
        slides
            .iter()
            .map(|uri| self.parse_slide(package, uri))
            .collect()
    }

    /// Parse a single slide, including its speaker notes.
    pub fn parse_slide(&self, package: &Package, slide: &PackUri) -> Result<SlideContent> {
        let part = package.require(slide)?;
        let root = part.xml()?;
        let mut content = slide_content(&root, package.slide_size());

        if let Some(notes_uri) = part.related_of_type(rel_type::NOTES_SLIDE) {
            match package.require(&notes_uri).and_then(|p| p.xml()) {
                Ok(notes) => content.notes = notes_text(&notes),
                Err(e) => log::warn!("Unreadable notes for {}: {}", slide, e),
            }
        }
        Ok(content)
    }
}

impl Default for PptxParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the shape model of a parsed slide (or layout) element tree.
pub fn slide_content(root: &XmlElement, size: SlideSize) -> SlideContent {
    let mut content = SlideContent::new(size);
    if let Some(tree) = root.find(&["cSld", "spTree"]) {
        for el in shape_elements(tree) {
            content.add_shape(parse_shape(el));
        }
    }
    content.background = root.find(&["cSld", "bg"]).and_then(parse_background);
    content
}

/// Shape elements of a shape tree, in z order. Index `i` here is shape `i`
/// of the parsed [`SlideContent`].
pub fn shape_elements(tree: &XmlElement) -> impl Iterator<Item = &XmlElement> {
    tree.elements().filter(|e| is_shape_element(e))
}

/// Mutable access to the shape element at a model index.
pub fn shape_element_mut(tree: &mut XmlElement, index: usize) -> Option<&mut XmlElement> {
    tree.elements_mut().filter(|e| is_shape_element(e)).nth(index)
}

pub(crate) fn is_shape_element(el: &XmlElement) -> bool {
    !TREE_PROPERTIES.contains(&el.local_name())
}

fn parse_shape(el: &XmlElement) -> Shape {
    let (nv_name, kind) = match el.local_name() {
        "sp" => {
            let kind = if el.child("txBody").is_some() {
                ShapeKind::Text
            } else {
                ShapeKind::AutoShape
            };
            ("nvSpPr", kind)
        }
        "pic" => ("nvPicPr", ShapeKind::Picture),
        "grpSp" => ("nvGrpSpPr", ShapeKind::Group),
        "graphicFrame" => ("nvGraphicFramePr", graphic_frame_kind(el)),
        "cxnSp" => ("nvCxnSpPr", ShapeKind::Other),
        _ => ("", ShapeKind::Other),
    };

    let nv = el.child(nv_name);
    let c_nv_pr = nv.and_then(|nv| nv.elements().find(|e| e.local_name() == "cNvPr"));
    let id = c_nv_pr
        .and_then(|c| c.attr("id"))
        .and_then(|id| id.parse().ok())
        .unwrap_or(0);
    let name = c_nv_pr.and_then(|c| c.attr("name")).unwrap_or_default();

    let mut shape = Shape::new(id, name, kind);
    shape.placeholder = nv
        .and_then(|nv| nv.child("nvPr"))
        .map(|nv_pr| {
            let ph = nv_pr.child("ph");
            PlaceholderRole::from_placeholder(ph.is_some(), ph.and_then(|p| p.attr("type")))
        })
        .unwrap_or(PlaceholderRole::None);

    let xfrm = match el.local_name() {
        "graphicFrame" => el.child("xfrm"),
        "grpSp" => el.find(&["grpSpPr", "xfrm"]),
        _ => el.find(&["spPr", "xfrm"]),
    };
    shape.geometry = xfrm.and_then(parse_xfrm);

    if let Some(tx_body) = el.child("txBody") {
        shape.text = Some(parse_text_body(tx_body));
    }
    if kind == ShapeKind::Picture {
        shape.picture_rel = el.find(&["blipFill", "blip"]).and_then(blip_rel);
    }
    shape
}

fn graphic_frame_kind(el: &XmlElement) -> ShapeKind {
    let Some(data) = el.find(&["graphic", "graphicData"]) else {
        return ShapeKind::Other;
    };
    if data.child("tbl").is_some() {
        return ShapeKind::Table;
    }
    match data.attr("uri") {
        Some(uri) if uri.ends_with("/chart") => ShapeKind::Chart,
        _ => ShapeKind::Other,
    }
}

fn parse_xfrm(xfrm: &XmlElement) -> Option<Geometry> {
    let off = xfrm.child("off")?;
    let ext = xfrm.child("ext")?;
    Some(Geometry::new(
        emu_attr(off, "x")?,
        emu_attr(off, "y")?,
        emu_attr(ext, "cx")?,
        emu_attr(ext, "cy")?,
    ))
}

fn emu_attr(el: &XmlElement, key: &str) -> Option<Emu> {
    el.attr(key)?.parse().ok()
}

/// Relationship id of a blip, embedded or linked.
pub(crate) fn blip_rel(blip: &XmlElement) -> Option<String> {
    let prefix = blip_rel_prefix(blip);
    blip.attr(&format!("{}:embed", prefix))
        .or_else(|| blip.attr(&format!("{}:link", prefix)))
        .map(str::to_string)
}

fn blip_rel_prefix(blip: &XmlElement) -> &str {
    blip.namespace_prefix(namespace::OFC_RELATIONSHIPS)
        .unwrap_or("r")
}

fn parse_text_body(tx_body: &XmlElement) -> TextBody {
    let mut body = TextBody::default();

    if let Some(body_pr) = tx_body.child("bodyPr") {
        body.word_wrap = body_pr.attr("wrap").map(|w| w != "none");
        body.margins = Insets {
            left: emu_attr(body_pr, "lIns"),
            top: emu_attr(body_pr, "tIns"),
            right: emu_attr(body_pr, "rIns"),
            bottom: emu_attr(body_pr, "bIns"),
        };
    }

    for p in tx_body.elements().filter(|e| e.local_name() == "p") {
        let mut paragraph = Paragraph::default();
        if let Some(p_pr) = p.child("pPr") {
            paragraph.alignment = p_pr.attr("algn").map(str::to_string);
            paragraph.level = p_pr.attr("lvl").and_then(|l| l.parse().ok()).unwrap_or(0);
        }
        for item in p.elements() {
            match item.local_name() {
                "r" | "fld" => paragraph.runs.push(Run {
                    text: item.child("t").map(XmlElement::text).unwrap_or_default(),
                    format: item.child("rPr").map(parse_run_format).unwrap_or_default(),
                }),
                "br" => paragraph.runs.push(Run {
                    text: "\n".to_string(),
                    format: item.child("rPr").map(parse_run_format).unwrap_or_default(),
                }),
                _ => {}
            }
        }
        body.paragraphs.push(paragraph);
    }
    body
}

fn parse_run_format(r_pr: &XmlElement) -> RunFormat {
    let flag = |key: &str| r_pr.attr(key).map(|v| v == "1" || v == "true");
    RunFormat {
        font: r_pr
            .child("latin")
            .and_then(|l| l.attr("typeface"))
            .map(str::to_string),
        size: r_pr.attr("sz").and_then(|s| s.parse().ok()),
        bold: flag("b"),
        italic: flag("i"),
        underline: r_pr.attr("u").map(|u| u != "none"),
        color: r_pr.child("solidFill").and_then(parse_color),
    }
}

/// Colour of a fill element holding `a:srgbClr` or `a:schemeClr`.
fn parse_color(fill: &XmlElement) -> Option<ColorRef> {
    fill.elements().find_map(|c| match c.local_name() {
        "srgbClr" => c.attr("val").map(|v| ColorRef::Rgb(v.to_string())),
        "schemeClr" => c.attr("val").map(|v| ColorRef::Scheme(v.to_string())),
        _ => None,
    })
}

fn parse_background(bg: &XmlElement) -> Option<Background> {
    if let Some(bg_ref) = bg.child("bgRef") {
        return Some(Background::ThemeRef(
            bg_ref.attr("idx").and_then(|i| i.parse().ok()).unwrap_or(0),
        ));
    }
    let bg_pr = bg.child("bgPr")?;
    if let Some(fill) = bg_pr.child("solidFill") {
        return parse_color(fill).map(Background::Solid);
    }
    if let Some(grad) = bg_pr.child("gradFill") {
        let stops = grad
            .child("gsLst")
            .map(|list| list.elements().filter_map(parse_color).collect())
            .unwrap_or_default();
        return Some(Background::Gradient(stops));
    }
    bg_pr
        .find(&["blipFill", "blip"])
        .and_then(blip_rel)
        .map(|rel_id| Background::Picture { rel_id })
}

/// Body text of a notes slide.
fn notes_text(root: &XmlElement) -> Option<String> {
    let tree = root.find(&["cSld", "spTree"])?;
    let text = shape_elements(tree)
        .map(parse_shape)
        .filter(|s| s.placeholder.is_body())
        .map(|s| s.plain_text())
        .collect::<Vec<_>>()
        .join("\n");
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{self, FixtureShape};

    const SLIDE: &str = r#"<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:bg><p:bgPr><a:solidFill><a:schemeClr val="bg2"/></a:solidFill></p:bgPr></p:bg><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/><p:sp><p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr><a:xfrm><a:off x="457200" y="274638"/><a:ext cx="8229600" cy="1143000"/></a:xfrm></p:spPr><p:txBody><a:bodyPr wrap="none" lIns="0"/><a:lstStyle/><a:p><a:pPr algn="ctr" lvl="1"/><a:r><a:rPr lang="en-US" sz="4400" b="1"><a:solidFill><a:srgbClr val="1F497D"/></a:solidFill><a:latin typeface="Georgia"/></a:rPr><a:t>Quarterly</a:t></a:r><a:br/><a:r><a:rPr u="sng"/><a:t>Review</a:t></a:r></a:p></p:txBody></p:sp><p:pic><p:nvPicPr><p:cNvPr id="3" name="Picture 2"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="rId2"/></p:blipFill><p:spPr><a:xfrm><a:off x="1" y="2"/><a:ext cx="3" cy="4"/></a:xfrm></p:spPr></p:pic><p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="4" name="Table 3"/><p:cNvGraphicFramePr/><p:nvPr/></p:nvGraphicFramePr><p:xfrm><a:off x="0" y="0"/><a:ext cx="10" cy="10"/></p:xfrm><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table"><a:tbl/></a:graphicData></a:graphic></p:graphicFrame><p:sp><p:nvSpPr><p:cNvPr id="5" name="Rect"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr/></p:sp></p:spTree></p:cSld></p:sld>"#;

    fn parsed() -> SlideContent {
        let root = XmlElement::parse(SLIDE.as_bytes()).unwrap();
        slide_content(&root, SlideSize::default())
    }

    #[test]
    fn test_shape_kinds_and_order() {
        let slide = parsed();
        let kinds: Vec<ShapeKind> = slide.shapes.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![ShapeKind::Text, ShapeKind::Picture, ShapeKind::Table, ShapeKind::AutoShape]
        );
        assert_eq!(slide.shapes[0].id, 2);
        assert_eq!(slide.shapes[0].name, "Title 1");
        assert_eq!(slide.shapes[0].placeholder, PlaceholderRole::Title);
        assert_eq!(slide.shapes[1].picture_rel.as_deref(), Some("rId2"));
        assert_eq!(slide.shapes[1].geometry, Some(Geometry::new(1, 2, 3, 4)));
        assert_eq!(slide.shapes[3].geometry, None);
    }

    #[test]
    fn test_text_body_formatting() {
        let slide = parsed();
        let body = slide.shapes[0].text.as_ref().unwrap();
        assert_eq!(body.word_wrap, Some(false));
        assert_eq!(body.margins.left, Some(0));
        assert_eq!(body.margins.top, None);

        let para = &body.paragraphs[0];
        assert_eq!(para.alignment.as_deref(), Some("ctr"));
        assert_eq!(para.level, 1);
        assert_eq!(para.text(), "Quarterly\nReview");

        let first = &para.runs[0].format;
        assert_eq!(first.font.as_deref(), Some("Georgia"));
        assert_eq!(first.size, Some(4400));
        assert_eq!(first.bold, Some(true));
        assert_eq!(first.color, Some(ColorRef::Rgb("1F497D".to_string())));
        assert_eq!(para.runs[2].format.underline, Some(true));
    }

    #[test]
    fn test_background_keeps_scheme_colour() {
        assert_eq!(
            parsed().background,
            Some(Background::Solid(ColorRef::Scheme("bg2".to_string())))
        );
    }

    #[test]
    fn test_shape_element_index_matches_model() {
        let mut root = XmlElement::parse(SLIDE.as_bytes()).unwrap();
        let tree = root.find_mut(&["cSld", "spTree"]).unwrap();
        assert_eq!(shape_elements(tree).count(), 4);
        let pic = shape_element_mut(tree, 1).unwrap();
        assert_eq!(pic.local_name(), "pic");
    }

    #[test]
    fn test_parse_package_with_notes() {
        let bytes = fixture::deck_with_notes(
            &[vec![FixtureShape::title("Agenda"), FixtureShape::body("Item one")]],
            &["Speak slowly"],
        );
        let package = Package::from_bytes(&bytes).unwrap();
        let slides = PptxParser::new().parse(&package).unwrap();
        assert_eq!(slides.len(), 1);
        assert_eq!(slides[0].plain_text(), "Agenda\nItem one");
        assert_eq!(slides[0].notes.as_deref(), Some("Speak slowly"));
    }
}
