//! In-memory presentation packages for tests.
//!
//! Decks have one master, two layouts ("Title and Content" and
//! "Two Content"), a theme, and optionally a notes master.

use crate::constants::{content_type, namespace, rel_type};
use crate::content_types::ContentTypes;
use crate::packuri::PackUri;
use crate::rels::Relationships;
use deck_core::Geometry;
use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

/// A tiny valid PNG.
pub const PNG_BYTES: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

const LAYOUT_NAMES: [&str; 2] = ["Title and Content", "Two Content"];

/// One shape on a fixture slide.
#[derive(Debug, Clone)]
pub enum FixtureShape {
    /// Title placeholder with a formatted run.
    Title(String),
    /// Untyped (object) placeholder.
    Body(String),
    /// Plain text box, no placeholder.
    TextBox { text: String, geometry: Geometry },
    /// Embedded picture stored as `/ppt/media/<media>`.
    Picture { r_id: String, media: String },
    /// Picture linked to an external URL.
    LinkedPicture { r_id: String, url: String },
    /// Picture whose relationship id is not declared.
    BrokenPicture { r_id: String },
    /// Chart frame with a chart part and embedded workbook.
    Chart { r_id: String },
    /// Text box with an external click hyperlink.
    Hyperlink { text: String, r_id: String, url: String },
    /// Text box with a slide-show action link, which has an empty `r:id`.
    ActionLink { text: String, action: String },
}

impl FixtureShape {
    pub fn title(text: &str) -> Self {
        Self::Title(text.to_string())
    }

    pub fn body(text: &str) -> Self {
        Self::Body(text.to_string())
    }

    pub fn text_box(text: &str, geometry: Geometry) -> Self {
        Self::TextBox {
            text: text.to_string(),
            geometry,
        }
    }

    pub fn picture(r_id: &str, media: &str) -> Self {
        Self::Picture {
            r_id: r_id.to_string(),
            media: media.to_string(),
        }
    }

    pub fn linked_picture(r_id: &str, url: &str) -> Self {
        Self::LinkedPicture {
            r_id: r_id.to_string(),
            url: url.to_string(),
        }
    }

    pub fn broken_picture(r_id: &str) -> Self {
        Self::BrokenPicture {
            r_id: r_id.to_string(),
        }
    }

    pub fn chart(r_id: &str) -> Self {
        Self::Chart {
            r_id: r_id.to_string(),
        }
    }

    pub fn action_link(text: &str, action: &str) -> Self {
        Self::ActionLink {
            text: text.to_string(),
            action: action.to_string(),
        }
    }

    pub fn hyperlink(text: &str, r_id: &str, url: &str) -> Self {
        Self::Hyperlink {
            text: text.to_string(),
            r_id: r_id.to_string(),
            url: url.to_string(),
        }
    }

    fn to_xml(&self, id: usize) -> String {
        match self {
            Self::Title(text) => text_shape(
                id,
                "Title",
                r#"<p:ph type="title"/>"#,
                Some(Geometry::new(457_200, 274_638, 8_229_600, 1_143_000)),
                &formatted_paragraphs(text),
            ),
            Self::Body(text) => text_shape(
                id,
                "Content Placeholder",
                r#"<p:ph idx="1"/>"#,
                Some(Geometry::new(457_200, 1_600_200, 8_229_600, 4_525_963)),
                &plain_paragraphs(text),
            ),
            Self::TextBox { text, geometry } => {
                text_shape(id, "TextBox", "", Some(*geometry), &plain_paragraphs(text))
            }
            Self::Picture { r_id, .. } | Self::BrokenPicture { r_id } => {
                picture_shape(id, &format!(r#"r:embed="{}""#, r_id))
            }
            Self::LinkedPicture { r_id, .. } => picture_shape(id, &format!(r#"r:link="{}""#, r_id)),
            Self::Chart { r_id } => format!(
                r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="{id}" name="Chart {id}"/><p:cNvGraphicFramePr/><p:nvPr/></p:nvGraphicFramePr><p:xfrm><a:off x="1524000" y="1397000"/><a:ext cx="6096000" cy="4064000"/></p:xfrm><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/chart"><c:chart xmlns:c="http://schemas.openxmlformats.org/drawingml/2006/chart" r:id="{r_id}"/></a:graphicData></a:graphic></p:graphicFrame>"#
            ),
            Self::ActionLink { text, action } => text_shape(
                id,
                "Action",
                "",
                Some(Geometry::new(7_000_000, 6_000_000, 1_500_000, 400_000)),
                &format!(
                    r#"<a:p><a:r><a:rPr lang="en-US"><a:hlinkClick r:id="" action="{}"/></a:rPr><a:t>{}</a:t></a:r></a:p>"#,
                    escape(action),
                    escape(text)
                ),
            ),
            Self::Hyperlink { text, r_id, .. } => text_shape(
                id,
                "Link",
                "",
                Some(Geometry::new(457_200, 6_000_000, 4_000_000, 400_000)),
                &format!(
                    r#"<a:p><a:r><a:rPr lang="en-US"><a:hlinkClick r:id="{}"/></a:rPr><a:t>{}</a:t></a:r></a:p>"#,
                    r_id,
                    escape(text)
                ),
            ),
        }
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn formatted_paragraphs(text: &str) -> String {
    if text.is_empty() {
        return r#"<a:p><a:pPr algn="ctr"/><a:endParaRPr lang="en-US" sz="4400"/></a:p>"#.to_string();
    }
    text.lines()
        .map(|line| {
            format!(
                r#"<a:p><a:pPr algn="ctr"/><a:r><a:rPr lang="en-US" sz="4400" b="1"><a:solidFill><a:schemeClr val="tx2"/></a:solidFill><a:latin typeface="Georgia"/></a:rPr><a:t>{}</a:t></a:r></a:p>"#,
                escape(line)
            )
        })
        .collect()
}

fn plain_paragraphs(text: &str) -> String {
    let paragraphs: String = text
        .lines()
        .map(|line| format!(r#"<a:p><a:r><a:rPr lang="en-US"/><a:t>{}</a:t></a:r></a:p>"#, escape(line)))
        .collect();
    if paragraphs.is_empty() {
        r#"<a:p><a:endParaRPr lang="en-US" sz="2000"/></a:p>"#.to_string()
    } else {
        paragraphs
    }
}

fn xfrm(geometry: Geometry) -> String {
    format!(
        r#"<a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm>"#,
        geometry.left, geometry.top, geometry.width, geometry.height
    )
}

fn text_shape(id: usize, name: &str, ph: &str, geometry: Option<Geometry>, paragraphs: &str) -> String {
    let sp_pr = geometry.map(xfrm).unwrap_or_default();
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name} {id}"/><p:cNvSpPr/><p:nvPr>{ph}</p:nvPr></p:nvSpPr><p:spPr>{sp_pr}</p:spPr><p:txBody><a:bodyPr wrap="square" lIns="91440"/><a:lstStyle/>{paragraphs}</p:txBody></p:sp>"#
    )
}

fn picture_shape(id: usize, blip_attr: &str) -> String {
    let sp_pr = xfrm(Geometry::new(5_000_000, 2_000_000, 3_000_000, 2_000_000));
    format!(
        r#"<p:pic><p:nvPicPr><p:cNvPr id="{id}" name="Picture {id}"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr><p:blipFill><a:blip {blip_attr}/><a:stretch><a:fillRect/></a:stretch></p:blipFill><p:spPr>{sp_pr}</p:spPr></p:pic>"#
    )
}

/// XML of a slide holding the given shapes. Shape ids start at 2.
pub fn slide_xml(shapes: &[FixtureShape]) -> String {
    let body: String = shapes
        .iter()
        .enumerate()
        .map(|(i, s)| s.to_xml(i + 2))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sld {NS}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{body}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#
    )
}

/// One slide of a fixture deck.
#[derive(Debug, Clone, Default)]
pub struct FixtureSlide {
    pub shapes: Vec<FixtureShape>,
    /// Zero-based index into the deck's layouts.
    pub layout: usize,
    pub notes: Option<String>,
}

/// Builder for a complete presentation package.
#[derive(Debug, Clone, Default)]
pub struct FixtureDeck {
    slides: Vec<FixtureSlide>,
    notes_master: bool,
}

impl FixtureDeck {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slide(mut self, shapes: Vec<FixtureShape>) -> Self {
        self.slides.push(FixtureSlide {
            shapes,
            ..FixtureSlide::default()
        });
        self
    }

    pub fn slide_with_layout(mut self, layout: usize, shapes: Vec<FixtureShape>) -> Self {
        self.slides.push(FixtureSlide {
            shapes,
            layout: layout.min(LAYOUT_NAMES.len() - 1),
            notes: None,
        });
        self
    }

    /// Attach speaker notes to the last slide.
    pub fn notes(mut self, text: &str) -> Self {
        self.notes_master = true;
        if let Some(slide) = self.slides.last_mut() {
            slide.notes = Some(text.to_string());
        }
        self
    }

    /// Include a notes master even if no slide has notes.
    pub fn with_notes_master(mut self) -> Self {
        self.notes_master = true;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut files: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        let mut types = ContentTypes::new();
        types.add_default("png", content_type::PNG);
        types.add_default("xlsx", XLSX);

        let mut pkg_rels = Relationships::new();
        pkg_rels.add(rel_type::OFFICE_DOCUMENT, "ppt/presentation.xml", false);
        files.insert("_rels/.rels".into(), pkg_rels.to_xml().into_bytes());

        // Presentation
        let mut pres_rels = Relationships::new();
        let master_rid = pres_rels.add(rel_type::SLIDE_MASTER, "slideMasters/slideMaster1.xml", false);
        pres_rels.add(rel_type::THEME, "theme/theme1.xml", false);
        let notes_master_list = if self.notes_master {
            let rid = pres_rels.add(rel_type::NOTES_MASTER, "notesMasters/notesMaster1.xml", false);
            format!(r#"<p:notesMasterIdLst><p:notesMasterId r:id="{}"/></p:notesMasterIdLst>"#, rid)
        } else {
            String::new()
        };
        let mut sld_ids = String::new();
        for (i, _) in self.slides.iter().enumerate() {
            let rid = pres_rels.add(rel_type::SLIDE, &format!("slides/slide{}.xml", i + 1), false);
            sld_ids.push_str(&format!(r#"<p:sldId id="{}" r:id="{}"/>"#, 256 + i, rid));
        }
        let sld_id_lst = if self.slides.is_empty() {
            String::new()
        } else {
            format!("<p:sldIdLst>{}</p:sldIdLst>", sld_ids)
        };
        files.insert(
            "ppt/presentation.xml".into(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:presentation {NS}><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="{master_rid}"/></p:sldMasterIdLst>{notes_master_list}{sld_id_lst}<p:sldSz cx="9144000" cy="6858000" type="screen4x3"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#
            )
            .into_bytes(),
        );
        files.insert("ppt/_rels/presentation.xml.rels".into(), pres_rels.to_xml().into_bytes());
        over(&mut types, "/ppt/presentation.xml", content_type::PML_PRESENTATION_MAIN);

        // Theme
        files.insert(
            "ppt/theme/theme1.xml".into(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><a:theme xmlns:a="{}" name="Office Theme"><a:themeElements/></a:theme>"#,
                namespace::DML_MAIN
            )
            .into_bytes(),
        );
        over(&mut types, "/ppt/theme/theme1.xml", content_type::OFC_THEME);

        // Master and layouts
        let mut master_rels = Relationships::new();
        let mut layout_ids = String::new();
        for (i, name) in LAYOUT_NAMES.iter().enumerate() {
            let rid = master_rels.add(
                rel_type::SLIDE_LAYOUT,
                &format!("../slideLayouts/slideLayout{}.xml", i + 1),
                false,
            );
            layout_ids.push_str(&format!(
                r#"<p:sldLayoutId id="{}" r:id="{}"/>"#,
                2_147_483_649u64 + i as u64,
                rid
            ));

            let mut layout_rels = Relationships::new();
            layout_rels.add(rel_type::SLIDE_MASTER, "../slideMasters/slideMaster1.xml", false);
            let shapes = slide_xml(&[FixtureShape::title(""), FixtureShape::body("")]);
            let tree = shapes
                .split_once("<p:cSld>")
                .and_then(|(_, rest)| rest.split_once("</p:cSld>"))
                .map(|(tree, _)| tree.to_string())
                .unwrap_or_default();
            files.insert(
                format!("ppt/slideLayouts/slideLayout{}.xml", i + 1),
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sldLayout {NS}><p:cSld name="{name}">{tree}</p:cSld></p:sldLayout>"#
                )
                .into_bytes(),
            );
            files.insert(
                format!("ppt/slideLayouts/_rels/slideLayout{}.xml.rels", i + 1),
                layout_rels.to_xml().into_bytes(),
            );
            over(
                &mut types,
                &format!("/ppt/slideLayouts/slideLayout{}.xml", i + 1),
                content_type::PML_SLIDE_LAYOUT,
            );
        }
        master_rels.add(rel_type::THEME, "../theme/theme1.xml", false);
        files.insert(
            "ppt/slideMasters/slideMaster1.xml".into(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sldMaster {NS}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/></p:spTree></p:cSld><p:sldLayoutIdLst>{layout_ids}</p:sldLayoutIdLst></p:sldMaster>"#
            )
            .into_bytes(),
        );
        files.insert(
            "ppt/slideMasters/_rels/slideMaster1.xml.rels".into(),
            master_rels.to_xml().into_bytes(),
        );
        over(&mut types, "/ppt/slideMasters/slideMaster1.xml", content_type::PML_SLIDE_MASTER);

        if self.notes_master {
            let mut rels = Relationships::new();
            rels.add(rel_type::THEME, "../theme/theme1.xml", false);
            files.insert(
                "ppt/notesMasters/notesMaster1.xml".into(),
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:notesMaster {NS}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/></p:spTree></p:cSld></p:notesMaster>"#
                )
                .into_bytes(),
            );
            files.insert(
                "ppt/notesMasters/_rels/notesMaster1.xml.rels".into(),
                rels.to_xml().into_bytes(),
            );
            over(&mut types, "/ppt/notesMasters/notesMaster1.xml", NOTES_MASTER);
        }

        // Slides
        let mut chart_count = 0;
        for (i, slide) in self.slides.iter().enumerate() {
            let n = i + 1;
            let mut rels = Relationships::new();
            rels.add(
                rel_type::SLIDE_LAYOUT,
                &format!("../slideLayouts/slideLayout{}.xml", slide.layout + 1),
                false,
            );

            for shape in &slide.shapes {
                match shape {
                    FixtureShape::Picture { r_id, media } => {
                        rels.insert(rel(r_id, rel_type::IMAGE, &format!("../media/{}", media), false));
                        files.insert(format!("ppt/media/{}", media), PNG_BYTES.to_vec());
                    }
                    FixtureShape::LinkedPicture { r_id, url } => {
                        rels.insert(rel(r_id, rel_type::IMAGE, url, true));
                    }
                    FixtureShape::Hyperlink { r_id, url, .. } => {
                        rels.insert(rel(r_id, rel_type::HYPERLINK, url, true));
                    }
                    FixtureShape::Chart { r_id } => {
                        chart_count += 1;
                        rels.insert(rel(
                            r_id,
                            rel_type::CHART,
                            &format!("../charts/chart{}.xml", chart_count),
                            false,
                        ));
                        let workbook = format!("Microsoft_Excel_Worksheet{}.xlsx", chart_count);
                        let mut chart_rels = Relationships::new();
                        let wb_rid = chart_rels.add(PACKAGE_REL, &format!("../embeddings/{}", workbook), false);
                        files.insert(
                            format!("ppt/charts/chart{}.xml", chart_count),
                            format!(
                                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><c:chartSpace xmlns:c="http://schemas.openxmlformats.org/drawingml/2006/chart" xmlns:r="{}"><c:chart/><c:externalData r:id="{}"/></c:chartSpace>"#,
                                namespace::OFC_RELATIONSHIPS,
                                wb_rid
                            )
                            .into_bytes(),
                        );
                        files.insert(
                            format!("ppt/charts/_rels/chart{}.xml.rels", chart_count),
                            chart_rels.to_xml().into_bytes(),
                        );
                        files.insert(format!("ppt/embeddings/{}", workbook), b"PK-workbook".to_vec());
                        over(&mut types, &format!("/ppt/charts/chart{}.xml", chart_count), CHART);
                    }
                    _ => {}
                }
            }

            if let Some(notes) = &slide.notes {
                rels.add(rel_type::NOTES_SLIDE, &format!("../notesSlides/notesSlide{}.xml", n), false);
                let mut notes_rels = Relationships::new();
                notes_rels.add(rel_type::NOTES_MASTER, "../notesMasters/notesMaster1.xml", false);
                notes_rels.add(rel_type::SLIDE, &format!("../slides/slide{}.xml", n), false);
                let body = text_shape(3, "Notes Placeholder", r#"<p:ph type="body" idx="1"/>"#, None, &plain_paragraphs(notes));
                files.insert(
                    format!("ppt/notesSlides/notesSlide{}.xml", n),
                    format!(
                        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:notes {NS}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{body}</p:spTree></p:cSld></p:notes>"#
                    )
                    .into_bytes(),
                );
                files.insert(
                    format!("ppt/notesSlides/_rels/notesSlide{}.xml.rels", n),
                    notes_rels.to_xml().into_bytes(),
                );
                over(
                    &mut types,
                    &format!("/ppt/notesSlides/notesSlide{}.xml", n),
                    content_type::PML_NOTES_SLIDE,
                );
            }

            files.insert(format!("ppt/slides/slide{}.xml", n), slide_xml(&slide.shapes).into_bytes());
            files.insert(format!("ppt/slides/_rels/slide{}.xml.rels", n), rels.to_xml().into_bytes());
            over(&mut types, &format!("/ppt/slides/slide{}.xml", n), content_type::PML_SLIDE);
        }

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();
        let entries = std::iter::once(("[Content_Types].xml".to_string(), types.to_xml().into_bytes()))
            .chain(files);
        for (name, data) in entries {
            zip.start_file(name, options).expect("start fixture entry");
            zip.write_all(&data).expect("write fixture entry");
        }
        zip.finish().expect("finish fixture zip").into_inner()
    }
}

const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const CHART: &str = "application/vnd.openxmlformats-officedocument.drawingml.chart+xml";
const NOTES_MASTER: &str = "application/vnd.openxmlformats-officedocument.presentationml.notesMaster+xml";
const PACKAGE_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/package";

fn over(types: &mut ContentTypes, name: &str, ct: &str) {
    if let Ok(uri) = PackUri::new(name) {
        types.add_override(&uri, ct);
    }
}

fn rel(r_id: &str, reltype: &str, target: &str, is_external: bool) -> crate::rels::Relationship {
    crate::rels::Relationship {
        r_id: r_id.to_string(),
        reltype: reltype.to_string(),
        target_ref: target.to_string(),
        is_external,
    }
}

/// A deck with one slide per entry, all on the first layout.
pub fn deck(slides: &[Vec<FixtureShape>]) -> Vec<u8> {
    slides
        .iter()
        .fold(FixtureDeck::new(), |deck, shapes| deck.slide(shapes.clone()))
        .build()
}

/// Like [`deck`], with speaker notes on the leading slides.
pub fn deck_with_notes(slides: &[Vec<FixtureShape>], notes: &[&str]) -> Vec<u8> {
    let mut deck = FixtureDeck::new().with_notes_master();
    for (i, shapes) in slides.iter().enumerate() {
        deck = deck.slide(shapes.clone());
        if let Some(text) = notes.get(i) {
            deck = deck.notes(text);
        }
    }
    deck.build()
}
