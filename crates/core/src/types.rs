//! Domain types for representing slide content.
//!
//! These are read-only views of a slide. Slides are parsed into this model
//! for classification and inspection. The underlying package content stays
//! authoritative for writing.

use serde::{Deserialize, Serialize};

/// English Metric Units, the coordinate system of slide geometry.
pub type Emu = i64;

/// Default slide size (10in x 7.5in) used when a package omits `p:sldSz`.
pub const DEFAULT_SLIDE_WIDTH: Emu = 9_144_000;
pub const DEFAULT_SLIDE_HEIGHT: Emu = 6_858_000;

/// The format of an input deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceFormat {
    /// PPTX (Office Open XML), loaded natively.
    Pptx,
    /// PDF, only usable through the conversion service.
    Pdf,
}

impl SourceFormat {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pptx" => Some(Self::Pptx),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Detect format from file magic bytes.
    pub fn from_magic(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 4 {
            return None;
        }

        // PPTX is a ZIP file (PK\x03\x04)
        if bytes.starts_with(&[0x50, 0x4B, 0x03, 0x04]) {
            return Some(Self::Pptx);
        }

        if bytes.starts_with(b"%PDF") {
            return Some(Self::Pdf);
        }

        None
    }

    /// Detect format from a declared media type.
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        match media_type.trim() {
            Self::PPTX_MEDIA_TYPE => Some(Self::Pptx),
            "application/pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    const PPTX_MEDIA_TYPE: &'static str =
        "application/vnd.openxmlformats-officedocument.presentationml.presentation";

    /// The media type declared to the conversion service.
    pub fn media_type(&self) -> &'static str {
        match self {
            Self::Pptx => Self::PPTX_MEDIA_TYPE,
            Self::Pdf => "application/pdf",
        }
    }

    /// Whether this format can be loaded as a package without conversion.
    pub fn is_native(&self) -> bool {
        matches!(self, Self::Pptx)
    }
}

/// Position and extent of a shape, in EMU.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub left: Emu,
    pub top: Emu,
    pub width: Emu,
    pub height: Emu,
}

impl Geometry {
    pub fn new(left: Emu, top: Emu, width: Emu, height: Emu) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn area(&self) -> i128 {
        i128::from(self.width.max(0)) * i128::from(self.height.max(0))
    }
}

/// Slide dimensions, in EMU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideSize {
    pub width: Emu,
    pub height: Emu,
}

impl Default for SlideSize {
    fn default() -> Self {
        Self {
            width: DEFAULT_SLIDE_WIDTH,
            height: DEFAULT_SLIDE_HEIGHT,
        }
    }
}

impl SlideSize {
    pub fn area(&self) -> i128 {
        i128::from(self.width.max(0)) * i128::from(self.height.max(0))
    }
}

/// What kind of drawing object a shape is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeKind {
    /// A text box or text-bearing placeholder.
    Text,
    Picture,
    /// A preset or custom geometry shape without a text body.
    AutoShape,
    Group,
    Table,
    Chart,
    /// Connectors, SmartArt, OLE frames and anything unrecognised.
    Other,
}

/// Semantic placeholder role a layout assigns to a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaceholderRole {
    Title,
    CenterTitle,
    Body,
    Object,
    Other,
    None,
}

impl PlaceholderRole {
    /// Map a `p:ph` element to a role.
    ///
    /// `is_placeholder` is whether a `p:ph` element is present at all, and
    /// `ph_type` is its `type` attribute. A placeholder without a type is an
    /// object placeholder.
    pub fn from_placeholder(is_placeholder: bool, ph_type: Option<&str>) -> Self {
        if !is_placeholder {
            return Self::None;
        }
        match ph_type {
            None | Some("obj") => Self::Object,
            Some("title") => Self::Title,
            Some("ctrTitle") => Self::CenterTitle,
            Some("body") | Some("subTitle") => Self::Body,
            Some(_) => Self::Other,
        }
    }

    pub fn is_title(&self) -> bool {
        matches!(self, Self::Title | Self::CenterTitle)
    }

    pub fn is_body(&self) -> bool {
        matches!(self, Self::Body | Self::Object)
    }
}

/// A colour reference on a run or fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorRef {
    /// Literal hex RGB, e.g. `1F497D`.
    Rgb(String),
    /// Theme-relative colour slot, e.g. `accent1` or `tx1`.
    Scheme(String),
}

/// Character formatting carried by a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFormat {
    /// Latin typeface name.
    pub font: Option<String>,
    /// Size in hundredths of a point.
    pub size: Option<u32>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub color: Option<ColorRef>,
}

/// A run of text with uniform formatting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub text: String,
    pub format: RunFormat,
}

/// A paragraph of runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    pub runs: Vec<Run>,
    /// Alignment token (`l`, `ctr`, `r`, `just`, ...).
    pub alignment: Option<String>,
    /// Outline indent level.
    pub level: u32,
}

impl Paragraph {
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// Text frame insets, in EMU.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insets {
    pub left: Option<Emu>,
    pub top: Option<Emu>,
    pub right: Option<Emu>,
    pub bottom: Option<Emu>,
}

/// The text frame of a shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBody {
    pub paragraphs: Vec<Paragraph>,
    pub word_wrap: Option<bool>,
    pub margins: Insets,
}

impl TextBody {
    /// All paragraph text joined with newlines.
    pub fn plain_text(&self) -> String {
        self.paragraphs
            .iter()
            .map(Paragraph::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn is_blank(&self) -> bool {
        self.paragraphs
            .iter()
            .all(|p| p.runs.iter().all(|r| r.text.trim().is_empty()))
    }
}

/// A drawing object on a slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    /// `id` from the shape's non-visual properties.
    pub id: u32,
    pub name: String,
    pub kind: ShapeKind,
    /// None when the shape inherits its position from a layout.
    pub geometry: Option<Geometry>,
    pub text: Option<TextBody>,
    /// Relationship id of an embedded or linked picture.
    pub picture_rel: Option<String>,
    pub placeholder: PlaceholderRole,
}

impl Shape {
    pub fn new(id: u32, name: impl Into<String>, kind: ShapeKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            geometry: None,
            text: None,
            picture_rel: None,
            placeholder: PlaceholderRole::None,
        }
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        let paragraphs = text
            .into()
            .lines()
            .map(|line| Paragraph {
                runs: vec![Run {
                    text: line.to_string(),
                    format: RunFormat::default(),
                }],
                ..Paragraph::default()
            })
            .collect();
        self.text = Some(TextBody {
            paragraphs,
            ..TextBody::default()
        });
        self
    }

    pub fn with_placeholder(mut self, role: PlaceholderRole) -> Self {
        self.placeholder = role;
        self
    }

    pub fn is_text_bearing(&self) -> bool {
        self.text.is_some()
    }

    /// Plain text of the shape, empty if it has no text body.
    pub fn plain_text(&self) -> String {
        self.text.as_ref().map(TextBody::plain_text).unwrap_or_default()
    }
}

/// Slide background fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Background {
    Solid(ColorRef),
    Gradient(Vec<ColorRef>),
    Picture { rel_id: String },
    /// A background style reference into the theme (`p:bgRef`).
    ThemeRef(u32),
}

/// The parsed content of one slide.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideContent {
    pub size: SlideSize,
    /// Shapes in document (z) order.
    pub shapes: Vec<Shape>,
    pub background: Option<Background>,
    pub notes: Option<String>,
}

impl SlideContent {
    pub fn new(size: SlideSize) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    pub fn add_shape(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }

    /// Text of all text-bearing shapes, one shape per line, in z order.
    pub fn plain_text(&self) -> String {
        self.shapes
            .iter()
            .map(Shape::plain_text)
            .filter(|t| !t.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Build a slide from unstructured page text.
    ///
    /// The first non-empty line becomes a shape across the top of the slide
    /// and the remaining lines become a second shape below it.
    pub fn from_page_text(text: &str, size: SlideSize) -> Self {
        let mut slide = Self::new(size);
        let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

        let band = size.height / 5;
        if let Some(first) = lines.next() {
            slide.add_shape(
                Shape::new(2, "Page Heading", ShapeKind::Text)
                    .with_geometry(Geometry::new(0, 0, size.width, band))
                    .with_text(first),
            );
        }
        let rest: Vec<&str> = lines.collect();
        if !rest.is_empty() {
            slide.add_shape(
                Shape::new(3, "Page Text", ShapeKind::Text)
                    .with_geometry(Geometry::new(0, band, size.width, size.height - band))
                    .with_text(rest.join("\n")),
            );
        }
        slide
    }
}

/// Title and body text extracted from, or destined for, a slide.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleText {
    pub title: Option<String>,
    pub body: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_magic() {
        assert_eq!(
            SourceFormat::from_magic(&[0x50, 0x4B, 0x03, 0x04, 0, 0]),
            Some(SourceFormat::Pptx)
        );
        assert_eq!(SourceFormat::from_magic(b"%PDF-1.7"), Some(SourceFormat::Pdf));
        assert_eq!(SourceFormat::from_magic(b"abc"), None);
        assert_eq!(SourceFormat::from_magic(b"GIF89a"), None);
    }

    #[test]
    fn test_format_from_extension_and_media_type() {
        assert_eq!(SourceFormat::from_extension("PPTX"), Some(SourceFormat::Pptx));
        assert_eq!(SourceFormat::from_extension("ppt"), None);
        assert_eq!(
            SourceFormat::from_media_type(SourceFormat::Pdf.media_type()),
            Some(SourceFormat::Pdf)
        );
        assert!(SourceFormat::Pptx.is_native());
        assert!(!SourceFormat::Pdf.is_native());
    }

    #[test]
    fn test_placeholder_role_mapping() {
        assert_eq!(
            PlaceholderRole::from_placeholder(false, Some("title")),
            PlaceholderRole::None
        );
        assert_eq!(
            PlaceholderRole::from_placeholder(true, None),
            PlaceholderRole::Object
        );
        assert_eq!(
            PlaceholderRole::from_placeholder(true, Some("ctrTitle")),
            PlaceholderRole::CenterTitle
        );
        assert_eq!(
            PlaceholderRole::from_placeholder(true, Some("subTitle")),
            PlaceholderRole::Body
        );
        assert_eq!(
            PlaceholderRole::from_placeholder(true, Some("sldNum")),
            PlaceholderRole::Other
        );
        assert!(PlaceholderRole::CenterTitle.is_title());
        assert!(PlaceholderRole::Object.is_body());
    }

    #[test]
    fn test_from_page_text_splits_heading() {
        let slide = SlideContent::from_page_text(
            "\n  Quarterly Review \nRevenue up\nCosts down\n",
            SlideSize::default(),
        );
        assert_eq!(slide.shapes.len(), 2);
        assert_eq!(slide.shapes[0].plain_text(), "Quarterly Review");
        assert_eq!(slide.shapes[1].plain_text(), "Revenue up\nCosts down");
        let g0 = slide.shapes[0].geometry.unwrap();
        let g1 = slide.shapes[1].geometry.unwrap();
        assert!(g0.top < g1.top);
    }

    #[test]
    fn test_from_page_text_empty() {
        let slide = SlideContent::from_page_text("   \n", SlideSize::default());
        assert!(slide.shapes.is_empty());
    }

    #[test]
    fn test_text_body_blank() {
        let shape = Shape::new(1, "Box", ShapeKind::Text).with_text("  ");
        assert!(shape.text.as_ref().unwrap().is_blank());
        let shape = Shape::new(1, "Box", ShapeKind::Text).with_text("a\nb");
        assert_eq!(shape.plain_text(), "a\nb");
    }
}
