//! Shape role classification.
//!
//! Picks at most one shape as the slide title and one as the body. Each
//! role is resolved by the first rule that matches:
//!
//! 1. Placeholder metadata (`title`/`ctrTitle` for the title,
//!    `body`/`obj` for the body).
//! 2. A text shape whose top edge lies in the top band of the slide is the
//!    title.
//! 3. A text shape holding a placeholder marker, or an empty text box
//!    covering enough of the slide, is the body.
//! 4. Of the text shapes still unclassified, the top-most is the title and
//!    the next is the body.
//!
//! Only text-bearing shapes are ever classified.

use crate::normalize::TextNormalizer;
use crate::types::{RoleText, Shape, SlideContent};
use serde::{Deserialize, Serialize};

/// Tunables for the heuristic rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Fraction of the slide height, from the top, treated as the title band.
    pub title_band: f64,
    /// Minimum fraction of the slide area for an empty text box to count
    /// as a body.
    pub body_min_area: f64,
    /// Placeholder marker strings that identify a body shape.
    pub markers: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            title_band: 0.25,
            body_min_area: 0.15,
            markers: vec![
                "Click to add text".to_string(),
                "Click to edit Master text styles".to_string(),
                "Click to add subtitle".to_string(),
                "Lorem ipsum".to_string(),
            ],
        }
    }
}

impl ClassifierConfig {
    pub fn with_title_band(mut self, band: f64) -> Self {
        self.title_band = band.clamp(0.0, 1.0);
        self
    }

    pub fn with_body_min_area(mut self, ratio: f64) -> Self {
        self.body_min_area = ratio.clamp(0.0, 1.0);
        self
    }

    pub fn with_markers(mut self, markers: Vec<String>) -> Self {
        self.markers = markers;
        self
    }
}

/// Role of a single shape after classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Title,
    Body,
    Unclassified,
}

/// Result of classifying a slide. Values are indices into
/// [`SlideContent::shapes`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub title: Option<usize>,
    pub body: Option<usize>,
}

impl RoleAssignment {
    /// Role of the shape at `index`.
    pub fn role_of(&self, index: usize) -> Role {
        if self.title == Some(index) {
            Role::Title
        } else if self.body == Some(index) {
            Role::Body
        } else {
            Role::Unclassified
        }
    }

    /// Plain text of the classified shapes. Blank text counts as absent.
    pub fn extract_text(&self, slide: &SlideContent) -> RoleText {
        let text_of = |idx: Option<usize>| {
            idx.and_then(|i| slide.shapes.get(i))
                .map(Shape::plain_text)
                .filter(|t| !t.trim().is_empty())
        };
        RoleText {
            title: text_of(self.title),
            body: text_of(self.body),
        }
    }
}

/// Assign title and body roles for a slide.
///
/// Pure and deterministic for a given slide and config, and never assigns
/// one shape to both roles.
pub fn classify_roles(slide: &SlideContent, config: &ClassifierConfig) -> RoleAssignment {
    let shapes = &slide.shapes;
    let text_shapes: Vec<usize> = (0..shapes.len())
        .filter(|&i| shapes[i].is_text_bearing())
        .collect();

    let mut roles = RoleAssignment::default();

    // Rule 1: placeholder metadata
    roles.title = text_shapes
        .iter()
        .copied()
        .find(|&i| shapes[i].placeholder.is_title());
    roles.body = text_shapes
        .iter()
        .copied()
        .find(|&i| shapes[i].placeholder.is_body() && Some(i) != roles.title);

    // Rule 2: top band
    if roles.title.is_none() {
        let band = slide.size.height as f64 * config.title_band;
        roles.title = text_shapes
            .iter()
            .copied()
            .filter(|&i| Some(i) != roles.body)
            .filter(|&i| matches!(shapes[i].geometry, Some(g) if (g.top as f64) < band))
            .min_by_key(|&i| (top_of(&shapes[i]), i));
    }

    // Rule 3: markers and large empty boxes
    if roles.body.is_none() {
        let normalizer = TextNormalizer::new();
        let min_area = slide.size.area() as f64 * config.body_min_area;
        roles.body = text_shapes
            .iter()
            .copied()
            .filter(|&i| Some(i) != roles.title)
            .find(|&i| {
                let shape = &shapes[i];
                let text = shape.plain_text();
                if normalizer.contains_marker(&text, &config.markers) {
                    return true;
                }
                text.trim().is_empty()
                    && matches!(shape.geometry, Some(g) if g.area() as f64 >= min_area)
            });
    }

    // Rule 4: reading order among what is left
    if roles.title.is_none() || roles.body.is_none() {
        let mut remaining: Vec<usize> = text_shapes
            .iter()
            .copied()
            .filter(|&i| Some(i) != roles.title && Some(i) != roles.body)
            .collect();
        remaining.sort_by_key(|&i| (top_of(&shapes[i]), left_of(&shapes[i]), i));

        let mut remaining = remaining.into_iter();
        if roles.title.is_none() {
            roles.title = remaining.next();
        }
        if roles.body.is_none() {
            roles.body = remaining.next();
        }
    }

    log::debug!(
        "Classified {} shapes: title={:?} body={:?}",
        shapes.len(),
        roles.title,
        roles.body
    );
    roles
}

/// Shapes without geometry sort after positioned ones.
fn top_of(shape: &Shape) -> i64 {
    shape.geometry.map(|g| g.top).unwrap_or(i64::MAX)
}

fn left_of(shape: &Shape) -> i64 {
    shape.geometry.map(|g| g.left).unwrap_or(i64::MAX)
}
