//! Writing title and body text into a slide's shapes.

use crate::parser::shape_element_mut;
use crate::slide::SlideDocument;
use crate::xml::XmlElement;
use deck_core::{classify_roles, ClassifierConfig, RoleText};
use serde::Serialize;

/// Result of [`populate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PopulateReport {
    /// Shape index that received the title text.
    pub title: Option<usize>,
    /// Shape index that received the body text.
    pub body: Option<usize>,
    pub warnings: Vec<String>,
}

impl PopulateReport {
    fn warn(&mut self, msg: String) {
        log::warn!("{}", msg);
        self.warnings.push(msg);
    }
}

/// Formatting captured from a shape before it was edited.
#[derive(Debug, Default)]
struct CapturedFormat {
    p_pr: Option<XmlElement>,
    r_pr: Option<XmlElement>,
}

/// Replace the title and body text of a slide, keeping each shape's
/// formatting.
///
/// Roles are resolved on the slide as it was opened, and formatting is
/// always taken from that state, so repeated calls do not drift. A role
/// with no text leaves its shape untouched; text for a role with no shape
/// is dropped with a warning.
pub fn populate(doc: &mut SlideDocument, text: &RoleText, config: &ClassifierConfig) -> PopulateReport {
    let roles = classify_roles(doc.pristine(), config);
    let mut report = PopulateReport::default();

    let targets = [
        ("title", roles.title, text.title.as_deref()),
        ("body", roles.body, text.body.as_deref()),
    ];
    for (role, index, content) in targets {
        let Some(content) = content.filter(|c| !c.trim().is_empty()) else {
            continue;
        };
        let Some(index) = index else {
            report.warn(format!("{}: no {} shape, {} text dropped", doc.uri(), role, role));
            continue;
        };

        let captured = capture_format(doc, index);
        if write_text(doc, index, content, &captured) {
            log::debug!("{}: wrote {} into shape {}", doc.uri(), role, index);
            match role {
                "title" => report.title = Some(index),
                _ => report.body = Some(index),
            }
        } else {
            report.warn(format!("{}: {} shape {} has no text body", doc.uri(), role, index));
        }
    }
    report
}

/// First paragraph properties and first run properties of the pristine
/// shape. Falls back to the end-of-paragraph properties of an empty shape.
fn capture_format(doc: &SlideDocument, index: usize) -> CapturedFormat {
    let Some(tx_body) = doc
        .pristine_tree()
        .find(&["cSld", "spTree"])
        .and_then(|tree| crate::parser::shape_elements(tree).nth(index))
        .and_then(|shape| shape.child("txBody"))
    else {
        return CapturedFormat::default();
    };

    let paragraphs: Vec<&XmlElement> = tx_body
        .elements()
        .filter(|e| e.local_name() == "p")
        .collect();
    let p_pr = paragraphs.first().and_then(|p| p.child("pPr")).cloned();

    let r_pr = paragraphs
        .iter()
        .flat_map(|p| p.elements())
        .filter(|e| e.local_name() == "r")
        .find_map(|r| r.child("rPr"))
        .cloned()
        .or_else(|| {
            let end = paragraphs.first()?.child("endParaRPr")?;
            let mut r_pr = end.clone();
            r_pr.name = with_prefix_of(&end.name, "rPr");
            Some(r_pr)
        });

    CapturedFormat { p_pr, r_pr }
}

/// Replace the shape's paragraphs with one paragraph holding `content`.
/// Returns false if the shape has no text body.
fn write_text(doc: &mut SlideDocument, index: usize, content: &str, format: &CapturedFormat) -> bool {
    let Some(tx_body) = doc
        .tree_mut()
        .find_mut(&["cSld", "spTree"])
        .and_then(|tree| shape_element_mut(tree, index))
        .and_then(|shape| shape.child_mut("txBody"))
    else {
        return false;
    };

    let prefix = tx_body
        .elements()
        .find_map(|e| e.name.split_once(':').map(|(p, _)| p.to_string()))
        .unwrap_or_else(|| "a".to_string());
    let name = |local: &str| format!("{}:{}", prefix, local);

    let mut paragraph = XmlElement::new(name("p"));
    if let Some(p_pr) = &format.p_pr {
        paragraph.push(p_pr.clone());
    }
    for (i, line) in content.lines().enumerate() {
        if i > 0 {
            let mut br = XmlElement::new(name("br"));
            if let Some(r_pr) = &format.r_pr {
                br.push(r_pr.clone());
            }
            paragraph.push(br);
        }
        let mut run = XmlElement::new(name("r"));
        if let Some(r_pr) = &format.r_pr {
            run.push(r_pr.clone());
        }
        run.push(XmlElement::new(name("t")).with_text(line));
        paragraph.push(run);
    }

    tx_body.remove_children("p");
    tx_body.push(paragraph);
    true
}

fn with_prefix_of(name: &str, local: &str) -> String {
    match name.split_once(':') {
        Some((prefix, _)) => format!("{}:{}", prefix, local),
        None => local.to_string(),
    }
}
