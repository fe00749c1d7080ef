//! PPTX (Office Open XML) package handling for deck assembly.
//!
//! A `.pptx` file is a ZIP archive of parts connected by relationships.
//! This crate loads it into an editable [`Package`], parses slides into the
//! shared shape model, copies slides between packages with their
//! dependencies, and writes new text into existing shapes.

pub mod clone;
pub mod constants;
pub mod content_types;
pub mod package;
pub mod packuri;
pub mod parser;
pub mod populate;
pub mod rels;
pub mod slide;
pub mod xml;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixture;

pub use clone::{clone_slide, CloneOptions, ClonedSlide, ResourceFetcher, ShapeOutcome, ShapeReport};
pub use package::{Package, Part};
pub use packuri::PackUri;
pub use parser::PptxParser;
pub use populate::{populate, PopulateReport};
pub use slide::SlideDocument;
