//! Core slide model, shape role classification, and text normalization
//! for deck assembly.

pub mod classify;
pub mod error;
pub mod normalize;
pub mod types;

pub use classify::{classify_roles, ClassifierConfig, Role, RoleAssignment};
pub use error::{Error, Result};
pub use normalize::TextNormalizer;
pub use types::{
    Background, ColorRef, Emu, Geometry, Insets, Paragraph, PlaceholderRole, RoleText, Run, RunFormat,
    Shape, ShapeKind, SlideContent, SlideSize, SourceFormat, TextBody,
};
