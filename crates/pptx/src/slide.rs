//! An editable slide part.

use crate::package::Package;
use crate::parser::slide_content;
use crate::packuri::PackUri;
use crate::xml::XmlElement;
use deck_core::{Result, SlideContent};

/// A slide's element tree opened for editing.
///
/// The state at open time is kept alongside the live tree, so edits can
/// always be derived from the slide as it was rather than from earlier
/// edits.
#[derive(Debug, Clone)]
pub struct SlideDocument {
    uri: PackUri,
    tree: XmlElement,
    pristine_tree: XmlElement,
    pristine: SlideContent,
}

impl SlideDocument {
    pub fn open(package: &Package, uri: &PackUri) -> Result<Self> {
        let tree = package.require(uri)?.xml()?;
        let pristine = slide_content(&tree, package.slide_size());
        Ok(Self {
            uri: uri.clone(),
            pristine_tree: tree.clone(),
            tree,
            pristine,
        })
    }

    pub fn uri(&self) -> &PackUri {
        &self.uri
    }

    /// Shape model as it was when the document was opened.
    pub fn pristine(&self) -> &SlideContent {
        &self.pristine
    }

    pub(crate) fn pristine_tree(&self) -> &XmlElement {
        &self.pristine_tree
    }

    pub fn tree(&self) -> &XmlElement {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut XmlElement {
        &mut self.tree
    }

    /// Shape model of the live tree.
    pub fn content(&self) -> SlideContent {
        slide_content(&self.tree, self.pristine.size)
    }

    /// Write the live tree back into its part.
    pub fn save(&self, package: &mut Package) -> Result<()> {
        package.require_mut(&self.uri)?.set_xml(&self.tree)
    }
}
