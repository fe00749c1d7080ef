//! The conversion service boundary.
//!
//! Non-native inputs (PDF and the like) are turned into an ordered list of
//! pages with their text and a rendered image. Past this point every
//! input is treated as a deck of slide-like units.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One page produced by the conversion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertedPage {
    pub page_index: usize,
    pub extracted_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "crate::base64_bytes")]
    pub rendered_image: Option<Vec<u8>>,
}

/// Turns a document into pages.
#[async_trait]
pub trait ConversionService: Send + Sync {
    /// Convert `bytes`, declared as `media_type`, into pages in order.
    async fn convert(&self, bytes: &[u8], media_type: &str) -> Result<Vec<ConvertedPage>>;
}
