//! Source decks: the templates and the content a plan draws from.

use crate::conversion::{ConversionService, ConvertedPage};
use crate::error::{AssemblyError, Result};
use crate::provider::CandidateInput;
use deck_core::{Error, SlideContent, SlideSize, SourceFormat, TextNormalizer};
use deck_pptx::{Package, PackUri, PptxParser};

/// One slide, or one converted page, of a source deck.
#[derive(Debug, Clone)]
pub struct SlideUnit {
    pub index: usize,
    /// Normalized text, cut to the candidate limit.
    pub text: String,
    pub content: SlideContent,
    pub image: Option<Vec<u8>>,
    /// Slide part, for units of a native deck.
    pub slide_uri: Option<PackUri>,
}

/// A loaded input deck.
///
/// Native decks keep their package so slides can be cloned out of them.
/// Converted decks only have units.
#[derive(Debug, Clone)]
pub struct SourceDeck {
    name: String,
    format: SourceFormat,
    package: Option<Package>,
    units: Vec<SlideUnit>,
}

impl SourceDeck {
    /// Wrap a loaded package.
    pub fn from_package(name: impl Into<String>, package: Package) -> Result<Self> {
        let name = name.into();
        let parser = PptxParser::new();
        let normalizer = TextNormalizer::new();

        let mut units = Vec::new();
        for (index, uri) in package.slide_uris()?.into_iter().enumerate() {
            let content = parser.parse_slide(&package, &uri)?;
            units.push(SlideUnit {
                index,
                text: normalizer.candidate_text(&content.plain_text()),
                content,
                image: None,
                slide_uri: Some(uri),
            });
        }
        log::debug!("Loaded {} with {} slides", name, units.len());

        Ok(Self {
            name,
            format: SourceFormat::Pptx,
            package: Some(package),
            units,
        })
    }

    /// Build a deck from conversion service output.
    pub fn from_pages(name: impl Into<String>, format: SourceFormat, mut pages: Vec<ConvertedPage>) -> Self {
        let normalizer = TextNormalizer::new();
        pages.sort_by_key(|p| p.page_index);

        let units = pages
            .into_iter()
            .enumerate()
            .map(|(index, page)| {
                let text = normalizer.candidate_text(&page.extracted_text);
                SlideUnit {
                    index,
                    content: SlideContent::from_page_text(&text, SlideSize::default()),
                    text,
                    image: page.rendered_image,
                    slide_uri: None,
                }
            })
            .collect();

        Self {
            name: name.into(),
            format,
            package: None,
            units,
        }
    }

    /// Load a native deck from bytes. Formats that need conversion are
    /// rejected.
    pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> Result<Self> {
        let name = name.into();
        match SourceFormat::from_magic(bytes) {
            Some(SourceFormat::Pptx) => Self::from_package(name, Package::from_bytes(bytes)?),
            Some(format) => Err(Error::UnsupportedFormat(format!(
                "{} is {:?} and needs a conversion service",
                name, format
            ))
            .into()),
            None => Err(Error::UnsupportedFormat(name).into()),
        }
    }

    /// Load any input, converting it when it is not a native package.
    ///
    /// The format is sniffed from the leading bytes, then taken from
    /// `media_type`. Non-native input needs `converter`.
    pub async fn load(
        name: impl Into<String>,
        bytes: &[u8],
        media_type: Option<&str>,
        converter: Option<&dyn ConversionService>,
    ) -> Result<Self> {
        let name = name.into();
        let format = SourceFormat::from_magic(bytes).or_else(|| media_type.and_then(SourceFormat::from_media_type));
        if format == Some(SourceFormat::Pptx) {
            return Self::from_bytes(name, bytes);
        }

        let declared = media_type.or(format.map(|f| f.media_type()));
        let (Some(converter), Some(declared)) = (converter, declared) else {
            return Err(Error::UnsupportedFormat(format!("{} cannot be loaded without conversion", name)).into());
        };

        log::info!("Converting {} as {}", name, declared);
        let pages = converter
            .convert(bytes, declared)
            .await
            .map_err(|e| AssemblyError::Conversion(format!("{}: {}", name, e)))?;
        Ok(Self::from_pages(name, format.unwrap_or(SourceFormat::Pdf), pages))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> SourceFormat {
        self.format
    }

    pub fn is_native(&self) -> bool {
        self.package.is_some()
    }

    pub fn package(&self) -> Option<&Package> {
        self.package.as_ref()
    }

    pub fn units(&self) -> &[SlideUnit] {
        &self.units
    }

    pub fn unit(&self, index: usize) -> Option<&SlideUnit> {
        self.units.get(index)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Units as match provider candidates.
    pub fn candidates(&self) -> Vec<CandidateInput> {
        self.units
            .iter()
            .map(|u| CandidateInput {
                index: u.index,
                extracted_text: u.text.clone(),
                rendered_image: u.image.clone(),
            })
            .collect()
    }
}
