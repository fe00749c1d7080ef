//! HTTP clients for a remote match provider and conversion service.

use crate::conversion::{ConversionService, ConvertedPage};
use crate::error::{AssemblyError, Result};
use crate::provider::{MatchProvider, MatchRequest, MatchResponse};
use async_trait::async_trait;
use base64::Engine;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

/// Posts match requests as JSON to an endpoint.
#[derive(Debug, Clone)]
pub struct HttpMatchProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpMatchProvider {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl MatchProvider for HttpMatchProvider {
    async fn rank(&self, request: &MatchRequest) -> Result<MatchResponse> {
        let error = |e: reqwest::Error| AssemblyError::MatchProvider(e.to_string());
        self.client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(error)?
            .json::<MatchResponse>()
            .await
            .map_err(error)
    }
}

/// Uploads documents to a conversion service's `/convert_document`.
#[derive(Debug, Clone)]
pub struct HttpConversionService {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ConvertResponse {
    slides: Vec<ConvertedSlide>,
}

#[derive(Debug, Deserialize)]
struct ConvertedSlide {
    slide_index: usize,
    #[serde(default)]
    text: String,
    #[serde(default)]
    image_data: Option<String>,
}

impl HttpConversionService {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ConversionService for HttpConversionService {
    async fn convert(&self, bytes: &[u8], media_type: &str) -> Result<Vec<ConvertedPage>> {
        let error = |e: reqwest::Error| AssemblyError::Conversion(e.to_string());
        let part = Part::bytes(bytes.to_vec())
            .file_name("document")
            .mime_str(media_type)
            .map_err(error)?;
        let form = Form::new().part("file", part);

        let response: ConvertResponse = self
            .client
            .post(format!("{}/convert_document", self.base_url))
            .multipart(form)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(error)?
            .json()
            .await
            .map_err(error)?;

        response.slides.into_iter().map(decode_slide).collect()
    }
}

fn decode_slide(slide: ConvertedSlide) -> Result<ConvertedPage> {
    let rendered_image = match slide.image_data.filter(|d| !d.is_empty()) {
        Some(data) => Some(
            base64::engine::general_purpose::STANDARD
                .decode(data)
                .map_err(|e| AssemblyError::Conversion(format!("slide {} image: {}", slide.slide_index, e)))?,
        ),
        None => None,
    };
    Ok(ConvertedPage {
        page_index: slide.slide_index,
        extracted_text: slide.text,
        rendered_image,
    })
}
