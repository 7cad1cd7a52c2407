//! Request and result types for outfit swaps.

use crate::error::{LuxeFitError, Result};
use crate::image::EncodedImage;
use base64::Engine;
use serde::Serialize;
use std::path::Path;

/// Instruction sent alongside the two images.
pub const OUTFIT_SWAP_PROMPT: &str = "\
You are an expert fashion AI.

Image 1: The Model (Reference for pose, body type, and appearance).
Image 2: The Garment (Reference for clothing style, fabric, and texture).

Task: Generate a photorealistic fashion editorial image of the person from Image 1 wearing the garment from Image 2.

Key Requirements:
- Retain the pose, lighting, and background of Image 1.
- Realistically drape the garment from Image 2 onto the model.
- Ensure high-quality, cinematic lighting and texture details.
- The result should look like a professional fashion photography shoot.
- Produce a single photorealistic image.";

/// File name used when saving a result without an explicit path.
pub const DEFAULT_RESULT_FILENAME: &str = "luxefit-generated.png";

/// A request to dress the model in the garment.
#[derive(Debug, Clone)]
pub struct SwapRequest {
    /// Photo of the person.
    pub model: EncodedImage,
    /// Photo of the clothing item.
    pub garment: EncodedImage,
    /// Instruction text, sent after both images.
    pub prompt: String,
}

impl SwapRequest {
    /// Creates a request with the standard instruction.
    ///
    /// Fails with [`LuxeFitError::MissingInput`] unless both images carry a
    /// payload and a media type.
    pub fn new(model: EncodedImage, garment: EncodedImage) -> Result<Self> {
        let request = Self {
            model,
            garment,
            prompt: OUTFIT_SWAP_PROMPT.to_string(),
        };
        request.validate()?;
        Ok(request)
    }

    /// Checks that both images are populated.
    pub fn validate(&self) -> Result<()> {
        match (self.model.is_ready(), self.garment.is_ready()) {
            (true, true) => Ok(()),
            (false, true) => Err(LuxeFitError::MissingInput("model image is empty".into())),
            (true, false) => Err(LuxeFitError::MissingInput(
                "garment image is empty".into(),
            )),
            (false, false) => Err(LuxeFitError::MissingInput(
                "model and garment images are empty".into(),
            )),
        }
    }
}

/// Metadata about the generation call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SwapMetadata {
    /// Model used for generation.
    pub model: Option<String>,
    /// Round-trip duration in milliseconds.
    pub duration_ms: Option<u64>,
}

/// The generated image, still base64-encoded as the service returned it.
#[derive(Debug, Clone, Serialize)]
#[must_use = "swap result should be displayed or saved"]
pub struct SwapResult {
    /// Base64 image content.
    #[serde(skip)]
    pub payload: String,
    /// MIME type reported by the service, if any.
    pub reported_media_type: Option<String>,
    /// Generation metadata.
    pub metadata: SwapMetadata,
}

impl SwapResult {
    /// Wraps a base64 payload returned by the service.
    pub fn new(payload: impl Into<String>, reported_media_type: Option<String>) -> Self {
        Self {
            payload: payload.into(),
            reported_media_type,
            metadata: SwapMetadata::default(),
        }
    }

    /// Attaches generation metadata.
    pub fn with_metadata(mut self, metadata: SwapMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Data URI of the result, always labelled PNG.
    pub fn data_uri(&self) -> String {
        format!("data:image/png;base64,{}", self.payload)
    }

    /// Data URI using the media type the service reported, PNG if none.
    pub fn reported_data_uri(&self) -> String {
        let media_type = self.reported_media_type.as_deref().unwrap_or("image/png");
        format!("data:{};base64,{}", media_type, self.payload)
    }

    /// Decodes the payload to raw image bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(&self.payload)
            .map_err(|e| LuxeFitError::Decode(e.to_string()))
    }

    /// Saves the decoded image to the specified path.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.decode()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(payload: &str, media_type: &str) -> EncodedImage {
        EncodedImage {
            source: None,
            preview_uri: format!("data:{media_type};base64,{payload}"),
            payload: payload.to_string(),
            media_type: media_type.to_string(),
        }
    }

    #[test]
    fn test_request_requires_both_images() {
        assert!(SwapRequest::new(image("AAAA", "image/png"), image("BBBB", "image/jpeg")).is_ok());

        let err = SwapRequest::new(image("", "image/png"), image("BBBB", "image/jpeg"))
            .unwrap_err();
        assert!(matches!(err, LuxeFitError::MissingInput(_)));

        let err = SwapRequest::new(image("AAAA", "image/png"), image("BBBB", "")).unwrap_err();
        assert_eq!(err.to_string(), "missing input: garment image is empty");
    }

    #[test]
    fn test_prompt_keeps_scene() {
        assert!(OUTFIT_SWAP_PROMPT.contains("Retain the pose, lighting, and background"));
        assert!(OUTFIT_SWAP_PROMPT.contains("photorealistic"));
    }

    #[test]
    fn test_result_data_uri_is_png() {
        let result = SwapResult::new("ABC123", Some("image/jpeg".into()));
        assert_eq!(result.data_uri(), "data:image/png;base64,ABC123");
        assert_eq!(result.reported_data_uri(), "data:image/jpeg;base64,ABC123");

        let result = SwapResult::new("ABC123", None);
        assert_eq!(result.reported_data_uri(), "data:image/png;base64,ABC123");
    }

    #[test]
    fn test_result_save_writes_decoded_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_RESULT_FILENAME);

        SwapResult::new("iVBORw0KGgo=", None).save(&path).unwrap();
        let written = std::fs::read(&path).unwrap();
        assert_eq!(written, [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]);
    }

    #[test]
    fn test_result_decode_rejects_garbage() {
        let err = SwapResult::new("not base64!", None).decode().unwrap_err();
        assert!(matches!(err, LuxeFitError::Decode(_)));
    }
}
