//! Turning user-selected files into [`EncodedImage`]s.

use crate::error::{LuxeFitError, Result};
use crate::image::types::{DataUri, EncodedImage, ImageFormat};
use base64::Engine;
use std::path::Path;

/// Default upload cap (raw bytes). Gemini rejects inline requests over 20 MB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 20 * 1024 * 1024;

/// Limits applied when accepting an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntakeLimits {
    /// Largest accepted file, in bytes.
    pub max_bytes: u64,
}

impl Default for IntakeLimits {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Encodes raw bytes as an [`EncodedImage`].
///
/// The data URI is built first and then split back apart, so the payload
/// and media type are exactly what a preview of the URI would carry.
pub fn encode_bytes(bytes: &[u8], media_type: &str) -> Result<EncodedImage> {
    if !media_type.starts_with("image/") {
        return Err(LuxeFitError::UnsupportedFile(format!(
            "media type {media_type} is not an image"
        )));
    }

    let payload = base64::engine::general_purpose::STANDARD.encode(bytes);
    let uri = DataUri {
        media_type,
        payload: &payload,
    }
    .to_string();

    EncodedImage::from_data_uri(uri).ok_or_else(|| {
        LuxeFitError::UnsupportedFile("could not encode image as a data URI".into())
    })
}

/// Detects the MIME type of an upload from its bytes, then its extension.
pub fn detect_media_type(path: &Path, bytes: &[u8]) -> Option<&'static str> {
    ImageFormat::from_magic_bytes(bytes)
        .or_else(|| {
            path.extension()
                .and_then(|e| e.to_str())
                .and_then(ImageFormat::from_extension)
        })
        .map(|f| f.mime_type())
}

/// Reads an image file and encodes it for preview and upload.
pub async fn read_image(path: impl AsRef<Path>, limits: &IntakeLimits) -> Result<EncodedImage> {
    let path = path.as_ref();

    let size = tokio::fs::metadata(path).await?.len();
    if size == 0 {
        return Err(LuxeFitError::UnsupportedFile(format!(
            "{} is empty",
            path.display()
        )));
    }
    if size > limits.max_bytes {
        return Err(LuxeFitError::FileTooLarge {
            size,
            limit: limits.max_bytes,
        });
    }

    let bytes = tokio::fs::read(path).await?;
    let media_type = detect_media_type(path, &bytes).ok_or_else(|| {
        LuxeFitError::UnsupportedFile(format!("{} is not a recognized image", path.display()))
    })?;

    tracing::debug!(path = %path.display(), media_type, size, "encoded upload");

    Ok(encode_bytes(&bytes, media_type)?.with_source(path))
}
