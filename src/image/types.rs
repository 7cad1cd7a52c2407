//! Core types for encoded images.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Image formats accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format (modern, efficient).
    WebP,
    /// GIF format (first frame is what the service sees).
    Gif,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
            Self::Gif => "gif",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
        }
    }

    /// Attempts to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 12 {
            return None;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        // GIF87a / GIF89a
        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Some(Self::Gif);
        }

        None
    }
}

/// A `data:<media type>;base64,<payload>` URI split into its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataUri<'a> {
    /// Media type between `data:` and `;base64,`.
    pub media_type: &'a str,
    /// Base64 payload after the comma.
    pub payload: &'a str,
}

impl<'a> DataUri<'a> {
    /// Splits a base64 data URI. Returns `None` unless both parts are non-empty.
    pub fn parse(uri: &'a str) -> Option<Self> {
        let rest = uri.strip_prefix("data:")?;
        let (media_type, payload) = rest.split_once(";base64,")?;
        if media_type.is_empty() || payload.is_empty() {
            return None;
        }
        Some(Self {
            media_type,
            payload,
        })
    }
}

impl fmt::Display for DataUri<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.media_type, self.payload)
    }
}

/// An uploaded image, ready to render and to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedImage {
    /// Where the bytes came from, for display only.
    pub source: Option<PathBuf>,
    /// Data URI used for previews.
    #[serde(skip)]
    pub preview_uri: String,
    /// Base64 content without the data URI header.
    #[serde(skip)]
    pub payload: String,
    /// MIME type, e.g. `image/png`.
    pub media_type: String,
}

impl EncodedImage {
    /// Builds an image from an already-encoded data URI.
    ///
    /// Returns `None` when the URI is not a base64 data URI.
    pub fn from_data_uri(uri: impl Into<String>) -> Option<Self> {
        let preview_uri = uri.into();
        let parsed = DataUri::parse(&preview_uri)?;
        let media_type = parsed.media_type.to_string();
        let payload = parsed.payload.to_string();
        Some(Self {
            source: None,
            preview_uri,
            payload,
            media_type,
        })
    }

    /// Attaches the originating file path.
    pub fn with_source(mut self, path: impl AsRef<Path>) -> Self {
        self.source = Some(path.as_ref().to_path_buf());
        self
    }

    /// Returns true if both payload and media type are present.
    pub fn is_ready(&self) -> bool {
        !self.payload.is_empty() && !self.media_type.is_empty()
    }

    /// Approximate decoded size in bytes.
    pub fn decoded_len(&self) -> usize {
        let padding = self.payload.bytes().rev().take_while(|b| *b == b'=').count();
        (self.payload.len() / 4 * 3).saturating_sub(padding)
    }

    /// File name of the source, if known.
    pub fn file_name(&self) -> Option<&str> {
        self.source
            .as_deref()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 12] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const JPEG_MAGIC: [u8; 12] = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0, 0, 0, 0, 0];
    const WEBP_MAGIC: [u8; 12] = *b"RIFF\x00\x00\x00\x00WEBP";
    const GIF_MAGIC: [u8; 12] = *b"GIF89a\x01\x00\x01\x00\x00\x00";

    #[test]
    fn test_format_from_magic_bytes() {
        assert_eq!(
            ImageFormat::from_magic_bytes(&PNG_MAGIC),
            Some(ImageFormat::Png)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&JPEG_MAGIC),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&WEBP_MAGIC),
            Some(ImageFormat::WebP)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&GIF_MAGIC),
            Some(ImageFormat::Gif)
        );
        assert_eq!(ImageFormat::from_magic_bytes(b"hello"), None);
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ImageFormat::from_extension("PNG"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_extension("jpeg"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_extension("txt"), None);
    }

    #[test]
    fn test_data_uri_parse() {
        let uri = DataUri::parse("data:image/jpeg;base64,/9j/4AAQ").unwrap();
        assert_eq!(uri.media_type, "image/jpeg");
        assert_eq!(uri.payload, "/9j/4AAQ");
        assert_eq!(uri.to_string(), "data:image/jpeg;base64,/9j/4AAQ");
    }

    #[test]
    fn test_data_uri_rejects_malformed() {
        assert!(DataUri::parse("image/png;base64,AAAA").is_none());
        assert!(DataUri::parse("data:image/png,AAAA").is_none());
        assert!(DataUri::parse("data:;base64,AAAA").is_none());
        assert!(DataUri::parse("data:image/png;base64,").is_none());
    }

    #[test]
    fn test_encoded_image_from_data_uri() {
        let image = EncodedImage::from_data_uri("data:image/png;base64,iVBORw0KGgo=")
            .unwrap()
            .with_source("/tmp/look.png");
        assert!(image.is_ready());
        assert_eq!(image.media_type, "image/png");
        assert_eq!(image.payload, "iVBORw0KGgo=");
        assert_eq!(image.decoded_len(), 8);
        assert_eq!(image.file_name(), Some("look.png"));
    }
}
