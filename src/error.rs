//! Error types for the outfit swap pipeline.

use serde::Serialize;
use std::time::Duration;

/// Longest error body kept from a service rejection.
const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Errors that can occur while encoding images or requesting a swap.
#[derive(Debug, thiserror::Error)]
pub enum LuxeFitError {
    /// A swap was attempted without both images.
    #[error("missing input: {0}")]
    MissingInput(String),

    /// Configuration is missing or invalid (e.g. no API key).
    #[error("configuration error: {0}")]
    Config(String),

    /// The selected file is not an encodable image.
    #[error("unsupported file: {0}")]
    UnsupportedFile(String),

    /// The selected file exceeds the upload cap.
    #[error("file too large: {size} bytes (limit {limit})")]
    FileTooLarge {
        /// Size of the rejected file in bytes.
        size: u64,
        /// Configured cap in bytes.
        limit: u64,
    },

    /// The service refused the request for availability reasons (HTTP 412).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// The service returned no content parts.
    #[error("no content generated: {0}")]
    EmptyResponse(String),

    /// Content parts came back but none carried image data.
    #[error("no image data found in response")]
    NoImageInResponse,

    /// The request did not finish in time.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// API key rejected.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Sanitized response body.
        message: String,
    },

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to decode base64 data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// I/O error (e.g., reading an upload or saving the result).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse failure category, used to pick user-facing text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// One or both image slots were empty.
    MissingInput,
    /// The API key or another setting is missing or invalid.
    Configuration,
    /// A selected file could not be used as an image.
    UnsupportedFile,
    /// Generation is not offered where the caller is.
    ServiceUnavailable,
    /// Nothing came back, usually a safety block.
    EmptyResponse,
    /// Parts came back without an image.
    NoImageInResponse,
    /// The call exceeded its deadline.
    Timeout,
    /// Anything else.
    Unknown,
}

impl FailureKind {
    /// Message shown to the user for this kind of failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::MissingInput => "Please upload both a model photo and a garment photo.",
            Self::Configuration => {
                "The studio is not configured. Set GOOGLE_API_KEY and try again."
            }
            Self::UnsupportedFile => {
                "That file is not a supported image. Please choose a PNG, JPEG, WebP or GIF photo."
            }
            Self::ServiceUnavailable => "Image generation is currently unavailable in your region.",
            Self::EmptyResponse => {
                "The AI could not generate a result. This often happens if the images trigger \
                 safety filters. Try using a different photo."
            }
            Self::Timeout => "The request took too long. Please try again.",
            Self::NoImageInResponse | Self::Unknown => {
                "Something went wrong. Please ensure both images are clear and try again."
            }
        }
    }
}

impl LuxeFitError {
    /// Returns the failure category of this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::MissingInput(_) => FailureKind::MissingInput,
            Self::Config(_) | Self::Auth(_) => FailureKind::Configuration,
            Self::UnsupportedFile(_) | Self::FileTooLarge { .. } => FailureKind::UnsupportedFile,
            Self::ServiceUnavailable(_) => FailureKind::ServiceUnavailable,
            Self::Api { status, message } if *status == 412 || message.contains("412") => {
                FailureKind::ServiceUnavailable
            }
            Self::EmptyResponse(_) => FailureKind::EmptyResponse,
            Self::NoImageInResponse => FailureKind::NoImageInResponse,
            Self::Timeout(_) => FailureKind::Timeout,
            Self::Network(e) if e.is_timeout() => FailureKind::Timeout,
            Self::Api { .. }
            | Self::Network(_)
            | Self::Decode(_)
            | Self::Io(_)
            | Self::Json(_) => FailureKind::Unknown,
        }
    }
}

/// Result type alias for outfit swap operations.
pub type Result<T> = std::result::Result<T, LuxeFitError>;

/// Cleans an error body before it is stored in an error value.
///
/// Redacts anything that looks like a Google API key and caps the length,
/// since service errors sometimes echo the request back.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    let redacted: Vec<String> = text
        .split_inclusive(|c: char| c.is_whitespace() || c == '"' || c == '\'' || c == '=')
        .map(|token| {
            let trimmed = token.trim_end_matches(|c: char| {
                c.is_whitespace() || c == '"' || c == '\'' || c == '='
            });
            if trimmed.starts_with("AIza") && trimmed.len() >= 30 {
                token.replacen(trimmed, "[REDACTED]", 1)
            } else {
                token.to_string()
            }
        })
        .collect();
    let text = redacted.concat();
    let text = text.trim();

    if text.chars().count() > MAX_ERROR_MESSAGE_LEN {
        let cut: String = text.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            LuxeFitError::MissingInput("garment".into()).kind(),
            FailureKind::MissingInput
        );
        assert_eq!(
            LuxeFitError::EmptyResponse("blocked".into()).kind(),
            FailureKind::EmptyResponse
        );
        assert_eq!(
            LuxeFitError::Api {
                status: 412,
                message: "precondition".into()
            }
            .kind(),
            FailureKind::ServiceUnavailable
        );
        assert_eq!(
            LuxeFitError::Api {
                status: 500,
                message: "internal".into()
            }
            .kind(),
            FailureKind::Unknown
        );
        assert_eq!(
            LuxeFitError::Api {
                status: 400,
                message: "upstream returned 412 for this project".into()
            }
            .kind(),
            FailureKind::ServiceUnavailable
        );
        assert_eq!(
            LuxeFitError::Timeout(Duration::from_secs(60)).kind(),
            FailureKind::Timeout
        );
        assert_eq!(
            LuxeFitError::Auth("bad key".into()).kind(),
            FailureKind::Configuration
        );
        assert_eq!(
            LuxeFitError::FileTooLarge { size: 10, limit: 5 }.kind(),
            FailureKind::UnsupportedFile
        );
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            FailureKind::ServiceUnavailable.user_message(),
            "Image generation is currently unavailable in your region."
        );
        assert!(FailureKind::EmptyResponse
            .user_message()
            .contains("safety filters"));
        assert_eq!(
            FailureKind::NoImageInResponse.user_message(),
            FailureKind::Unknown.user_message()
        );
    }

    #[test]
    fn test_error_display() {
        let err = LuxeFitError::Api {
            status: 404,
            message: "Not found".into(),
        };
        assert_eq!(err.to_string(), "API error: 404 - Not found");

        let err = LuxeFitError::FileTooLarge {
            size: 2048,
            limit: 1024,
        };
        assert_eq!(err.to_string(), "file too large: 2048 bytes (limit 1024)");
    }

    #[test]
    fn test_sanitize_redacts_api_key() {
        let body = r#"{"error": "key AIzaSyA1234567890abcdefghijklmnopqrs is invalid"}"#;
        let cleaned = sanitize_error_message(body);
        assert!(!cleaned.contains("AIzaSy"));
        assert!(cleaned.contains("[REDACTED]"));
        assert!(cleaned.contains("is invalid"));
    }

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let body = "x".repeat(2000);
        let cleaned = sanitize_error_message(&body);
        assert_eq!(cleaned.len(), MAX_ERROR_MESSAGE_LEN + 3);
        assert!(cleaned.ends_with("..."));
    }
}
