//! Image intake: files in, data URIs out.

pub mod intake;
mod types;

pub use intake::{encode_bytes, read_image, IntakeLimits, DEFAULT_MAX_UPLOAD_BYTES};
pub use types::{DataUri, EncodedImage, ImageFormat};
