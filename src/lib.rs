#![warn(missing_docs)]
//! LuxeFit - virtual outfit swap.
//!
//! Upload a photo of a person and a photo of a garment; Gemini renders the
//! person wearing the garment, keeping their pose, lighting and background.
//!
//! # Quick Start
//!
//! ```no_run
//! use luxefit::{GeminiSwapProvider, Slot, Studio, SubmitOutcome};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> luxefit::Result<()> {
//!     let provider = GeminiSwapProvider::builder().build()?;
//!     let studio = Studio::new(Arc::new(provider));
//!
//!     studio.load_file(Slot::Model, "model.jpg").await?;
//!     studio.load_file(Slot::Garment, "dress.png").await?;
//!
//!     match studio.submit().await {
//!         SubmitOutcome::Completed => {
//!             studio.save_result("luxefit-generated.png")?;
//!         }
//!         _ => eprintln!("{}", studio.failure_message().unwrap_or("nothing to do")),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Layers
//!
//! - [`image`]: reads files into [`EncodedImage`]s (data URI, payload, media type).
//! - [`swap`]: the [`SwapProvider`] trait and the Gemini implementation.
//! - [`studio`]: session state machine and user-facing failure text.
//! - [`config`]: environment-driven settings.
//!
//! # Features
//!
//! - `cli` (default): the `luxefit` command-line front-end

pub mod config;
mod error;
pub mod image;
pub mod studio;
pub mod swap;

// Re-export error types at crate root
pub use error::{FailureKind, LuxeFitError, Result};

pub use config::Config;
pub use image::{DataUri, EncodedImage, ImageFormat, IntakeLimits};
pub use studio::{RequestStatus, Slot, Studio, StudioView, SubmitOutcome};
pub use swap::providers::{
    GeminiModel, GeminiSwapProvider, GeminiSwapProviderBuilder, SafetyThreshold,
};
pub use swap::{SwapProvider, SwapRequest, SwapResult};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{FailureKind, LuxeFitError, Result};
    pub use crate::image::EncodedImage;
    pub use crate::studio::{Slot, Studio, SubmitOutcome};
    pub use crate::swap::providers::GeminiSwapProvider;
    pub use crate::swap::{SwapProvider, SwapRequest, SwapResult};
}
