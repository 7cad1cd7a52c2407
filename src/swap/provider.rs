//! Swap provider trait.

use crate::error::Result;
use crate::swap::types::{SwapRequest, SwapResult};
use async_trait::async_trait;

/// A backend that can dress a model photo in a garment photo.
///
/// Implementations perform exactly one outbound call per [`swap`](Self::swap)
/// and never retry.
#[async_trait]
pub trait SwapProvider: Send + Sync {
    /// Sends the request and returns the first generated image.
    async fn swap(&self, request: &SwapRequest) -> Result<SwapResult>;

    /// Returns the name of this provider for display.
    fn name(&self) -> &str;

    /// Checks if the provider is reachable and authenticated.
    async fn health_check(&self) -> Result<()>;
}
