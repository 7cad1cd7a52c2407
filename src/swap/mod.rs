//! Outfit swap requests.

mod provider;
pub mod providers;
mod types;

pub use provider::SwapProvider;
pub use types::{
    SwapMetadata, SwapRequest, SwapResult, DEFAULT_RESULT_FILENAME, OUTFIT_SWAP_PROMPT,
};
