//! Swap providers.

mod gemini;

pub use gemini::{
    GeminiModel, GeminiSwapProvider, GeminiSwapProviderBuilder, SafetyThreshold,
    DEFAULT_BASE_URL, DEFAULT_TIMEOUT,
};

#[cfg(test)]
pub(crate) use gemini::result_from_json;
