//! Remote model backends.

mod gemini;

pub use gemini::{
    GeminiClient, GeminiClientBuilder, GeminiImageModel, DEFAULT_BASE_URL, DEFAULT_TEXT_MODEL,
};
