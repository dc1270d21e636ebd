#![warn(missing_docs)]
//! CharViz - character images from a reference photo and a description.
//!
//! A run takes a [`FormInput`] (reference images, character and scene
//! descriptions, influence and background settings). It translates
//! non-English descriptions, composes a prompt, and asks the image model for
//! three variants in parallel. The results come back as data URIs.
//!
//! # Quick Start
//!
//! ```no_run
//! use charviz::{FormInput, GeminiClient, Orchestrator, ReferenceImage};
//!
//! #[tokio::main]
//! async fn main() -> charviz::Result<()> {
//!     let client = GeminiClient::builder().build()?;
//!     let orchestrator = Orchestrator::new(client);
//!
//!     let form = FormInput::new()
//!         .with_image(ReferenceImage::from_path("me.jpg")?)
//!         .with_character("a knight")
//!         .with_scene("in a forest")
//!         .with_influence(75);
//!     form.validate()?;
//!
//!     for (i, image) in orchestrator.generate_images(&form).await?.iter().enumerate() {
//!         image.save(".", i)?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `cli`: the `charviz` command-line interface

mod error;
pub mod form;
pub mod image;
pub mod language;
pub mod orchestrator;
pub mod prompt;

// Re-export error types at crate root
pub use error::{CharVizError, Result};

pub use form::{FormInput, Quality};
pub use image::providers::{GeminiClient, GeminiClientBuilder, GeminiImageModel};
pub use image::{GeneratedImage, GenerativeModel, ImageFormat, ImagePayload, ReferenceImage};
pub use language::{is_vietnamese, LanguageDetector, NoTranslation, VietnameseDetector};
pub use orchestrator::{Orchestrator, VARIANT_COUNT};
pub use prompt::{compose_prompt, influence_prompt};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{CharVizError, Result};
    pub use crate::form::{FormInput, Quality};
    pub use crate::image::providers::GeminiClient;
    pub use crate::image::{GeneratedImage, GenerativeModel, ImagePayload, ReferenceImage};
    pub use crate::language::LanguageDetector;
    pub use crate::orchestrator::Orchestrator;
}
