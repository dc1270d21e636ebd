//! The remote model seam used by the orchestrator.

use crate::error::Result;
use crate::image::types::ImagePayload;
use async_trait::async_trait;

/// A remote generative model able to answer text prompts and produce images
/// from a reference image plus a prompt.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Sends a text-only prompt and returns the reply, trimmed.
    async fn generate_text(&self, prompt: &str) -> Result<String>;

    /// Sends the reference image and prompt, asking for image and text output.
    ///
    /// Returns the first inline image of the reply, or `None` when the reply
    /// carries no image.
    async fn generate_image(
        &self,
        reference: &ImagePayload,
        prompt: &str,
    ) -> Result<Option<ImagePayload>>;

    /// Returns the name of this model backend for display.
    fn name(&self) -> &str;

    /// Checks if the backend is reachable and authenticated.
    async fn health_check(&self) -> Result<()>;
}

#[async_trait]
impl<T: GenerativeModel + ?Sized> GenerativeModel for std::sync::Arc<T> {
    async fn generate_text(&self, prompt: &str) -> Result<String> {
        (**self).generate_text(prompt).await
    }

    async fn generate_image(
        &self,
        reference: &ImagePayload,
        prompt: &str,
    ) -> Result<Option<ImagePayload>> {
        (**self).generate_image(reference, prompt).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    async fn health_check(&self) -> Result<()> {
        (**self).health_check().await
    }
}
