//! Turns a form into a prompt and fans it out to the image model.
//!
//! One run does the following:
//! 1. Takes the first reference image and encodes it as base64.
//! 2. Translates descriptions the [`LanguageDetector`] flags. A failed
//!    translation falls back to the original text.
//! 3. Composes the prompt (see [`crate::prompt`]).
//! 4. Sends [`VARIANT_COUNT`] identical image requests concurrently and waits
//!    for all of them. The first failure fails the whole run.
//! 5. Keeps the first image of each reply, in submission order.

use crate::error::{CharVizError, Result};
use crate::form::FormInput;
use crate::image::{GeneratedImage, GenerativeModel, ImagePayload};
use crate::language::{LanguageDetector, VietnameseDetector};
use crate::prompt::compose_prompt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Number of image requests issued per run.
pub const VARIANT_COUNT: usize = 3;

/// Builds the translation request for `text`.
pub fn translation_prompt(text: &str) -> String {
    format!(
        "Translate the following text to English, keeping the core meaning and tone. Only return the translated text, with no extra formatting or explanations:\n\n\"{text}\""
    )
}

/// Runs character generation against a caller-owned model client.
pub struct Orchestrator<M, D = VietnameseDetector> {
    model: M,
    detector: D,
}

impl<M: GenerativeModel> Orchestrator<M> {
    /// Creates an orchestrator translating Vietnamese input.
    pub fn new(model: M) -> Self {
        Self {
            model,
            detector: VietnameseDetector,
        }
    }
}

impl<M: GenerativeModel, D: LanguageDetector> Orchestrator<M, D> {
    /// Swaps the language detection strategy.
    pub fn with_detector<D2: LanguageDetector>(self, detector: D2) -> Orchestrator<M, D2> {
        Orchestrator {
            model: self.model,
            detector,
        }
    }

    /// The underlying model client.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Returns `text` in English. Never fails: on any error the input is
    /// returned unchanged.
    pub async fn translate_to_english(&self, text: &str) -> String {
        if !self.detector.needs_translation(text) {
            return text.to_string();
        }

        match self.try_translate(text).await {
            Ok(translated) => {
                tracing::debug!(original = text, translated = %translated, "translated description");
                translated
            }
            Err(e) => {
                tracing::warn!(error = %e, "translation failed, using original text");
                text.to_string()
            }
        }
    }

    async fn try_translate(&self, text: &str) -> Result<String> {
        self.model
            .generate_text(&translation_prompt(text))
            .await
            .map_err(|e| CharVizError::Translation(e.to_string()))
    }

    /// Translates both descriptions and composes the final prompt.
    pub async fn build_prompt(&self, form: &FormInput) -> String {
        let (character, scene) = tokio::join!(
            self.translate_to_english(&form.character_desc),
            self.translate_to_english(&form.scene_desc),
        );
        compose_prompt(&character, &scene, form)
    }

    /// Generates images and returns them as data URIs, in submission order.
    pub async fn generate(&self, form: &FormInput) -> Result<Vec<String>> {
        let images = self.generate_images(form).await?;
        Ok(images.iter().map(GeneratedImage::src).collect())
    }

    /// Generates images, each tagged with an id unique to this run.
    pub async fn generate_images(&self, form: &FormInput) -> Result<Vec<GeneratedImage>> {
        let reference = form
            .images
            .first()
            .ok_or_else(|| CharVizError::Validation("No reference image provided.".into()))?;

        if form.images.len() > 1 {
            tracing::warn!(
                ignored = form.images.len() - 1,
                "only the first reference image is used for generation"
            );
        }

        let encoded = reference.to_payload();
        let prompt = self.build_prompt(form).await;

        tracing::info!(
            model = self.model.name(),
            variants = VARIANT_COUNT,
            quality = %form.quality,
            "generating character images"
        );
        tracing::debug!(prompt = %prompt, "composed prompt");

        let payloads = self.fan_out(&encoded, &prompt).await?;
        if payloads.is_empty() {
            return Err(CharVizError::Generation(
                "no images produced. Please try modifying your prompt.".into(),
            ));
        }

        let run = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();

        tracing::info!(
            produced = payloads.len(),
            requested = VARIANT_COUNT,
            "character generation complete"
        );

        Ok(payloads
            .into_iter()
            .enumerate()
            .map(|(i, payload)| GeneratedImage::new(format!("img-{run}-{i}"), payload))
            .collect())
    }

    // All-or-nothing: try_join drops the pending calls as soon as one fails.
    async fn fan_out(&self, reference: &ImagePayload, prompt: &str) -> Result<Vec<ImagePayload>> {
        let (first, second, third) = tokio::try_join!(
            self.model.generate_image(reference, prompt),
            self.model.generate_image(reference, prompt),
            self.model.generate_image(reference, prompt),
        )?;
        Ok([first, second, third].into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ReferenceImage;
    use crate::language::NoTranslation;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Clone)]
    enum Reply {
        Image(&'static str, u64),
        Empty,
        Fail,
    }

    struct FakeModel {
        translation: Option<&'static str>,
        replies: Vec<Reply>,
        text_calls: AtomicUsize,
        image_calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
        references: Mutex<Vec<ImagePayload>>,
    }

    impl FakeModel {
        fn new(replies: Vec<Reply>) -> Self {
            Self {
                translation: Some("A girl"),
                replies,
                text_calls: AtomicUsize::new(0),
                image_calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
                references: Mutex::new(Vec::new()),
            }
        }

        fn failing_translation(mut self) -> Self {
            self.translation = None;
            self
        }

        fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl GenerativeModel for FakeModel {
        async fn generate_text(&self, _prompt: &str) -> Result<String> {
            self.text_calls.fetch_add(1, Ordering::SeqCst);
            self.translation
                .map(str::to_string)
                .ok_or_else(|| CharVizError::Api {
                    status: 500,
                    message: "boom".into(),
                })
        }

        async fn generate_image(
            &self,
            reference: &ImagePayload,
            prompt: &str,
        ) -> Result<Option<ImagePayload>> {
            let idx = self.image_calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.references.lock().unwrap().push(reference.clone());

            match self.replies[idx].clone() {
                Reply::Image(data, delay_ms) => {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    Ok(Some(ImagePayload::new("image/png", data)))
                }
                Reply::Empty => Ok(None),
                Reply::Fail => Err(CharVizError::RateLimited { retry_after: None }),
            }
        }

        fn name(&self) -> &str {
            "fake"
        }

        async fn health_check(&self) -> Result<()> {
            Ok(())
        }
    }

    fn jpeg(tag: u8) -> ReferenceImage {
        ReferenceImage::new(vec![0xFF, 0xD8, 0xFF, tag], "image/jpeg")
    }

    fn knight_form() -> FormInput {
        FormInput::new()
            .with_image(jpeg(0xE0))
            .with_character("a knight")
            .with_scene("in a forest")
    }

    #[test]
    fn test_translation_prompt() {
        assert_eq!(
            translation_prompt("Một cô gái"),
            "Translate the following text to English, keeping the core meaning and tone. Only return the translated text, with no extra formatting or explanations:\n\n\"Một cô gái\""
        );
    }

    #[tokio::test]
    async fn test_no_image_fails_before_any_call() {
        let orchestrator = Orchestrator::new(FakeModel::new(vec![]));
        let form = FormInput::new().with_character("Một cô gái");

        let err = orchestrator.generate(&form).await.unwrap_err();
        assert!(matches!(err, CharVizError::Validation(_)));
        assert_eq!(orchestrator.model().text_calls.load(Ordering::SeqCst), 0);
        assert_eq!(orchestrator.model().image_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_results_follow_submission_order() {
        let model = FakeModel::new(vec![
            Reply::Image("AAAA", 40),
            Reply::Image("BBBB", 20),
            Reply::Image("CCCC", 0),
        ]);
        let orchestrator = Orchestrator::new(model);

        let uris = orchestrator.generate(&knight_form()).await.unwrap();
        assert_eq!(
            uris,
            vec![
                "data:image/png;base64,AAAA",
                "data:image/png;base64,BBBB",
                "data:image/png;base64,CCCC",
            ]
        );
        assert_eq!(orchestrator.model().image_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_all_empty_is_generation_error() {
        let orchestrator =
            Orchestrator::new(FakeModel::new(vec![Reply::Empty, Reply::Empty, Reply::Empty]));

        let err = orchestrator.generate(&knight_form()).await.unwrap_err();
        assert!(matches!(err, CharVizError::Generation(_)));
        assert!(err.to_string().contains("no images produced"));
    }

    #[tokio::test]
    async fn test_single_image_of_three() {
        let orchestrator = Orchestrator::new(FakeModel::new(vec![
            Reply::Empty,
            Reply::Image("BBBB", 0),
            Reply::Empty,
        ]));

        let images = orchestrator.generate_images(&knight_form()).await.unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].payload.data, "BBBB");
        assert!(images[0].id.starts_with("img-"));
        assert!(images[0].id.ends_with("-0"));
    }

    #[tokio::test]
    async fn test_one_failure_fails_the_run() {
        let orchestrator = Orchestrator::new(FakeModel::new(vec![
            Reply::Image("AAAA", 0),
            Reply::Fail,
            Reply::Image("CCCC", 0),
        ]));

        let err = orchestrator.generate(&knight_form()).await.unwrap_err();
        assert!(matches!(err, CharVizError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn test_only_first_reference_image_is_sent() {
        let orchestrator = Orchestrator::new(FakeModel::new(vec![Reply::Image("AAAA", 0); 3]));
        let form = knight_form().with_image(jpeg(0xE1)).with_image(jpeg(0xE2));

        orchestrator.generate(&form).await.unwrap();

        let expected = jpeg(0xE0).to_payload();
        let references = orchestrator.model().references.lock().unwrap();
        assert_eq!(references.len(), 3);
        assert!(references.iter().all(|r| *r == expected));
    }

    #[tokio::test]
    async fn test_every_call_gets_the_same_prompt() {
        let orchestrator = Orchestrator::new(FakeModel::new(vec![Reply::Image("AAAA", 0); 3]));
        let form = knight_form().with_influence(75).with_remove_background(true);

        orchestrator.generate(&form).await.unwrap();

        let prompts = orchestrator.model().prompts.lock().unwrap();
        assert_eq!(prompts.len(), 3);
        assert!(prompts.iter().all(|p| p == &prompts[0]));
        assert!(prompts[0].starts_with("a knight. in a forest. The generated image should closely match"));
    }

    #[tokio::test]
    async fn test_vietnamese_description_is_translated() {
        let orchestrator = Orchestrator::new(FakeModel::new(vec![Reply::Image("AAAA", 0); 3]));
        let form = knight_form().with_character("Một cô gái").without_influence();

        orchestrator.generate(&form).await.unwrap();

        assert_eq!(orchestrator.model().text_calls.load(Ordering::SeqCst), 1);
        assert!(orchestrator
            .model()
            .last_prompt()
            .starts_with("A girl. in a forest. The final image"));
    }

    #[tokio::test]
    async fn test_translation_failure_keeps_original() {
        let orchestrator = Orchestrator::new(FakeModel::new(vec![]).failing_translation());

        let text = orchestrator.translate_to_english("Một cô gái").await;
        assert_eq!(text, "Một cô gái");
        assert_eq!(orchestrator.model().text_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_english_is_not_translated() {
        let orchestrator = Orchestrator::new(FakeModel::new(vec![]));

        assert_eq!(orchestrator.translate_to_english("A girl").await, "A girl");
        assert_eq!(orchestrator.model().text_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_custom_detector() {
        let orchestrator = Orchestrator::new(FakeModel::new(vec![])).with_detector(NoTranslation);

        assert_eq!(orchestrator.translate_to_english("cô gái").await, "cô gái");
        assert_eq!(orchestrator.model().text_calls.load(Ordering::SeqCst), 0);
    }
}
