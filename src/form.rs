//! Form input collected from the user for one generation run.

use crate::error::{CharVizError, Result};
use crate::image::ReferenceImage;
use serde::{Deserialize, Serialize};

/// Highest accepted influence strength.
pub const MAX_INFLUENCE_STRENGTH: u8 = 100;

/// Requested output quality tier.
///
/// Recorded with the form but not sent to the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// Good quality.
    Standard,
    /// Sharper details.
    #[default]
    High,
    /// Photorealistic.
    Ultra,
}

impl Quality {
    /// All tiers, in display order.
    pub const ALL: [Quality; 3] = [Quality::Standard, Quality::High, Quality::Ultra];

    /// Display label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Standard => "Standard",
            Self::High => "2K - 4K (High)",
            Self::Ultra => "8K (Ultra)",
        }
    }

    /// Short caption shown under the label.
    pub fn caption(&self) -> &'static str {
        match self {
            Self::Standard => "Good quality",
            Self::High => "Sharper details",
            Self::Ultra => "Photorealistic",
        }
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything the user supplied for a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormInput {
    /// Reference images. Only the first one is used for generation.
    pub images: Vec<ReferenceImage>,
    /// Ask for the subject isolated on a plain background.
    pub remove_background: bool,
    /// Whether the reference image influence sentence is added.
    pub influence_enabled: bool,
    /// Influence strength in `[0, 100]`.
    pub influence_strength: u8,
    /// Free-text character description.
    pub character_desc: String,
    /// Free-text scene description.
    pub scene_desc: String,
    /// Requested quality tier.
    pub quality: Quality,
}

impl Default for FormInput {
    fn default() -> Self {
        Self {
            images: Vec::new(),
            remove_background: false,
            influence_enabled: true,
            influence_strength: MAX_INFLUENCE_STRENGTH,
            character_desc: String::new(),
            scene_desc: String::new(),
            quality: Quality::High,
        }
    }
}

impl FormInput {
    /// Creates a form with the default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a reference image.
    pub fn with_image(mut self, image: ReferenceImage) -> Self {
        self.images.push(image);
        self
    }

    /// Sets the character description.
    pub fn with_character(mut self, desc: impl Into<String>) -> Self {
        self.character_desc = desc.into();
        self
    }

    /// Sets the scene description.
    pub fn with_scene(mut self, desc: impl Into<String>) -> Self {
        self.scene_desc = desc.into();
        self
    }

    /// Toggles background removal.
    pub fn with_remove_background(mut self, enabled: bool) -> Self {
        self.remove_background = enabled;
        self
    }

    /// Enables reference influence at the given strength, clamped to 100.
    pub fn with_influence(mut self, strength: u8) -> Self {
        self.influence_enabled = true;
        self.influence_strength = strength.min(MAX_INFLUENCE_STRENGTH);
        self
    }

    /// Disables reference influence.
    pub fn without_influence(mut self) -> Self {
        self.influence_enabled = false;
        self
    }

    /// Sets the quality tier.
    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    /// Caller-side check run before starting generation.
    pub fn validate(&self) -> Result<()> {
        if self.images.is_empty() {
            return Err(CharVizError::Validation(
                "Please upload at least one reference image.".into(),
            ));
        }
        if self.character_desc.trim().is_empty() {
            return Err(CharVizError::Validation(
                "Character Description cannot be empty.".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jpeg() -> ReferenceImage {
        ReferenceImage::new(vec![0xFF, 0xD8, 0xFF, 0xE0], "image/jpeg")
    }

    #[test]
    fn test_defaults() {
        let form = FormInput::default();
        assert!(form.images.is_empty());
        assert!(!form.remove_background);
        assert!(form.influence_enabled);
        assert_eq!(form.influence_strength, 100);
        assert_eq!(form.quality, Quality::High);
    }

    #[test]
    fn test_influence_is_clamped() {
        let form = FormInput::new().without_influence().with_influence(250);
        assert!(form.influence_enabled);
        assert_eq!(form.influence_strength, 100);
    }

    #[test]
    fn test_validate() {
        let err = FormInput::new().with_character("a knight").validate().unwrap_err();
        assert_eq!(err.to_string(), "Please upload at least one reference image.");

        let err = FormInput::new()
            .with_image(jpeg())
            .with_character("   ")
            .validate()
            .unwrap_err();
        assert_eq!(err.to_string(), "Character Description cannot be empty.");

        let form = FormInput::new().with_image(jpeg()).with_character("a knight");
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_quality_labels() {
        assert_eq!(Quality::Standard.label(), "Standard");
        assert_eq!(Quality::High.to_string(), "2K - 4K (High)");
        assert_eq!(Quality::Ultra.caption(), "Photorealistic");
        assert_eq!(Quality::ALL.len(), 3);
    }
}
