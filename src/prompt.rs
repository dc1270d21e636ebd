//! Prompt composition from form settings.
//!
//! The sentences here are fixed wording: generated prompts are compared
//! verbatim in tests and against recorded outputs.

use crate::form::FormInput;

/// Influence sentence for strength in `[0, 20]`.
pub const INFLUENCE_LOOSE: &str =
    "The generated image should be loosely inspired by the character in the reference image.";
/// Influence sentence for strength in `(20, 40]`.
pub const INFLUENCE_INSPIRED: &str =
    "The generated image should be inspired by the character in the reference image.";
/// Influence sentence for strength in `(40, 60]`.
pub const INFLUENCE_BASED: &str =
    "The generated image should be based on the character in the reference image.";
/// Influence sentence for strength in `(60, 80]`.
pub const INFLUENCE_CLOSE: &str =
    "The generated image should closely match the character in the reference image.";
/// Influence sentence for strength above 80.
pub const INFLUENCE_PHOTOREAL: &str = "The generated image should be a photorealistic version of the character in the reference image, maintaining all key features.";

/// Appended when background removal is requested.
pub const REMOVE_BACKGROUND: &str =
    "The character should be isolated on a transparent or simple studio background.";

/// Always closes the prompt.
pub const QUALITY_SUFFIX: &str = "The final image should be highly detailed, photorealistic, with natural daylight, HDR cinematic quality, and a shallow depth of field.";

/// Maps an influence strength to its sentence. Band upper bounds are inclusive.
pub fn influence_prompt(strength: u8) -> &'static str {
    match strength {
        0..=20 => INFLUENCE_LOOSE,
        21..=40 => INFLUENCE_INSPIRED,
        41..=60 => INFLUENCE_BASED,
        61..=80 => INFLUENCE_CLOSE,
        _ => INFLUENCE_PHOTOREAL,
    }
}

/// Builds the final prompt from already translated descriptions.
///
/// Only the toggles of `form` are read; its description fields are ignored
/// in favour of `character` and `scene`.
pub fn compose_prompt(character: &str, scene: &str, form: &FormInput) -> String {
    let mut prompt = format!("{character}. {scene}.");

    if form.influence_enabled {
        prompt.push(' ');
        prompt.push_str(influence_prompt(form.influence_strength));
    }

    if form.remove_background {
        prompt.push(' ');
        prompt.push_str(REMOVE_BACKGROUND);
    }

    prompt.push(' ');
    prompt.push_str(QUALITY_SUFFIX);
    prompt
}
