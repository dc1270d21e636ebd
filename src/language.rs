//! Lightweight detection of text that needs translating to English.

/// Lowercase Vietnamese letters carrying diacritics.
const VIETNAMESE_DIACRITICS: &str = "àáạảãâầấậẩẫăằắặẳẵèéẹẻẽêềếệểễìíịỉĩòóọỏõôồốộổỗơờớợởỡùúụủũưừứựửữỳýỵỷỹđ";

/// Decides whether a piece of text should be translated before prompting.
pub trait LanguageDetector: Send + Sync {
    /// Returns true when `text` is likely not English.
    fn needs_translation(&self, text: &str) -> bool;
}

/// Flags text containing any Vietnamese diacritic, in either case.
#[derive(Debug, Clone, Copy, Default)]
pub struct VietnameseDetector;

impl LanguageDetector for VietnameseDetector {
    fn needs_translation(&self, text: &str) -> bool {
        is_vietnamese(text)
    }
}

/// Returns true if `text` contains a Vietnamese diacritic character.
pub fn is_vietnamese(text: &str) -> bool {
    text.chars()
        .flat_map(char::to_lowercase)
        .any(|c| VIETNAMESE_DIACRITICS.contains(c))
}

/// Never asks for translation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTranslation;

impl LanguageDetector for NoTranslation {
    fn needs_translation(&self, _text: &str) -> bool {
        false
    }
}
