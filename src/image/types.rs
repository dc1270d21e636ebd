//! Core image types: reference inputs and generated payloads.

use crate::error::{CharVizError, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Image formats recognised for reference uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format (lossless).
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format.
    WebP,
    /// GIF format.
    Gif,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
            Self::Gif => "gif",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
        }
    }

    /// Attempts to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Maps a MIME type back to a format.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime.to_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            "image/gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }
        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Some(Self::Gif);
        }
        if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }
        None
    }
}

/// A user-supplied image anchoring the character's appearance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    /// Raw image bytes.
    pub data: Vec<u8>,
    /// Declared content type, e.g. `image/jpeg`.
    pub mime_type: String,
}

impl ReferenceImage {
    /// Creates a reference image with an explicit content type.
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }

    /// Creates a reference image, detecting the content type from magic bytes.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let format = ImageFormat::from_magic_bytes(&data).ok_or_else(|| {
            CharVizError::Validation("Unrecognised reference image format.".into())
        })?;
        Ok(Self::new(data, format.mime_type()))
    }

    /// Reads a reference image from disk.
    ///
    /// The content type comes from the file's magic bytes, falling back to
    /// its extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let format = ImageFormat::from_magic_bytes(&data)
            .or_else(|| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .and_then(ImageFormat::from_extension)
            })
            .ok_or_else(|| {
                CharVizError::Validation(format!(
                    "{} is not a supported image (png, jpeg, webp, gif).",
                    path.display()
                ))
            })?;
        Ok(Self::new(data, format.mime_type()))
    }

    /// Encodes the image for transport as inline data.
    pub fn to_payload(&self) -> ImagePayload {
        ImagePayload {
            mime_type: self.mime_type.clone(),
            data: base64::engine::general_purpose::STANDARD.encode(&self.data),
        }
    }
}

/// Base64 image data paired with its MIME type, as carried on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePayload {
    /// MIME type, e.g. `image/png`.
    pub mime_type: String,
    /// Standard base64 encoded bytes.
    pub data: String,
}

impl ImagePayload {
    /// Creates a payload from already encoded data.
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Returns the payload as a directly displayable data URI.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    /// Parses a `data:{mime};base64,{data}` URI.
    pub fn from_data_uri(uri: &str) -> Result<Self> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| CharVizError::Decode("not a data URI".into()))?;
        let (mime_type, data) = rest
            .split_once(";base64,")
            .ok_or_else(|| CharVizError::Decode("data URI is not base64 encoded".into()))?;
        Ok(Self::new(mime_type, data))
    }

    /// Decodes the base64 data into raw bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(self.data.trim())
            .map_err(|e| CharVizError::Decode(e.to_string()))
    }

    /// File extension matching the MIME type; `png` when unknown.
    pub fn extension(&self) -> &'static str {
        ImageFormat::from_mime_type(&self.mime_type)
            .unwrap_or(ImageFormat::Png)
            .extension()
    }
}

/// A generated image with an identifier for list keying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[must_use = "generated image should be saved or displayed"]
pub struct GeneratedImage {
    /// Caller-facing identifier, unique within one run.
    pub id: String,
    /// The image itself.
    pub payload: ImagePayload,
}

impl GeneratedImage {
    /// Wraps a payload with an identifier.
    pub fn new(id: impl Into<String>, payload: ImagePayload) -> Self {
        Self {
            id: id.into(),
            payload,
        }
    }

    /// Returns the image as a data URI.
    pub fn src(&self) -> String {
        self.payload.to_data_uri()
    }

    /// Writes the image into `dir` as `character_{index + 1}.{ext}`.
    pub fn save(&self, dir: impl AsRef<Path>, index: usize) -> Result<PathBuf> {
        let path = dir
            .as_ref()
            .join(format!("character_{}.{}", index + 1, self.payload.extension()));
        std::fs::write(&path, self.payload.decode()?)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 12] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const JPEG_MAGIC: [u8; 12] = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0, 0, 0, 0, 0];
    const WEBP_MAGIC: [u8; 12] = *b"RIFF\x00\x00\x00\x00WEBP";

    #[test]
    fn test_format_from_magic_bytes() {
        assert_eq!(
            ImageFormat::from_magic_bytes(&PNG_MAGIC),
            Some(ImageFormat::Png)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&JPEG_MAGIC),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&WEBP_MAGIC),
            Some(ImageFormat::WebP)
        );
        assert_eq!(ImageFormat::from_magic_bytes(b"hello world!"), None);
    }

    #[test]
    fn test_reference_image_encoding() {
        let image = ReferenceImage::from_bytes(JPEG_MAGIC.to_vec()).unwrap();
        assert_eq!(image.mime_type, "image/jpeg");

        let payload = image.to_payload();
        assert_eq!(payload.mime_type, "image/jpeg");
        assert_eq!(payload.decode().unwrap(), JPEG_MAGIC.to_vec());
    }

    #[test]
    fn test_reference_image_unknown_format() {
        let err = ReferenceImage::from_bytes(b"plain text".to_vec()).unwrap_err();
        assert!(matches!(err, CharVizError::Validation(_)));
    }

    #[test]
    fn test_reference_image_from_path_uses_extension_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("face.webp");
        std::fs::write(&path, b"not really webp").unwrap();

        let image = ReferenceImage::from_path(&path).unwrap();
        assert_eq!(image.mime_type, "image/webp");
    }

    #[test]
    fn test_data_uri() {
        let payload = ImagePayload::new("image/png", "iVBORw0KGgo=");
        assert_eq!(payload.to_data_uri(), "data:image/png;base64,iVBORw0KGgo=");
        assert_eq!(
            ImagePayload::from_data_uri("data:image/png;base64,iVBORw0KGgo=").unwrap(),
            payload
        );
        assert!(ImagePayload::from_data_uri("https://example.com/a.png").is_err());
    }

    #[test]
    fn test_payload_extension() {
        assert_eq!(ImagePayload::new("image/jpeg", "").extension(), "jpg");
        assert_eq!(ImagePayload::new("image/x-unknown", "").extension(), "png");
    }

    #[test]
    fn test_generated_image_save() {
        let dir = tempfile::tempdir().unwrap();
        let image = GeneratedImage::new("img-1-0", ImagePayload::new("image/png", "iVBORw0KGgo="));

        let path = image.save(dir.path(), 1).unwrap();
        assert_eq!(path.file_name().unwrap(), "character_2.png");
        assert_eq!(
            std::fs::read(&path).unwrap(),
            vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]
        );
    }
}
