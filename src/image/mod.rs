//! Image types and the remote model seam.

mod provider;
pub mod providers;
mod types;

pub use provider::GenerativeModel;
pub use types::{GeneratedImage, ImageFormat, ImagePayload, ReferenceImage};
