//! Profile image upload validation.
//!
//! Uploaded bytes are sniffed rather than trusting the client's declared
//! content type, and the header is decoded far enough to read dimensions so
//! truncated or disguised files are rejected before they reach storage.

use std::io::Cursor;

use image::{ImageFormat, ImageReader};

use crate::error::ServiceError;

/// Default maximum upload size: 5 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Largest width or height accepted for a profile image.
pub const MAX_IMAGE_DIMENSION: u32 = 8192;

/// Image formats accepted as profile pictures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageKind {
    fn from_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(ImageKind::Jpeg),
            ImageFormat::Png => Some(ImageKind::Png),
            ImageFormat::Gif => Some(ImageKind::Gif),
            ImageFormat::WebP => Some(ImageKind::Webp),
            _ => None,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
            ImageKind::Gif => "image/gif",
            ImageKind::Webp => "image/webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            ImageKind::Png => "png",
            ImageKind::Gif => "gif",
            ImageKind::Webp => "webp",
        }
    }
}

/// Result of inspecting an uploaded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub kind: ImageKind,
    pub width: u32,
    pub height: u32,
}

/// Validate an uploaded profile image.
///
/// # Errors
///
/// - [`ServiceError::EmptyFile`] for zero-length uploads
/// - [`ServiceError::PayloadTooLarge`] when `data` exceeds `max_bytes`
/// - [`ServiceError::UnsupportedImage`] when the format is not accepted, the
///   header cannot be decoded, or a side exceeds [`MAX_IMAGE_DIMENSION`]
pub fn inspect_image(data: &[u8], max_bytes: usize) -> Result<ImageInfo, ServiceError> {
    if data.is_empty() {
        return Err(ServiceError::EmptyFile);
    }
    if data.len() > max_bytes {
        return Err(ServiceError::PayloadTooLarge {
            size: data.len(),
            max: max_bytes,
        });
    }

    let format = image::guess_format(data).map_err(|_| ServiceError::UnsupportedImage {
        reason: "unrecognized image format".to_string(),
    })?;

    let kind = ImageKind::from_format(format).ok_or_else(|| ServiceError::UnsupportedImage {
        reason: format!(
            "{:?} is not accepted (use JPEG, PNG, GIF or WebP)",
            format
        ),
    })?;

    let (width, height) = ImageReader::with_format(Cursor::new(data), format)
        .into_dimensions()
        .map_err(|e| ServiceError::UnsupportedImage {
            reason: format!("cannot read image header: {}", e),
        })?;

    if width == 0 || height == 0 || width > MAX_IMAGE_DIMENSION || height > MAX_IMAGE_DIMENSION {
        return Err(ServiceError::UnsupportedImage {
            reason: format!(
                "dimensions {}x{} outside 1..={} px",
                width, height, MAX_IMAGE_DIMENSION
            ),
        });
    }

    Ok(ImageInfo {
        kind,
        width,
        height,
    })
}
