//! Photo normalization.
//!
//! Selected images are downscaled so their longest edge fits a fixed bound,
//! re-encoded as JPEG and stored inline as `data:` URLs. Normalization is
//! best-effort: inputs that are not images or fail to decode are skipped.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageDecoder, ImageReader};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{Error, Result};

/// Upper bound on photos attached to one entry.
pub const MAX_PHOTOS_PER_ENTRY: usize = 5;

const JPEG_DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// An inline image, stored as a `data:<media type>;base64,<payload>` URL.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Photo(String);

impl Photo {
    /// Wrap JPEG bytes as a data URL.
    #[must_use]
    pub fn from_jpeg(bytes: &[u8]) -> Self {
        Self(format!("{JPEG_DATA_URL_PREFIX}{}", BASE64.encode(bytes)))
    }

    /// Wrap an existing data URL without inspecting it.
    #[must_use]
    pub fn from_data_url(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// The data URL.
    #[must_use]
    pub fn as_data_url(&self) -> &str {
        &self.0
    }

    /// Media type declared by the data URL, e.g. `image/jpeg`.
    #[must_use]
    pub fn media_type(&self) -> Option<&str> {
        let rest = self.0.strip_prefix("data:")?;
        let end = rest.find(|c| c == ';' || c == ',')?;
        Some(&rest[..end])
    }

    /// Decode the base64 payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not a base64 data URL.
    pub fn decode(&self) -> Result<Vec<u8>> {
        let (header, payload) = self
            .0
            .split_once(',')
            .ok_or_else(|| Error::entry_validation("photo is not a data URL"))?;
        if !header.starts_with("data:") || !header.ends_with(";base64") {
            return Err(Error::entry_validation("photo is not a base64 data URL"));
        }
        BASE64
            .decode(payload)
            .map_err(|e| Error::entry_validation(format!("photo payload is not base64: {e}")))
    }
}

impl std::fmt::Debug for Photo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Photo")
            .field("media_type", &self.media_type())
            .field("len", &self.0.len())
            .finish()
    }
}

/// Downscales and re-encodes selected images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotoNormalizer {
    /// Longest edge of an output image, in pixels.
    pub max_edge: u32,
    /// JPEG quality, 1-100.
    pub jpeg_quality: u8,
    /// Maximum number of outputs.
    pub max_photos: usize,
}

impl Default for PhotoNormalizer {
    fn default() -> Self {
        Self {
            max_edge: 1600,
            jpeg_quality: 80,
            max_photos: MAX_PHOTOS_PER_ENTRY,
        }
    }
}

impl PhotoNormalizer {
    /// Normalize the files at `paths`, in order.
    ///
    /// Unreadable files, non-images and images that fail to decode are
    /// skipped. At most `max_photos` photos are returned.
    #[must_use]
    pub fn normalize<P: AsRef<Path>>(&self, paths: &[P]) -> Vec<Photo> {
        let limit = self.max_photos.min(MAX_PHOTOS_PER_ENTRY);
        let mut photos = Vec::with_capacity(limit.min(paths.len()));

        for path in paths {
            if photos.len() >= limit {
                debug!("Photo limit of {} reached, ignoring the rest", limit);
                break;
            }
            let path = path.as_ref();
            let bytes = match std::fs::read(path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    debug!("Skipping unreadable file {}: {}", path.display(), e);
                    continue;
                }
            };
            if image::guess_format(&bytes).is_err() {
                debug!("Skipping non-image file {}", path.display());
                continue;
            }
            match self.normalize_bytes(&bytes) {
                Ok(photo) => photos.push(photo),
                Err(e) => debug!("Skipping {}: {}", path.display(), e),
            }
        }

        photos
    }

    /// Normalize owned paths; convenience for moving work onto a blocking thread.
    #[must_use]
    pub fn normalize_owned(self, paths: Vec<PathBuf>) -> Vec<Photo> {
        self.normalize(&paths)
    }

    /// Normalize one encoded image.
    ///
    /// An EXIF orientation tag is applied before scaling, so the stored
    /// photo is upright.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ImageDecode`] if the bytes are not a decodable image and
    /// [`Error::ImageEncode`] if JPEG encoding fails.
    pub fn normalize_bytes(&self, bytes: &[u8]) -> Result<Photo> {
        let decoded = decode_upright(bytes)?;
        let (width, height) = decoded.dimensions();
        let (target_w, target_h) = scaled_dimensions(width, height, self.max_edge);

        let resized = if (target_w, target_h) == (width, height) {
            decoded
        } else {
            decoded.resize_exact(target_w, target_h, FilterType::CatmullRom)
        };
        trace!(
            "Normalized {}x{} image to {}x{}",
            width,
            height,
            target_w,
            target_h
        );

        // JPEG carries no alpha channel.
        let rgb = resized.to_rgb8();
        drop(resized);

        let mut buf = Vec::new();
        JpegEncoder::new_with_quality(&mut buf, self.jpeg_quality)
            .encode_image(&rgb)
            .map_err(Error::ImageEncode)?;

        Ok(Photo::from_jpeg(&buf))
    }
}

/// Decode an image and rotate or flip it as its EXIF orientation says.
fn decode_upright(bytes: &[u8]) -> Result<DynamicImage> {
    let mut decoder = ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()?
        .into_decoder()
        .map_err(Error::ImageDecode)?;
    let orientation = decoder.orientation().map_err(Error::ImageDecode)?;
    let mut image = DynamicImage::from_decoder(decoder).map_err(Error::ImageDecode)?;
    image.apply_orientation(orientation);
    Ok(image)
}

/// Dimensions after scaling so the longest edge is at most `max_edge`.
///
/// Images already within bounds are left alone; edges are rounded to the
/// nearest pixel and never drop below one.
#[must_use]
pub fn scaled_dimensions(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest == 0 || longest <= max_edge {
        return (width, height);
    }
    let scale = f64::from(max_edge) / f64::from(longest);
    let scale_edge = |edge: u32| -> u32 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let scaled = (f64::from(edge) * scale).round() as u32;
        scaled.max(1)
    };
    (scale_edge(width), scale_edge(height))
}
