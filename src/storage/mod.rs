use error_stack::{Report, Result, ResultExt};
use image::imageops::FilterType;
use image::GenericImageView;
use mime::Mime;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

use crate::config;

/// Canonical featured-image size every upload is resized to.
const FEATURED_WIDTH: u32 = 800;
const FEATURED_HEIGHT: u32 = 455;

// Featured images render in a 16:9-ish slot.
const MIN_ASPECT_RATIO: f64 = 1.7;
const MAX_ASPECT_RATIO: f64 = 1.8;
const MIN_DIMENSIONS: (u32, u32) = (535, 300);
const MAX_DIMENSIONS: (u32, u32) = (1600, 900);

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("uploaded file is empty")]
    Empty,
    #[error("uploaded file exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },
    #[error("media type {0:?} is not in the allow-list")]
    UnsupportedType(String),
    #[error("uploaded file could not be decoded as an image")]
    NotAnImage,
    #[error("image dimensions {width}x{height} are outside the accepted band")]
    BadDimensions { width: u32, height: u32 },
    #[error("failed to store image asset")]
    Storage,
}

/// Validates, stores and removes featured-image assets on the local
/// filesystem. References handed out are paths relative to the upload
/// root, usable later for `delete`.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
    max_size_bytes: u64,
    allowed_types: Vec<Mime>,
}

impl ImageStore {
    #[must_use]
    pub fn new(config: &config::Uploads) -> Self {
        Self {
            root: config.root_dir.clone(),
            max_size_bytes: config.max_size_bytes,
            // entries were parse-checked when the config loaded
            allowed_types: config
                .allowed_types
                .iter()
                .filter_map(|v| v.parse().ok())
                .collect(),
        }
    }

    /// Checks size, declared media type and decoded pixel dimensions
    /// without touching the filesystem.
    pub fn validate(&self, bytes: &[u8], declared_type: &Mime) -> Result<(), ImageError> {
        if bytes.is_empty() {
            return Err(Report::new(ImageError::Empty));
        }

        if bytes.len() as u64 > self.max_size_bytes {
            return Err(Report::new(ImageError::TooLarge {
                limit: self.max_size_bytes,
            }));
        }

        if !self
            .allowed_types
            .iter()
            .any(|allowed| allowed.essence_str() == declared_type.essence_str())
        {
            return Err(Report::new(ImageError::UnsupportedType(
                declared_type.essence_str().to_string(),
            )));
        }

        let decoded = image::load_from_memory(bytes)
            .change_context(ImageError::NotAnImage)?;

        let (width, height) = decoded.dimensions();
        let aspect_ratio = f64::from(width) / f64::from(height);
        let within_band = (MIN_ASPECT_RATIO..=MAX_ASPECT_RATIO).contains(&aspect_ratio)
            && width >= MIN_DIMENSIONS.0
            && height >= MIN_DIMENSIONS.1
            && width <= MAX_DIMENSIONS.0
            && height <= MAX_DIMENSIONS.1;

        if !within_band {
            return Err(Report::new(ImageError::BadDimensions { width, height }));
        }

        Ok(())
    }

    /// Validates, resizes to the canonical featured size and writes the
    /// file under a generated unique name. Returns the stable reference
    /// for the stored asset.
    #[tracing::instrument(skip(self, bytes), name = "storage.images.save")]
    pub async fn save(
        &self,
        bytes: Vec<u8>,
        declared_type: &Mime,
        subfolder: &str,
    ) -> Result<String, ImageError> {
        self.validate(&bytes, declared_type)?;

        // Decode + resize + re-encode is CPU-bound; keep it off the
        // async workers.
        let encoded = tokio::task::spawn_blocking(move || -> Result<(Vec<u8>, &str), ImageError> {
            let format = image::guess_format(&bytes).change_context(ImageError::NotAnImage)?;
            let decoded =
                image::load_from_memory(&bytes).change_context(ImageError::NotAnImage)?;
            let resized = decoded.resize_exact(FEATURED_WIDTH, FEATURED_HEIGHT, FilterType::Lanczos3);

            let mut out = std::io::Cursor::new(Vec::new());
            resized
                .write_to(&mut out, format)
                .change_context(ImageError::Storage)?;

            let extension = format.extensions_str().first().copied().unwrap_or("img");
            Ok((out.into_inner(), extension))
        })
        .await
        .change_context(ImageError::Storage)?;
        let (encoded, extension) = encoded?;

        let file_name = format!("{}.{extension}", Uuid::new_v4());
        let directory = self.root.join(subfolder);
        tokio::fs::create_dir_all(&directory)
            .await
            .change_context(ImageError::Storage)?;
        tokio::fs::write(directory.join(&file_name), encoded)
            .await
            .change_context(ImageError::Storage)?;

        if subfolder.is_empty() {
            Ok(file_name)
        } else {
            Ok(format!("{subfolder}/{file_name}"))
        }
    }

    /// Best-effort removal. A reference that no longer resolves is not
    /// an error.
    #[tracing::instrument(skip(self), name = "storage.images.delete")]
    pub async fn delete(&self, reference: &str) -> bool {
        // references are store-generated; anything pointing outside the
        // root is not ours to delete
        if Path::new(reference)
            .components()
            .any(|c| !matches!(c, std::path::Component::Normal(..)))
        {
            return false;
        }

        tokio::fs::remove_file(self.root.join(reference)).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Uploads;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        use image::{ImageBuffer, Rgb};

        let buffer = ImageBuffer::from_pixel(width, height, Rgb::<u8>([120, 80, 200]));
        let mut out = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(buffer)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn store_in(dir: &Path) -> ImageStore {
        ImageStore::new(&Uploads {
            root_dir: dir.to_path_buf(),
            ..Uploads::default()
        })
    }

    #[test]
    fn accepts_a_well_formed_featured_image() {
        let store = store_in(Path::new("unused"));
        // 800x455 sits inside the aspect band
        assert!(store.validate(&png_bytes(800, 455), &mime::IMAGE_PNG).is_ok());
    }

    #[test]
    fn rejects_bad_inputs() {
        let store = store_in(Path::new("unused"));

        assert!(store.validate(&[], &mime::IMAGE_PNG).is_err());
        assert!(store.validate(b"not an image at all", &mime::IMAGE_PNG).is_err());
        assert!(store
            .validate(&png_bytes(800, 455), &"application/pdf".parse().unwrap())
            .is_err());
        // square violates the aspect band
        assert!(store.validate(&png_bytes(600, 600), &mime::IMAGE_PNG).is_err());
        // too small even at the right ratio
        assert!(store.validate(&png_bytes(350, 200), &mime::IMAGE_PNG).is_err());
    }

    #[test]
    fn rejects_oversized_files() {
        let dir = Path::new("unused");
        let store = ImageStore::new(&Uploads {
            root_dir: dir.to_path_buf(),
            max_size_bytes: 16,
            ..Uploads::default()
        });
        assert!(store.validate(&png_bytes(800, 455), &mime::IMAGE_PNG).is_err());
    }

    #[tokio::test]
    async fn save_then_delete_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        let reference = store
            .save(png_bytes(1600, 900), &mime::IMAGE_PNG, "featured")
            .await
            .unwrap();
        assert!(reference.starts_with("featured/"));
        assert!(dir.path().join(&reference).exists());

        assert!(store.delete(&reference).await);
        assert!(!dir.path().join(&reference).exists());

        // deleting again is a no-op, not an error
        assert!(!store.delete(&reference).await);
    }

    #[tokio::test]
    async fn delete_never_escapes_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        assert!(!store.delete("../outside.png").await);
    }
}
