//! # attache-transform
//!
//! Derives new stored objects from existing ones: on-demand thumbnails
//! (cached by derived key, no metadata record) and materialized crops.
//! Works over any [`Storage`] backend.

use std::io::Cursor;
use std::sync::Arc;

use bytes::Bytes;
use image::{DynamicImage, ImageFormat};
use thiserror::Error;
use tracing::{debug, instrument};

use attache_storage::{Storage, StorageError};

/// Transform errors
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("source is not a decodable image: {0}")]
    Decode(String),
    #[error("failed to encode derived image: {0}")]
    Encode(String),
    #[error("crop region {width}x{height}+{origin_x}+{origin_y} exceeds image bounds")]
    InvalidRegion {
        width: u32,
        height: u32,
        origin_x: u32,
        origin_y: u32,
    },
}

pub type TransformResult<T> = Result<T, TransformError>;

/// Image transform service over a storage backend
pub struct ImageTransformer<S: Storage> {
    storage: Arc<S>,
}

impl<S: Storage> ImageTransformer<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Derive a thumbnail no larger than `width` x `height` (aspect
    /// preserved) and return its URL. The derived object is cached under a
    /// deterministic sibling key; repeat calls skip re-rendering.
    #[instrument(skip(self))]
    pub async fn thumbnail(&self, key: &str, width: u32, height: u32) -> TransformResult<String> {
        let derived = derived_key(key, &format!("thumb_{}x{}", width, height));

        if self.storage.exists(&derived).await? {
            debug!(key = %derived, "thumbnail cache hit");
            return Ok(self.storage.url(&derived).await?);
        }

        let source = self.decode(key).await?;
        let thumb = source.thumbnail(width, height);

        self.storage.put(&derived, encode_png(&thumb)?).await?;
        debug!(source = key, key = %derived, "thumbnail rendered");

        Ok(self.storage.url(&derived).await?)
    }

    /// Crop a `width` x `height` region at `(origin_x, origin_y)` out of the
    /// source and materialize it as a new sibling object, returning its URL.
    /// Crops are never cached; every call writes a fresh object.
    #[instrument(skip(self))]
    pub async fn crop(
        &self,
        key: &str,
        width: u32,
        height: u32,
        origin_x: u32,
        origin_y: u32,
    ) -> TransformResult<String> {
        let source = self.decode(key).await?;

        if origin_x.saturating_add(width) > source.width()
            || origin_y.saturating_add(height) > source.height()
            || width == 0
            || height == 0
        {
            return Err(TransformError::InvalidRegion {
                width,
                height,
                origin_x,
                origin_y,
            });
        }

        let cropped = source.crop_imm(origin_x, origin_y, width, height);
        let derived = derived_key(
            key,
            &format!("crop_{}x{}_{}_{}", width, height, origin_x, origin_y),
        );

        self.storage.put(&derived, encode_png(&cropped)?).await?;
        debug!(source = key, key = %derived, "crop materialized");

        Ok(self.storage.url(&derived).await?)
    }

    async fn decode(&self, key: &str) -> TransformResult<DynamicImage> {
        let data = self.storage.get(key).await?;
        image::load_from_memory(&data).map_err(|e| TransformError::Decode(e.to_string()))
    }
}

/// Sibling key for a derived object: the source's extension is replaced by
/// the derivation suffix and the PNG extension all derivatives are encoded
/// with.
fn derived_key(source: &str, suffix: &str) -> String {
    let stem = match source.rsplit_once('.') {
        // Guard against dots in directory names
        Some((stem, ext)) if !ext.contains('/') => stem,
        _ => source,
    };
    format!("{}_{}.png", stem, suffix)
}

fn encode_png(img: &DynamicImage) -> TransformResult<Bytes> {
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| TransformError::Encode(e.to_string()))?;
    Ok(Bytes::from(buffer.into_inner()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use attache_storage::MemoryStorage;
    use image::{Rgba, RgbaImage};

    /// Encode a solid-color test image as PNG bytes
    fn png_fixture(width: u32, height: u32) -> Bytes {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 30, 30, 255]));
        encode_png(&DynamicImage::ImageRgba8(img)).unwrap()
    }

    async fn transformer_with(
        key: &str,
        data: Bytes,
    ) -> (Arc<MemoryStorage>, ImageTransformer<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        storage.put(key, data).await.unwrap();
        (storage.clone(), ImageTransformer::new(storage))
    }

    #[tokio::test]
    async fn test_thumbnail_writes_derived_object() {
        let (storage, transformer) = transformer_with("img/photo.png", png_fixture(64, 32)).await;

        let url = transformer.thumbnail("img/photo.png", 16, 16).await.unwrap();
        assert_eq!(url, "memory://img/photo_thumb_16x16.png");

        let derived = storage.get("img/photo_thumb_16x16.png").await.unwrap();
        let thumb = image::load_from_memory(&derived).unwrap();
        // Aspect preserved: 64x32 bounded by 16x16 becomes 16x8
        assert_eq!((thumb.width(), thumb.height()), (16, 8));
    }

    #[tokio::test]
    async fn test_thumbnail_is_cached() {
        let (storage, transformer) = transformer_with("photo.png", png_fixture(32, 32)).await;

        let first = transformer.thumbnail("photo.png", 8, 8).await.unwrap();
        // Poison the source; a cache hit never re-decodes it
        storage
            .put("photo.png", Bytes::from_static(b"not an image"))
            .await
            .unwrap();
        let second = transformer.thumbnail("photo.png", 8, 8).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_crop_materializes_new_object() {
        let (storage, transformer) = transformer_with("img/src.png", png_fixture(40, 40)).await;

        let url = transformer.crop("img/src.png", 10, 20, 5, 5).await.unwrap();
        assert_eq!(url, "memory://img/src_crop_10x20_5_5.png");

        let derived = storage.get("img/src_crop_10x20_5_5.png").await.unwrap();
        let cropped = image::load_from_memory(&derived).unwrap();
        assert_eq!((cropped.width(), cropped.height()), (10, 20));
    }

    #[tokio::test]
    async fn test_crop_out_of_bounds() {
        let (_storage, transformer) = transformer_with("src.png", png_fixture(16, 16)).await;

        let result = transformer.crop("src.png", 16, 16, 8, 8).await;
        assert!(matches!(result, Err(TransformError::InvalidRegion { .. })));
    }

    #[tokio::test]
    async fn test_non_image_source_fails_decode() {
        let (_storage, transformer) =
            transformer_with("doc.txt", Bytes::from_static(b"plain text")).await;

        let result = transformer.thumbnail("doc.txt", 8, 8).await;
        assert!(matches!(result, Err(TransformError::Decode(_))));
    }

    #[tokio::test]
    async fn test_missing_source_is_storage_not_found() {
        let storage = Arc::new(MemoryStorage::new());
        let transformer = ImageTransformer::new(storage);

        let result = transformer.thumbnail("ghost.png", 8, 8).await;
        assert!(matches!(
            result,
            Err(TransformError::Storage(StorageError::NotFound(_)))
        ));
    }

    #[test]
    fn test_derived_key_shapes() {
        assert_eq!(derived_key("a/b.png", "thumb_4x4"), "a/b_thumb_4x4.png");
        assert_eq!(derived_key("noext", "thumb_4x4"), "noext_thumb_4x4.png");
        assert_eq!(derived_key("d.ir/file", "s"), "d.ir/file_s.png");
    }
}
