use std::sync::Arc;

use image::ImageFormat;
use sha2::{Digest, Sha256};

use crate::app::error::{ServiceError, ServiceResult};
use crate::app::forms::{FormErrors, Upload};
use crate::infra::storage::MediaStore;

const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

#[derive(Clone)]
pub struct MediaService {
    store: Arc<dyn MediaStore>,
}

/// An upload that decoded as an image, not yet stored.
#[derive(Debug, Clone)]
pub struct CheckedImage {
    pub key: String,
    pub content_type: &'static str,
    upload: Upload,
}

impl MediaService {
    pub fn new(store: Arc<dyn MediaStore>) -> Self {
        Self { store }
    }

    /// Decodes the upload; the returned key is derived from the content, so
    /// re-uploading the same picture reuses the stored object.
    pub fn check_image(&self, upload: Upload) -> ServiceResult<CheckedImage> {
        let format = image::guess_format(&upload.data)
            .map_err(|_| ServiceError::Validation(FormErrors::single("image", INVALID_IMAGE)))?;
        if image::load_from_memory_with_format(&upload.data, format).is_err() {
            return Err(ServiceError::Validation(FormErrors::single(
                "image",
                INVALID_IMAGE,
            )));
        }

        let extension = format.extensions_str().first().copied().unwrap_or("img");
        let digest = hex::encode(Sha256::digest(&upload.data));

        Ok(CheckedImage {
            key: format!("posts/{}.{}", digest, extension),
            content_type: content_type_for(format),
            upload,
        })
    }

    pub async fn store(&self, image: CheckedImage) -> ServiceResult<String> {
        self.store
            .put(&image.key, image.upload.data, image.content_type)
            .await?;
        tracing::debug!(
            key = %image.key,
            file_name = ?image.upload.file_name,
            "stored post image"
        );
        Ok(image.key)
    }

    pub fn url(&self, key: &str) -> String {
        self.store.url(key)
    }
}

fn content_type_for(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Gif => "image/gif",
        ImageFormat::WebP => "image/webp",
        _ => "application/octet-stream",
    }
}
