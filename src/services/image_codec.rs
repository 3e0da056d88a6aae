// src/services/image_codec.rs
use crate::errors::TerrainError;
use crate::models::{EncodedImage, ImageMime, UploadedImage};
use base64::{Engine as _, engine::general_purpose};
use std::io::Read;

pub struct ImageCodec {
    max_bytes: usize,
}

impl ImageCodec {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Checks the declared type and the byte size of an upload.
    pub fn validate(&self, image: &UploadedImage) -> Result<ImageMime, TerrainError> {
        let mime = ImageMime::from_content_type(&image.content_type).ok_or_else(|| {
            TerrainError::Validation(
                "Invalid image format. Only JPEG and PNG are supported.".to_string(),
            )
        })?;

        self.check_size(image.size)?;

        Ok(mime)
    }

    pub fn check_size(&self, size: usize) -> Result<(), TerrainError> {
        if size > self.max_bytes {
            return Err(TerrainError::Validation(format!(
                "Image size must be less than {}MB",
                self.max_bytes / (1024 * 1024)
            )));
        }
        Ok(())
    }

    pub fn encode(&self, data: &[u8], mime: ImageMime) -> EncodedImage {
        EncodedImage {
            data: general_purpose::STANDARD.encode(data),
            mime,
        }
    }

    pub fn encode_reader<R: Read>(
        &self,
        mut reader: R,
        mime: ImageMime,
    ) -> Result<EncodedImage, TerrainError> {
        let mut data = Vec::new();
        reader
            .read_to_end(&mut data)
            .map_err(|e| TerrainError::Encoding(e.to_string()))?;
        Ok(self.encode(&data, mime))
    }
}
