// src/services/orchestrator.rs
use crate::errors::TerrainError;
use crate::models::{CombinedResult, UploadedImage};
use crate::services::{ImageCodec, ModelGenerator, SceneAnalyzer};
use log::{error, info};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Runs model generation and scene analysis side by side for one upload.
pub struct Orchestrator {
    codec: ImageCodec,
    model_generator: Arc<dyn ModelGenerator>,
    scene_analyzer: Arc<dyn SceneAnalyzer>,
}

impl Orchestrator {
    pub fn new(
        codec: ImageCodec,
        model_generator: Arc<dyn ModelGenerator>,
        scene_analyzer: Arc<dyn SceneAnalyzer>,
    ) -> Self {
        Self {
            codec,
            model_generator,
            scene_analyzer,
        }
    }

    pub fn codec(&self) -> &ImageCodec {
        &self.codec
    }

    pub async fn run(
        &self,
        image: UploadedImage,
        description: &str,
    ) -> Result<CombinedResult, TerrainError> {
        let start = Instant::now();
        let request_id = Uuid::new_v4();

        if description.trim().is_empty() {
            return Err(TerrainError::Validation("Description is required".to_string()));
        }
        let mime = self.codec.validate(&image)?;
        let encoded = self.codec.encode_reader(image.data.as_slice(), mime)?;
        drop(image);

        info!(
            "[{}] Processing terrain: {} bytes of base64 {}",
            request_id,
            encoded.data.len(),
            mime.as_str()
        );

        // Both futures always run to completion; neither failure cancels the other.
        let (model, analysis) = tokio::join!(
            self.model_generator.generate(&encoded),
            self.scene_analyzer.analyze(&encoded, description),
        );

        let (model_url, analysis) = match (model, analysis) {
            (Ok(model_url), Ok(analysis)) => (model_url, analysis),
            (Err(model_err), Err(analysis_err)) => {
                error!("[{}] Scene analysis also failed: {}", request_id, analysis_err);
                return Err(model_err);
            }
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => {
                error!("[{}] Terrain processing failed: {}", request_id, e);
                return Err(e);
            }
        };

        let processing_time = start.elapsed().as_millis() as u64;
        info!(
            "[{}] Terrain processed in {}ms: {}",
            request_id, processing_time, model_url
        );

        Ok(CombinedResult {
            model_url,
            analysis,
            processing_time,
        })
    }
}
