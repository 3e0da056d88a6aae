// src/services/mod.rs
pub mod image_codec;
pub mod model_generation;
pub mod orchestrator;
pub mod relay;
pub mod scene_analysis;

pub use image_codec::ImageCodec;
pub use model_generation::{ModelGenerationClient, ModelGenerator};
pub use orchestrator::Orchestrator;
pub use relay::ModelRelay;
pub use scene_analysis::{SceneAnalysisClient, SceneAnalyzer};
