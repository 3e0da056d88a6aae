// src/services/model_generation.rs
use crate::config::{ModelGenerationConfig, PollPolicy};
use crate::errors::TerrainError;
use crate::models::{EncodedImage, GenerationJob, JobHandle, JobStatus};
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Client;
use serde_json::{Value, json};

/// Remote task API used by the model generation client.
#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn create_task(&self, image: &EncodedImage) -> Result<JobHandle, TerrainError>;
    async fn fetch_task(&self, handle: &JobHandle) -> Result<GenerationJob, TerrainError>;
}

/// Produces a downloadable 3D model reference from an image.
#[async_trait]
pub trait ModelGenerator: Send + Sync {
    async fn generate(&self, image: &EncodedImage) -> Result<String, TerrainError>;
}

type UrlExtractor = fn(&Value) -> Option<&str>;

fn output_pbr_model(data: &Value) -> Option<&str> {
    data["output"]["pbr_model"].as_str()
}

fn result_pbr_model(data: &Value) -> Option<&str> {
    data["result"]["pbr_model"]["url"].as_str()
}

fn output_model(data: &Value) -> Option<&str> {
    data["output"]["model"].as_str()
}

fn result_model(data: &Value) -> Option<&str> {
    data["result"]["model"]["url"].as_str()
}

// The task API nests the finished asset under different keys depending on
// the response variant. Tried in order; the first hit wins.
const MODEL_URL_EXTRACTORS: &[UrlExtractor] =
    &[output_pbr_model, result_pbr_model, output_model, result_model];

pub fn extract_model_url(data: &Value) -> Option<String> {
    MODEL_URL_EXTRACTORS
        .iter()
        .find_map(|extract| extract(data).filter(|url| !url.is_empty()))
        .map(str::to_string)
}

pub struct Tripo3DApi {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl Tripo3DApi {
    pub fn new(client: Client, api_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn api_key(&self) -> Result<&str, TerrainError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| TerrainError::Configuration("TRIPO3D_API_KEY".to_string()))
    }
}

#[async_trait]
impl TaskApi for Tripo3DApi {
    async fn create_task(&self, image: &EncodedImage) -> Result<JobHandle, TerrainError> {
        let api_key = self.api_key()?;

        let response = self
            .client
            .post(format!("{}/task", self.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&json!({
                "type": "image_to_model",
                "file": {
                    "type": "base64",
                    "data": image.data
                }
            }))
            .send()
            .await
            .map_err(|e| TerrainError::Submission(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(TerrainError::Submission(format!(
                "{} - {}",
                status.as_u16(),
                error_text
            )));
        }

        let result: Value = response
            .json()
            .await
            .map_err(|e| TerrainError::Submission(format!("invalid response body: {}", e)))?;

        let task_id = result["data"]["task_id"]
            .as_str()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                TerrainError::Submission("invalid response: missing task_id".to_string())
            })?;

        Ok(JobHandle {
            task_id: task_id.to_string(),
        })
    }

    async fn fetch_task(&self, handle: &JobHandle) -> Result<GenerationJob, TerrainError> {
        let api_key = self.api_key()?;

        let response = self
            .client
            .get(format!("{}/task/{}", self.base_url, handle.task_id))
            .header("Authorization", format!("Bearer {}", api_key))
            .send()
            .await
            .map_err(|e| TerrainError::PollTransport(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(TerrainError::PollTransport(format!(
                "{} - {}",
                status.as_u16(),
                error_text
            )));
        }

        let result: Value = response
            .json()
            .await
            .map_err(|e| TerrainError::PollTransport(format!("invalid response body: {}", e)))?;

        let data = &result["data"];
        let status = data["status"].as_str().ok_or_else(|| {
            TerrainError::PollTransport("invalid response: missing status".to_string())
        })?;

        Ok(GenerationJob {
            task_id: handle.task_id.clone(),
            status: JobStatus::parse(status),
            progress: data["progress"].as_u64().map(|p| p.min(100) as u8),
            model_url: extract_model_url(data),
        })
    }
}

pub struct ModelGenerationClient<A> {
    api: A,
    policy: PollPolicy,
}

impl ModelGenerationClient<Tripo3DApi> {
    pub fn from_config(client: Client, config: &ModelGenerationConfig) -> Self {
        Self::new(
            Tripo3DApi::new(client, config.api_key.clone(), config.base_url.clone()),
            config.poll,
        )
    }
}

impl<A: TaskApi> ModelGenerationClient<A> {
    pub fn new(api: A, policy: PollPolicy) -> Self {
        Self { api, policy }
    }

    pub async fn submit(&self, image: &EncodedImage) -> Result<JobHandle, TerrainError> {
        self.api.create_task(image).await
    }

    /// Polls the job until it reaches a terminal state or the attempt budget
    /// runs out. Only non-terminal observations consume budget and sleep.
    pub async fn await_completion(&self, handle: &JobHandle) -> Result<String, TerrainError> {
        let max_attempts = self.policy.max_attempts;

        for attempt in 1..=max_attempts {
            let job = self.api.fetch_task(handle).await?;

            info!(
                "[Tripo3D] Attempt {}/{} - task {} status: {}{}",
                attempt,
                max_attempts,
                handle.task_id,
                job.status,
                job.progress
                    .map(|p| format!(" - progress: {}%", p))
                    .unwrap_or_default()
            );

            match job.status {
                JobStatus::Succeeded => {
                    return job
                        .model_url
                        .ok_or_else(|| TerrainError::MalformedResult(handle.task_id.clone()));
                }
                JobStatus::Failed => {
                    return Err(TerrainError::RemoteJobFailed {
                        task_id: handle.task_id.clone(),
                    });
                }
                JobStatus::Queued | JobStatus::Running => {}
                JobStatus::Other(ref status) => {
                    warn!(
                        "[Tripo3D] Unknown status '{}' for task {}, continuing to poll",
                        status, handle.task_id
                    );
                }
            }

            if attempt < max_attempts {
                tokio::time::sleep(self.policy.interval).await;
            }
        }

        Err(TerrainError::PollTimeout {
            task_id: handle.task_id.clone(),
            attempts: max_attempts,
        })
    }
}

#[async_trait]
impl<A: TaskApi> ModelGenerator for ModelGenerationClient<A> {
    async fn generate(&self, image: &EncodedImage) -> Result<String, TerrainError> {
        info!("[Tripo3D] Starting model generation...");
        let handle = self.submit(image).await?;
        info!("[Tripo3D] Task created with ID: {}", handle.task_id);
        let model_url = self.await_completion(&handle).await?;
        debug!("[Tripo3D] Model ready at: {}", model_url);
        Ok(model_url)
    }
}
