// src/services/scene_analysis.rs
use crate::config::SceneAnalysisConfig;
use crate::errors::TerrainError;
use crate::models::{EncodedImage, SceneAnalysis};
use async_trait::async_trait;
use log::info;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Instant;

const SYSTEM_PROMPT: &str = "You are an expert in land assessment and real estate investment. \
Analyze terrain photos and provide structured investment recommendations. \
Respond ONLY with valid JSON.";

/// Produces a structured investment analysis of a terrain photo.
#[async_trait]
pub trait SceneAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        image: &EncodedImage,
        description: &str,
    ) -> Result<SceneAnalysis, TerrainError>;
}

pub struct SceneAnalysisClient {
    api_key: Option<String>,
    base_url: String,
    model: String,
    client: Client,
}

impl SceneAnalysisClient {
    pub fn new(client: Client, config: &SceneAnalysisConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            client,
        }
    }

    fn user_prompt(description: &str) -> String {
        format!(
            r#"Analyze this terrain and provide a structured analysis.

Description provided by the user: {description}

Return a JSON object with exactly this structure:
{{
  "constraints": {{
    "flood_risk": "low" | "moderate" | "high",
    "slope": "flat" | "slight" | "moderate" | "steep",
    "access": "direct_road" | "secondary_road" | "limited" | "difficult",
    "vegetation": "none" | "sparse" | "moderate" | "dense"
  }},
  "strengths": ["strength 1", "strength 2", "strength 3"],
  "projects": [
    {{
      "type": "residential" | "commercial" | "eco_hotel" | "green_park" | "industrial",
      "description": "Project description",
      "justification": "Why this project fits the terrain"
    }}
  ],
  "investors": ["Investor type 1", "Investor type 2"],
  "potential": "low" | "medium" | "medium-high" | "high"
}}"#
        )
    }
}

#[async_trait]
impl SceneAnalyzer for SceneAnalysisClient {
    async fn analyze(
        &self,
        image: &EncodedImage,
        description: &str,
    ) -> Result<SceneAnalysis, TerrainError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| TerrainError::Configuration("OPENAI_API_KEY".to_string()))?;

        let start = Instant::now();

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&json!({
                "model": self.model,
                "response_format": { "type": "json_object" },
                "messages": [
                    {
                        "role": "system",
                        "content": SYSTEM_PROMPT
                    },
                    {
                        "role": "user",
                        "content": [
                            {
                                "type": "text",
                                "text": Self::user_prompt(description)
                            },
                            {
                                "type": "image_url",
                                "image_url": {
                                    "url": image.data_uri(),
                                    "detail": "high"
                                }
                            }
                        ]
                    }
                ],
                "temperature": 0.7,
                "max_tokens": 1500
            }))
            .send()
            .await
            .map_err(|e| TerrainError::AnalysisRequest(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(TerrainError::AnalysisRequest(format!(
                "{} - {}",
                status.as_u16(),
                error_text
            )));
        }

        let result: Value = response
            .json()
            .await
            .map_err(|e| TerrainError::AnalysisRequest(format!("invalid response body: {}", e)))?;

        let content = result["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default();

        let analysis = parse_analysis(content)?;

        info!(
            "[OpenAI] Terrain analysis completed in {}ms (potential: {:?})",
            start.elapsed().as_millis(),
            analysis.potential
        );

        Ok(analysis)
    }
}

/// Parses the model's JSON content, requiring every top-level field.
pub fn parse_analysis(content: &str) -> Result<SceneAnalysis, TerrainError> {
    if content.trim().is_empty() {
        return Err(TerrainError::EmptyResponse);
    }

    let data: Value =
        serde_json::from_str(content).map_err(|e| TerrainError::Parse(e.to_string()))?;

    if !data.is_object() {
        return Err(TerrainError::Parse("expected a JSON object".to_string()));
    }

    let missing: Vec<&str> = SceneAnalysis::REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| data[*field].is_null())
        .collect();
    if !missing.is_empty() {
        return Err(TerrainError::IncompleteAnalysis(missing.join(", ")));
    }

    serde_json::from_value(data).map_err(|e| TerrainError::Parse(e.to_string()))
}
