// src/models.rs
use serde::{Deserialize, Serialize};

/// Image formats accepted at ingress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMime {
    Jpeg,
    Png,
}

impl ImageMime {
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        match content_type.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(ImageMime::Jpeg),
            "image/png" => Some(ImageMime::Png),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageMime::Jpeg => "image/jpeg",
            ImageMime::Png => "image/png",
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub data: Vec<u8>,
    pub content_type: String,
    pub size: usize,
}

impl UploadedImage {
    pub fn new(data: Vec<u8>, content_type: impl Into<String>) -> Self {
        let size = data.len();
        Self {
            data,
            content_type: content_type.into(),
            size,
        }
    }
}

/// Base64 form of an uploaded image, ready for remote submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data: String,
    pub mime: ImageMime,
}

impl EncodedImage {
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime.as_str(), self.data)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub task_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Other(String),
}

impl JobStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "queued" => JobStatus::Queued,
            "running" => JobStatus::Running,
            "success" | "succeeded" => JobStatus::Succeeded,
            "failed" => JobStatus::Failed,
            other => JobStatus::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Queued => f.write_str("queued"),
            JobStatus::Running => f.write_str("running"),
            JobStatus::Succeeded => f.write_str("succeeded"),
            JobStatus::Failed => f.write_str("failed"),
            JobStatus::Other(s) => f.write_str(s),
        }
    }
}

/// One observation of the remote generation job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationJob {
    pub task_id: String,
    pub status: JobStatus,
    pub progress: Option<u8>,
    pub model_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FloodRisk {
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slope {
    Flat,
    Slight,
    Moderate,
    Steep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    DirectRoad,
    SecondaryRoad,
    Limited,
    Difficult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vegetation {
    None,
    Sparse,
    Moderate,
    Dense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    Residential,
    Commercial,
    EcoHotel,
    GreenPark,
    Industrial,
}

/// Investment potential, ordered from lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Potential {
    Low,
    Medium,
    MediumHigh,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainConstraints {
    pub flood_risk: FloodRisk,
    pub slope: Slope,
    pub access: Access,
    pub vegetation: Vegetation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecommendation {
    #[serde(rename = "type")]
    pub project_type: ProjectType,
    pub description: String,
    pub justification: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneAnalysis {
    pub constraints: TerrainConstraints,
    pub strengths: Vec<String>,
    pub projects: Vec<ProjectRecommendation>,
    pub investors: Vec<String>,
    pub potential: Potential,
}

impl SceneAnalysis {
    /// Top-level fields that must be present and non-null.
    pub const REQUIRED_FIELDS: [&'static str; 5] =
        ["constraints", "strengths", "projects", "investors", "potential"];
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedResult {
    pub model_url: String,
    pub analysis: SceneAnalysis,
    /// Milliseconds from orchestration start to both operations complete.
    pub processing_time: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn potential_is_ordered() {
        assert!(Potential::Low < Potential::Medium);
        assert!(Potential::Medium < Potential::MediumHigh);
        assert!(Potential::MediumHigh < Potential::High);
        let parsed: Potential = serde_json::from_str("\"medium-high\"").unwrap();
        assert_eq!(parsed, Potential::MediumHigh);
    }

    #[test]
    fn content_types_map_to_mime() {
        assert_eq!(ImageMime::from_content_type("image/jpg"), Some(ImageMime::Jpeg));
        assert_eq!(ImageMime::from_content_type("IMAGE/PNG"), Some(ImageMime::Png));
        assert_eq!(ImageMime::from_content_type("image/gif"), None);
    }

    #[test]
    fn job_status_accepts_both_success_spellings() {
        assert_eq!(JobStatus::parse("success"), JobStatus::Succeeded);
        assert_eq!(JobStatus::parse("succeeded"), JobStatus::Succeeded);
        assert_eq!(
            JobStatus::parse("banned"),
            JobStatus::Other("banned".to_string())
        );
    }

    #[test]
    fn combined_result_uses_camel_case_keys() {
        let analysis: SceneAnalysis = serde_json::from_value(serde_json::json!({
            "constraints": {
                "flood_risk": "low",
                "slope": "flat",
                "access": "direct_road",
                "vegetation": "sparse"
            },
            "strengths": ["flat"],
            "projects": [{
                "type": "eco_hotel",
                "description": "Lodges",
                "justification": "Quiet area"
            }],
            "investors": ["Hospitality funds"],
            "potential": "high"
        }))
        .unwrap();
        let result = CombinedResult {
            model_url: "https://tripo3d.com/m.glb".to_string(),
            analysis,
            processing_time: 1200,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["modelUrl"], "https://tripo3d.com/m.glb");
        assert_eq!(value["processingTime"], 1200);
        assert_eq!(value["analysis"]["projects"][0]["type"], "eco_hotel");
    }
}
