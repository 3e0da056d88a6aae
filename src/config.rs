// src/config.rs
use crate::errors::ConfigError;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_TRIPO3D_BASE_URL: &str = "https://api.tripo3d.ai/v2/openapi";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Polling discipline for the model generation job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(5000),
            max_attempts: 60,
        }
    }
}

/// Tripo3D model generation configuration
#[derive(Debug, Clone)]
pub struct ModelGenerationConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub poll: PollPolicy,
}

/// OpenAI scene analysis configuration
#[derive(Debug, Clone)]
pub struct SceneAnalysisConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

/// Model relay configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub allowed_domains: Vec<String>,
}

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model_generation: ModelGenerationConfig,
    pub scene_analysis: SceneAnalysisConfig,
    pub relay: RelayConfig,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// Credentials are optional here; their absence is reported by the
    /// client that needs them, on first use.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let server = ServerConfig {
            host: non_blank("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 8080)?,
        };

        let defaults = PollPolicy::default();
        let poll = PollPolicy {
            interval: Duration::from_millis(parse_or(
                &lookup,
                "POLL_INTERVAL_MS",
                defaults.interval.as_millis() as u64,
            )?),
            max_attempts: parse_or(&lookup, "MAX_POLL_ATTEMPTS", defaults.max_attempts)?,
        };
        if poll.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "MAX_POLL_ATTEMPTS".to_string(),
                value: "0".to_string(),
            });
        }

        let allowed_domains: Vec<String> = non_blank("RELAY_ALLOWED_DOMAINS")
            .unwrap_or_else(|| "tripo3d.com".to_string())
            .split(',')
            .map(|d| d.trim().trim_start_matches('.').to_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        if allowed_domains.is_empty() {
            return Err(ConfigError::Empty("RELAY_ALLOWED_DOMAINS".to_string()));
        }

        Ok(Self {
            server,
            model_generation: ModelGenerationConfig {
                api_key: non_blank("TRIPO3D_API_KEY"),
                base_url: non_blank("TRIPO3D_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_TRIPO3D_BASE_URL.to_string()),
                poll,
            },
            scene_analysis: SceneAnalysisConfig {
                api_key: non_blank("OPENAI_API_KEY"),
                base_url: non_blank("OPENAI_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
                model: non_blank("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            },
            relay: RelayConfig { allowed_domains },
            max_upload_bytes: MAX_UPLOAD_BYTES,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            })
        }
        _ => Ok(default),
    }
}
