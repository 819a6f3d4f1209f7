use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::types::GenerationConfig;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LLMConfig,
    pub generation: GenerationConfig,
    pub upload: UploadConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
}

#[derive(Clone, Deserialize)]
pub struct LLMConfig {
    pub provider: String,
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

// Keeps the credential out of `{:?}` output in logs
impl std::fmt::Debug for LLMConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LLMConfig")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Directory receiving the per-cycle temporary copy of each upload
    pub temp_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub filter: String,
    pub log_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = GenerationConfig::default();

        Ok(Self {
            server: ServerConfig {
                port: parse_or(&var, "PORT", 3000)?,
                host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                cors_allowed_origins: var("ALLOWED_ORIGINS")
                    .unwrap_or_else(|| "http://localhost:3000".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                max_upload_bytes: parse_or(&var, "MAX_UPLOAD_BYTES", 25 * 1024 * 1024)?,
            },
            llm: LLMConfig {
                provider: var("LLM_PROVIDER").unwrap_or_else(|| "google".to_string()),
                api_key: var("GEMINI_API_KEY").or_else(|| var("GOOGLE_API_KEY")),
                model: var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
                base_url: var("GEMINI_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            },
            generation: GenerationConfig {
                temperature: parse_or(&var, "GENERATION_TEMPERATURE", defaults.temperature)?,
                top_p: parse_or(&var, "GENERATION_TOP_P", defaults.top_p)?,
                top_k: parse_or(&var, "GENERATION_TOP_K", defaults.top_k)?,
                max_output_tokens: parse_or(
                    &var,
                    "GENERATION_MAX_OUTPUT_TOKENS",
                    defaults.max_output_tokens,
                )?,
                response_mime_type: defaults.response_mime_type,
            },
            upload: UploadConfig {
                temp_dir: var("UPLOAD_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(env::temp_dir),
            },
            logging: LoggingConfig {
                filter: var("RUST_LOG")
                    .unwrap_or_else(|| "oxidized_extract=debug,tower_http=debug".to_string()),
                log_dir: var("LOG_DIR").map(PathBuf::from),
            },
        })
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.llm.provider, "google");
        assert_eq!(config.llm.model, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.llm.base_url, DEFAULT_GEMINI_BASE_URL);
        assert!(config.llm.api_key.is_none());
        assert_eq!(config.generation, GenerationConfig::default());
        assert!(config.logging.log_dir.is_none());
    }

    #[test]
    fn test_api_key_fallback_and_blank_values() {
        let config = config_from(&[("GEMINI_API_KEY", "  "), ("GOOGLE_API_KEY", "g-key")]).unwrap();
        assert_eq!(config.llm.api_key.as_deref(), Some("g-key"));

        let config = config_from(&[("GEMINI_API_KEY", "gem-key"), ("GOOGLE_API_KEY", "g-key")]).unwrap();
        assert_eq!(config.llm.api_key.as_deref(), Some("gem-key"));
    }

    #[test]
    fn test_generation_overrides() {
        let config = config_from(&[
            ("GENERATION_TEMPERATURE", "0.2"),
            ("GENERATION_TOP_K", "10"),
        ])
        .unwrap();
        assert_eq!(config.generation.temperature, 0.2);
        assert_eq!(config.generation.top_k, 10);
        assert_eq!(config.generation.top_p, 0.95);
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let err = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = config_from(&[("GEMINI_API_KEY", "secret-value")]).unwrap();
        let rendered = format!("{:?}", config.llm);
        assert!(!rendered.contains("secret-value"));
        assert!(rendered.contains("<redacted>"));
    }
}
