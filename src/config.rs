use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::core::filters::RegionBounds;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    #[serde(default)]
    pub dataset: DatasetSettings,
    #[serde(default)]
    pub geocoder: GeocoderSettings,
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub recommendation: RecommendationSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Location of the per-region building files
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetSettings {
    #[serde(default = "default_dataset_root")]
    pub root: PathBuf,
    #[serde(default = "default_regions")]
    pub regions: Vec<String>,
}

impl Default for DatasetSettings {
    fn default() -> Self {
        Self {
            root: default_dataset_root(),
            regions: default_regions(),
        }
    }
}

fn default_dataset_root() -> PathBuf { PathBuf::from("dataset") }
fn default_regions() -> Vec<String> {
    ["alameda", "contra_costa", "san_francisco", "san_mateo", "santa_clara"]
        .iter()
        .map(|r| r.to_string())
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocoderSettings {
    /// Search endpoint; geocoding is disabled when unset
    pub endpoint: Option<String>,
    #[serde(default = "default_geocoder_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_geocoder_cache_size")]
    pub cache_size: u64,
    #[serde(default = "default_geocoder_cache_ttl")]
    pub cache_ttl_secs: u64,
}

impl Default for GeocoderSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: default_geocoder_timeout(),
            cache_size: default_geocoder_cache_size(),
            cache_ttl_secs: default_geocoder_cache_ttl(),
        }
    }
}

fn default_geocoder_timeout() -> u64 { 15 }
fn default_geocoder_cache_size() -> u64 { 1000 }
fn default_geocoder_cache_ttl() -> u64 { 3600 }

/// OpenAI-compatible chat and embedding service
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSettings {
    /// Ranking and query embeddings are disabled without a key
    pub api_key: Option<String>,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_chat_timeout")]
    pub chat_timeout_secs: u64,
    #[serde(default = "default_embed_timeout")]
    pub embed_timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_llm_base_url(),
            chat_model: default_chat_model(),
            embedding_model: default_embedding_model(),
            chat_timeout_secs: default_chat_timeout(),
            embed_timeout_secs: default_embed_timeout(),
        }
    }
}

fn default_llm_base_url() -> String { "https://api.openai.com/v1".to_string() }
fn default_chat_model() -> String { "gpt-4o".to_string() }
fn default_embedding_model() -> String { "text-embedding-3-small".to_string() }
fn default_chat_timeout() -> u64 { 240 }
fn default_embed_timeout() -> u64 { 180 }

#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationSettings {
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_refine_top_n")]
    pub refine_top_n: usize,
    #[serde(default)]
    pub region_bounds: RegionBounds,
}

impl Default for RecommendationSettings {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            refine_top_n: default_refine_top_n(),
            region_bounds: RegionBounds::default(),
        }
    }
}

fn default_top_n() -> usize { 20 }
fn default_refine_top_n() -> usize { 40 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Later sources override earlier ones:
    /// 1. config/default.toml
    /// 2. config/local.toml (development overrides)
    /// 3. Environment variables prefixed with RECO__, e.g. RECO__SERVER__PORT
    /// 4. OPENAI_API_KEY for the LLM key
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(env_source())
            .build()?;

        apply_env_overrides(settings)?.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(env_source())
            .build()?;

        apply_env_overrides(settings)?.try_deserialize()
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("RECO")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

/// The conventional OPENAI_API_KEY variable wins over file values
fn apply_env_overrides(settings: Config) -> Result<Config, ConfigError> {
    let mut builder = Config::builder().add_source(settings);

    if let Some(key) = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty()) {
        builder = builder.set_override("llm.api_key", key)?;
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_file_parses() {
        let raw = include_str!("../config/default.toml");
        let settings: Settings = toml::from_str(raw).unwrap();

        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.recommendation.top_n, 20);
        assert_eq!(settings.recommendation.refine_top_n, 40);
        assert_eq!(settings.recommendation.region_bounds, RegionBounds::BAY_AREA);
        assert_eq!(settings.llm.chat_model, "gpt-4o");
        assert_eq!(settings.dataset.regions.len(), 5);
    }

    #[test]
    fn test_minimal_settings_use_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [server]
            host = "127.0.0.1"
            port = 9000
            "#,
        )
        .unwrap();

        assert!(settings.llm.api_key.is_none());
        assert!(settings.geocoder.endpoint.is_none());
        assert_eq!(settings.geocoder.timeout_secs, 15);
        assert_eq!(settings.llm.embedding_model, "text-embedding-3-small");
        assert_eq!(settings.logging.level, "info");
        assert_eq!(settings.logging.format, "json");
    }
}
