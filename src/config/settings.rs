//! Configuration settings for Groundwise.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub credentials: CredentialSettings,
    pub api: ApiSettings,
    pub corpus: CorpusSettings,
    pub chunking: ChunkingSettings,
    pub answer: AnswerSettings,
    pub fallback: FallbackSettings,
    pub video: VideoSettings,
    pub ingest: IngestSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Timeout applied to every external API call.
    pub request_timeout_secs: u64,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.groundwise".to_string(),
            log_level: "warn".to_string(),
            request_timeout_secs: 120,
        }
    }
}

/// Credential resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialSettings {
    /// Service-account key file tried after ambient credentials.
    pub service_account_file: String,
    /// OAuth scopes requested for service-account and user tokens.
    pub scopes: Vec<String>,
}

impl Default for CredentialSettings {
    fn default() -> Self {
        Self {
            service_account_file: "service_account_key.json".to_string(),
            scopes: crate::auth::DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Endpoints of the hosted services.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Generative Language API (corpora, AQA, Gemini).
    pub generative_base_url: String,
    /// YouTube Data API.
    pub youtube_base_url: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            generative_base_url: "https://generativelanguage.googleapis.com/v1beta/".to_string(),
            youtube_base_url: "https://www.googleapis.com/youtube/v3/".to_string(),
        }
    }
}

/// Corpus selection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusSettings {
    /// Display name used to look up or create the corpus.
    pub display_name: String,
    /// Resource name (e.g. `corpora/my-corpus-123`). Skips the lookup when set.
    pub resource_name: Option<String>,
    /// Attempts for the corpus lookup/creation step.
    pub lookup_retries: usize,
}

impl Default for CorpusSettings {
    fn default() -> Self {
        Self {
            display_name: "My Corpus".to_string(),
            resource_name: None,
            lookup_retries: 3,
        }
    }
}

/// Passage and chunk size bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Maximum words in a passage.
    pub max_words_per_passage: usize,
    /// Maximum characters in a stored chunk.
    pub max_chars_per_chunk: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            max_words_per_passage: crate::chunking::DEFAULT_MAX_WORDS,
            max_chars_per_chunk: crate::chunking::DEFAULT_MAX_CHARS,
        }
    }
}

/// Grounded answer (AQA) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerSettings {
    pub model: String,
    pub temperature: f32,
    pub answer_style: String,
    /// Grounded answers at or below this probability go to the fallback model.
    pub confidence_threshold: f64,
}

impl Default for AnswerSettings {
    fn default() -> Self {
        Self {
            model: "models/aqa".to_string(),
            temperature: 0.2,
            answer_style: "EXTRACTIVE".to_string(),
            confidence_threshold: crate::answer::CONFIDENCE_THRESHOLD,
        }
    }
}

/// Fallback generative model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackSettings {
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for FallbackSettings {
    fn default() -> Self {
        Self {
            model: "models/gemini-1.5-flash".to_string(),
            temperature: 0.3,
            top_p: 1.0,
            top_k: 40,
            max_output_tokens: 2048,
        }
    }
}

/// Video enrichment settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoSettings {
    pub enabled: bool,
    pub max_results: u32,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_results: 1,
        }
    }
}

/// Ingestion run settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    /// Directory scanned for `.pdf` files.
    pub data_dir: String,
    /// Diagnostic side-file of `{chunk_id, text}` records.
    pub output_json: String,
    /// Abort the whole run on the first unreadable PDF.
    pub fail_fast: bool,
    /// Documents processed at once.
    pub max_concurrent_documents: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            data_dir: "static/data".to_string(),
            output_json: "embeddings.json".to_string(),
            fail_fast: false,
            max_concurrent_documents: 1,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::GroundwiseError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("groundwise")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded PDF input directory.
    pub fn ingest_dir(&self) -> PathBuf {
        Self::expand_path(&self.ingest.data_dir)
    }

    /// Path of the chunk side-file. Relative paths live under the data directory.
    pub fn side_file_path(&self) -> PathBuf {
        let path = Self::expand_path(&self.ingest.output_json);
        if path.is_absolute() {
            path
        } else {
            self.data_dir().join(path)
        }
    }

    /// Get the expanded service-account key path.
    pub fn service_account_path(&self) -> PathBuf {
        Self::expand_path(&self.credentials.service_account_file)
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.general.request_timeout_secs)
    }
}
