//! `docrag` configuration: `$DOCRAG_HOME/config.toml` plus credentials from
//! the environment.

use docrag_embeddings::DEFAULT_EMBEDDING_MODEL;
use docrag_embeddings::LocalModelType;
use docrag_recall_eval::DEFAULT_COMPLETION_BASE_URL;
use docrag_recall_eval::DEFAULT_COMPLETION_MODEL;
use docrag_retrieval::DEFAULT_RERANK_MODEL;
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;

pub const DOCRAG_HOME_ENV: &str = "DOCRAG_HOME";
pub const CONFIG_FILE_NAME: &str = "config.toml";

const DEFAULT_INFERENCE_URL: &str = "https://api.pinecone.io";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not locate home directory")]
    NoHome,

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("{what} requires an API key (set {env})")]
    MissingApiKey {
        what: &'static str,
        env: &'static str,
    },

    #[error("The hosted index requires [index].host")]
    MissingHost,

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Local,
    Hosted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocragConfig {
    #[serde(default)]
    pub index: IndexSection,

    #[serde(default)]
    pub embedding: EmbeddingSection,

    #[serde(default)]
    pub rerank: RerankSection,

    #[serde(default)]
    pub retrieval: RetrievalSection,

    #[serde(default)]
    pub generation: GenerationSection,

    #[serde(default)]
    pub registry: RegistrySection,

    /// Timeout for every hosted service call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for DocragConfig {
    fn default() -> Self {
        Self {
            index: IndexSection::default(),
            embedding: EmbeddingSection::default(),
            rerank: RerankSection::default(),
            retrieval: RetrievalSection::default(),
            generation: GenerationSection::default(),
            registry: RegistrySection::default(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSection {
    #[serde(default)]
    pub backend: Backend,

    /// Data-plane host of the hosted index
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub namespace: Option<String>,

    /// Snapshot file of the local index (default `$DOCRAG_HOME/index.json`)
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Ids per listing page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page_size() -> usize {
    100
}

impl Default for IndexSection {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            host: None,
            api_key: None,
            namespace: None,
            path: None,
            page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingSection {
    #[serde(default)]
    pub provider: Backend,

    #[serde(default = "default_inference_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Hosted model name
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Model run in-process when `provider = "local"`
    #[serde(default)]
    pub local_model: LocalModelType,

    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: usize,
}

fn default_inference_url() -> String {
    DEFAULT_INFERENCE_URL.to_string()
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_embedding_batch_size() -> usize {
    96
}

impl Default for EmbeddingSection {
    fn default() -> Self {
        Self {
            provider: Backend::default(),
            base_url: default_inference_url(),
            api_key: None,
            model: default_embedding_model(),
            local_model: LocalModelType::default(),
            batch_size: default_embedding_batch_size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankSection {
    /// Rerank search results when an API key is available
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_inference_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_rerank_model")]
    pub model: String,
}

fn default_true() -> bool {
    true
}

fn default_rerank_model() -> String {
    DEFAULT_RERANK_MODEL.to_string()
}

impl Default for RerankSection {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_inference_url(),
            api_key: None,
            model: default_rerank_model(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalSection {
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Dense candidates handed to the reranker (default `min(50, 5 * top_k)`)
    #[serde(default)]
    pub rerank_pool_size: Option<usize>,
}

fn default_top_k() -> usize {
    10
}

impl Default for RetrievalSection {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            rerank_pool_size: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSection {
    #[serde(default = "default_completion_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_completion_model")]
    pub model: String,

    /// Dataset file written by `gen-questions`
    #[serde(default = "default_generation_output")]
    pub output: PathBuf,
}

fn default_completion_base_url() -> String {
    DEFAULT_COMPLETION_BASE_URL.to_string()
}

fn default_completion_model() -> String {
    DEFAULT_COMPLETION_MODEL.to_string()
}

fn default_generation_output() -> PathBuf {
    PathBuf::from("export").join("recall_questions.jsonl")
}

impl Default for GenerationSection {
    fn default() -> Self {
        Self {
            base_url: default_completion_base_url(),
            api_key: None,
            model: default_completion_model(),
            output: default_generation_output(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrySection {
    /// Registry file (default `$DOCRAG_HOME/documents.json`)
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// `$DOCRAG_HOME`, or `~/.docrag`
pub fn docrag_home() -> Result<PathBuf, ConfigError> {
    if let Ok(home) = std::env::var(DOCRAG_HOME_ENV)
        && !home.is_empty()
    {
        return Ok(PathBuf::from(home));
    }

    let mut home = dirs::home_dir().ok_or(ConfigError::NoHome)?;
    home.push(".docrag");
    Ok(home)
}

impl DocragConfig {
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `explicit`, or `config.toml` under `home` when it exists
    pub async fn load(explicit: Option<&Path>, home: &Path) -> Result<Self, ConfigError> {
        let (path, required) = match explicit {
            Some(path) => (path.to_path_buf(), true),
            None => (home.join(CONFIG_FILE_NAME), false),
        };

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Self::from_toml(&content, &path),
            Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config at {}; using defaults", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read { path, source }),
        }
    }

    /// Fill credentials from environment variables. Set variables win over
    /// keys from the file.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let first = |names: &[&str]| {
            names
                .iter()
                .copied()
                .find_map(|name| var(name).filter(|v| !v.trim().is_empty()))
        };

        if let Some(key) = first(&["DOCRAG_INDEX_API_KEY", "PINECONE_API_KEY"]) {
            self.index.api_key = Some(key);
        }
        if let Some(key) = first(&["DOCRAG_INFERENCE_API_KEY"]) {
            self.embedding.api_key = Some(key);
        }
        if let Some(key) = first(&["GEMINI_API_KEY", "GOOGLE_GENERATIVE_AI_API_KEY"]) {
            self.generation.api_key = Some(key);
        }

        if self.embedding.api_key.is_none() {
            self.embedding.api_key = self.index.api_key.clone();
        }
        if self.rerank.api_key.is_none() {
            self.rerank.api_key = self.embedding.api_key.clone();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.index.backend == Backend::Hosted {
            if self.index.host.as_deref().is_none_or(str::is_empty) {
                return Err(ConfigError::MissingHost);
            }
            if self.index.api_key.is_none() {
                return Err(ConfigError::MissingApiKey {
                    what: "The hosted index",
                    env: "DOCRAG_INDEX_API_KEY or PINECONE_API_KEY",
                });
            }
        }
        if self.embedding.provider == Backend::Hosted && self.embedding.api_key.is_none() {
            return Err(ConfigError::MissingApiKey {
                what: "Hosted embeddings",
                env: "DOCRAG_INFERENCE_API_KEY",
            });
        }

        if self.retrieval.top_k == 0 {
            return Err(ConfigError::Invalid("retrieval.top_k must be > 0".into()));
        }
        if self.embedding.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "embedding.batch_size must be > 0".into(),
            ));
        }
        if self.index.page_size == 0 {
            return Err(ConfigError::Invalid("index.page_size must be > 0".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Key for the generative model, required by `gen-questions`
    pub fn generation_api_key(&self) -> Result<&str, ConfigError> {
        self.generation
            .api_key
            .as_deref()
            .ok_or(ConfigError::MissingApiKey {
                what: "Question generation",
                env: "GEMINI_API_KEY or GOOGLE_GENERATIVE_AI_API_KEY",
            })
    }

    pub fn index_path(&self, home: &Path) -> PathBuf {
        self.index
            .path
            .clone()
            .unwrap_or_else(|| home.join("index.json"))
    }

    pub fn registry_path(&self, home: &Path) -> PathBuf {
        self.registry
            .path
            .clone()
            .unwrap_or_else(|| home.join("documents.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_empty_file_is_a_usable_local_config() {
        let config = DocragConfig::from_toml("", Path::new("config.toml")).unwrap();

        assert_eq!(config.index.backend, Backend::Local);
        assert_eq!(config.embedding.provider, Backend::Local);
        assert_eq!(config.retrieval.top_k, 10);
        assert_eq!(config.request_timeout_secs, 30);
        assert!(config.rerank.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sections_parse() {
        let toml = r#"
            request_timeout_secs = 10

            [index]
            backend = "hosted"
            host = "docs-abc.svc.pinecone.io"
            namespace = "handbook"

            [embedding]
            provider = "hosted"
            batch_size = 50

            [retrieval]
            top_k = 5
            rerank_pool_size = 25

            [generation]
            model = "gemini-2.5-pro"
        "#;

        let config = DocragConfig::from_toml(toml, Path::new("config.toml")).unwrap();

        assert_eq!(config.index.backend, Backend::Hosted);
        assert_eq!(config.index.host.as_deref(), Some("docs-abc.svc.pinecone.io"));
        assert_eq!(config.index.namespace.as_deref(), Some("handbook"));
        assert_eq!(config.index.page_size, 100);
        assert_eq!(config.embedding.batch_size, 50);
        assert_eq!(config.retrieval.rerank_pool_size, Some(25));
        assert_eq!(config.generation.model, "gemini-2.5-pro");
        assert_eq!(config.request_timeout_secs, 10);
    }

    #[test]
    fn test_parse_error_names_the_file() {
        let err = DocragConfig::from_toml("[index", Path::new("/tmp/bad.toml")).unwrap_err();
        assert!(err.to_string().contains("/tmp/bad.toml"));
    }

    #[test]
    fn test_env_keys_and_fallbacks() {
        let mut config = DocragConfig::default();
        config.apply_env(env(&[
            ("PINECONE_API_KEY", "pc-key"),
            ("GOOGLE_GENERATIVE_AI_API_KEY", "google-key"),
        ]));

        assert_eq!(config.index.api_key.as_deref(), Some("pc-key"));
        assert_eq!(config.embedding.api_key.as_deref(), Some("pc-key"));
        assert_eq!(config.rerank.api_key.as_deref(), Some("pc-key"));
        assert_eq!(config.generation_api_key().unwrap(), "google-key");
    }

    #[test]
    fn test_specific_env_keys_take_precedence() {
        let mut config = DocragConfig::default();
        config.apply_env(env(&[
            ("DOCRAG_INDEX_API_KEY", "index-key"),
            ("PINECONE_API_KEY", "pc-key"),
            ("DOCRAG_INFERENCE_API_KEY", "inference-key"),
            ("GEMINI_API_KEY", "gemini-key"),
            ("GOOGLE_GENERATIVE_AI_API_KEY", "google-key"),
        ]));

        assert_eq!(config.index.api_key.as_deref(), Some("index-key"));
        assert_eq!(config.embedding.api_key.as_deref(), Some("inference-key"));
        assert_eq!(config.rerank.api_key.as_deref(), Some("inference-key"));
        assert_eq!(config.generation.api_key.as_deref(), Some("gemini-key"));
    }

    #[test]
    fn test_blank_env_values_are_ignored() {
        let mut config = DocragConfig::default();
        config.index.api_key = Some("file-key".to_string());
        config.apply_env(env(&[("PINECONE_API_KEY", "  ")]));

        assert_eq!(config.index.api_key.as_deref(), Some("file-key"));
    }

    #[test]
    fn test_hosted_index_needs_host_and_key() {
        let mut config = DocragConfig::default();
        config.index.backend = Backend::Hosted;
        assert!(matches!(config.validate(), Err(ConfigError::MissingHost)));

        config.index.host = Some("docs.svc.pinecone.io".to_string());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingApiKey { .. })
        ));

        config.index.api_key = Some("key".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_hosted_embeddings_need_key() {
        let mut config = DocragConfig::default();
        config.embedding.provider = Backend::Hosted;

        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingApiKey { .. })
        ));
    }

    #[test]
    fn test_zero_sizes_are_rejected() {
        let mut config = DocragConfig::default();
        config.retrieval.top_k = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = DocragConfig::default();
        config.embedding.batch_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = DocragConfig::default();
        config.index.page_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_generation_key_is_required() {
        assert!(matches!(
            DocragConfig::default().generation_api_key(),
            Err(ConfigError::MissingApiKey { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_missing_home_config_uses_defaults() {
        let home = TempDir::new().unwrap();

        let config = DocragConfig::load(None, home.path()).await.unwrap();

        assert_eq!(config, DocragConfig::default());
        assert_eq!(config.index_path(home.path()), home.path().join("index.json"));
        assert_eq!(
            config.registry_path(home.path()),
            home.path().join("documents.json")
        );
    }

    #[tokio::test]
    async fn test_load_missing_explicit_config_fails() {
        let home = TempDir::new().unwrap();
        let missing = home.path().join("nope.toml");

        let err = DocragConfig::load(Some(&missing), home.path())
            .await
            .unwrap_err();

        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[tokio::test]
    async fn test_load_reads_home_config() {
        let home = TempDir::new().unwrap();
        tokio::fs::write(
            home.path().join(CONFIG_FILE_NAME),
            "[retrieval]\ntop_k = 3\n",
        )
        .await
        .unwrap();

        let config = DocragConfig::load(None, home.path()).await.unwrap();

        assert_eq!(config.retrieval.top_k, 3);
    }
}
