use crate::error::EmbeddingError;
use crate::gateway::{EmbeddingProvider, EmbeddingRole};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tokio::sync::OnceCell;

/// Configuration for the local embedding provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalEmbeddingConfig {
    /// Model to use for embeddings
    #[serde(default)]
    pub model: LocalModelType,

    /// Maximum batch size for embedding generation
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Show download progress when downloading models
    #[serde(default)]
    pub show_download_progress: bool,
}

fn default_batch_size() -> usize {
    32
}

impl Default for LocalEmbeddingConfig {
    fn default() -> Self {
        Self {
            model: LocalModelType::default(),
            batch_size: default_batch_size(),
            show_download_progress: false,
        }
    }
}

/// Supported local models. All of them are E5-family models, which encode
/// the passage/query asymmetry as an input prefix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocalModelType {
    /// multilingual-e5-large (1024 dimensions, same model as the hosted default)
    #[default]
    MultilingualE5Large,
    /// multilingual-e5-small (384 dimensions, faster)
    MultilingualE5Small,
}

impl LocalModelType {
    fn to_fastembed_model(self) -> EmbeddingModel {
        match self {
            LocalModelType::MultilingualE5Large => EmbeddingModel::MultilingualE5Large,
            LocalModelType::MultilingualE5Small => EmbeddingModel::MultilingualE5Small,
        }
    }

    fn name(self) -> &'static str {
        match self {
            LocalModelType::MultilingualE5Large => "multilingual-e5-large",
            LocalModelType::MultilingualE5Small => "multilingual-e5-small",
        }
    }
}

/// Embedding provider running an ONNX model in-process via fastembed.
///
/// The model is loaded (and downloaded if missing) on the first `embed`
/// call, so building a provider is cheap.
pub struct LocalEmbeddingProvider {
    model: OnceCell<Mutex<TextEmbedding>>,
    config: LocalEmbeddingConfig,
}

impl LocalEmbeddingProvider {
    pub fn new(config: LocalEmbeddingConfig) -> Result<Self, EmbeddingError> {
        if config.batch_size == 0 {
            return Err(EmbeddingError::InvalidInput(
                "batch_size must be > 0".to_string(),
            ));
        }

        Ok(Self {
            model: OnceCell::new(),
            config,
        })
    }

    /// Whether the model has been loaded yet
    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

    async fn loaded_model(&self) -> Result<&Mutex<TextEmbedding>, EmbeddingError> {
        self.model
            .get_or_try_init(|| async {
                let model_type = self.config.model;
                let show_download_progress = self.config.show_download_progress;
                info!("Initializing local embedding model {}", model_type.name());

                let model = tokio::task::spawn_blocking(move || {
                    let init_options = InitOptions::new(model_type.to_fastembed_model())
                        .with_show_download_progress(show_download_progress);
                    TextEmbedding::try_new(init_options)
                })
                .await
                .map_err(|e| EmbeddingError::ModelInitialization(e.to_string()))?
                .map_err(|e| {
                    EmbeddingError::ModelInitialization(format!("Failed to initialize model: {e}"))
                })?;

                info!("Local embedding model initialized");
                Ok(Mutex::new(model))
            })
            .await
    }

    /// E5 models expect `query: ` / `passage: ` in front of every input
    fn prefixed(texts: &[String], role: EmbeddingRole) -> Vec<String> {
        texts
            .iter()
            .map(|text| format!("{}: {text}", role.as_str()))
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbeddingProvider {
    fn model(&self) -> &str {
        self.config.model.name()
    }

    async fn embed(
        &self,
        texts: &[String],
        role: EmbeddingRole,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        debug!("Generating local embeddings for {} texts", texts.len());

        let inputs = Self::prefixed(texts, role);
        let model = self
            .loaded_model()
            .await?
            .lock()
            .map_err(|_| EmbeddingError::EmbeddingGeneration("model lock poisoned".into()))?;
        let embeddings = model.embed(inputs, Some(self.config.batch_size))?;

        debug!("Generated {} embeddings", embeddings.len());
        Ok(embeddings)
    }
}
