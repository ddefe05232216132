use crate::error::EmbeddingError;
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Which side of an asymmetric embedding model a text is encoded for.
///
/// Stored chunks are always embedded as [`EmbeddingRole::Passage`] and search
/// text as [`EmbeddingRole::Query`]; mixing them up silently degrades recall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingRole {
    Passage,
    Query,
}

impl EmbeddingRole {
    pub fn as_str(self) -> &'static str {
        match self {
            EmbeddingRole::Passage => "passage",
            EmbeddingRole::Query => "query",
        }
    }
}

impl fmt::Display for EmbeddingRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upstream source of embedding vectors (hosted service or local model).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model identifier used for every request
    fn model(&self) -> &str;

    /// Embed `texts` for `role`, returning one vector per input in order
    async fn embed(
        &self,
        texts: &[String],
        role: EmbeddingRole,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Validating front door to an [`EmbeddingProvider`].
///
/// The gateway guarantees that a successful call returns exactly one
/// non-empty vector per input text. It never retries.
#[derive(Clone)]
pub struct EmbeddingGateway {
    provider: Arc<dyn EmbeddingProvider>,
}

impl fmt::Debug for EmbeddingGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingGateway")
            .field("model", &self.provider.model())
            .finish()
    }
}

impl EmbeddingGateway {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    /// Generate embeddings for a list of texts
    ///
    /// # Errors
    ///
    /// * [`EmbeddingError::EmptyResponse`] when the provider returns no vectors
    ///   or an empty vector
    /// * [`EmbeddingError::CountMismatch`] when the vector count differs from
    ///   the input count
    pub async fn embed(
        &self,
        texts: &[String],
        role: EmbeddingRole,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            "Embedding {} texts as {role} with {}",
            texts.len(),
            self.provider.model()
        );

        let vectors = self.provider.embed(texts, role).await?;

        if vectors.is_empty() {
            return Err(EmbeddingError::EmptyResponse);
        }
        if vectors.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                actual: vectors.len(),
            });
        }
        if vectors.iter().any(Vec::is_empty) {
            return Err(EmbeddingError::EmptyResponse);
        }

        Ok(vectors)
    }

    /// Embed a single search query
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self
            .embed(&[text.to_string()], EmbeddingRole::Query)
            .await?;
        vectors.pop().ok_or(EmbeddingError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    /// Provider that replays a canned answer and records the roles it saw.
    struct CannedProvider {
        answer: Vec<Vec<f32>>,
        roles: Mutex<Vec<EmbeddingRole>>,
    }

    impl CannedProvider {
        fn new(answer: Vec<Vec<f32>>) -> Arc<Self> {
            Arc::new(Self {
                answer,
                roles: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl EmbeddingProvider for CannedProvider {
        fn model(&self) -> &str {
            "canned"
        }

        async fn embed(
            &self,
            _texts: &[String],
            role: EmbeddingRole,
        ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            self.roles.lock().unwrap().push(role);
            Ok(self.answer.clone())
        }
    }

    fn texts(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("text {i}")).collect()
    }

    #[tokio::test]
    async fn test_embed_passes_role_through() {
        let provider = CannedProvider::new(vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        let gateway = EmbeddingGateway::new(provider.clone());

        let vectors = gateway.embed(&texts(2), EmbeddingRole::Passage).await.unwrap();

        assert_eq!(vectors.len(), 2);
        assert_eq!(*provider.roles.lock().unwrap(), vec![EmbeddingRole::Passage]);
    }

    #[tokio::test]
    async fn test_empty_input_skips_provider() {
        let provider = CannedProvider::new(vec![]);
        let gateway = EmbeddingGateway::new(provider.clone());

        let vectors = gateway.embed(&[], EmbeddingRole::Query).await.unwrap();

        assert!(vectors.is_empty());
        assert!(provider.roles.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_data_is_an_error() {
        let gateway = EmbeddingGateway::new(CannedProvider::new(vec![]));

        let err = gateway.embed(&texts(1), EmbeddingRole::Passage).await.unwrap_err();

        assert!(matches!(err, EmbeddingError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_count_mismatch_is_an_error() {
        let gateway = EmbeddingGateway::new(CannedProvider::new(vec![vec![1.0]]));

        let err = gateway.embed(&texts(3), EmbeddingRole::Passage).await.unwrap_err();

        assert!(matches!(
            err,
            EmbeddingError::CountMismatch {
                expected: 3,
                actual: 1
            }
        ));
    }

    #[tokio::test]
    async fn test_empty_vector_is_an_error() {
        let gateway = EmbeddingGateway::new(CannedProvider::new(vec![vec![1.0], vec![]]));

        let err = gateway.embed(&texts(2), EmbeddingRole::Passage).await.unwrap_err();

        assert!(matches!(err, EmbeddingError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_embed_query_uses_query_role() {
        let provider = CannedProvider::new(vec![vec![0.5, 0.5]]);
        let gateway = EmbeddingGateway::new(provider.clone());

        let vector = gateway.embed_query("what is rust?").await.unwrap();

        assert_eq!(vector, vec![0.5, 0.5]);
        assert_eq!(*provider.roles.lock().unwrap(), vec![EmbeddingRole::Query]);
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(
            serde_json::to_string(&EmbeddingRole::Passage).unwrap(),
            "\"passage\""
        );
        assert_eq!(EmbeddingRole::Query.to_string(), "query");
    }
}
