use docrag_embeddings::EmbeddingError;
use docrag_embeddings::EmbeddingGateway;
use docrag_embeddings::EmbeddingProvider;
use docrag_embeddings::EmbeddingRole;
use docrag_embeddings::HttpEmbeddingConfig;
use docrag_embeddings::HttpEmbeddingProvider;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::body_partial_json;
use wiremock::matchers::header;
use wiremock::matchers::method;
use wiremock::matchers::path;

fn provider(server: &MockServer, batch_size: usize) -> HttpEmbeddingProvider {
    let mut config = HttpEmbeddingConfig::new(server.uri(), "test-key");
    config.batch_size = batch_size;
    HttpEmbeddingProvider::new(config).unwrap()
}

fn vectors(n: usize) -> serde_json::Value {
    let data: Vec<_> = (0..n)
        .map(|i| json!({ "values": [i as f32, 1.0] }))
        .collect();
    json!({ "model": "multilingual-e5-large", "data": data })
}

#[test_log::test(tokio::test)]
async fn passage_request_shape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embed"))
        .and(header("api-key", "test-key"))
        .and(body_partial_json(json!({
            "model": "multilingual-e5-large",
            "parameters": { "input_type": "passage", "truncate": "END" },
            "inputs": [{ "text": "first" }, { "text": "second" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(vectors(2)))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider(&server, 96);
    let out = provider
        .embed(
            &["first".to_string(), "second".to_string()],
            EmbeddingRole::Passage,
        )
        .await
        .unwrap();

    assert_eq!(out, vec![vec![0.0, 1.0], vec![1.0, 1.0]]);
}

#[test_log::test(tokio::test)]
async fn query_role_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embed"))
        .and(body_partial_json(json!({
            "parameters": { "input_type": "query" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(vectors(1)))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = EmbeddingGateway::new(Arc::new(provider(&server, 96)));
    let vector = gateway.embed_query("what is a chunk id?").await.unwrap();

    assert_eq!(vector, vec![0.0, 1.0]);
}

#[test_log::test(tokio::test)]
async fn inputs_are_split_into_batches() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embed"))
        .and(body_partial_json(json!({
            "inputs": [{ "text": "t0" }, { "text": "t1" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(vectors(2)))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vectors(1)))
        .expect(1)
        .mount(&server)
        .await;

    // Every two-element batch carries the same texts, so reuse them.
    let texts: Vec<String> = ["t0", "t1", "t0", "t1", "t4"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let out = provider(&server, 2)
        .embed(&texts, EmbeddingRole::Passage)
        .await
        .unwrap();

    assert_eq!(out.len(), 5);
}

#[test_log::test(tokio::test)]
async fn non_success_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embed"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let err = provider(&server, 96)
        .embed(&["text".to_string()], EmbeddingRole::Passage)
        .await
        .unwrap_err();

    match err {
        EmbeddingError::Status { status, body } => {
            assert_eq!(status, 429);
            assert_eq!(body, "slow down");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test_log::test(tokio::test)]
async fn empty_data_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&server)
        .await;

    let gateway = EmbeddingGateway::new(Arc::new(provider(&server, 96)));
    let err = gateway
        .embed(&["text".to_string()], EmbeddingRole::Passage)
        .await
        .unwrap_err();

    assert!(matches!(err, EmbeddingError::EmptyResponse));
}

#[test]
fn zero_batch_size_is_rejected() {
    let mut config = HttpEmbeddingConfig::new("http://localhost", "key");
    config.batch_size = 0;

    assert!(matches!(
        HttpEmbeddingProvider::new(config),
        Err(EmbeddingError::InvalidInput(_))
    ));
}
