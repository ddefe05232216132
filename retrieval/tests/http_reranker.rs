use docrag_retrieval::HttpReranker;
use docrag_retrieval::HttpRerankerConfig;
use docrag_retrieval::RerankError;
use docrag_retrieval::RerankHit;
use docrag_retrieval::Reranker;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::body_json;
use wiremock::matchers::header;
use wiremock::matchers::method;
use wiremock::matchers::path;

fn reranker(server: &MockServer) -> HttpReranker {
    HttpReranker::new(HttpRerankerConfig::new(server.uri(), "rerank-key")).unwrap()
}

#[test_log::test(tokio::test)]
async fn sends_documents_without_asking_them_back() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rerank"))
        .and(header("api-key", "rerank-key"))
        .and(body_json(json!({
            "model": "bge-reranker-v2-m3",
            "query": "what is a chunk?",
            "documents": [{ "text": "first" }, { "text": "second" }],
            "top_n": 1,
            "return_documents": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "bge-reranker-v2-m3",
            "data": [{ "index": 1, "score": 0.75 }],
            "usage": { "rerank_units": 1 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let hits = reranker(&server)
        .rerank(
            "what is a chunk?",
            &["first".to_string(), "second".to_string()],
            1,
        )
        .await
        .unwrap();

    assert_eq!(
        hits,
        vec![RerankHit {
            index: 1,
            score: 0.75
        }]
    );
}

#[test_log::test(tokio::test)]
async fn error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rerank"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let err = reranker(&server)
        .rerank("q", &["doc".to_string()], 1)
        .await
        .unwrap_err();

    assert!(matches!(err, RerankError::Status { status: 500, .. }));
}

#[test_log::test(tokio::test)]
async fn malformed_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rerank"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": "nope" })))
        .mount(&server)
        .await;

    let err = reranker(&server)
        .rerank("q", &["doc".to_string()], 1)
        .await
        .unwrap_err();

    assert!(matches!(err, RerankError::InvalidResponse(_)));
}
