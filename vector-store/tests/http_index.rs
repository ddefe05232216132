use docrag_vector_store::ChunkId;
use docrag_vector_store::ChunkMetadata;
use docrag_vector_store::ChunkRecord;
use docrag_vector_store::HttpIndex;
use docrag_vector_store::HttpIndexConfig;
use docrag_vector_store::IndexError;
use docrag_vector_store::VectorIndex;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::body_json;
use wiremock::matchers::body_partial_json;
use wiremock::matchers::header;
use wiremock::matchers::method;
use wiremock::matchers::path;
use wiremock::matchers::query_param;

fn index(server: &MockServer) -> HttpIndex {
    let mut config = HttpIndexConfig::new(server.uri(), "index-key");
    config.page_size = 2;
    HttpIndex::new(config).unwrap()
}

#[test_log::test(tokio::test)]
async fn upsert_sends_records_with_wire_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/vectors/upsert"))
        .and(header("api-key", "index-key"))
        .and(body_json(json!({
            "vectors": [{
                "id": "d#c",
                "values": [0.5, 0.25],
                "metadata": { "text": "hello", "file_key": "d", "file_name": "doc.md" }
            }],
            "namespace": "tenant"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "upsertedCount": 1 })))
        .expect(1)
        .mount(&server)
        .await;

    let record = ChunkRecord {
        id: ChunkId::from_parts("d", "c"),
        vector: vec![0.5, 0.25],
        metadata: ChunkMetadata {
            text: "hello".to_string(),
            document_fingerprint: "d".to_string(),
            document_name: "doc.md".to_string(),
        },
    };
    index(&server)
        .upsert(vec![record], Some("tenant"))
        .await
        .unwrap();
}

#[test_log::test(tokio::test)]
async fn query_returns_matches_with_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_partial_json(json!({
            "topK": 3,
            "includeMetadata": true,
            "includeValues": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "matches": [
                { "id": "d#1", "score": 0.9, "values": [], "metadata": { "text": "one" } },
                { "id": "d#2", "score": 0.4 }
            ],
            "namespace": ""
        })))
        .mount(&server)
        .await;

    let matches = index(&server).query(&[1.0, 0.0], 3, None).await.unwrap();

    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].id.as_str(), "d#1");
    assert_eq!(matches[0].metadata.text, "one");
    assert_eq!(matches[1].metadata, ChunkMetadata::default());
}

#[test_log::test(tokio::test)]
async fn list_follows_pagination_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vectors/list"))
        .and(query_param("prefix", "d#"))
        .and(query_param("limit", "2"))
        .and(query_param("paginationToken", "tok-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "vectors": [{ "id": "d#3" }],
            "pagination": null
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/vectors/list"))
        .and(query_param("prefix", "d#"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "vectors": [{ "id": "d#1" }, { "id": "d#2" }],
            "pagination": { "next": "tok-2" }
        })))
        .mount(&server)
        .await;

    let index = index(&server);
    let first = index.list_ids_page(Some("d#"), None, None).await.unwrap();
    assert_eq!(first.ids, vec![ChunkId::from("d#1"), ChunkId::from("d#2")]);
    assert_eq!(first.next_cursor.as_deref(), Some("tok-2"));

    let second = index
        .list_ids_page(Some("d#"), first.next_cursor.as_deref(), None)
        .await
        .unwrap();
    assert_eq!(second.ids, vec![ChunkId::from("d#3")]);
    assert_eq!(second.next_cursor, None);
}

#[test_log::test(tokio::test)]
async fn fetch_normalizes_keyed_vectors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vectors/fetch"))
        .and(query_param("namespace", "tenant"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "vectors": {
                "d#1": { "id": "d#1", "values": [1.0], "metadata": { "text": "one" } }
            },
            "namespace": "tenant"
        })))
        .mount(&server)
        .await;

    let records = index(&server)
        .fetch(&[ChunkId::from("d#1"), ChunkId::from("d#9")], Some("tenant"))
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].vector, vec![1.0]);
    assert_eq!(records[0].metadata.text, "one");
}

#[test_log::test(tokio::test)]
async fn delete_sends_ids() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/vectors/delete"))
        .and(body_json(json!({ "ids": ["d#1", "d#2"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    index(&server)
        .delete(&[ChunkId::from("d#1"), ChunkId::from("d#2")], None)
        .await
        .unwrap();
}

#[test_log::test(tokio::test)]
async fn non_success_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&server)
        .await;

    let err = index(&server).query(&[1.0], 1, None).await.unwrap_err();

    match err {
        IndexError::Status { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "bad key");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test_log::test(tokio::test)]
async fn malformed_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vectors/list"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = index(&server).list_ids_page(None, None, None).await.unwrap_err();

    assert!(matches!(err, IndexError::InvalidResponse(_)));
}
