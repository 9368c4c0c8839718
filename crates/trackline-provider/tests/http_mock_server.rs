use trackline_provider::{BatchLoader, HttpBatchLoader, HttpSearchProvider, SearchProvider};
use trackline_schema::{EventId, EventKind};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn feature_collection() -> serde_json::Value {
    serde_json::json!({
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [-122.41, 37.77]},
                "properties": {"id": "obs-2", "label": "Swerve", "severity": "medium",
                               "status": "pending", "time_str": "0:30"}
            },
            {
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [-122.40, 37.78]},
                "properties": {"id": "obs-1", "label": "Hard brake", "severity": "high",
                               "status": "approved", "timestamp": 1000, "timestamp_end": 2000}
            },
            {
                "type": "Feature",
                "geometry": {"type": "LineString", "coordinates": [[-122.40, 37.78], [-122.39, 37.79]]},
                "properties": {"id": "obs-1", "label": "Hard brake", "severity": "high",
                               "timestamp": 1000, "timestamp_end": 2000}
            },
            {
                "type": "Feature",
                "geometry": {"type": "LineString", "coordinates": [[-122.40, 37.78]]},
                "properties": {"id": "broken"}
            }
        ]
    })
}

#[tokio::test]
async fn batch_loader_posts_batch_and_filter() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/visualize"))
        .and(body_json(serde_json::json!({"batchId": "batch-7", "filter": "brake"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(feature_collection()))
        .expect(1)
        .mount(&server)
        .await;

    let loader = HttpBatchLoader::new(server.uri());
    let events = loader.load("batch-7", "brake").await.unwrap();

    assert_eq!(events.len(), 3);
    assert_eq!(events[0].id(), &EventId::from("obs-2"));
    assert_eq!(events[1].kind(), EventKind::Point);
    assert_eq!(events[2].kind(), EventKind::Path);
    assert_eq!(events[1].id(), events[2].id());
}

#[tokio::test]
async fn batch_loader_surfaces_server_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/visualize"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(serde_json::json!({"detail": "csv missing"})),
        )
        .mount(&server)
        .await;

    let loader = HttpBatchLoader::new(server.uri());
    let err = loader.load("batch-7", "all").await.unwrap_err();
    assert!(err.to_string().contains("csv missing"));
}

#[tokio::test]
async fn search_collapses_duplicate_ids() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/ai-search"))
        .and(body_json(serde_json::json!({"batchId": "batch-7", "query": "debris"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "matching_ids": ["obs-1", "obs-2", "obs-1"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = HttpSearchProvider::new(format!("{}/", server.uri()));
    let ids = provider.search("batch-7", "debris").await.unwrap();

    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&EventId::from("obs-1")));
    assert!(ids.contains(&EventId::from("obs-2")));
}

#[tokio::test]
async fn search_on_unloaded_batch_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/ai-search"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "detail": "Batch data not loaded. Please click Visualize first."
        })))
        .mount(&server)
        .await;

    let provider = HttpSearchProvider::new(server.uri());
    let err = provider.search("never-loaded", "debris").await.unwrap_err();
    assert!(err.to_string().contains("not found"));
    assert!(err.to_string().contains("Visualize first"));
}
