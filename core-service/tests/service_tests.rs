use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use core_catalog::{FetchStatus, TrackDraft, VocabularyStatus};
use core_runtime::config::CatalogConfig;
use core_runtime::events::{CoreEvent, NotificationLevel, TrackEvent};
use core_service::{CatalogService, CoreError};
use std::sync::{Arc, Mutex};

const TRACK_JSON: &str = r#"{
    "id": "1",
    "slug": "blue-monday",
    "title": "Blue Monday",
    "artist": "New Order",
    "genres": ["Electronic"],
    "createdAt": "2024-01-01T00:00:00Z"
}"#;

/// Routes requests by method and path like the catalog API would.
#[derive(Default)]
struct RoutingServer {
    seen: Mutex<Vec<(HttpMethod, String)>>,
}

impl RoutingServer {
    fn seen(&self) -> Vec<(HttpMethod, String)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for RoutingServer {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let path = request
            .url
            .trim_start_matches("http://catalog.test")
            .to_string();
        self.seen.lock().unwrap().push((request.method, path.clone()));

        let response = match (request.method, path.as_str()) {
            (HttpMethod::Get, "/api/tracks") => HttpResponse::new(
                200,
                format!(
                    r#"{{"data":[{}],"meta":{{"total":1,"page":1,"limit":10,"totalPages":1}}}}"#,
                    TRACK_JSON
                ),
            ),
            (HttpMethod::Get, "/api/tracks/blue-monday") => HttpResponse::new(200, TRACK_JSON),
            (HttpMethod::Get, "/api/genres") => HttpResponse::new(200, r#"["Electronic","Rock"]"#),
            (HttpMethod::Get, "/api/artists") => HttpResponse::new(200, r#"["New Order"]"#),
            (HttpMethod::Post, "/api/tracks") => HttpResponse::new(
                409,
                r#"{"error":"A track with this title already exists"}"#,
            ),
            _ => HttpResponse::new(404, r#"{"error":"Not found"}"#),
        };
        Ok(response)
    }
}

fn service(server: &Arc<RoutingServer>) -> CatalogService {
    let config = CatalogConfig::builder()
        .base_url("http://catalog.test/")
        .http_client(Arc::clone(server) as Arc<dyn HttpClient>)
        .build()
        .unwrap();
    CatalogService::new(config).unwrap()
}

#[tokio::test]
async fn test_open_tracks_view_loads_everything() {
    let server = Arc::new(RoutingServer::default());
    let view = service(&server).open_tracks_view();
    view.settled().await;

    let rows = view.query.snapshot();
    assert_eq!(rows.status, FetchStatus::Ready);
    assert_eq!(rows.rows[0].slug, "blue-monday");
    assert_eq!(view.genres.items(), vec!["Electronic", "Rock"]);
    assert_eq!(view.artists.snapshot().status, VocabularyStatus::Ready);

    let seen = server.seen();
    assert_eq!(seen.len(), 3);
    assert!(seen.contains(&(HttpMethod::Get, "/api/genres".to_string())));
}

#[tokio::test]
async fn test_track_by_slug() {
    let server = Arc::new(RoutingServer::default());
    let track = service(&server).track_by_slug("blue-monday").await.unwrap();
    assert_eq!(track.title, "Blue Monday");

    let err = service(&server).track_by_slug("nope").await.unwrap_err();
    assert!(matches!(err, CoreError::Catalog(ref e) if e.is_not_found()));
}

#[tokio::test]
async fn test_conflict_is_reported_to_subscribers() {
    let server = Arc::new(RoutingServer::default());
    let service = service(&server);
    let mut events = service.subscribe();
    let view = service.open_tracks_view();
    view.settled().await;

    let draft = TrackDraft::new("Blue Monday", "New Order").with_genres(["Electronic"]);
    let err = view.mutations.create(draft).await.unwrap_err();
    assert_eq!(err.message(), "A track with this title already exists");

    let drained = events.drain();
    assert!(drained.iter().any(|event| matches!(
        event,
        CoreEvent::Notification(n) if n.level == NotificationLevel::Error
    )));
    assert!(!drained
        .iter()
        .any(|event| matches!(event, CoreEvent::Tracks(TrackEvent::Created { .. }))));
}

#[test]
fn test_invalid_config_is_rejected() {
    let server = Arc::new(RoutingServer::default());
    let err = CatalogConfig::builder()
        .base_url("ftp://catalog.test")
        .http_client(server as Arc<dyn HttpClient>)
        .build()
        .unwrap_err();
    assert!(matches!(CoreError::from(err), CoreError::Runtime(_)));
}
