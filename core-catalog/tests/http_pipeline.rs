use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{BridgeError, HttpClient, HttpMethod, HttpRequest, HttpResponse};
use core_catalog::{
    AppError, FetchStatus, QueryController, TrackApi, TrackClient, Transport,
};
use std::sync::{Arc, Mutex};

/// Answers every request with a canned response and records what was sent.
struct CannedServer {
    requests: Mutex<Vec<HttpRequest>>,
    respond: Box<dyn Fn(&HttpRequest) -> BridgeResult<HttpResponse> + Send + Sync>,
}

impl CannedServer {
    fn new<F>(respond: F) -> Arc<Self>
    where
        F: Fn(&HttpRequest) -> BridgeResult<HttpResponse> + Send + Sync + 'static,
    {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            respond: Box::new(respond),
        })
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for CannedServer {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let response = (self.respond)(&request);
        self.requests.lock().unwrap().push(request);
        response
    }
}

const PAGE_JSON: &str = r#"{
    "data": [
        {
            "id": "1",
            "slug": "blue-monday",
            "title": "Blue Monday",
            "artist": "New Order",
            "album": "Power, Corruption & Lies",
            "genres": ["Electronic"],
            "coverImage": "https://example.com/blue.jpg",
            "createdAt": "2024-01-01T00:00:00.000Z",
            "audioFile": null
        }
    ],
    "meta": { "total": 1, "page": 1, "limit": 10, "totalPages": 1 }
}"#;

fn controller(server: &Arc<CannedServer>) -> QueryController {
    let http = Arc::clone(server) as Arc<dyn HttpClient>;
    let transport = Arc::new(Transport::new(http, "http://localhost:8000/"));
    QueryController::with_defaults(Arc::new(TrackClient::new(transport)) as Arc<dyn TrackApi>)
}

#[tokio::test]
async fn test_list_view_over_http() {
    let server = CannedServer::new(|_| Ok(HttpResponse::new(200, PAGE_JSON)));
    let tracks = controller(&server);

    tracks.set_genre_filter(Some("Electronic".into()));
    let view = tracks.settled().await;

    assert_eq!(view.status, FetchStatus::Ready);
    assert_eq!(view.rows[0].title, "Blue Monday");
    assert_eq!(view.rows[0].album.as_deref(), Some("Power, Corruption & Lies"));

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, HttpMethod::Get);
    assert_eq!(requests[0].url, "http://localhost:8000/api/tracks");
    assert_eq!(requests[0].query_value("genre"), Some("Electronic"));
    assert_eq!(requests[0].query_value("sort"), Some("title"));
    assert_eq!(requests[0].query_value("order"), Some("asc"));
}

#[tokio::test]
async fn test_server_errors_surface_as_fetch_errors() {
    let server = CannedServer::new(|_| Ok(HttpResponse::new(500, r#"{"error":"Database offline"}"#)));
    let tracks = controller(&server);

    tracks.refetch();
    let view = tracks.settled().await;

    assert_eq!(
        view.status,
        FetchStatus::Errored(AppError::network(Some(500), "Database offline"))
    );
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    let server = CannedServer::new(|_| Err(BridgeError::Network("connection refused".into())));
    let tracks = controller(&server);

    tracks.refetch();
    let view = tracks.settled().await;

    let err = view.status.error().cloned().unwrap();
    assert!(matches!(err, AppError::Network { status: None, .. }));
}
