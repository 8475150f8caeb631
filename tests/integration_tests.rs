// Integration tests for Roam discovery sessions

use async_trait::async_trait;
use roam_discovery::core::{DiscoveryController, DiscoveryOptions, Outcome, Phase, Rejection, SearchInput};
use roam_discovery::models::{Coordinate, Cursor, DiscoveryRequest, Entity, EntityCore, FeedKind, Hotel, ResultPage, SearchMode};
use roam_discovery::services::{GeoLocator, HttpSearchBackend, ReportedPosition, SearchBackend, SearchError, FALLBACK_COORDINATE};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

fn items(prefix: &str, count: usize) -> Vec<EntityCore> {
    (0..count)
        .map(|i| EntityCore::new(format!("{}-{}", prefix, i), format!("Place {}", i)))
        .collect()
}

/// Answers from a queue of canned responses and records every request
#[derive(Default)]
struct Scripted {
    responses: Mutex<VecDeque<Result<ResultPage<EntityCore>, SearchError>>>,
    requests: Mutex<Vec<DiscoveryRequest>>,
}

impl Scripted {
    fn then(self, response: Result<ResultPage<EntityCore>, SearchError>) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    fn requests(&self) -> Vec<DiscoveryRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchBackend<EntityCore> for Scripted {
    async fn search(&self, request: &DiscoveryRequest) -> Result<ResultPage<EntityCore>, SearchError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ResultPage::terminal(Vec::new())))
    }
}

fn controller(backend: Arc<dyn SearchBackend<EntityCore>>, position: ReportedPosition) -> DiscoveryController<EntityCore> {
    DiscoveryController::new(
        FeedKind::Attractions,
        backend,
        GeoLocator::reported(position),
        DiscoveryOptions::default(),
    )
}

fn network_error() -> SearchError {
    SearchError::Backend {
        status: 503,
        message: "upstream unavailable".to_string(),
    }
}

#[tokio::test]
async fn test_integration_denied_location_uses_fallback() {
    let backend = Arc::new(Scripted::default().then(Ok(ResultPage::terminal(items("a", 3)))));
    let controller = controller(backend.clone(), ReportedPosition::Denied);

    assert_eq!(controller.mount().await, Outcome::Applied);

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].coordinate, Some(FALLBACK_COORDINATE));
    assert_eq!(requests[0].radius_meters, Some(5_000));
    assert_eq!(requests[0].cursor, None);

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.mode, SearchMode::Nearby);
    assert_eq!(snapshot.origin, Some(FALLBACK_COORDINATE));
    assert_eq!(snapshot.phase, Phase::Ready);
}

#[tokio::test]
async fn test_integration_load_more_until_exhausted() {
    let backend = Arc::new(
        Scripted::default()
            .then(Ok(ResultPage::new(items("first", 50), Some(Cursor::from("abc")))))
            .then(Ok(ResultPage::terminal(items("second", 20)))),
    );
    let controller = controller(backend.clone(), ReportedPosition::Denied);
    controller.mount().await;

    assert!(controller.inspect(|s| s.has_more()).await);
    assert_eq!(controller.load_more().await, Outcome::Applied);

    let requests = backend.requests();
    assert_eq!(requests[1].cursor, Some(Cursor::from("abc")));
    assert_eq!(requests[1].coordinate, requests[0].coordinate);

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.items.len(), 70);
    assert!(!snapshot.has_more);

    // Nothing left to fetch: no request goes out.
    assert_eq!(
        controller.load_more().await,
        Outcome::Ignored(Rejection::NoMoreResults)
    );
    assert_eq!(backend.requests().len(), 2);
}

#[tokio::test]
async fn test_integration_global_search_then_clear() {
    let origin = Coordinate::new(15.4909, 73.8278).unwrap();
    let backend = Arc::new(
        Scripted::default()
            .then(Ok(ResultPage::terminal(items("near", 5))))
            .then(Ok(ResultPage::new(items("beach", 10), Some(Cursor::from("g2")))))
            .then(Ok(ResultPage::terminal(items("near", 5)))),
    );
    let controller = controller(backend.clone(), ReportedPosition::Fix(origin));
    controller.mount().await;

    assert_eq!(controller.submit_search(SearchInput::global("beach")).await, Outcome::Applied);
    let requests = backend.requests();
    assert_eq!(requests[1].coordinate, None);
    assert_eq!(requests[1].radius_meters, None);
    assert_eq!(requests[1].query_text, "beach");
    assert_eq!(controller.inspect(|s| s.mode()).await, SearchMode::Global);

    assert_eq!(controller.clear_search().await, Outcome::Applied);
    let requests = backend.requests();
    assert_eq!(requests[2].coordinate, Some(origin));
    assert_eq!(requests[2].query_text, "");
    assert_eq!(requests[2].cursor, None);

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.mode, SearchMode::Nearby);
    assert_eq!(snapshot.query_text, "");
    assert_eq!(snapshot.items.len(), 5);
}

#[tokio::test]
async fn test_integration_failure_keeps_items_and_retry_repeats_request() {
    let backend = Arc::new(
        Scripted::default()
            .then(Ok(ResultPage::new(items("p1", 30), Some(Cursor::from("next")))))
            .then(Err(network_error()))
            .then(Ok(ResultPage::terminal(items("p2", 10)))),
    );
    let controller = controller(backend.clone(), ReportedPosition::Denied);
    controller.mount().await;

    assert!(matches!(controller.load_more().await, Outcome::Failed(_)));
    let snapshot = controller.snapshot().await;
    assert!(matches!(snapshot.phase, Phase::Error(_)));
    assert_eq!(snapshot.items.len(), 30);

    assert_eq!(controller.retry().await, Outcome::Applied);
    let requests = backend.requests();
    assert_eq!(requests[2], requests[1]);
    assert_eq!(controller.inspect(|s| s.items().len()).await, 40);
}

#[tokio::test]
async fn test_integration_empty_global_search_is_noop() {
    let backend = Arc::new(Scripted::default().then(Ok(ResultPage::terminal(items("a", 2)))));
    let controller = controller(backend.clone(), ReportedPosition::Denied);
    controller.mount().await;

    assert_eq!(
        controller.submit_search(SearchInput::global("   ")).await,
        Outcome::Ignored(Rejection::EmptyGlobalQuery)
    );
    assert_eq!(backend.requests().len(), 1);

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.mode, SearchMode::Nearby);
    assert_eq!(snapshot.items.len(), 2);
}

#[tokio::test]
async fn test_integration_toggle_resets_results_each_time() {
    let backend = Arc::new(
        Scripted::default()
            .then(Ok(ResultPage::new(items("near", 4), Some(Cursor::from("n2")))))
            .then(Ok(ResultPage::new(items("near", 4), Some(Cursor::from("n2"))))),
    );
    let controller = controller(backend.clone(), ReportedPosition::Denied);
    controller.mount().await;

    // Global with an empty box: mode flips, nothing is fetched.
    assert_eq!(controller.toggle_mode().await, Outcome::Applied);
    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.mode, SearchMode::Global);
    assert!(snapshot.items.is_empty());
    assert!(!snapshot.has_more);
    assert_eq!(backend.requests().len(), 1);

    assert_eq!(controller.toggle_mode().await, Outcome::Applied);
    let requests = backend.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].coordinate, Some(FALLBACK_COORDINATE));
    assert_eq!(requests[1].cursor, None);
    assert_eq!(controller.inspect(|s| s.mode()).await, SearchMode::Nearby);
}

#[tokio::test]
async fn test_integration_radius_rules() {
    let backend = Arc::new(Scripted::default());
    let controller = controller(backend.clone(), ReportedPosition::Denied);
    controller.mount().await;

    assert!(matches!(
        controller.set_radius(10).await,
        Outcome::Ignored(Rejection::RadiusOutOfRange { .. })
    ));

    controller.submit_search(SearchInput::global("museum")).await;
    assert_eq!(
        controller.set_radius(2_000).await,
        Outcome::Ignored(Rejection::NearbyOnly)
    );
    assert_eq!(controller.inspect(|s| s.radius_meters()).await, 5_000);
}

type Pending = (DiscoveryRequest, oneshot::Sender<ResultPage<EntityCore>>);

/// Holds every request until the test answers it
struct Gated {
    tx: mpsc::UnboundedSender<Pending>,
}

#[async_trait]
impl SearchBackend<EntityCore> for Gated {
    async fn search(&self, request: &DiscoveryRequest) -> Result<ResultPage<EntityCore>, SearchError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send((request.clone(), reply))
            .map_err(|_| SearchError::InvalidResponse("test harness closed".into()))?;
        rx.await
            .map_err(|_| SearchError::InvalidResponse("reply dropped".into()))
    }
}

#[tokio::test]
async fn test_integration_superseded_response_is_discarded() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let controller = Arc::new(controller(Arc::new(Gated { tx }), ReportedPosition::Denied));

    let mount = tokio::spawn({
        let controller = controller.clone();
        async move { controller.mount().await }
    });
    let (_, reply) = rx.recv().await.unwrap();
    reply.send(ResultPage::terminal(items("initial", 3))).unwrap();
    assert_eq!(mount.await.unwrap(), Outcome::Applied);

    let older = tokio::spawn({
        let controller = controller.clone();
        async move { controller.submit_search(SearchInput::text("cafe")).await }
    });
    let (older_request, older_reply) = rx.recv().await.unwrap();
    assert_eq!(older_request.query_text, "cafe");

    let newer = tokio::spawn({
        let controller = controller.clone();
        async move { controller.submit_search(SearchInput::text("bakery")).await }
    });
    let (newer_request, newer_reply) = rx.recv().await.unwrap();
    assert_eq!(newer_request.query_text, "bakery");

    newer_reply.send(ResultPage::terminal(items("bakery", 2))).unwrap();
    assert_eq!(newer.await.unwrap(), Outcome::Applied);

    older_reply.send(ResultPage::terminal(items("cafe", 8))).unwrap();
    assert_eq!(older.await.unwrap(), Outcome::Superseded);

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.query_text, "bakery");
    assert_eq!(snapshot.items.len(), 2);
    assert!(snapshot.items.iter().all(|item| item.id().starts_with("bakery")));
    assert_eq!(snapshot.phase, Phase::Ready);
}

#[tokio::test]
async fn test_integration_load_more_rejected_while_fetching() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let controller = Arc::new(controller(Arc::new(Gated { tx }), ReportedPosition::Denied));

    let mount = tokio::spawn({
        let controller = controller.clone();
        async move { controller.mount().await }
    });
    let (_, reply) = rx.recv().await.unwrap();
    reply
        .send(ResultPage::new(items("p1", 2), Some(Cursor::from("c2"))))
        .unwrap();
    mount.await.unwrap();

    let first = tokio::spawn({
        let controller = controller.clone();
        async move { controller.load_more().await }
    });
    let (_, reply) = rx.recv().await.unwrap();

    assert_eq!(
        controller.load_more().await,
        Outcome::Ignored(Rejection::RequestInFlight)
    );

    reply.send(ResultPage::terminal(items("p2", 2))).unwrap();
    assert_eq!(first.await.unwrap(), Outcome::Applied);
    assert_eq!(controller.inspect(|s| s.items().len()).await, 4);
}

async fn wait_for_phase(controller: &DiscoveryController<EntityCore>, expected: Phase) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while controller.inspect(|s| s.phase().clone()).await != expected {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("session never reached the expected phase");
}

#[tokio::test]
async fn test_integration_response_lands_after_caller_is_dropped() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let controller = Arc::new(controller(Arc::new(Gated { tx }), ReportedPosition::Denied));

    let mount = tokio::spawn({
        let controller = controller.clone();
        async move { controller.mount().await }
    });
    let (_, reply) = rx.recv().await.unwrap();
    reply
        .send(ResultPage::new(items("initial", 3), Some(Cursor::from("n2"))))
        .unwrap();
    mount.await.unwrap();

    // Caller disappears while its request is still in flight
    let search = tokio::spawn({
        let controller = controller.clone();
        async move { controller.submit_search(SearchInput::text("cafe")).await }
    });
    let (request, reply) = rx.recv().await.unwrap();
    assert_eq!(request.query_text, "cafe");
    search.abort();
    assert!(search.await.unwrap_err().is_cancelled());

    reply
        .send(ResultPage::new(items("cafe", 4), Some(Cursor::from("c2"))))
        .unwrap();
    wait_for_phase(&controller, Phase::Ready).await;

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.items.len(), 4);
    assert!(snapshot.has_more);

    // The session keeps working afterwards
    let more = tokio::spawn({
        let controller = controller.clone();
        async move { controller.load_more().await }
    });
    let (request, reply) = rx.recv().await.unwrap();
    assert_eq!(request.cursor, Some(Cursor::from("c2")));
    reply.send(ResultPage::terminal(items("cafe-more", 2))).unwrap();
    assert_eq!(more.await.unwrap(), Outcome::Applied);
}

#[tokio::test]
async fn test_integration_mount_completes_after_caller_is_dropped() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let controller = Arc::new(controller(Arc::new(Gated { tx }), ReportedPosition::Denied));

    let mount = tokio::spawn({
        let controller = controller.clone();
        async move { controller.mount().await }
    });
    let (_, reply) = rx.recv().await.unwrap();
    mount.abort();

    reply.send(ResultPage::terminal(items("initial", 2))).unwrap();
    wait_for_phase(&controller, Phase::Ready).await;
    assert_eq!(controller.inspect(|s| s.items().len()).await, 2);
}

#[tokio::test]
async fn test_integration_toggle_with_query_refetches_both_ways() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let controller = Arc::new(controller(Arc::new(Gated { tx }), ReportedPosition::Denied));

    let mount = tokio::spawn({
        let controller = controller.clone();
        async move { controller.mount().await }
    });
    let (_, reply) = rx.recv().await.unwrap();
    reply
        .send(ResultPage::new(items("initial", 3), Some(Cursor::from("i2"))))
        .unwrap();
    mount.await.unwrap();

    let search = tokio::spawn({
        let controller = controller.clone();
        async move { controller.submit_search(SearchInput::text("cafe")).await }
    });
    let (_, reply) = rx.recv().await.unwrap();
    reply
        .send(ResultPage::new(items("near-cafe", 5), Some(Cursor::from("n2"))))
        .unwrap();
    assert_eq!(search.await.unwrap(), Outcome::Applied);
    assert!(controller.inspect(|s| s.has_more()).await);

    // Nearby -> Global
    let toggle = tokio::spawn({
        let controller = controller.clone();
        async move { controller.toggle_mode().await }
    });
    let (global_request, reply) = rx.recv().await.unwrap();
    assert_eq!(global_request.coordinate, None);
    assert_eq!(global_request.radius_meters, None);
    assert_eq!(global_request.cursor, None);
    assert_eq!(global_request.query_text, "cafe");

    let pending = controller.snapshot().await;
    assert_eq!(pending.mode, SearchMode::Global);
    assert_eq!(pending.phase, Phase::Fetching);
    assert!(pending.items.is_empty());
    assert!(!pending.has_more);

    reply
        .send(ResultPage::new(items("global-cafe", 6), Some(Cursor::from("g2"))))
        .unwrap();
    assert_eq!(toggle.await.unwrap(), Outcome::Applied);
    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.items.len(), 6);
    assert!(snapshot.items.iter().all(|item| item.id().starts_with("global-cafe")));

    // Global -> Nearby
    let toggle = tokio::spawn({
        let controller = controller.clone();
        async move { controller.toggle_mode().await }
    });
    let (nearby_request, reply) = rx.recv().await.unwrap();
    assert_eq!(nearby_request.coordinate, Some(FALLBACK_COORDINATE));
    assert_eq!(nearby_request.radius_meters, Some(5_000));
    assert_eq!(nearby_request.cursor, None);
    assert_eq!(nearby_request.query_text, "cafe");

    let pending = controller.snapshot().await;
    assert_eq!(pending.mode, SearchMode::Nearby);
    assert!(pending.items.is_empty());
    assert!(!pending.has_more);

    reply.send(ResultPage::terminal(items("near-again", 2))).unwrap();
    assert_eq!(toggle.await.unwrap(), Outcome::Applied);
    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.items.len(), 2);
    assert!(snapshot.items.iter().all(|item| item.id().starts_with("near-again")));

    // Exactly the two toggle requests went out
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_integration_http_backend_against_mock_server() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/places/hotels")
        .match_query(mockito::Matcher::AllOf(vec![
            mockito::Matcher::UrlEncoded("q".into(), "sea view".into()),
            mockito::Matcher::UrlEncoded("pageSize".into(), "20".into()),
        ]))
        .match_header("x-api-key", "test-key")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "results": [
                    { "placeId": "h1", "name": "Sea Breeze", "rating": 4.4, "location": { "lat": 15.5, "lng": 73.8 } },
                    { "placeId": "h2", "name": "Palm Court", "vicinity": "Calangute" },
                    { "rating": 3.0 }
                ],
                "next_page_token": "tok-2"
            }"#,
        )
        .create_async()
        .await;

    let backend: HttpSearchBackend<Hotel> = HttpSearchBackend::new(
        server.url(),
        "places/hotels",
        Some("test-key".to_string()),
        Duration::from_secs(5),
    )
    .unwrap();

    let request = DiscoveryRequest {
        coordinate: None,
        radius_meters: None,
        query_text: "sea view".to_string(),
        cursor: None,
        page_size: 20,
    };
    let page = backend.search(&request).await.unwrap();

    mock.assert_async().await;
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].display_name(), "Sea Breeze");
    assert_eq!(page.items[1].address.as_deref(), Some("Calangute"));
    assert_eq!(page.next_cursor, Some(Cursor::from("tok-2")));
}

#[tokio::test]
async fn test_integration_http_backend_error_status() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", mockito::Matcher::Any)
        .with_status(502)
        .with_body("bad gateway")
        .create_async()
        .await;

    let backend: HttpSearchBackend<Hotel> =
        HttpSearchBackend::new(server.url(), "places/hotels", None, Duration::from_secs(5)).unwrap();
    let request = DiscoveryRequest {
        coordinate: Some(FALLBACK_COORDINATE),
        radius_meters: Some(5_000),
        query_text: String::new(),
        cursor: None,
        page_size: 20,
    };

    match backend.search(&request).await {
        Err(SearchError::Backend { status, message }) => {
            assert_eq!(status, 502);
            assert_eq!(message, "bad gateway");
        }
        other => panic!("expected backend error, got {:?}", other.map(|p| p.items.len())),
    }
}
