//! End-to-end journey tests against the in-process mock router

use scats_journey::domain::{Phase, RouteError, Status};
use scats_journey::infra::{Config, Metrics};
use scats_journey::io::mock_router::{serve_mock_router, RoadGraph, DEFAULT_DEGREE};
use scats_journey::io::HttpRouteService;
use scats_journey::services::{Applied, JourneyPlanner, MarkerKind};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;

struct Harness {
    planner: JourneyPlanner,
    metrics: Arc<Metrics>,
    _shutdown: watch::Sender<bool>,
}

async fn harness() -> Harness {
    let config = Config::default();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let graph = Arc::new(RoadGraph::from_registry(&config.site_registry(), DEFAULT_DEGREE));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(serve_mock_router(listener, graph, shutdown_rx));

    let config = config.with_service_base_url(&format!("http://{addr}"));
    let service = HttpRouteService::new(&config).unwrap();
    let metrics = Arc::new(Metrics::new());
    let planner = JourneyPlanner::new(&config, Arc::new(service), metrics.clone());

    Harness { planner, metrics, _shutdown: shutdown_tx }
}

#[tokio::test]
async fn test_submit_draws_route_between_selected_sites() {
    let mut h = harness().await;
    h.planner.start_journey();
    h.planner.click_site("970");
    h.planner.click_site("3001");
    assert_eq!(h.planner.phase(), Phase::Complete);

    let applied = h.planner.submit().await.unwrap();
    assert_eq!(applied, Applied::Installed { alternates: 0 });

    let routes = h.planner.routes();
    let primary = routes.primary.as_ref().unwrap();
    assert_eq!(primary.labels().first().map(|id| id.as_str()), Some("970"));
    assert_eq!(primary.labels().last().map(|id| id.as_str()), Some("3001"));
    // Every hop lands on a known site
    assert_eq!(primary.coordinates().len(), primary.labels().len());
    assert!(primary.cost() > 0.0);
    assert!(primary.cost_label.ends_with(" minutes"));
    assert_eq!(primary.css_color, "blue");
}

#[tokio::test]
async fn test_alternates_replace_previous_routes() {
    let mut h = harness().await;
    h.planner.start_journey();
    h.planner.click_site("970");
    h.planner.click_site("3001");

    h.planner.submit().await.unwrap();
    let best_cost = h.planner.routes().primary.as_ref().map(|r| r.cost());

    let applied = h.planner.submit_with_alternates(2).await.unwrap();
    let Applied::Installed { alternates } = applied else {
        panic!("expected routes to be installed, got {applied:?}");
    };
    assert!(alternates <= 2);

    let routes = h.planner.routes();
    assert_eq!(routes.primary.as_ref().map(|r| r.cost()), best_cost);
    assert_eq!(routes.alternates.len(), alternates);
    for (i, route) in routes.alternates.iter().enumerate() {
        assert_eq!(route.color.to_string(), format!("alt{}", i + 1));
    }

    let scene = h.planner.scene();
    assert_eq!(scene.polylines.len(), alternates + 1);
    assert_eq!(scene.polylines.last().map(|p| p.css_color.as_str()), Some("blue"));
    assert_eq!(scene.marker("970").map(|m| m.kind), Some(MarkerKind::Start));
    assert_eq!(scene.marker("3001").map(|m| m.kind), Some(MarkerKind::Target));
}

#[tokio::test]
async fn test_unreachable_service_keeps_routes() {
    let mut h = harness().await;
    h.planner.start_journey();
    h.planner.click_site("970");
    h.planner.click_site("2000");
    h.planner.submit().await.unwrap();
    let before = h.planner.routes();

    // Same registry, but pointing at a port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    let config = Config::default().with_service_base_url(&dead);
    let mut offline =
        JourneyPlanner::new(&config, Arc::new(HttpRouteService::new(&config).unwrap()), h.metrics.clone());
    offline.start_journey();
    offline.click_site("970");
    offline.click_site("2000");

    let err = offline.submit().await.unwrap_err();
    assert!(matches!(err, RouteError::RouteServiceUnavailable(_)));
    assert!(matches!(offline.status(), Status::Failed(_)));
    assert!(offline.routes().is_empty());

    // The first planner is unaffected
    assert_eq!(*h.planner.routes(), *before);
}

#[tokio::test]
async fn test_submit_before_target_is_rejected_locally() {
    let mut h = harness().await;
    h.planner.start_journey();
    h.planner.click_site("970");

    let err = h.planner.submit_with_alternates(2).await.unwrap_err();
    assert_eq!(err, RouteError::InvalidSelection);
    assert_eq!(h.metrics.requests_total(), 0);
}

#[tokio::test]
async fn test_new_journey_clears_map() {
    let mut h = harness().await;
    h.planner.start_journey();
    h.planner.click_site("970");
    h.planner.click_site("2000");
    h.planner.submit().await.unwrap();

    h.planner.start_journey();
    assert!(h.planner.routes().is_empty());
    assert!(h.planner.scene().polylines.is_empty());
    assert!(h.planner.scene().markers.iter().all(|m| m.kind == MarkerKind::Site));
}
