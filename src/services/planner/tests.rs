//! Tests for the JourneyPlanner

use super::*;
use crate::domain::site::{Site, SiteId};
use crate::services::scene::MarkerKind;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Route service that replays queued outcomes and records every call
#[derive(Default)]
struct ScriptedService {
    outcomes: Mutex<VecDeque<Result<Vec<RouteResult>, RouteError>>>,
    calls: Mutex<Vec<u32>>,
    hang: bool,
}

impl ScriptedService {
    fn with(outcomes: Vec<Result<Vec<RouteResult>, RouteError>>) -> Arc<Self> {
        Arc::new(Self { outcomes: Mutex::new(outcomes.into()), ..Default::default() })
    }

    fn hanging() -> Arc<Self> {
        Arc::new(Self { hang: true, ..Default::default() })
    }

    fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    async fn next(&self, paths: u32) -> Result<Vec<RouteResult>, RouteError> {
        self.calls.lock().push(paths);
        if self.hang {
            std::future::pending::<()>().await;
        }
        self.outcomes.lock().pop_front().unwrap_or_else(|| {
            Err(RouteError::RouteServiceUnavailable("no scripted outcome".to_string()))
        })
    }
}

#[async_trait]
impl RouteService for ScriptedService {
    async fn best_path(&self, request: &RouteRequest) -> Result<RouteResult, RouteError> {
        let mut results = self.next(request.path_count()).await?;
        Ok(results.remove(0))
    }

    async fn alternate_paths(&self, request: &RouteRequest) -> Result<Vec<RouteResult>, RouteError> {
        self.next(request.path_count()).await
    }
}

fn config() -> Config {
    Config::default().with_service_timeout_ms(2_000).with_sites(vec![
        Site::new("970", -37.8657, 145.0928),
        Site::new("2000", -37.8504, 145.0947),
        Site::new("3685", -37.8548714, 145.0939236),
        Site::new("3682", -37.837475, 145.0968675),
    ])
}

fn planner(service: Arc<ScriptedService>) -> JourneyPlanner {
    JourneyPlanner::new(&config(), service, Arc::new(Metrics::new()))
}

fn path(ids: &[&str], cost: f64) -> RouteResult {
    RouteResult::new(ids.iter().map(|&id| SiteId::from(id)).collect(), cost)
}

fn select(planner: &mut JourneyPlanner, start: &str, target: &str) {
    planner.start_journey();
    planner.click_site(start);
    planner.click_site(target);
}

#[test]
fn test_scenario_a_selection() {
    let mut planner = planner(ScriptedService::with(Vec::new()));
    planner.start_journey();

    assert!(planner.click_site("970"));
    assert_eq!(planner.phase(), Phase::AwaitingTarget);
    assert_eq!(planner.selection().start().map(|s| s.id.as_str()), Some("970"));

    assert!(planner.click_site("2000"));
    assert_eq!(planner.phase(), Phase::Complete);
    assert_eq!(planner.selection().target().map(|s| s.id.as_str()), Some("2000"));
    assert_eq!(planner.controls(), Controls { start_journey: true, submit: true, alternates: true });
}

#[test]
fn test_unknown_site_click_ignored() {
    let mut planner = planner(ScriptedService::with(Vec::new()));
    planner.start_journey();
    assert!(!planner.click_site("4444"));
    assert_eq!(planner.phase(), Phase::AwaitingStart);
    assert!(planner.selection().start().is_none());
}

#[test]
fn test_clicks_before_start_journey_ignored() {
    let mut planner = planner(ScriptedService::with(Vec::new()));
    assert!(!planner.click_site("970"));
    assert_eq!(planner.phase(), Phase::Idle);
    assert_eq!(planner.controls(), Controls { start_journey: true, submit: false, alternates: false });
}

#[tokio::test]
async fn test_scenario_b_submit_installs_primary() {
    let service = ScriptedService::with(vec![Ok(vec![path(&["970", "2000"], 120.0)])]);
    let mut planner = planner(service.clone());
    select(&mut planner, "970", "2000");

    let applied = planner.submit().await.unwrap();
    assert_eq!(applied, Applied::Installed { alternates: 0 });

    let routes = planner.routes();
    let primary = routes.primary.as_ref().unwrap();
    assert_eq!(primary.coordinates().len(), 2);
    assert_eq!(primary.cost(), 120.0);
    assert_eq!(primary.cost_label, "2.00 minutes");
    assert!(routes.alternates.is_empty());
    assert_eq!(planner.status(), &Status::RoutesShown { alternates: 0 });
    assert_eq!(service.calls.lock().as_slice(), &[1]);
}

#[tokio::test]
async fn test_scenario_c_alternates_colored_in_order() {
    let service = ScriptedService::with(vec![Ok(vec![
        path(&["970", "2000"], 100.0),
        path(&["970", "3685", "2000"], 130.0),
        path(&["970", "3682", "2000"], 150.0),
        path(&["970", "3685", "3682", "2000"], 170.0),
    ])]);
    let mut planner = planner(service.clone());
    select(&mut planner, "970", "2000");

    let applied = planner.submit_with_alternates(3).await.unwrap();
    assert_eq!(applied, Applied::Installed { alternates: 3 });

    let routes = planner.routes();
    assert!(routes.primary.is_some());
    let tags: Vec<String> = routes.alternates.iter().map(|r| r.color.to_string()).collect();
    assert_eq!(tags, vec!["alt1", "alt2", "alt3"]);
    let costs: Vec<f64> = routes.alternates.iter().map(|r| r.cost()).collect();
    assert_eq!(costs, vec![130.0, 150.0, 170.0]);
    assert_eq!(service.calls.lock().as_slice(), &[4]);
}

#[tokio::test]
async fn test_scenario_d_failure_keeps_previous_routes() {
    let service = ScriptedService::with(vec![
        Ok(vec![path(&["970", "2000"], 120.0)]),
        Err(RouteError::RouteServiceUnavailable("connection refused".to_string())),
    ]);
    let mut planner = planner(service);
    select(&mut planner, "970", "2000");
    planner.submit().await.unwrap();
    let before = planner.routes();

    let err = planner.submit().await.unwrap_err();
    assert!(matches!(err, RouteError::RouteServiceUnavailable(_)));

    assert_eq!(*planner.routes(), *before);
    assert!(matches!(planner.status(), Status::Failed(_)));
}

#[tokio::test]
async fn test_protocol_error_keeps_previous_routes() {
    let service = ScriptedService::with(vec![
        Ok(vec![path(&["970", "2000"], 120.0)]),
        Err(RouteError::RouteServiceProtocolError("missing field `path`".to_string())),
    ]);
    let mut planner = planner(service);
    select(&mut planner, "970", "2000");
    planner.submit().await.unwrap();

    assert!(planner.submit_with_alternates(2).await.is_err());
    assert_eq!(planner.routes().primary.as_ref().map(|r| r.cost()), Some(120.0));
}

#[tokio::test]
async fn test_submit_incomplete_selection_makes_no_call() {
    let service = ScriptedService::with(vec![Ok(vec![path(&["970", "2000"], 120.0)])]);
    let mut planner = planner(service.clone());
    planner.start_journey();
    planner.click_site("970");

    let err = planner.submit().await.unwrap_err();
    assert_eq!(err, RouteError::InvalidSelection);
    assert_eq!(service.call_count(), 0);
    assert_eq!(planner.phase(), Phase::AwaitingTarget);
    assert_eq!(planner.status(), &Status::SelectionIncomplete);
    assert!(planner.routes().is_empty());
}

#[tokio::test]
async fn test_start_journey_clears_routes() {
    let service = ScriptedService::with(vec![Ok(vec![path(&["970", "2000"], 120.0)])]);
    let mut planner = planner(service);
    select(&mut planner, "970", "2000");
    planner.submit().await.unwrap();
    assert!(!planner.routes().is_empty());

    let generation = planner.generation();
    planner.start_journey();
    assert!(planner.routes().is_empty());
    assert_eq!(planner.generation(), generation + 1);
    assert_eq!(planner.phase(), Phase::AwaitingStart);
}

#[test]
fn test_response_from_previous_journey_discarded() {
    let mut planner = planner(ScriptedService::with(Vec::new()));
    select(&mut planner, "970", "2000");
    let pending = planner.prepare(0).unwrap();

    select(&mut planner, "2000", "970");
    let applied = planner.apply(&pending, Ok(vec![path(&["970", "2000"], 120.0)])).unwrap();

    assert_eq!(applied, Applied::Discarded);
    assert!(planner.routes().is_empty());
    assert_eq!(planner.status(), &Status::ReadyToSubmit);
}

#[test]
fn test_latest_request_wins() {
    let mut planner = planner(ScriptedService::with(Vec::new()));
    select(&mut planner, "970", "2000");

    let single = planner.prepare(0).unwrap();
    let alternates = planner.prepare(2).unwrap();

    let applied = planner
        .apply(
            &alternates,
            Ok(vec![
                path(&["970", "2000"], 100.0),
                path(&["970", "3685", "2000"], 130.0),
                path(&["970", "3682", "2000"], 150.0),
            ]),
        )
        .unwrap();
    assert_eq!(applied, Applied::Installed { alternates: 2 });

    // The older single-path answer arrives late
    let late = planner.apply(&single, Ok(vec![path(&["970", "2000"], 90.0)])).unwrap();
    assert_eq!(late, Applied::Discarded);

    let routes = planner.routes();
    assert_eq!(routes.primary.as_ref().map(|r| r.cost()), Some(100.0));
    assert_eq!(routes.alternates.len(), 2);
}

#[test]
fn test_stale_failure_does_not_touch_status() {
    let mut planner = planner(ScriptedService::with(Vec::new()));
    select(&mut planner, "970", "2000");

    let older = planner.prepare(0).unwrap();
    let newer = planner.prepare(0).unwrap();
    planner.apply(&newer, Ok(vec![path(&["970", "2000"], 100.0)])).unwrap();

    let applied = planner
        .apply(&older, Err(RouteError::RouteServiceUnavailable("HTTP 502".to_string())))
        .unwrap();
    assert_eq!(applied, Applied::Discarded);
    assert_eq!(planner.status(), &Status::RoutesShown { alternates: 0 });
}

#[tokio::test]
async fn test_start_journey_aborts_in_flight_request() {
    let mut planner = planner(ScriptedService::hanging());
    select(&mut planner, "970", "2000");

    let pending = planner.prepare(0).unwrap();
    let dispatcher = planner.dispatcher();
    let request = pending.request.clone();
    let task = tokio::spawn(async move { dispatcher.send(&request).await });

    planner.start_journey();

    let outcome = task.await.unwrap();
    assert_eq!(outcome.clone().unwrap_err(), RouteError::Aborted);
    assert_eq!(planner.apply(&pending, outcome).unwrap(), Applied::Discarded);
    assert_eq!(planner.status(), &Status::SelectStart);
}

#[tokio::test]
async fn test_geometry_gap_still_renders() {
    let service = ScriptedService::with(vec![Ok(vec![path(&["970", "4444", "2000"], 60.0)])]);
    let metrics = Arc::new(Metrics::new());
    let mut planner = JourneyPlanner::new(&config(), service, metrics.clone());
    select(&mut planner, "970", "2000");

    planner.submit().await.unwrap();

    let routes = planner.routes();
    let primary = routes.primary.as_ref().unwrap();
    assert_eq!(primary.coordinates().len(), 2);
    assert_eq!(primary.labels().len(), 3);
    assert_eq!(metrics.report().geometry_gaps, 1);
}

#[tokio::test]
async fn test_scene_reflects_selection_and_routes() {
    let service = ScriptedService::with(vec![Ok(vec![
        path(&["970", "2000"], 100.0),
        path(&["970", "3685", "2000"], 130.0),
    ])]);
    let mut planner = planner(service);
    select(&mut planner, "970", "2000");
    planner.submit_with_alternates(1).await.unwrap();

    let scene = planner.scene();
    assert_eq!(scene.zoom, 13);
    assert_eq!(scene.center, Coordinate::new(-37.8657, 145.0928));
    assert_eq!(scene.marker("970").map(|m| m.kind), Some(MarkerKind::Start));
    assert_eq!(scene.marker("2000").map(|m| m.kind), Some(MarkerKind::Target));

    let colors: Vec<&str> = scene.polylines.iter().map(|p| p.css_color.as_str()).collect();
    assert_eq!(colors, vec!["red", "blue"]);
}

#[tokio::test]
async fn test_submit_alternates_uses_configured_count() {
    let service = ScriptedService::with(vec![Ok(vec![
        path(&["970", "2000"], 100.0),
        path(&["970", "3685", "2000"], 130.0),
        path(&["970", "3682", "2000"], 150.0),
    ])]);
    let mut planner = planner(service.clone());
    select(&mut planner, "970", "2000");

    planner.submit_alternates().await.unwrap();
    assert_eq!(service.calls.lock().as_slice(), &[planner.alternate_count() + 1]);
}
