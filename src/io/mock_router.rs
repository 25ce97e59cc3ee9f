//! Mock routing service for local runs and integration tests
//!
//! Serves the same JSON endpoints as the real traffic-prediction router:
//! - `POST /evaluate` - best path
//! - `POST /find_alternate_paths` - best path plus alternates
//! - `GET /health`
//!
//! Instead of predicted traffic flow, each hop costs the great-circle
//! distance at a fixed speed plus a fixed delay per intersection.
//! Alternates are found by blocking every edge of the paths already
//! returned and searching again.

use crate::domain::site::{Site, SiteRegistry};
use crate::io::route_service::{AlternatePathRequest, EvaluateRequest};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Assumed free-flow speed
const SPEED_KMH: f64 = 60.0;

/// Delay added at every intersection passed (seconds)
const INTERSECTION_DELAY_S: f64 = 30.0;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Nearest sites each site is linked to
pub const DEFAULT_DEGREE: usize = 4;

fn haversine_km(from: &Site, to: &Site) -> f64 {
    let lat1 = from.coordinate.lat.to_radians();
    let lat2 = to.coordinate.lat.to_radians();
    let delta_lat = (to.coordinate.lat - from.coordinate.lat).to_radians();
    let delta_lng = (to.coordinate.lng - from.coordinate.lng).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lng / 2.0).sin().powi(2);

    EARTH_RADIUS_KM * 2.0 * a.sqrt().asin()
}

/// Undirected road graph over the numeric SCATS sites
#[derive(Debug, Clone)]
pub struct RoadGraph {
    sites: Vec<Site>,
    numbers: Vec<u32>,
    index: FxHashMap<u32, usize>,
    neighbors: Vec<Vec<usize>>,
}

impl RoadGraph {
    /// Link every site to its `degree` nearest sites, plus a spanning tree
    /// so the whole network is reachable. Non-numeric ids are left out.
    pub fn from_registry(registry: &SiteRegistry, degree: usize) -> Self {
        let mut sites = Vec::new();
        let mut numbers = Vec::new();
        let mut index = FxHashMap::default();
        for site in registry.sites() {
            let Some(number) = site.id.scats_number() else {
                warn!(site_id = %site.id, "mock_router_site_skipped");
                continue;
            };
            index.insert(number, sites.len());
            numbers.push(number);
            sites.push(site.clone());
        }

        let n = sites.len();
        let mut edges: FxHashSet<(usize, usize)> = FxHashSet::default();
        let mut link = |a: usize, b: usize| {
            edges.insert((a.min(b), a.max(b)));
        };

        for a in 0..n {
            let mut by_distance: Vec<usize> = (0..n).filter(|&b| b != a).collect();
            by_distance.sort_by(|&x, &y| {
                haversine_km(&sites[a], &sites[x]).total_cmp(&haversine_km(&sites[a], &sites[y]))
            });
            for &b in by_distance.iter().take(degree) {
                link(a, b);
            }
        }

        // Prim's spanning tree
        if n > 0 {
            let mut in_tree = vec![false; n];
            let mut best: Vec<(f64, usize)> = vec![(f64::INFINITY, 0); n];
            in_tree[0] = true;
            for b in 1..n {
                best[b] = (haversine_km(&sites[0], &sites[b]), 0);
            }
            for _ in 1..n {
                let Some(next) = (0..n)
                    .filter(|&b| !in_tree[b])
                    .min_by(|&x, &y| best[x].0.total_cmp(&best[y].0))
                else {
                    break;
                };
                in_tree[next] = true;
                link(next, best[next].1);
                for b in 0..n {
                    let d = haversine_km(&sites[next], &sites[b]);
                    if !in_tree[b] && d < best[b].0 {
                        best[b] = (d, next);
                    }
                }
            }
        }

        let mut neighbors = vec![Vec::new(); n];
        for &(a, b) in &edges {
            neighbors[a].push(b);
            neighbors[b].push(a);
        }
        for list in &mut neighbors {
            list.sort_unstable();
        }

        debug!(sites = %n, edges = %edges.len(), "mock_router_graph_built");

        Self { sites, numbers, index, neighbors }
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn contains(&self, number: u32) -> bool {
        self.index.contains_key(&number)
    }

    /// Travel time of one hop in seconds
    #[inline]
    fn hop_cost(&self, a: usize, b: usize) -> f64 {
        haversine_km(&self.sites[a], &self.sites[b]) / SPEED_KMH * 3600.0 + INTERSECTION_DELAY_S
    }

    /// Cheapest path avoiding `blocked` edges; returns the SCATS numbers
    /// and the total cost in whole seconds
    pub fn shortest_path(
        &self,
        start: u32,
        target: u32,
        blocked: &FxHashSet<(usize, usize)>,
    ) -> Option<(Vec<u32>, f64)> {
        let &from = self.index.get(&start)?;
        let &to = self.index.get(&target)?;

        let mut cost = vec![f64::INFINITY; self.len()];
        let mut prev: Vec<Option<usize>> = vec![None; self.len()];
        // Keyed on milliseconds so the heap can order them
        let mut heap = BinaryHeap::new();
        cost[from] = 0.0;
        heap.push(Reverse((0u64, from)));

        while let Some(Reverse((_, node))) = heap.pop() {
            if node == to {
                break;
            }
            for &next in &self.neighbors[node] {
                if blocked.contains(&(node.min(next), node.max(next))) {
                    continue;
                }
                let candidate = cost[node] + self.hop_cost(node, next);
                if candidate < cost[next] {
                    cost[next] = candidate;
                    prev[next] = Some(node);
                    heap.push(Reverse(((candidate * 1000.0) as u64, next)));
                }
            }
        }

        if !cost[to].is_finite() {
            return None;
        }

        let mut path = vec![self.numbers[to]];
        let mut current = to;
        while let Some(p) = prev[current] {
            path.push(self.numbers[p]);
            current = p;
        }
        path.reverse();

        Some((path, cost[to].round()))
    }

    /// Up to `num_paths` distinct paths, best first
    pub fn alternate_paths(&self, start: u32, target: u32, num_paths: u32) -> Vec<(Vec<u32>, f64)> {
        let mut paths: Vec<(Vec<u32>, f64)> = Vec::new();
        let mut blocked = FxHashSet::default();

        for _ in 0..num_paths {
            let Some((path, cost)) = self.shortest_path(start, target, &blocked) else {
                break;
            };
            if paths.iter().any(|(seen, _)| *seen == path) {
                break;
            }
            for hop in path.windows(2) {
                let a = self.index[&hop[0]];
                let b = self.index[&hop[1]];
                blocked.insert((a.min(b), a.max(b)));
            }
            paths.push((path, cost));
        }

        paths
    }
}

#[derive(Debug, Serialize)]
struct PathBody {
    path_cost: f64,
    path: Vec<u32>,
}

#[derive(Debug, Serialize)]
struct AlternatePathsBody {
    alternate_paths: Vec<PathBody>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let bytes = serde_json::to_vec(body).unwrap_or_default();
    let mut response = Response::new(Full::new(Bytes::from(bytes)));
    *response.status_mut() = status;
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn error_response(status: StatusCode, detail: impl Into<String>) -> Response<Full<Bytes>> {
    json_response(status, &ErrorBody { detail: detail.into() })
}

fn evaluate(graph: &RoadGraph, body: &[u8]) -> Response<Full<Bytes>> {
    let request: EvaluateRequest = match serde_json::from_slice(body) {
        Ok(request) => request,
        Err(e) => return error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
    };
    let (Ok(start), Ok(target)) = (request.start.trim().parse::<u32>(), request.target.trim().parse::<u32>())
    else {
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, "site ids must be SCATS numbers");
    };

    info!(start = %start, target = %target, datetime = %request.datetime, "mock_router_evaluate");

    match graph.shortest_path(start, target, &FxHashSet::default()) {
        Some((path, path_cost)) => json_response(StatusCode::OK, &PathBody { path_cost, path }),
        None => error_response(StatusCode::NOT_FOUND, "no path"),
    }
}

fn find_alternate_paths(graph: &RoadGraph, body: &[u8]) -> Response<Full<Bytes>> {
    let request: AlternatePathRequest = match serde_json::from_slice(body) {
        Ok(request) => request,
        Err(e) => return error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
    };

    info!(
        start = %request.start_scats,
        target = %request.target_scats,
        num_paths = %request.num_paths,
        "mock_router_find_alternate_paths"
    );

    let alternate_paths = graph
        .alternate_paths(request.start_scats, request.target_scats, request.num_paths)
        .into_iter()
        .map(|(path, path_cost)| PathBody { path_cost, path })
        .collect();

    json_response(StatusCode::OK, &AlternatePathsBody { alternate_paths })
}

/// Handle HTTP requests
async fn handle_request(
    req: Request<hyper::body::Incoming>,
    graph: Arc<RoadGraph>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => return Ok(error_response(StatusCode::BAD_REQUEST, e.to_string())),
    };

    let response = match (method, path.as_str()) {
        (Method::POST, "/evaluate") => evaluate(&graph, &body),
        (Method::POST, "/find_alternate_paths") => find_alternate_paths(&graph, &body),
        (Method::GET, "/health") => Response::new(Full::new(Bytes::from_static(b"ok"))),
        _ => error_response(StatusCode::NOT_FOUND, "Not Found"),
    };

    Ok(response)
}

/// Serve the mock router on an already bound listener until `shutdown` is set
pub async fn serve_mock_router(
    listener: TcpListener,
    graph: Arc<RoadGraph>,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    info!(addr = %listener.local_addr()?, sites = %graph.len(), "mock_router_started");

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let io = TokioIo::new(stream);
                        let graph = graph.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let graph = graph.clone();
                                async move { handle_request(req, graph).await }
                            });

                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                error!(error = %e, "mock_router_http_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "mock_router_accept_error");
                    }
                }
            }
            changed = shutdown.changed() => {
                // A dropped sender also stops the server
                if changed.is_err() || *shutdown.borrow() {
                    info!("mock_router_shutdown");
                    return Ok(());
                }
            }
        }
    }
}
