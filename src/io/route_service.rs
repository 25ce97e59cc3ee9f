//! Routing service client - JSON over HTTP
//!
//! Endpoints:
//! - `POST /evaluate` `{start, target, datetime}` -> `{path, path_cost}`
//! - `POST /find_alternate_paths` `{start_scats, target_scats, date_time, num_paths}`
//!   -> `{alternate_paths: [{path, path_cost}]}`, element 0 being the best path
//!
//! Site ids in `path` arrive as JSON integers or strings; both are accepted.

use crate::domain::error::RouteError;
use crate::domain::route::{RouteRequest, RouteResult};
use crate::domain::site::SiteId;
use crate::infra::config::Config;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

/// Anything that can compute paths between two sites
#[async_trait]
pub trait RouteService: Send + Sync {
    /// Single best path
    async fn best_path(&self, request: &RouteRequest) -> Result<RouteResult, RouteError>;

    /// `request.path_count()` paths in one round trip, best first
    async fn alternate_paths(&self, request: &RouteRequest) -> Result<Vec<RouteResult>, RouteError>;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EvaluateRequest {
    pub start: String,
    pub target: String,
    pub datetime: DateTime<Local>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AlternatePathRequest {
    pub start_scats: u32,
    pub target_scats: u32,
    #[serde(default)]
    pub date_time: Option<DateTime<Local>>,
    #[serde(default = "default_num_paths")]
    pub num_paths: u32,
}

fn default_num_paths() -> u32 {
    2
}

/// A site id as it appears on the wire
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireSiteId {
    Number(i64),
    Text(String),
}

impl From<WireSiteId> for SiteId {
    fn from(value: WireSiteId) -> Self {
        match value {
            WireSiteId::Number(n) => SiteId(n.to_string()),
            WireSiteId::Text(s) => SiteId(s),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PathResponse {
    pub path: Vec<WireSiteId>,
    pub path_cost: f64,
}

#[derive(Debug, Deserialize)]
pub struct AlternatePathsResponse {
    pub alternate_paths: Vec<PathResponse>,
}

impl TryFrom<PathResponse> for RouteResult {
    type Error = RouteError;

    fn try_from(value: PathResponse) -> Result<Self, Self::Error> {
        if value.path.is_empty() {
            return Err(RouteError::RouteServiceProtocolError("empty path".to_string()));
        }
        if !value.path_cost.is_finite() || value.path_cost < 0.0 {
            return Err(RouteError::RouteServiceProtocolError(format!(
                "invalid path_cost {}",
                value.path_cost
            )));
        }
        Ok(RouteResult::new(value.path.into_iter().map(SiteId::from).collect(), value.path_cost))
    }
}

/// Decode a single-path response body
pub fn decode_best_path(body: &[u8]) -> Result<RouteResult, RouteError> {
    let response: PathResponse = serde_json::from_slice(body)
        .map_err(|e| RouteError::RouteServiceProtocolError(e.to_string()))?;
    RouteResult::try_from(response)
}

/// Decode an alternate-paths response body, preserving service order
pub fn decode_alternate_paths(body: &[u8]) -> Result<Vec<RouteResult>, RouteError> {
    let response: AlternatePathsResponse = serde_json::from_slice(body)
        .map_err(|e| RouteError::RouteServiceProtocolError(e.to_string()))?;
    if response.alternate_paths.is_empty() {
        return Err(RouteError::RouteServiceProtocolError("no paths returned".to_string()));
    }
    response.alternate_paths.into_iter().map(RouteResult::try_from).collect()
}

fn scats_number(id: &SiteId) -> Result<u32, RouteError> {
    id.scats_number().ok_or_else(|| {
        RouteError::RouteServiceProtocolError(format!("site id '{id}' is not a SCATS number"))
    })
}

/// Log transport failure (cold path)
#[cold]
fn log_transport_error(url: &str, e: &reqwest::Error) {
    error!(url = %url, error = %e, timeout = %e.is_timeout(), "route_service_transport_error");
}

/// Routing service reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpRouteService {
    client: reqwest::Client,
    evaluate_url: String,
    alternates_url: String,
}

impl HttpRouteService {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        // One client for connection pooling
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.service_timeout_ms()))
            .build()?;

        Ok(Self { client, evaluate_url: config.evaluate_url(), alternates_url: config.alternates_url() })
    }

    async fn post<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<Vec<u8>, RouteError> {
        let response = self.client.post(url).json(body).send().await.map_err(|e| {
            log_transport_error(url, &e);
            RouteError::RouteServiceUnavailable(if e.is_timeout() {
                "request timed out".to_string()
            } else {
                e.to_string()
            })
        })?;

        let status = response.status();
        if !status.is_success() {
            error!(url = %url, status = %status.as_u16(), "route_service_bad_status");
            return Err(RouteError::RouteServiceUnavailable(format!("HTTP {}", status.as_u16())));
        }

        let body = response.bytes().await.map_err(|e| {
            log_transport_error(url, &e);
            RouteError::RouteServiceUnavailable(e.to_string())
        })?;

        debug!(url = %url, bytes = %body.len(), "route_service_response");
        Ok(body.to_vec())
    }
}

#[async_trait]
impl RouteService for HttpRouteService {
    async fn best_path(&self, request: &RouteRequest) -> Result<RouteResult, RouteError> {
        let body = EvaluateRequest {
            start: request.start.to_string(),
            target: request.target.to_string(),
            datetime: request.issued_at,
        };
        let bytes = self.post(&self.evaluate_url, &body).await?;
        decode_best_path(&bytes)
    }

    async fn alternate_paths(&self, request: &RouteRequest) -> Result<Vec<RouteResult>, RouteError> {
        let body = AlternatePathRequest {
            start_scats: scats_number(&request.start)?,
            target_scats: scats_number(&request.target)?,
            date_time: Some(request.issued_at),
            num_paths: request.path_count(),
        };
        let bytes = self.post(&self.alternates_url, &body).await?;
        decode_alternate_paths(&bytes)
    }
}
