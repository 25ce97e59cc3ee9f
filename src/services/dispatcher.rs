//! Route request dispatcher - validates a selection and performs one round trip
//!
//! Every call is bounded by the configured timeout and races the journey
//! abort signal: a `watch` channel carrying the current generation. Once
//! the generation moves past the request's own, the call resolves with
//! `RouteError::Aborted`. There is no automatic retry.

use crate::domain::error::RouteError;
use crate::domain::route::{Generation, RouteRequest, RouteResult};
use crate::domain::selection::Selection;
use crate::infra::metrics::Metrics;
use crate::io::route_service::RouteService;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{info, warn};

/// Sends route requests to the routing service
#[derive(Clone)]
pub struct RouteDispatcher {
    service: Arc<dyn RouteService>,
    timeout: Duration,
    abort_rx: watch::Receiver<Generation>,
    metrics: Arc<Metrics>,
}

impl RouteDispatcher {
    pub fn new(
        service: Arc<dyn RouteService>,
        timeout: Duration,
        abort_rx: watch::Receiver<Generation>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self { service, timeout, abort_rx, metrics }
    }

    /// Build a request for a complete selection, stamped with the current time
    pub fn build_request(
        selection: &Selection,
        alternate_count: u32,
        generation: Generation,
    ) -> Result<RouteRequest, RouteError> {
        let (start, target) = selection.pair().ok_or(RouteError::InvalidSelection)?;
        Ok(RouteRequest::new(start.id.clone(), target.id.clone(), alternate_count, generation))
    }

    /// Request the single best path for a complete selection
    pub async fn submit(
        &self,
        selection: &Selection,
        generation: Generation,
    ) -> Result<RouteResult, RouteError> {
        let request = Self::build_request(selection, 0, generation)?;
        self.send(&request).await?.into_iter().next().ok_or_else(no_paths)
    }

    /// Request `alternate_count + 1` paths; index 0 is the best path
    pub async fn submit_with_alternates(
        &self,
        selection: &Selection,
        alternate_count: u32,
        generation: Generation,
    ) -> Result<Vec<RouteResult>, RouteError> {
        let request = Self::build_request(selection, alternate_count, generation)?;
        self.send(&request).await
    }

    /// Perform the round trip for a prepared request.
    ///
    /// Results are non-empty and in service order, capped at
    /// `request.path_count()`.
    pub async fn send(&self, request: &RouteRequest) -> Result<Vec<RouteResult>, RouteError> {
        let started = Instant::now();
        self.metrics.record_request_sent();

        info!(
            start = %request.start,
            target = %request.target,
            paths = %request.path_count(),
            generation = %request.generation,
            issued_at = %request.issued_at.to_rfc3339(),
            "route_request_sent"
        );

        let call = async {
            if request.wants_alternates() {
                self.service.alternate_paths(request).await
            } else {
                self.service.best_path(request).await.map(|result| vec![result])
            }
        };

        let mut abort_rx = self.abort_rx.clone();
        let outcome = tokio::select! {
            result = tokio::time::timeout(self.timeout, call) => match result {
                Ok(result) => result,
                Err(_) => Err(RouteError::RouteServiceUnavailable(format!(
                    "no response within {} ms",
                    self.timeout.as_millis()
                ))),
            },
            _ = wait_for_abort(&mut abort_rx, request.generation) => Err(RouteError::Aborted),
        };

        let outcome = outcome.and_then(|mut results| {
            if results.is_empty() {
                return Err(no_paths());
            }
            results.truncate(request.path_count() as usize);
            Ok(results)
        });

        let latency_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(results) => {
                self.metrics.record_request_succeeded(latency_ms);
                info!(
                    generation = %request.generation,
                    paths = %results.len(),
                    best_cost_s = %results[0].total_cost,
                    latency_ms = %latency_ms,
                    "route_response_received"
                );
            }
            Err(RouteError::Aborted) => {
                self.metrics.record_request_aborted();
                info!(generation = %request.generation, latency_ms = %latency_ms, "route_request_aborted");
            }
            Err(e) => {
                self.metrics.record_request_failed();
                warn!(
                    generation = %request.generation,
                    kind = %e.kind(),
                    error = %e,
                    latency_ms = %latency_ms,
                    "route_request_failed"
                );
            }
        }

        outcome
    }
}

fn no_paths() -> RouteError {
    RouteError::RouteServiceProtocolError("no paths returned".to_string())
}

/// Resolves once the journey generation moves past `generation`
async fn wait_for_abort(abort_rx: &mut watch::Receiver<Generation>, generation: Generation) {
    // A closed channel means no newer journey can ever start
    if abort_rx.wait_for(|current| *current != generation).await.is_err() {
        std::future::pending::<()>().await;
    }
}
