//! Journey planner - single owner of the selection and the displayed routes
//!
//! The planner ties together:
//! - Selection state machine (start/target picking)
//! - Route dispatch (one round trip per submit, bounded and abortable)
//! - Geometry mapping and the presentation store
//!
//! Submission is split in two so callers can keep the UI responsive while
//! a request is outstanding: `prepare` issues a `PendingRoute` ticket, the
//! ticket's request is sent on the dispatcher (possibly in a spawned task),
//! and `apply` installs the outcome. A ticket is only installed if its
//! generation is still current and it is the latest one issued; anything
//! else is discarded as stale.

#[cfg(test)]
mod tests;

use crate::domain::error::RouteError;
use crate::domain::route::{Generation, RouteRequest, RouteResult};
use crate::domain::selection::{Phase, Selection, Status};
use crate::domain::site::{Coordinate, SiteRegistry};
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::io::route_service::RouteService;
use crate::services::dispatcher::RouteDispatcher;
use crate::services::geometry::map_to_geometry;
use crate::services::presentation::{Palette, RouteSet, RouteStore};
use crate::services::scene::{build_scene, MapScene};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// An issued route request awaiting its outcome
#[derive(Debug, Clone)]
pub struct PendingRoute {
    pub request: RouteRequest,
    /// Position in the planner's issue order
    pub sequence: u64,
}

impl PendingRoute {
    pub fn generation(&self) -> Generation {
        self.request.generation
    }
}

/// What `apply` did with an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Routes replaced; number of alternates shown
    Installed { alternates: usize },
    /// Superseded by a newer request or journey; nothing changed
    Discarded,
}

/// Which controls are usable in the current phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Controls {
    pub start_journey: bool,
    pub submit: bool,
    pub alternates: bool,
}

pub struct JourneyPlanner {
    registry: Arc<SiteRegistry>,
    selection: Selection,
    store: Arc<RouteStore>,
    dispatcher: RouteDispatcher,
    /// Publishes the current generation; in-flight requests of older
    /// generations abort when it changes
    abort_tx: watch::Sender<Generation>,
    generation: Generation,
    latest_sequence: u64,
    journey_id: Option<String>,
    alternate_count: u32,
    map_center: Option<Coordinate>,
    map_zoom: u8,
    metrics: Arc<Metrics>,
}

impl JourneyPlanner {
    pub fn new(config: &Config, service: Arc<dyn RouteService>, metrics: Arc<Metrics>) -> Self {
        let (abort_tx, abort_rx) = watch::channel(0);
        let dispatcher = RouteDispatcher::new(
            service,
            Duration::from_millis(config.service_timeout_ms()),
            abort_rx,
            metrics.clone(),
        );

        Self {
            registry: Arc::new(config.site_registry()),
            selection: Selection::new(),
            store: Arc::new(RouteStore::new(Palette::from_config(config))),
            dispatcher,
            abort_tx,
            generation: 0,
            latest_sequence: 0,
            journey_id: None,
            alternate_count: config.alternate_count(),
            map_center: config.map_center(),
            map_zoom: config.map_zoom(),
            metrics,
        }
    }

    /// Begin a new journey: reset the selection, clear displayed routes and
    /// abort any request still in flight.
    pub fn start_journey(&mut self) {
        self.generation += 1;
        self.abort_tx.send_replace(self.generation);
        self.selection.start_journey();
        self.store.clear();

        let journey_id = Uuid::now_v7().to_string();
        info!(journey_id = %journey_id, generation = %self.generation, "journey_started");
        self.journey_id = Some(journey_id);
    }

    /// Handle a click on a map site. Unknown ids are ignored.
    pub fn click_site(&mut self, id: &str) -> bool {
        let Some(site) = self.registry.get(id) else {
            warn!(site_id = %id, "click_unknown_site");
            return false;
        };

        let accepted = self.selection.click_site(site);
        if accepted {
            info!(
                journey_id = %self.journey_id.as_deref().unwrap_or("-"),
                site_id = %id,
                phase = %self.selection.phase().as_str(),
                "site_selected"
            );
        } else {
            debug!(site_id = %id, phase = %self.selection.phase().as_str(), "site_click_ignored");
        }
        accepted
    }

    /// Validate the selection and issue a ticket for `alternate_count + 1` paths
    pub fn prepare(&mut self, alternate_count: u32) -> Result<PendingRoute, RouteError> {
        let request =
            match RouteDispatcher::build_request(&self.selection, alternate_count, self.generation) {
                Ok(request) => request,
                Err(e) => {
                    warn!(phase = %self.selection.phase().as_str(), "submit_selection_incomplete");
                    self.selection.set_status(Status::SelectionIncomplete);
                    return Err(e);
                }
            };

        self.latest_sequence += 1;
        self.selection.set_status(Status::Routing { paths: request.path_count() });

        Ok(PendingRoute { request, sequence: self.latest_sequence })
    }

    /// Install the outcome of a ticket, or discard it if superseded.
    ///
    /// Failures set a `Failed` status and leave the displayed routes as
    /// they were.
    pub fn apply(
        &mut self,
        pending: &PendingRoute,
        outcome: Result<Vec<RouteResult>, RouteError>,
    ) -> Result<Applied, RouteError> {
        if pending.generation() != self.generation || pending.sequence != self.latest_sequence {
            self.metrics.record_stale_response();
            info!(
                generation = %pending.generation(),
                current_generation = %self.generation,
                sequence = %pending.sequence,
                latest_sequence = %self.latest_sequence,
                "route_response_stale"
            );
            return Ok(Applied::Discarded);
        }

        let results = match outcome {
            Ok(results) => results,
            // Only a generation change aborts, and that was handled above
            Err(RouteError::Aborted) => return Ok(Applied::Discarded),
            Err(e) => {
                self.selection.set_status(Status::Failed(e.to_string()));
                return Err(e);
            }
        };

        let mut geometries = results.iter().map(|result| map_to_geometry(&self.registry, result));
        let Some(primary) = geometries.next() else {
            let e = RouteError::RouteServiceProtocolError("no paths returned".to_string());
            self.selection.set_status(Status::Failed(e.to_string()));
            return Err(e);
        };
        let alternates: Vec<_> = geometries.collect();

        let dropped = primary.dropped() + alternates.iter().map(|g| g.dropped()).sum::<usize>();
        if dropped > 0 {
            self.metrics.record_geometry_gaps(dropped);
        }

        let shown = alternates.len();
        info!(
            journey_id = %self.journey_id.as_deref().unwrap_or("-"),
            cost = %primary.cost_label(),
            alternates = %shown,
            dropped = %dropped,
            "routes_installed"
        );

        self.store.replace_all(primary, alternates);
        self.selection.set_status(Status::RoutesShown { alternates: shown });

        Ok(Applied::Installed { alternates: shown })
    }

    /// Request the best path and install it
    pub async fn submit(&mut self) -> Result<Applied, RouteError> {
        self.run(0).await
    }

    /// Request the best path plus `alternate_count` alternates and install them
    pub async fn submit_with_alternates(
        &mut self,
        alternate_count: u32,
    ) -> Result<Applied, RouteError> {
        self.run(alternate_count).await
    }

    /// Alternates with the configured count
    pub async fn submit_alternates(&mut self) -> Result<Applied, RouteError> {
        self.run(self.alternate_count).await
    }

    async fn run(&mut self, alternate_count: u32) -> Result<Applied, RouteError> {
        let pending = self.prepare(alternate_count)?;
        let outcome = self.dispatcher.send(&pending.request).await;
        self.apply(&pending, outcome)
    }

    /// Dispatcher handle for sending a ticket off the planner's task
    pub fn dispatcher(&self) -> RouteDispatcher {
        self.dispatcher.clone()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn phase(&self) -> Phase {
        self.selection.phase()
    }

    pub fn status(&self) -> &Status {
        self.selection.status()
    }

    pub fn routes(&self) -> Arc<RouteSet> {
        self.store.snapshot()
    }

    pub fn store(&self) -> Arc<RouteStore> {
        self.store.clone()
    }

    pub fn registry(&self) -> &Arc<SiteRegistry> {
        &self.registry
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn journey_id(&self) -> Option<&str> {
        self.journey_id.as_deref()
    }

    pub fn alternate_count(&self) -> u32 {
        self.alternate_count
    }

    pub fn controls(&self) -> Controls {
        let complete = self.selection.phase() == Phase::Complete;
        Controls { start_journey: true, submit: complete, alternates: complete }
    }

    /// Current map scene
    pub fn scene(&self) -> MapScene {
        build_scene(
            &self.registry,
            &self.selection,
            &self.store.snapshot(),
            self.map_center,
            self.map_zoom,
        )
    }
}
