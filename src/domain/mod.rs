//! Domain models - core types of the journey client
//!
//! This module contains the canonical data types used throughout the system:
//! - `Site` / `SiteRegistry` - SCATS intersections and their coordinates
//! - `Selection` - the start/target selection state machine
//! - `RouteRequest` / `RouteResult` / `RenderedRoute` - route data at each stage
//! - `RouteError` - failure taxonomy for route requests

pub mod error;
pub mod route;
pub mod selection;
pub mod site;

// Re-export commonly used types at module level
pub use error::RouteError;
pub use route::{ColorTag, Generation, RenderedRoute, RouteGeometry, RouteRequest, RouteResult};
pub use selection::{Phase, Selection, Status};
pub use site::{Coordinate, Site, SiteId, SiteRegistry};
