//! Services - journey logic and route state
//!
//! - `planner` - Journey planner, single owner of selection and routes
//! - `dispatcher` - Route request dispatch with timeout and abort
//! - `geometry` - Site sequence to map coordinates
//! - `presentation` - Displayed route set and color assignment
//! - `scene` - Map scene for the view layer

pub mod dispatcher;
pub mod geometry;
pub mod planner;
pub mod presentation;
pub mod scene;

// Re-export commonly used types
pub use dispatcher::RouteDispatcher;
pub use geometry::map_to_geometry;
pub use planner::{Applied, Controls, JourneyPlanner, PendingRoute};
pub use presentation::{Palette, RouteSet, RouteStore};
pub use scene::{build_scene, MapScene, Marker, MarkerKind, Polyline};
