//! Route request/result types and rendered route geometry

use crate::domain::site::{Coordinate, SiteId};
use chrono::{DateTime, Local};
use serde::Serialize;

/// Selection instance a request belongs to (bumped by every `start_journey`)
pub type Generation = u64;

/// One submission to the routing service
#[derive(Debug, Clone)]
pub struct RouteRequest {
    pub start: SiteId,
    pub target: SiteId,
    pub issued_at: DateTime<Local>,
    /// 0 for a single best path
    pub alternate_count: u32,
    pub generation: Generation,
}

impl RouteRequest {
    pub fn new(start: SiteId, target: SiteId, alternate_count: u32, generation: Generation) -> Self {
        Self { start, target, issued_at: Local::now(), alternate_count, generation }
    }

    /// Total number of paths asked for (best + alternates)
    #[inline]
    pub fn path_count(&self) -> u32 {
        self.alternate_count.saturating_add(1)
    }

    pub fn wants_alternates(&self) -> bool {
        self.alternate_count > 0
    }
}

/// One path returned by the routing service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteResult {
    pub site_sequence: Vec<SiteId>,
    /// Travel time in seconds
    pub total_cost: f64,
}

impl RouteResult {
    pub fn new(site_sequence: Vec<SiteId>, total_cost: f64) -> Self {
        Self { site_sequence, total_cost }
    }
}

/// Map geometry for one route, before a color is assigned
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteGeometry {
    pub coordinates: Vec<Coordinate>,
    /// Seconds, copied from the result
    pub cost: f64,
    /// Full site sequence, including ids with no coordinate
    pub labels: Vec<SiteId>,
}

impl RouteGeometry {
    /// Number of labels that have no coordinate
    pub fn dropped(&self) -> usize {
        self.labels.len().saturating_sub(self.coordinates.len())
    }

    pub fn cost_label(&self) -> String {
        format_minutes(self.cost)
    }
}

/// Rendering color slot of a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorTag {
    Primary,
    /// Index into the alternate palette
    Alternate(usize),
}

impl std::fmt::Display for ColorTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColorTag::Primary => f.write_str("primary"),
            ColorTag::Alternate(slot) => write!(f, "alt{}", slot + 1),
        }
    }
}

/// A route ready for the map view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedRoute {
    #[serde(flatten)]
    pub geometry: RouteGeometry,
    pub color: ColorTag,
    /// CSS color resolved from the palette
    pub css_color: String,
    pub cost_label: String,
}

impl RenderedRoute {
    pub fn new(geometry: RouteGeometry, color: ColorTag, css_color: &str) -> Self {
        let cost_label = geometry.cost_label();
        Self { geometry, color, css_color: css_color.to_string(), cost_label }
    }

    pub fn coordinates(&self) -> &[Coordinate] {
        &self.geometry.coordinates
    }

    pub fn cost(&self) -> f64 {
        self.geometry.cost
    }

    pub fn labels(&self) -> &[SiteId] {
        &self.geometry.labels
    }
}

/// Format a travel time in seconds as minutes with two decimals
pub fn format_minutes(seconds: f64) -> String {
    format!("{:.2} minutes", seconds / 60.0)
}
