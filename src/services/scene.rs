//! Map scene - what the view layer draws
//!
//! Markers for every registry site (start/target highlighted) plus one
//! polyline per displayed route. Polylines are ordered alternates first so
//! the primary route is drawn on top.

use crate::domain::route::ColorTag;
use crate::domain::selection::Selection;
use crate::domain::site::{Coordinate, Site, SiteId, SiteRegistry};
use crate::services::presentation::RouteSet;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    Site,
    Start,
    Target,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub site_id: SiteId,
    pub position: Coordinate,
    pub kind: MarkerKind,
    /// Popup text
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Polyline {
    pub coordinates: Vec<Coordinate>,
    pub color: ColorTag,
    pub css_color: String,
    pub cost_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapScene {
    pub center: Coordinate,
    pub zoom: u8,
    pub markers: Vec<Marker>,
    pub polylines: Vec<Polyline>,
}

impl MapScene {
    pub fn marker(&self, id: &str) -> Option<&Marker> {
        self.markers.iter().find(|m| m.site_id.as_str() == id)
    }
}

fn marker_kind(site: &Site, selection: &Selection) -> MarkerKind {
    // A site picked as both ends shows as the start
    if selection.start().is_some_and(|s| s.id == site.id) {
        MarkerKind::Start
    } else if selection.target().is_some_and(|s| s.id == site.id) {
        MarkerKind::Target
    } else {
        MarkerKind::Site
    }
}

fn popup_label(site: &Site) -> String {
    format!(
        "{}\nLatitude: {}, Longitude: {}",
        site.label(),
        site.coordinate.lat,
        site.coordinate.lng
    )
}

/// Assemble the scene. `center` falls back to the first registry site.
pub fn build_scene(
    registry: &SiteRegistry,
    selection: &Selection,
    routes: &RouteSet,
    center: Option<Coordinate>,
    zoom: u8,
) -> MapScene {
    let center = center
        .or_else(|| registry.first().map(|site| site.coordinate))
        .unwrap_or(Coordinate::new(0.0, 0.0));

    let markers = registry
        .sites()
        .iter()
        .map(|site| Marker {
            site_id: site.id.clone(),
            position: site.coordinate,
            kind: marker_kind(site, selection),
            label: popup_label(site),
        })
        .collect();

    let polylines = routes
        .draw_order()
        .map(|route| Polyline {
            coordinates: route.coordinates().to_vec(),
            color: route.color,
            css_color: route.css_color.clone(),
            cost_label: route.cost_label.clone(),
        })
        .collect();

    MapScene { center, zoom, markers, polylines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::route::RouteGeometry;
    use crate::services::presentation::{Palette, RouteStore};

    fn registry() -> SiteRegistry {
        SiteRegistry::new(vec![
            Site::new("970", -37.8657, 145.0928),
            Site::new("2000", -37.8504, 145.0947),
            Site::new("3685", -37.8548714, 145.0939236),
        ])
    }

    fn geometry(ids: &[&str], registry: &SiteRegistry, cost: f64) -> RouteGeometry {
        RouteGeometry {
            coordinates: ids.iter().filter_map(|id| registry.coordinate(id)).collect(),
            cost,
            labels: ids.iter().map(|&id| SiteId::from(id)).collect(),
        }
    }

    #[test]
    fn test_empty_scene_centers_on_first_site() {
        let registry = registry();
        let scene = build_scene(&registry, &Selection::new(), &RouteSet::default(), None, 13);

        assert_eq!(scene.center, Coordinate::new(-37.8657, 145.0928));
        assert_eq!(scene.zoom, 13);
        assert_eq!(scene.markers.len(), 3);
        assert!(scene.markers.iter().all(|m| m.kind == MarkerKind::Site));
        assert!(scene.polylines.is_empty());
    }

    #[test]
    fn test_configured_center_wins() {
        let registry = registry();
        let center = Coordinate::new(-37.83, 145.06);
        let scene =
            build_scene(&registry, &Selection::new(), &RouteSet::default(), Some(center), 15);
        assert_eq!(scene.center, center);
        assert_eq!(scene.zoom, 15);
    }

    #[test]
    fn test_selected_sites_are_highlighted() {
        let registry = registry();
        let mut selection = Selection::new();
        selection.start_journey();
        selection.click_site(registry.get("970").unwrap());
        selection.click_site(registry.get("2000").unwrap());

        let scene = build_scene(&registry, &selection, &RouteSet::default(), None, 13);
        assert_eq!(scene.marker("970").unwrap().kind, MarkerKind::Start);
        assert_eq!(scene.marker("2000").unwrap().kind, MarkerKind::Target);
        assert_eq!(scene.marker("3685").unwrap().kind, MarkerKind::Site);
    }

    #[test]
    fn test_marker_popup_label() {
        let registry = registry();
        let scene = build_scene(&registry, &Selection::new(), &RouteSet::default(), None, 13);
        let label = &scene.marker("970").unwrap().label;
        assert!(label.starts_with("SCATS Location 970"));
        assert!(label.contains("Latitude: -37.8657"));
    }

    #[test]
    fn test_primary_polyline_drawn_last() {
        let registry = registry();
        let store = RouteStore::new(Palette::default());
        store.replace_all(
            geometry(&["970", "2000"], &registry, 100.0),
            vec![
                geometry(&["970", "3685", "2000"], &registry, 150.0),
                geometry(&["970", "4444", "2000"], &registry, 170.0),
            ],
        );

        let scene = build_scene(&registry, &Selection::new(), &store.snapshot(), None, 13);
        let colors: Vec<&str> = scene.polylines.iter().map(|p| p.css_color.as_str()).collect();
        assert_eq!(colors, vec!["red", "green", "blue"]);
        assert_eq!(scene.polylines[0].coordinates.len(), 3);
        assert_eq!(scene.polylines[1].coordinates.len(), 2);
        assert_eq!(scene.polylines[2].cost_label, "1.67 minutes");
    }
}
