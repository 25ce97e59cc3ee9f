//! Route presentation store - the routes currently shown on the map
//!
//! The whole set is swapped under one write lock, so readers holding a
//! snapshot see either the previous set or the new one, never a mix.

use crate::domain::route::{ColorTag, RenderedRoute, RouteGeometry};
use crate::infra::config::Config;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// Route colors: a fixed primary and a cycling alternate palette
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    primary: String,
    alternates: Vec<String>,
}

impl Palette {
    /// An empty alternate list falls back to the primary color
    pub fn new(primary: &str, alternates: &[String]) -> Self {
        let alternates =
            if alternates.is_empty() { vec![primary.to_string()] } else { alternates.to_vec() };
        Self { primary: primary.to_string(), alternates }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.primary_color(), config.palette())
    }

    /// Color slot for the alternate at `index`
    #[inline]
    pub fn alternate_tag(&self, index: usize) -> ColorTag {
        ColorTag::Alternate(index % self.alternates.len())
    }

    pub fn css_color(&self, tag: ColorTag) -> &str {
        match tag {
            ColorTag::Primary => &self.primary,
            ColorTag::Alternate(slot) => &self.alternates[slot % self.alternates.len()],
        }
    }

    pub fn len(&self) -> usize {
        self.alternates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alternates.is_empty()
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// One complete set of displayed routes
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct RouteSet {
    pub primary: Option<RenderedRoute>,
    pub alternates: Vec<RenderedRoute>,
}

impl RouteSet {
    pub fn is_empty(&self) -> bool {
        self.primary.is_none() && self.alternates.is_empty()
    }

    /// Alternates first, primary last
    pub fn draw_order(&self) -> impl Iterator<Item = &RenderedRoute> {
        self.alternates.iter().chain(self.primary.iter())
    }
}

/// Shared store of the displayed route set
pub struct RouteStore {
    palette: Palette,
    current: RwLock<Arc<RouteSet>>,
}

impl RouteStore {
    pub fn new(palette: Palette) -> Self {
        Self { palette, current: RwLock::new(Arc::new(RouteSet::default())) }
    }

    /// Discard the current set and install a new one, assigning colors
    pub fn replace_all(&self, primary: RouteGeometry, alternates: Vec<RouteGeometry>) {
        let primary = RenderedRoute::new(
            primary,
            ColorTag::Primary,
            self.palette.css_color(ColorTag::Primary),
        );
        let alternates: Vec<RenderedRoute> = alternates
            .into_iter()
            .enumerate()
            .map(|(i, geometry)| {
                let tag = self.palette.alternate_tag(i);
                RenderedRoute::new(geometry, tag, self.palette.css_color(tag))
            })
            .collect();

        debug!(alternates = %alternates.len(), "route_store_replaced");

        let next = Arc::new(RouteSet { primary: Some(primary), alternates });
        *self.current.write() = next;
    }

    pub fn clear(&self) {
        *self.current.write() = Arc::new(RouteSet::default());
    }

    /// Current route set (cheap clone of the shared snapshot)
    pub fn snapshot(&self) -> Arc<RouteSet> {
        self.current.read().clone()
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }
}

impl Default for RouteStore {
    fn default() -> Self {
        Self::new(Palette::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::site::Coordinate;

    fn geometry(cost: f64) -> RouteGeometry {
        RouteGeometry {
            coordinates: vec![Coordinate::new(-37.86, 145.09), Coordinate::new(-37.85, 145.09)],
            cost,
            labels: vec!["970".into(), "2000".into()],
        }
    }

    fn palette() -> Palette {
        Palette::new("blue", &["red".to_string(), "green".to_string(), "purple".to_string()])
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = RouteStore::new(palette());
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_replace_all_assigns_colors() {
        let store = RouteStore::new(palette());
        store.replace_all(geometry(100.0), vec![geometry(120.0), geometry(130.0), geometry(140.0)]);

        let set = store.snapshot();
        let primary = set.primary.as_ref().unwrap();
        assert_eq!(primary.color, ColorTag::Primary);
        assert_eq!(primary.css_color, "blue");

        let tags: Vec<String> = set.alternates.iter().map(|r| r.color.to_string()).collect();
        assert_eq!(tags, vec!["alt1", "alt2", "alt3"]);
        let colors: Vec<&str> = set.alternates.iter().map(|r| r.css_color.as_str()).collect();
        assert_eq!(colors, vec!["red", "green", "purple"]);
    }

    #[test]
    fn test_alternate_colors_cycle() {
        let palette = palette();
        let store = RouteStore::new(palette.clone());
        let k = 7;
        store.replace_all(geometry(1.0), (0..k).map(|i| geometry(i as f64)).collect());

        let set = store.snapshot();
        for (i, route) in set.alternates.iter().enumerate() {
            assert_eq!(route.color, ColorTag::Alternate(i % palette.len()));
            assert_eq!(route.css_color, palette.css_color(ColorTag::Alternate(i % palette.len())));
        }
        assert_eq!(set.alternates[3].css_color, "red");
    }

    #[test]
    fn test_replace_all_discards_previous_set() {
        let store = RouteStore::new(palette());
        store.replace_all(geometry(100.0), vec![geometry(120.0), geometry(130.0)]);
        store.replace_all(geometry(50.0), Vec::new());

        let set = store.snapshot();
        assert_eq!(set.primary.as_ref().map(|r| r.cost()), Some(50.0));
        assert!(set.alternates.is_empty());
    }

    #[test]
    fn test_snapshot_unaffected_by_later_replace() {
        let store = RouteStore::new(palette());
        store.replace_all(geometry(100.0), vec![geometry(120.0)]);
        let before = store.snapshot();

        store.replace_all(geometry(60.0), Vec::new());

        assert_eq!(before.primary.as_ref().map(|r| r.cost()), Some(100.0));
        assert_eq!(before.alternates.len(), 1);
        assert_eq!(store.snapshot().alternates.len(), 0);
    }

    #[test]
    fn test_clear() {
        let store = RouteStore::new(palette());
        store.replace_all(geometry(100.0), vec![geometry(120.0)]);
        store.clear();
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_draw_order_puts_primary_last() {
        let store = RouteStore::new(palette());
        store.replace_all(geometry(100.0), vec![geometry(120.0), geometry(130.0)]);
        let set = store.snapshot();
        let order: Vec<ColorTag> = set.draw_order().map(|r| r.color).collect();
        assert_eq!(
            order,
            vec![ColorTag::Alternate(0), ColorTag::Alternate(1), ColorTag::Primary]
        );
    }

    #[test]
    fn test_empty_palette_falls_back_to_primary() {
        let palette = Palette::new("blue", &[]);
        assert_eq!(palette.len(), 1);
        assert_eq!(palette.css_color(palette.alternate_tag(5)), "blue");
    }
}
