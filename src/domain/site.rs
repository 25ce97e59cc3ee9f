//! SCATS site registry - static mapping from site id to map coordinate

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use tracing::warn;

/// Newtype wrapper for SCATS site identifiers
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(pub String);

impl SiteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric SCATS number, if the id is one
    pub fn scats_number(&self) -> Option<u32> {
        self.0.trim().parse().ok()
    }
}

impl std::fmt::Display for SiteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for SiteId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SiteId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Geographic coordinate, serialized as `[lat, lng]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl From<[f64; 2]> for Coordinate {
    fn from([lat, lng]: [f64; 2]) -> Self {
        Self { lat, lng }
    }
}

impl From<Coordinate> for [f64; 2] {
    fn from(c: Coordinate) -> Self {
        [c.lat, c.lng]
    }
}

/// A selectable intersection on the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: SiteId,
    pub coordinate: Coordinate,
}

impl Site {
    pub fn new(id: &str, lat: f64, lng: f64) -> Self {
        Self { id: SiteId::from(id), coordinate: Coordinate::new(lat, lng) }
    }

    /// Popup label shown next to the marker
    pub fn label(&self) -> String {
        format!("SCATS Location {}", self.id)
    }
}

/// Sites shipped with the client (Boroondara SCATS network)
const BUILTIN_SITES: [(&str, f64, f64); 40] = [
    ("970", -37.8673031, 145.0915114),
    ("2000", -37.8519228, 145.0943244),
    ("2200", -37.81654, 145.0980472),
    ("2820", -37.7947848, 145.0304651),
    ("2825", -37.78661, 145.06202),
    ("2827", -37.7817393, 145.0773314),
    ("2846", -37.8613043, 145.0578745),
    ("3001", -37.8145649, 145.02221),
    ("3002", -37.8151625, 145.0265725),
    ("3120", -37.822895, 145.0572875),
    ("3122", -37.8238567, 145.0643933),
    ("3126", -37.8278467, 145.0985767),
    ("3127", -37.8252267, 145.0779467),
    ("3180", -37.7962133, 145.0835067),
    ("3662", -37.8089525, 145.0274575),
    ("3682", -37.837475, 145.0968675),
    ("3685", -37.8548714, 145.0939236),
    ("3804", -37.8336425, 145.0623925),
    ("3812", -37.83749, 145.060865),
    ("4030", -37.79533, 145.0616067),
    ("4032", -37.8022975, 145.06123),
    ("4034", -37.81185, 145.059405),
    ("4035", -37.8181564, 145.0581226),
    ("4040", -37.8328717, 145.0554233),
    ("4043", -37.84716, 145.0526275),
    ("4051", -37.7941433, 145.0693333),
    ("4057", -37.8049687, 145.0817598),
    ("4063", -37.8143725, 145.080005),
    ("4262", -37.82155, 145.01503),
    ("4263", -37.8230562, 145.024958),
    ("4264", -37.8241054, 145.0340062),
    ("4266", -37.82529, 145.04387),
    ("4270", -37.8302275, 145.032815),
    ("4272", -37.8318833, 145.0463933),
    ("4273", -37.84659, 145.04443),
    ("4321", -37.8008379, 145.049119),
    ("4324", -37.8093323, 145.0368477),
    ("4335", -37.806215, 145.03525),
    ("4812", -37.8289133, 145.0155867),
    ("4821", -37.812965, 145.00847),
];

/// Read-only registry of sites, in load order
#[derive(Debug, Clone)]
pub struct SiteRegistry {
    sites: Vec<Site>,
    index: FxHashMap<SiteId, usize>,
}

impl SiteRegistry {
    /// Build a registry. The first occurrence of a duplicated id wins.
    pub fn new(sites: Vec<Site>) -> Self {
        let mut kept = Vec::with_capacity(sites.len());
        let mut index = FxHashMap::default();

        for site in sites {
            if index.contains_key(&site.id) {
                warn!(site_id = %site.id, "site_registry_duplicate_ignored");
                continue;
            }
            index.insert(site.id.clone(), kept.len());
            kept.push(site);
        }

        Self { sites: kept, index }
    }

    /// Registry of the built-in SCATS sites
    pub fn builtin() -> Self {
        Self::new(BUILTIN_SITES.iter().map(|&(id, lat, lng)| Site::new(id, lat, lng)).collect())
    }

    #[inline]
    pub fn get(&self, id: &str) -> Option<&Site> {
        self.index.get(id).map(|&idx| &self.sites[idx])
    }

    #[inline]
    pub fn coordinate(&self, id: &str) -> Option<Coordinate> {
        self.get(id).map(|site| site.coordinate)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn first(&self) -> Option<&Site> {
        self.sites.first()
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

impl Default for SiteRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
