//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> (or --config=<path>) command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml

use crate::domain::site::{Coordinate, Site, SiteRegistry};
use anyhow::{bail, Context};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "config/dev.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Routing service root, e.g. "http://localhost:8000"
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_evaluate_path")]
    pub evaluate_path: String,
    #[serde(default = "default_alternates_path")]
    pub alternates_path: String,
    /// Upper bound for one round trip
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            evaluate_path: default_evaluate_path(),
            alternates_path: default_alternates_path(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_evaluate_path() -> String {
    "/evaluate".to_string()
}

fn default_alternates_path() -> String {
    "/find_alternate_paths".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct MapConfig {
    /// Initial map center as [lat, lng]. Defaults to the first site.
    #[serde(default)]
    pub center: Option<Coordinate>,
    #[serde(default = "default_zoom")]
    pub zoom: u8,
}

fn default_zoom() -> u8 {
    13
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoutesConfig {
    /// Alternates requested by "Get Alternate Paths"
    #[serde(default = "default_alternate_count")]
    pub alternate_count: u32,
    #[serde(default = "default_primary_color")]
    pub primary_color: String,
    /// Cycled through by alternate routes in order
    #[serde(default = "default_palette")]
    pub palette: Vec<String>,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            alternate_count: default_alternate_count(),
            primary_color: default_primary_color(),
            palette: default_palette(),
        }
    }
}

fn default_alternate_count() -> u32 {
    2
}

fn default_primary_color() -> String {
    "blue".to_string()
}

fn default_palette() -> Vec<String> {
    vec!["red".to_string(), "green".to_string(), "purple".to_string()]
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub routes: RoutesConfig,
    /// Site registry override; empty means the built-in sites
    #[serde(default)]
    pub sites: Vec<Site>,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    service_base_url: String,
    evaluate_path: String,
    alternates_path: String,
    service_timeout_ms: u64,
    map_center: Option<Coordinate>,
    map_zoom: u8,
    alternate_count: u32,
    primary_color: String,
    palette: Vec<String>,
    sites: Vec<Site>,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_base_url: default_base_url(),
            evaluate_path: default_evaluate_path(),
            alternates_path: default_alternates_path(),
            service_timeout_ms: default_timeout_ms(),
            map_center: None,
            map_zoom: default_zoom(),
            alternate_count: default_alternate_count(),
            primary_color: default_primary_color(),
            palette: default_palette(),
            sites: Vec::new(),
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    /// Determine config file path: CLI flag, then `CONFIG_FILE`, then the dev file
    pub fn resolve_config_path(cli_path: Option<&str>) -> String {
        Self::choose_config_path(cli_path, env::var("CONFIG_FILE").ok())
    }

    fn choose_config_path(cli_path: Option<&str>, env_path: Option<String>) -> String {
        match (cli_path, env_path) {
            (Some(path), _) => path.to_string(),
            (None, Some(path)) if !path.is_empty() => path,
            _ => DEFAULT_CONFIG_PATH.to_string(),
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
            .map(|config| Self { config_file: path.display().to_string(), ..config })
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let toml_config: TomlConfig = toml::from_str(content)?;

        if toml_config.routes.palette.is_empty() {
            bail!("routes.palette must list at least one color");
        }
        if toml_config.service.timeout_ms == 0 {
            bail!("service.timeout_ms must be greater than zero");
        }

        Ok(Self {
            service_base_url: toml_config.service.base_url,
            evaluate_path: toml_config.service.evaluate_path,
            alternates_path: toml_config.service.alternates_path,
            service_timeout_ms: toml_config.service.timeout_ms,
            map_center: toml_config.map.center,
            map_zoom: toml_config.map.zoom,
            alternate_count: toml_config.routes.alternate_count,
            primary_color: toml_config.routes.primary_color,
            palette: toml_config.routes.palette,
            sites: toml_config.sites,
            config_file: "inline".to_string(),
        })
    }

    /// Load configuration from a path, falling back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "config_load_failed_using_defaults");
                Self::default()
            }
        }
    }

    /// Load configuration - tries TOML file first, falls back to defaults
    pub fn load(cli_path: Option<&str>) -> Self {
        Self::load_from_path(&Self::resolve_config_path(cli_path))
    }

    /// Build the site registry (built-in sites when none are configured)
    pub fn site_registry(&self) -> SiteRegistry {
        if self.sites.is_empty() {
            SiteRegistry::builtin()
        } else {
            SiteRegistry::new(self.sites.clone())
        }
    }

    pub fn evaluate_url(&self) -> String {
        join_url(&self.service_base_url, &self.evaluate_path)
    }

    pub fn alternates_url(&self) -> String {
        join_url(&self.service_base_url, &self.alternates_path)
    }

    // Getters for all config fields
    pub fn service_base_url(&self) -> &str {
        &self.service_base_url
    }

    pub fn service_timeout_ms(&self) -> u64 {
        self.service_timeout_ms
    }

    pub fn map_center(&self) -> Option<Coordinate> {
        self.map_center
    }

    pub fn map_zoom(&self) -> u8 {
        self.map_zoom
    }

    pub fn alternate_count(&self) -> u32 {
        self.alternate_count
    }

    pub fn primary_color(&self) -> &str {
        &self.primary_color
    }

    pub fn palette(&self) -> &[String] {
        &self.palette
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method to point the client at another routing service
    pub fn with_service_base_url(mut self, url: &str) -> Self {
        self.service_base_url = url.to_string();
        self
    }

    /// Builder method to set the round-trip timeout
    pub fn with_service_timeout_ms(mut self, ms: u64) -> Self {
        self.service_timeout_ms = ms;
        self
    }

    /// Builder method to replace the site list
    pub fn with_sites(mut self, sites: Vec<Site>) -> Self {
        self.sites = sites;
        self
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
