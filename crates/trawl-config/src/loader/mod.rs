//! Layered configuration loader.
//!
//! Discovers configuration layers (user/project/cwd/runtime), validates each
//! layer's schema, merges them in precedence order and produces a final
//! `TrawlConfig`.

mod layer_io;
mod merge;
mod schema;
mod utils;


use crate::{ConfigError, TrawlConfig};
use log::{debug, info};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Default config filename in local layers.
const DEFAULT_CONFIG_FILE: &str = "trawl.json5";
/// Default config directory under user or project roots.
const DEFAULT_CONFIG_DIR: &str = ".trawl";
/// Marker files/dirs that identify a project root.
const DEFAULT_PROJECT_ROOT_MARKERS: &[&str] = &[".git"];

/// Effective config plus metadata about which layers were loaded.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    /// The merged, validated config.
    pub config: TrawlConfig,
    /// Metadata for each layer that contributed to the config.
    pub layers: Vec<ConfigLayer>,
}

/// Origin for a single config layer in the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayerSource {
    /// User-specific configuration.
    User,
    /// Project root configuration (`<root>/.trawl/trawl.json5`).
    Project,
    /// Current working directory configuration.
    Cwd,
    /// Runtime overrides (highest precedence).
    Runtime,
}

/// Metadata about a loaded config layer.
#[derive(Debug, Clone)]
pub struct ConfigLayer {
    /// Layer origin.
    pub source: ConfigLayerSource,
    /// Location on disk; `None` for in-memory overrides.
    pub path: Option<PathBuf>,
}

/// Options controlling layered config discovery and overrides.
#[derive(Debug, Clone)]
pub struct LayeredConfigOptions {
    /// Working directory used to find the project root and cwd layer.
    pub cwd: PathBuf,
    /// Optional user config path (defaults to `~/.trawl/trawl.json5`).
    pub user_config_path: Option<PathBuf>,
    /// Runtime override config paths applied after local layers.
    pub runtime_paths: Vec<PathBuf>,
    /// In-memory overrides applied last (e.g. CLI flags).
    pub runtime_overrides: Vec<Value>,
    /// Marker files/dirs used to detect the project root.
    pub project_root_markers: Vec<String>,
}

impl LayeredConfigOptions {
    /// Create options with default layer locations for the provided cwd.
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            user_config_path: layer_io::default_user_config_path(),
            runtime_paths: Vec::new(),
            runtime_overrides: Vec::new(),
            project_root_markers: DEFAULT_PROJECT_ROOT_MARKERS
                .iter()
                .map(|marker| marker.to_string())
                .collect(),
        }
    }

    /// Replace the user config path; `None` skips the user layer.
    pub fn with_user_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.user_config_path = path;
        self
    }

    /// Add a runtime override config path.
    pub fn with_runtime_path(mut self, path: impl AsRef<Path>) -> Self {
        self.runtime_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Add an in-memory override applied after every file layer.
    pub fn with_override(mut self, value: Value) -> Self {
        self.runtime_overrides.push(value);
        self
    }
}

impl TrawlConfig {
    /// Load a single config from a path (no layering).
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        info!("loading config from path: {}", path.as_ref().display());
        let contents = fs::read_to_string(path)?;
        let value: Value = json5::from_str(&contents)?;
        config_from_value(value, "config")
    }

    /// Load a single config from JSON5 contents (no layering).
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        debug!("loading config from raw contents (len={})", contents.len());
        let value: Value = json5::from_str(contents)?;
        config_from_value(value, "config")
    }

    /// Load a layered config stack using the default layer locations.
    pub fn load_layered(cwd: impl AsRef<Path>) -> Result<LayeredConfig, ConfigError> {
        info!(
            "loading layered config with defaults (cwd={})",
            cwd.as_ref().display()
        );
        Self::load_layered_with_options(LayeredConfigOptions::new(cwd))
    }

    /// Load a layered config stack using explicit layer locations and overrides.
    ///
    /// Layer precedence (low -> high): user, project, cwd, runtime paths,
    /// runtime overrides.
    pub fn load_layered_with_options(
        options: LayeredConfigOptions,
    ) -> Result<LayeredConfig, ConfigError> {
        let cwd = utils::normalize_path(&options.cwd)?;
        debug!("normalized cwd for config load: {}", cwd.display());
        let mut layers = Vec::new();
        let mut merge_layers = Vec::new();
        let mut seen_paths = HashSet::new();

        let mut candidates = Vec::new();
        if let Some(path) = options.user_config_path.clone() {
            candidates.push((ConfigLayerSource::User, path));
        }
        match utils::find_project_root(&cwd, &options.project_root_markers) {
            Some(root) => {
                debug!("resolved project root: {}", root.display());
                candidates.push((
                    ConfigLayerSource::Project,
                    root.join(DEFAULT_CONFIG_DIR).join(DEFAULT_CONFIG_FILE),
                ));
            }
            None => debug!("project root not found; skipping project layer"),
        }
        candidates.push((ConfigLayerSource::Cwd, cwd.join(DEFAULT_CONFIG_FILE)));

        for (source, path) in candidates {
            if !path.exists() {
                debug!(
                    "skipping missing layer (source={:?}, path={})",
                    source,
                    path.display()
                );
                continue;
            }
            if !seen_paths.insert(utils::unique_path(&path)) {
                debug!(
                    "skipping duplicate layer (source={:?}, path={})",
                    source,
                    path.display()
                );
                continue;
            }
            let loaded = layer_io::load_required_layer(source, &path)?;
            layers.push(loaded.meta.clone());
            merge_layers.push(loaded);
        }

        for runtime_path in &options.runtime_paths {
            let loaded = layer_io::load_required_layer(ConfigLayerSource::Runtime, runtime_path)?;
            debug!("loaded runtime layer (path={})", runtime_path.display());
            layers.push(loaded.meta.clone());
            merge_layers.push(loaded);
        }

        for (index, value) in options.runtime_overrides.into_iter().enumerate() {
            schema::validate_layer_schema(&value, &format!("override[{index}]"))?;
            let meta = ConfigLayer {
                source: ConfigLayerSource::Runtime,
                path: None,
            };
            layers.push(meta.clone());
            merge_layers.push(LoadedLayer { meta, value });
        }

        let mut merged = Value::Object(serde_json::Map::new());
        for layer in merge_layers {
            merge::merge_json_values(&mut merged, &layer.value);
        }

        let config = config_from_value(merged, "effective")?;
        info!("layered config loaded (layers={})", layers.len());
        Ok(LayeredConfig { config, layers })
    }

    /// Validate configuration invariants that cannot be expressed in serde.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.crawl.max_pages == 0 {
            return Err(ConfigError::Invalid(
                "crawl.max_pages must be at least 1".to_string(),
            ));
        }
        if self.crawl.seed_timeout_ms == 0 || self.crawl.page_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "crawl timeouts must be greater than zero".to_string(),
            ));
        }
        if self.dispatch.segment_limit == 0 {
            return Err(ConfigError::Invalid(
                "dispatch.segment_limit must be at least 1".to_string(),
            ));
        }
        let retrieval = &self.memory.retrieval;
        for (name, value) in [
            ("memory.retrieval.floor", retrieval.floor),
            ("memory.retrieval.token_weight", retrieval.token_weight),
            ("memory.retrieval.url_bonus", retrieval.url_bonus),
            ("router.answer_threshold", self.router.answer_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a non-negative number"
                )));
            }
        }
        if self.router.answer_threshold < retrieval.floor {
            return Err(ConfigError::Invalid(
                "router.answer_threshold must not be below memory.retrieval.floor".to_string(),
            ));
        }
        Ok(())
    }
}

/// Internal representation of a loaded config layer.
#[derive(Debug, Clone)]
struct LoadedLayer {
    meta: ConfigLayer,
    value: Value,
}

fn config_from_value(value: Value, label: &str) -> Result<TrawlConfig, ConfigError> {
    schema::validate_layer_schema(&value, label)?;
    let config: TrawlConfig = serde_json::from_value(value)?;
    config.validate()?;
    Ok(config)
}
