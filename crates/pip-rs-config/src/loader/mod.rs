//! Layered configuration loader.
//!
//! Discovers configuration layers (user, project, cwd, runtime overrides),
//! validates each against the schema, merges them, and produces a final
//! `PipConfig`.

mod schema;

#[cfg(test)]
mod tests;

use crate::{ConfigError, MAX_HISTORY_WINDOW, PipConfig};
use directories::UserDirs;
use log::{debug, info};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Default config filename in local layers.
const DEFAULT_CONFIG_FILE: &str = "pip.json5";
/// Default config directory under the home or project root.
const DEFAULT_CONFIG_DIR: &str = ".pip";
/// Marker files/dirs that identify a project root.
const DEFAULT_PROJECT_ROOT_MARKERS: &[&str] = &[".git"];

/// Effective config plus metadata about which layers were loaded.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    /// The merged, validated config.
    pub config: PipConfig,
    /// Layers that contributed, lowest precedence first.
    pub layers: Vec<ConfigLayer>,
}

/// Origin for a single config layer in the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayerSource {
    /// `~/.pip/pip.json5`.
    User,
    /// `.pip/pip.json5` under the project root.
    Project,
    /// `pip.json5` in the working directory.
    Cwd,
    /// Explicit override paths (highest precedence).
    Runtime,
}

impl ConfigLayerSource {
    fn label(&self) -> &'static str {
        match self {
            ConfigLayerSource::User => "user",
            ConfigLayerSource::Project => "project",
            ConfigLayerSource::Cwd => "cwd",
            ConfigLayerSource::Runtime => "runtime",
        }
    }
}

/// Metadata about a loaded config layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigLayer {
    pub source: ConfigLayerSource,
    pub path: PathBuf,
}

/// Options controlling layer discovery and overrides.
#[derive(Debug, Clone)]
pub struct LayeredConfigOptions {
    /// Working directory used to find the cwd and project layers.
    pub cwd: PathBuf,
    /// User config path (defaults to `~/.pip/pip.json5`).
    pub user_config_path: Option<PathBuf>,
    /// Runtime override config paths applied last, in order.
    pub runtime_paths: Vec<PathBuf>,
    /// Marker files/dirs used to detect the project root.
    pub project_root_markers: Vec<String>,
}

impl LayeredConfigOptions {
    /// Create options with default layer locations for the provided cwd.
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            user_config_path: UserDirs::new().map(|dirs| {
                dirs.home_dir()
                    .join(DEFAULT_CONFIG_DIR)
                    .join(DEFAULT_CONFIG_FILE)
            }),
            runtime_paths: Vec::new(),
            project_root_markers: DEFAULT_PROJECT_ROOT_MARKERS
                .iter()
                .map(|marker| marker.to_string())
                .collect(),
        }
    }

    /// Replace the user config location; `None` skips the user layer.
    pub fn with_user_path(mut self, path: Option<PathBuf>) -> Self {
        self.user_config_path = path;
        self
    }

    /// Add a runtime override config path that is applied last.
    pub fn with_runtime_path(mut self, path: impl AsRef<Path>) -> Self {
        self.runtime_paths.push(path.as_ref().to_path_buf());
        self
    }
}

impl PipConfig {
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
        Self::load_layered_with_options(LayeredConfigOptions::new(cwd))
    }

    /// Load a layered config stack.
    ///
    /// Layer precedence (low -> high): user, project, cwd, runtime overrides.
    /// Missing optional layers are skipped; missing runtime paths are errors.
    pub fn load_layered_with_options(
        options: LayeredConfigOptions,
    ) -> Result<LayeredConfig, ConfigError> {
        let cwd = match options.cwd.canonicalize() {
            Ok(path) => path,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => options.cwd.clone(),
            Err(err) => return Err(ConfigError::ReadFailed(err)),
        };

        let mut candidates = Vec::new();
        if let Some(path) = options.user_config_path.clone() {
            candidates.push((ConfigLayerSource::User, path));
        }
        if let Some(root) = find_project_root(&cwd, &options.project_root_markers) {
            debug!("resolved project root: {}", root.display());
            candidates.push((
                ConfigLayerSource::Project,
                root.join(DEFAULT_CONFIG_DIR).join(DEFAULT_CONFIG_FILE),
            ));
        }
        candidates.push((ConfigLayerSource::Cwd, cwd.join(DEFAULT_CONFIG_FILE)));

        let mut merged = Value::Object(serde_json::Map::new());
        let mut layers = Vec::new();
        let mut seen = HashSet::new();

        for (source, path) in candidates {
            if !path.exists() {
                debug!(
                    "skipping missing layer (source={:?}, path={})",
                    source,
                    path.display()
                );
                continue;
            }
            let unique = path.canonicalize().unwrap_or_else(|_| path.clone());
            if !seen.insert(unique) {
                debug!(
                    "skipping duplicate layer (source={:?}, path={})",
                    source,
                    path.display()
                );
                continue;
            }
            let value = read_layer(source, &path)?;
            merge_values(&mut merged, &value);
            layers.push(ConfigLayer { source, path });
        }

        for path in options.runtime_paths {
            let value = read_layer(ConfigLayerSource::Runtime, &path)?;
            merge_values(&mut merged, &value);
            layers.push(ConfigLayer {
                source: ConfigLayerSource::Runtime,
                path,
            });
        }

        let config = config_from_value(merged, "effective")?;
        info!("layered config loaded (layers={})", layers.len());
        Ok(LayeredConfig { config, layers })
    }

    /// Validate invariants that cannot be expressed in serde.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let window = self.assistant.history_window;
        if window == 0 || window > MAX_HISTORY_WINDOW {
            return Err(out_of_range(
                "assistant.history_window",
                format!("between 1 and {MAX_HISTORY_WINDOW}"),
                window,
            ));
        }
        for (path, value) in [
            (
                "classifier.confidence_threshold",
                self.classifier.confidence_threshold,
            ),
            ("decide.min_relevance", self.decide.min_relevance),
            ("photo.min_confidence", self.photo.min_confidence),
            ("photo.confident_above", self.photo.confident_above),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(out_of_range(path, "between 0 and 1", value));
            }
        }
        if self.photo.min_confidence > self.photo.confident_above {
            return Err(out_of_range(
                "photo.min_confidence",
                "at most photo.confident_above",
                self.photo.min_confidence,
            ));
        }
        if self.recommender.top_n == 0 {
            return Err(out_of_range("recommender.top_n", "at least 1", 0));
        }
        if self.recommender.candidate_pool < self.recommender.top_n {
            return Err(out_of_range(
                "recommender.candidate_pool",
                "at least recommender.top_n",
                self.recommender.candidate_pool,
            ));
        }
        Ok(())
    }
}

fn out_of_range(
    path: &str,
    expected: impl Into<String>,
    actual: impl ToString,
) -> ConfigError {
    ConfigError::OutOfRange {
        path: path.to_string(),
        expected: expected.into(),
        actual: actual.to_string(),
    }
}

fn config_from_value(value: Value, label: &str) -> Result<PipConfig, ConfigError> {
    schema::validate_layer_schema(&value, label)?;
    let config: PipConfig = serde_json::from_value(value)?;
    config.validate()?;
    Ok(config)
}

/// Read and schema-check a single layer from disk.
fn read_layer(source: ConfigLayerSource, path: &Path) -> Result<Value, ConfigError> {
    debug!(
        "loading config layer (source={:?}, path={})",
        source,
        path.display()
    );
    let contents = fs::read_to_string(path)?;
    let value: Value = json5::from_str(&contents)?;
    let label = format!("{}({})", source.label(), path.display());
    schema::validate_layer_schema(&value, &label)?;
    Ok(value)
}

/// Walk ancestors to find a directory containing any marker entries.
fn find_project_root(cwd: &Path, markers: &[String]) -> Option<PathBuf> {
    cwd.ancestors()
        .find(|ancestor| markers.iter().any(|marker| ancestor.join(marker).exists()))
        .map(Path::to_path_buf)
}

/// Merge overlay values into the base; objects merge recursively, everything else replaces.
fn merge_values(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (slot, value) => *slot = value.clone(),
    }
}
