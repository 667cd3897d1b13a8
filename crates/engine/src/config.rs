//! Engine configuration, loaded from a JSON file.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use foundation::{Color, LayerKind};
use layers::{DEFAULT_CHUNK_SIZE, LayerStyle};
use scene::SelectionMode;
use serde::{Deserialize, Serialize};
use streaming::{DEFAULT_VIEWPORT_DEBOUNCE_MS, FeatureSource, FileFeatureSource, HttpFeatureSource};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config json: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceBackend {
    Http { base_url: String },
    File { dir: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(flatten)]
    pub backend: SourceBackend,
    /// Re-query with the visible rectangle after the camera settles.
    /// Only honored by the HTTP backend.
    #[serde(default)]
    pub viewport_scoped: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            backend: SourceBackend::File {
                dir: PathBuf::from("data"),
            },
            viewport_scoped: false,
        }
    }
}

impl SourceConfig {
    pub fn supports_viewport(&self) -> bool {
        self.viewport_scoped && matches!(self.backend, SourceBackend::Http { .. })
    }

    pub fn build(&self) -> Arc<dyn FeatureSource> {
        match &self.backend {
            SourceBackend::Http { base_url } => Arc::new(
                HttpFeatureSource::new(base_url.clone()).viewport_scoped(self.viewport_scoped),
            ),
            SourceBackend::File { dir } => Arc::new(FileFeatureSource::new(dir.clone())),
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub name: String,
    pub kind: LayerKind,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub style: LayerStyle,
}

impl LayerConfig {
    pub fn new(name: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            name: name.into(),
            kind,
            enabled: true,
            style: LayerStyle::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub chunk_size: usize,
    /// Features materialized per frame across all layers.
    pub frame_budget_features: u32,
    pub viewport_debounce_ms: u64,
    pub highlight_color: Color,
    pub selection_mode: SelectionMode,
    pub source: SourceConfig,
    pub layers: Vec<LayerConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            frame_budget_features: 1000,
            viewport_debounce_ms: DEFAULT_VIEWPORT_DEBOUNCE_MS,
            highlight_color: Color::rgb8(0xff, 0xff, 0x00),
            selection_mode: SelectionMode::Accumulate,
            source: SourceConfig::default(),
            layers: LayerKind::ALL
                .iter()
                .map(|&kind| LayerConfig::new(kind.as_str(), kind))
                .collect(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_json::from_str(s)?;
        config.chunk_size = config.chunk_size.max(1);
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut names = BTreeSet::new();
        for layer in &self.layers {
            if layer.name.is_empty() {
                return Err(ConfigError::Invalid("layer name is empty".into()));
            }
            if !names.insert(layer.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate layer name {:?}",
                    layer.name
                )));
            }
            if let Some(alpha) = layer.style.alpha
                && !(0.0..=1.0).contains(&alpha)
            {
                return Err(ConfigError::Invalid(format!(
                    "layer {:?}: alpha {alpha} outside [0, 1]",
                    layer.name
                )));
            }
        }
        if self.frame_budget_features == 0 {
            return Err(ConfigError::Invalid(
                "frame_budget_features must be positive".into(),
            ));
        }
        Ok(())
    }
}
