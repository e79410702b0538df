//! Engine configuration.
//!
//! Canvas spacing and metric floors are passed explicitly into every
//! derivation. They can be read from a TOML file; absent keys keep their
//! defaults.
//!
//! ```toml
//! [layout]
//! vertical_spacing = 120.0
//! horizontal_spacing = 220.0
//! padding = 40.0
//!
//! [metrics]
//! cost_floor = 0.01
//! ```

use crate::domain::layering::LayoutConfig;
use crate::domain::metrics::MetricsConfig;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub layout: LayoutConfig,
    pub metrics: MetricsConfig,
}

impl EngineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load from `path` if given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}
