//! Agency configuration, persisted as TOML.
//!
//! Every field has a serde default, so an empty file yields the same agency
//! as [`AgencyConfig::default`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AgencyResult, ConfigError};

/// Top-level configuration for an [`Agency`](crate::agency::Agency).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgencyConfig {
    /// Capacity of the shared atomspace.
    #[serde(default = "default_max_atoms")]
    pub max_atoms: usize,
    /// Confidence added to an experience atom on each `learn`.
    #[serde(default = "default_learning_step")]
    pub learning_step: f32,
    /// Forward-chaining parameters.
    #[serde(default)]
    pub inference: InferenceConfig,
}

/// How rule application shapes the atoms it derives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Derived strength = belief strength × this factor.
    #[serde(default = "default_strength_factor")]
    pub strength_factor: f32,
    /// Derived confidence = belief confidence × this factor.
    #[serde(default = "default_confidence_factor")]
    pub confidence_factor: f32,
    /// Name given to every derived atom.
    #[serde(default = "default_conclusion_name")]
    pub conclusion_name: String,
}

fn default_max_atoms() -> usize {
    10_000
}
fn default_learning_step() -> f32 {
    0.05
}
fn default_strength_factor() -> f32 {
    0.8
}
fn default_confidence_factor() -> f32 {
    0.9
}
fn default_conclusion_name() -> String {
    "inferred_knowledge".into()
}

impl Default for AgencyConfig {
    fn default() -> Self {
        Self {
            max_atoms: default_max_atoms(),
            learning_step: default_learning_step(),
            inference: InferenceConfig::default(),
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            strength_factor: default_strength_factor(),
            confidence_factor: default_confidence_factor(),
            conclusion_name: default_conclusion_name(),
        }
    }
}

impl AgencyConfig {
    /// Default configuration with a different atomspace capacity.
    pub fn with_max_atoms(max_atoms: usize) -> Self {
        Self {
            max_atoms,
            ..Default::default()
        }
    }

    /// Check ranges. Called by `Agency::init` and after loading.
    pub fn validate(&self) -> AgencyResult<()> {
        if self.max_atoms == 0 {
            return Err(invalid("max_atoms must be > 0"));
        }
        let unit = 0.0..=1.0;
        if !unit.contains(&self.learning_step) {
            return Err(invalid("learning_step must lie in [0.0, 1.0]"));
        }
        if !unit.contains(&self.inference.strength_factor)
            || !unit.contains(&self.inference.confidence_factor)
        {
            return Err(invalid("inference factors must lie in [0.0, 1.0]"));
        }
        if self.inference.conclusion_name.is_empty() {
            return Err(invalid("inference.conclusion_name cannot be empty"));
        }
        Ok(())
    }

    /// Load from a TOML file and validate.
    pub fn load(path: &Path) -> AgencyResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> AgencyResult<()> {
        let content = self.to_toml_string()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })?;
        Ok(())
    }

    /// Render as pretty TOML.
    pub fn to_toml_string(&self) -> AgencyResult<String> {
        toml::to_string_pretty(self).map_err(|e| {
            ConfigError::Serialize {
                message: e.to_string(),
            }
            .into()
        })
    }
}

fn invalid(message: &str) -> crate::error::AgencyError {
    ConfigError::Invalid {
        message: message.into(),
    }
    .into()
}
