//! Scenario files: run settings, prices, wells and groups in YAML or JSON.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use econ_core::{EngineConfig, WellInput};

use crate::group::GroupInput;
use crate::revenue::FlatPriceRevenue;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("io error: {0}")]
    Io(String),
    #[error("invalid scenario: {0}")]
    Invalid(String),
    #[error("unsupported scenario format '{0}' (expected .yaml, .yml or .json)")]
    UnsupportedFormat(String),
}

impl From<std::io::Error> for ScenarioError {
    fn from(e: std::io::Error) -> Self {
        ScenarioError::Io(e.to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScenarioFormat {
    Yaml,
    Json,
}

impl ScenarioFormat {
    pub fn from_path(path: &Path) -> Result<Self, ScenarioError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            _ => Err(ScenarioError::UnsupportedFormat(ext)),
        }
    }
}

/// One batch run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub settings: EngineConfig,
    #[serde(default)]
    pub prices: FlatPriceRevenue,
    #[serde(default)]
    pub wells: Vec<WellInput>,
    #[serde(default)]
    pub groups: Vec<GroupInput>,
}

pub fn parse_scenario(text: &str, format: ScenarioFormat) -> Result<Scenario, ScenarioError> {
    match format {
        ScenarioFormat::Yaml => {
            serde_yaml::from_str(text).map_err(|e| ScenarioError::Invalid(e.to_string()))
        }
        ScenarioFormat::Json => {
            serde_json::from_str(text).map_err(|e| ScenarioError::Invalid(e.to_string()))
        }
    }
}

pub fn load_scenario<P: AsRef<Path>>(path: P) -> Result<Scenario, ScenarioError> {
    let path = path.as_ref();
    let format = ScenarioFormat::from_path(path)?;
    let text = fs::read_to_string(path)?;
    let scenario = parse_scenario(&text, format)?;
    info!(
        path = %path.display(),
        wells = scenario.wells.len(),
        groups = scenario.groups.len(),
        "scenario loaded"
    );
    Ok(scenario)
}
